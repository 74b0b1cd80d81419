//! Dependency tree construction from nested manifests.
//!
//! The tree is expanded one level at a time. Manifests of all nodes on a
//! level are fetched concurrently, then children are linked in level order,
//! so the resulting tree never depends on which fetch finished first.

use std::sync::Arc;

use ipdb_core::package::PackageReference;
use ipdb_util::errors::IpdbError;
use petgraph::graph::NodeIndex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::graph::DependencyTree;
use crate::source::ManifestSource;

const DEFAULT_JOBS: usize = 8;

type Manifest = Option<Vec<PackageReference>>;

/// Expands a top-level IP list into a [`DependencyTree`].
pub struct TreeBuilder {
    source: Arc<dyn ManifestSource>,
    jobs: usize,
}

impl TreeBuilder {
    pub fn new(source: Arc<dyn ManifestSource>) -> Self {
        Self {
            source,
            jobs: DEFAULT_JOBS,
        }
    }

    /// Maximum number of manifests fetched at once. `1` fetches sequentially.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Build the tree below a synthetic root holding `roots`.
    ///
    /// Any hard fetch error aborts the build; no partial tree is returned.
    pub async fn build(&self, roots: Vec<PackageReference>) -> Result<DependencyTree, IpdbError> {
        let mut tree = DependencyTree::new();
        let root = tree.root();
        let mut frontier = tree.attach_children(root, roots)?;
        let mut depth = 1usize;

        while !frontier.is_empty() {
            let manifests = self.fetch_level(&tree, &frontier).await?;
            let mut next = Vec::new();
            for (&idx, manifest) in frontier.iter().zip(manifests) {
                if let Some(children) = manifest {
                    next.extend(tree.attach_children(idx, children)?);
                }
            }
            tracing::debug!(
                "Depth {depth}: {} ips, {} nested dependencies",
                frontier.len(),
                next.len()
            );
            frontier = next;
            depth += 1;
        }

        tracing::info!("Built dependency tree with {} ips", tree.len());
        Ok(tree)
    }

    /// Fetch the manifests of `frontier`, returned in `frontier` order.
    async fn fetch_level(
        &self,
        tree: &DependencyTree,
        frontier: &[NodeIndex],
    ) -> Result<Vec<Manifest>, IpdbError> {
        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut join_set = JoinSet::new();

        for (position, &idx) in frontier.iter().enumerate() {
            let Some(reference) = tree.reference(idx).cloned() else {
                continue;
            };
            let source = Arc::clone(&self.source);
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| IpdbError::Generic {
                    message: format!("Manifest fetch pool closed: {e}"),
                })?;
            join_set.spawn_blocking(move || {
                let _permit = permit;
                tracing::debug!("Fetching nested manifest of {reference}");
                let result = source
                    .fetch(&reference)
                    .map_err(|e| into_fetch_error(&reference, e));
                (position, result)
            });
        }

        let mut slots: Vec<Option<Result<Manifest, IpdbError>>> =
            (0..frontier.len()).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let (position, result) = joined.map_err(|e| IpdbError::Generic {
                message: format!("Manifest fetch task failed: {e}"),
            })?;
            slots[position] = Some(result);
        }

        // The first failure in tree order wins, whatever finished first.
        slots.into_iter().map(|slot| slot.unwrap_or(Ok(None))).collect()
    }
}

fn into_fetch_error(reference: &PackageReference, err: IpdbError) -> IpdbError {
    match err {
        IpdbError::Fetch { .. } => err,
        other => IpdbError::Fetch {
            package: reference.name.clone(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn ip(name: &str, commit: &str) -> PackageReference {
        PackageReference::new(name, commit)
    }

    #[tokio::test]
    async fn builds_nested_levels() {
        let source = MemorySource::new()
            .with_manifest("a", "v1", vec![ip("c", "v2")])
            .with_manifest("c", "v2", vec![ip("d", "v1")]);
        let tree = TreeBuilder::new(Arc::new(source))
            .build(vec![ip("a", "v1"), ip("b", "master")])
            .await
            .unwrap();
        assert_eq!(tree.len(), 4);

        let a = tree.node(tree.root()).child("a").unwrap();
        let c = tree.node(a).child("c").unwrap();
        assert!(tree.node(c).child("d").is_some());
        let b = tree.node(tree.root()).child("b").unwrap();
        assert!(tree.node(b).is_leaf());
    }

    #[tokio::test]
    async fn empty_root_list_builds_empty_tree() {
        let tree = TreeBuilder::new(Arc::new(MemorySource::new()))
            .build(Vec::new())
            .await
            .unwrap();
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn nested_failure_aborts_build() {
        let source = MemorySource::new()
            .with_manifest("a", "v1", vec![ip("c", "v2")])
            .with_failure("c", "v2", "remote unreachable");
        let err = TreeBuilder::new(Arc::new(source))
            .build(vec![ip("a", "v1")])
            .await
            .unwrap_err();
        match err {
            IpdbError::Fetch { package, message } => {
                assert_eq!(package, "c");
                assert_eq!(message, "remote unreachable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn first_failure_in_tree_order_is_reported() {
        let source = MemorySource::new()
            .with_failure("a", "v1", "first")
            .with_failure("b", "v1", "second");
        let err = TreeBuilder::new(Arc::new(source))
            .jobs(4)
            .build(vec![ip("a", "v1"), ip("b", "v1")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("first"), "got: {err}");
    }

    #[tokio::test]
    async fn cyclic_manifest_is_rejected() {
        let source = MemorySource::new()
            .with_manifest("a", "v1", vec![ip("b", "v1")])
            .with_manifest("b", "v1", vec![ip("a", "v1")]);
        let err = TreeBuilder::new(Arc::new(source))
            .build(vec![ip("a", "v1")])
            .await
            .unwrap_err();
        assert!(matches!(err, IpdbError::CyclicDependency { .. }), "got: {err}");
    }
}
