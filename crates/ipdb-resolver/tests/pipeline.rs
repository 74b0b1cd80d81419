use std::sync::Arc;
use std::time::Duration;

use ipdb_core::package::PackageReference;
use ipdb_resolver::builder::TreeBuilder;
use ipdb_resolver::conflict::{aggregate, Conflict};
use ipdb_resolver::graph::DependencyTree;
use ipdb_resolver::policy::{
    CancelFlag, Decider, Decision, FirstCandidate, InvalidSelection, Resolution,
    ResolutionPolicy,
};
use ipdb_resolver::source::{ManifestSource, MemorySource};
use ipdb_util::errors::IpdbError;

fn ip(name: &str, commit: &str) -> PackageReference {
    PackageReference::new(name, commit)
        .with_server("git@github.com")
        .with_group("pulp-platform")
}

fn ids(packages: &[PackageReference]) -> Vec<String> {
    packages.iter().map(|r| r.to_string()).collect()
}

/// Pins the closure signature so it satisfies `Decider`.
fn decider<F>(f: F) -> F
where
    F: FnMut(&Conflict<'_>) -> Decision,
{
    f
}

async fn build(source: MemorySource, roots: Vec<PackageReference>) -> DependencyTree {
    TreeBuilder::new(Arc::new(source))
        .build(roots)
        .await
        .unwrap()
}

/// root → A@v1, B@master; A → C@v2; B → C@v3
fn diamond() -> (MemorySource, Vec<PackageReference>) {
    let source = MemorySource::new()
        .with_manifest("A", "v1", vec![ip("C", "v2")])
        .with_manifest("B", "master", vec![ip("C", "v3")]);
    (source, vec![ip("A", "v1"), ip("B", "master")])
}

#[tokio::test]
async fn diamond_conflict_resolves_to_selected_candidate() {
    let (source, roots) = diamond();
    let tree = build(source, roots).await;
    let groups = aggregate(&tree);

    let mut seen = Vec::new();
    let mut pick_first = decider(|c| {
        seen.push((
            c.name.to_string(),
            c.candidates
                .iter()
                .map(|cand| cand.describe(false))
                .collect::<Vec<_>>(),
        ));
        Decision::index(1)
    });
    let resolution = ResolutionPolicy::new().resolve(&tree, &groups, &mut pick_first);

    assert_eq!(
        seen,
        vec![(
            "C".to_string(),
            vec![
                "pulp-platform/C @ v2 (retrieved from pulp-platform/A @ v1)".to_string(),
                "pulp-platform/C @ v3 (retrieved from pulp-platform/B @ master)".to_string(),
            ]
        )]
    );
    let packages = resolution.into_packages().unwrap();
    assert_eq!(ids(&packages), ["A@v1", "B@master", "C@v2"]);
}

#[tokio::test]
async fn unique_names_never_ask() {
    let source = MemorySource::new()
        .with_manifest("a", "v1", vec![ip("c", "v1"), ip("d", "v1")])
        .with_manifest("b", "v1", vec![ip("e", "v1")]);
    let tree = build(source, vec![ip("a", "v1"), ip("b", "v1")]).await;
    let groups = aggregate(&tree);

    let mut calls = 0;
    let mut counting = decider(|_| {
        calls += 1;
        Decision::Cancel
    });
    let resolution = ResolutionPolicy::new().resolve(&tree, &groups, &mut counting);

    assert_eq!(calls, 0);
    let packages = resolution.into_packages().unwrap();
    assert_eq!(packages.len(), tree.len());
    assert_eq!(ids(&packages), ["a@v1", "b@v1", "c@v1", "d@v1", "e@v1"]);
}

#[tokio::test]
async fn zero_conflicts_equals_flattening() {
    let source = MemorySource::new()
        .with_manifest("a", "v1", vec![ip("c", "v1")])
        .with_manifest("c", "v1", vec![ip("d", "v1")]);
    let tree = build(source, vec![ip("a", "v1"), ip("b", "v1")]).await;
    let groups = aggregate(&tree);

    let resolution = ResolutionPolicy::new().resolve(&tree, &groups, &mut FirstCandidate);
    assert_eq!(resolution, Resolution::Resolved(tree.flatten()));
}

#[tokio::test]
async fn candidates_follow_discovery_order() {
    let source = MemorySource::new()
        .with_manifest("a", "v1", vec![ip("x", "v2")])
        .with_manifest("b", "v1", vec![ip("c", "v1")])
        .with_manifest("c", "v1", vec![ip("x", "v4")]);
    let roots = vec![ip("a", "v1"), ip("x", "v1"), ip("b", "v1")];
    let tree = build(source, roots).await;
    let groups = aggregate(&tree);

    let mut commits = Vec::new();
    let mut pick_last = decider(|c| {
        commits = c
            .candidates
            .iter()
            .map(|cand| cand.reference.commit.clone())
            .collect();
        Decision::index(c.candidates.len())
    });
    let packages = ResolutionPolicy::new()
        .resolve(&tree, &groups, &mut pick_last)
        .into_packages()
        .unwrap();

    assert_eq!(commits, ["v1", "v2", "v4"]);
    assert_eq!(ids(&packages), ["a@v1", "x@v4", "b@v1", "c@v1"]);
}

#[tokio::test]
async fn cancellation_discards_everything() {
    let source = MemorySource::new()
        .with_manifest("a", "v1", vec![ip("p", "v2"), ip("q", "v2"), ip("r", "v2")])
        .with_manifest("b", "v1", vec![ip("p", "v3"), ip("q", "v3"), ip("r", "v3")]);
    let tree = build(source, vec![ip("a", "v1"), ip("b", "v1")]).await;
    let groups = aggregate(&tree);
    assert_eq!(groups.conflict_count(), 3);

    let mut asked = Vec::new();
    let mut cancel_second = decider(|c| {
        asked.push(c.name.to_string());
        if asked.len() == 2 {
            Decision::Cancel
        } else {
            Decision::index(1)
        }
    });
    let resolution = ResolutionPolicy::new().resolve(&tree, &groups, &mut cancel_second);

    assert_eq!(resolution, Resolution::Aborted);
    assert_eq!(asked, ["p", "q"]);
}

#[tokio::test]
async fn external_cancel_between_conflicts() {
    let (source, roots) = diamond();
    let tree = build(source, roots).await;
    let groups = aggregate(&tree);

    let flag = CancelFlag::new();
    let policy = ResolutionPolicy::with_cancel_flag(flag.clone());
    flag.cancel();
    let resolution = policy.resolve(&tree, &groups, &mut FirstCandidate);
    assert!(resolution.is_aborted());
}

#[tokio::test]
async fn cancel_raised_during_a_decision_applies_to_the_next_name() {
    let source = MemorySource::new()
        .with_manifest("a", "v1", vec![ip("p", "v2"), ip("z", "v1")])
        .with_manifest("b", "v1", vec![ip("p", "v3")]);
    let tree = build(source, vec![ip("a", "v1"), ip("b", "v1")]).await;
    let groups = aggregate(&tree);

    let flag = CancelFlag::new();
    let policy = ResolutionPolicy::with_cancel_flag(flag.clone());
    let mut interrupted = decider(|_| {
        flag.cancel();
        Decision::index(2)
    });
    assert!(policy.resolve(&tree, &groups, &mut interrupted).is_aborted());
}

/// Replays scripted answers and records rejections.
struct Scripted {
    answers: Vec<&'static str>,
    rejected: Vec<InvalidSelection>,
}

impl Decider for Scripted {
    fn decide(&mut self, _conflict: &Conflict<'_>) -> Decision {
        Decision::Choice(self.answers.remove(0).to_string())
    }

    fn rejected(&mut self, _conflict: &Conflict<'_>, error: &InvalidSelection) {
        self.rejected.push(error.clone());
    }
}

#[tokio::test]
async fn invalid_input_is_asked_again() {
    let source = MemorySource::new()
        .with_manifest("a", "v1", vec![ip("x", "v2")])
        .with_manifest("b", "v1", vec![ip("x", "v3")]);
    let tree = build(source, vec![ip("a", "v1"), ip("b", "v1"), ip("x", "v1")]).await;
    let groups = aggregate(&tree);
    assert_eq!(groups.get("x").unwrap().len(), 3);

    let mut scripted = Scripted {
        answers: vec!["abc", "0", "99", "2"],
        rejected: Vec::new(),
    };
    let packages = ResolutionPolicy::new()
        .resolve(&tree, &groups, &mut scripted)
        .into_packages()
        .unwrap();

    assert!(scripted.answers.is_empty());
    assert_eq!(scripted.rejected.len(), 3);
    assert!(matches!(scripted.rejected[0], InvalidSelection::NotANumber { .. }));
    assert!(matches!(scripted.rejected[1], InvalidSelection::OutOfRange { .. }));
    assert!(matches!(scripted.rejected[2], InvalidSelection::OutOfRange { .. }));
    let x = packages.iter().find(|r| r.name == "x").unwrap();
    assert_eq!(x.commit, "v2");
}

#[tokio::test]
async fn same_input_same_output() {
    let run = |jobs| async move {
        let (source, roots) = diamond();
        let tree = TreeBuilder::new(Arc::new(source))
            .jobs(jobs)
            .build(roots)
            .await
            .unwrap();
        let groups = aggregate(&tree);
        ResolutionPolicy::new().resolve(&tree, &groups, &mut decider(|_| Decision::index(2)))
    };
    let first = run(1).await;
    let second = run(8).await;
    assert_eq!(first, second);
    assert_eq!(
        ids(&first.into_packages().unwrap()),
        ["A@v1", "B@master", "C@v3"]
    );
}

/// Delays every fetch so that earlier siblings finish last.
struct Staggered {
    inner: MemorySource,
}

impl ManifestSource for Staggered {
    fn fetch(
        &self,
        reference: &PackageReference,
    ) -> Result<Option<Vec<PackageReference>>, IpdbError> {
        let delay = match reference.name.as_str() {
            "a" => 60,
            "b" => 30,
            _ => 0,
        };
        std::thread::sleep(Duration::from_millis(delay));
        self.inner.fetch(reference)
    }
}

#[tokio::test]
async fn concurrent_fetch_keeps_manifest_order() {
    let inner = MemorySource::new()
        .with_manifest("a", "v1", vec![ip("x", "v1")])
        .with_manifest("b", "v1", vec![ip("x", "v2")])
        .with_manifest("c", "v1", vec![ip("x", "v3")]);
    let tree = TreeBuilder::new(Arc::new(Staggered { inner }))
        .jobs(3)
        .build(vec![ip("a", "v1"), ip("b", "v1"), ip("c", "v1")])
        .await
        .unwrap();
    let groups = aggregate(&tree);
    let conflict = groups.get("x").unwrap().conflict(&tree);
    let parents: Vec<&str> = conflict
        .candidates
        .iter()
        .map(|c| c.retrieved_from.unwrap().name.as_str())
        .collect();
    assert_eq!(parents, ["a", "b", "c"]);
}

#[tokio::test]
async fn fetch_error_is_not_an_abort() {
    let (source, roots) = diamond();
    let source = source.with_failure("C", "v3", "malformed manifest");
    let err = TreeBuilder::new(Arc::new(source))
        .build(roots)
        .await
        .unwrap_err();
    assert!(matches!(err, IpdbError::Fetch { .. }), "got: {err}");
}
