//! Dependency tree construction and traversal.
//!
//! Nodes live in a petgraph arena. A node owns nothing: children are listed
//! by index and the parent link (`father`) is an index as well, so the only
//! ownership is arena → node.

use std::collections::VecDeque;
use std::fmt;

use ipdb_core::package::PackageReference;
use ipdb_util::errors::IpdbError;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

/// A node of the dependency tree.
///
/// Every node except the synthetic root wraps exactly one reference.
#[derive(Debug, Clone)]
pub struct GraphNode {
    itself: Option<PackageReference>,
    father: Option<NodeIndex>,
    children: Vec<(String, NodeIndex)>,
    depth: usize,
}

impl GraphNode {
    /// The reference this node stands for; `None` for the root.
    pub fn itself(&self) -> Option<&PackageReference> {
        self.itself.as_ref()
    }

    /// Parent node; `None` for the root.
    pub fn father(&self) -> Option<NodeIndex> {
        self.father
    }

    /// Children by name, in manifest order.
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeIndex)> + '_ {
        self.children.iter().map(|(name, idx)| (name.as_str(), *idx))
    }

    pub fn child(&self, name: &str) -> Option<NodeIndex> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, idx)| *idx)
    }

    pub fn is_root(&self) -> bool {
        self.itself.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Distance from the root (top-level IPs are at depth 1).
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.itself {
            Some(r) => write!(f, "{r}"),
            None => write!(f, "root"),
        }
    }
}

/// The full IP hierarchy rooted at the top-level IP list.
///
/// Edge weights are the 0-based position of the child in its parent's manifest.
#[derive(Debug, Clone)]
pub struct DependencyTree {
    graph: DiGraph<GraphNode, usize>,
    root: NodeIndex,
}

impl DependencyTree {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(GraphNode {
            itself: None,
            father: None,
            children: Vec::new(),
            depth: 0,
        });
        Self { graph, root }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    pub fn reference(&self, idx: NodeIndex) -> Option<&PackageReference> {
        self.graph[idx].itself()
    }

    /// The reference of the IP whose manifest listed `idx`.
    ///
    /// `None` when `idx` comes straight from the top-level list (or is the root).
    pub fn retrieved_from(&self, idx: NodeIndex) -> Option<&PackageReference> {
        self.graph[idx]
            .father
            .and_then(|father| self.graph[father].itself())
    }

    /// Attach the dependencies listed by `parent`'s manifest.
    ///
    /// Must be called at most once per parent. A name listed twice keeps its
    /// first position and its last binding. A name that matches one of the
    /// parent's ancestors (or the parent itself) is a cycle.
    pub(crate) fn attach_children(
        &mut self,
        parent: NodeIndex,
        references: Vec<PackageReference>,
    ) -> Result<Vec<NodeIndex>, IpdbError> {
        debug_assert!(
            self.graph[parent].children.is_empty(),
            "children of a node are attached once"
        );

        let mut ordered: Vec<PackageReference> = Vec::with_capacity(references.len());
        for reference in references {
            match ordered.iter_mut().find(|r| r.name == reference.name) {
                Some(existing) => {
                    tracing::warn!(
                        "ip '{}' is listed twice by {}, keeping {}",
                        reference.name,
                        self.graph[parent],
                        reference
                    );
                    *existing = reference;
                }
                None => ordered.push(reference),
            }
        }

        let depth = self.graph[parent].depth + 1;
        let mut attached = Vec::with_capacity(ordered.len());
        for (position, reference) in ordered.into_iter().enumerate() {
            self.check_cycle(parent, &reference)?;
            let name = reference.name.clone();
            let idx = self.graph.add_node(GraphNode {
                itself: Some(reference),
                father: Some(parent),
                children: Vec::new(),
                depth,
            });
            self.graph.add_edge(parent, idx, position);
            self.graph[parent].children.push((name, idx));
            attached.push(idx);
        }
        Ok(attached)
    }

    fn check_cycle(&self, parent: NodeIndex, reference: &PackageReference) -> Result<(), IpdbError> {
        let mut path = self.path_to(parent);
        if path.iter().any(|&idx| {
            self.reference(idx)
                .is_some_and(|r| r.name == reference.name)
        }) {
            path.retain(|&idx| !self.graph[idx].is_root());
            let mut chain: Vec<String> = path
                .iter()
                .filter_map(|&idx| self.reference(idx))
                .map(|r| r.to_string())
                .collect();
            chain.push(reference.to_string());
            return Err(IpdbError::CyclicDependency {
                chain: chain.join(" -> "),
            });
        }
        Ok(())
    }

    /// Nodes from the root down to `idx`, both included.
    pub fn path_to(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut path = vec![idx];
        let mut current = idx;
        while let Some(father) = self.graph[current].father {
            path.push(father);
            current = father;
        }
        path.reverse();
        path
    }

    /// All IP nodes in breadth-first order: level by level, each level
    /// left-to-right in manifest order. The root is excluded.
    pub fn breadth_first(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.len());
        let mut queue: VecDeque<NodeIndex> = self.graph[self.root].children().map(|(_, i)| i).collect();
        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            queue.extend(self.graph[idx].children().map(|(_, i)| i));
        }
        order
    }

    /// First occurrence of every IP name, in breadth-first order.
    pub fn flatten(&self) -> Vec<PackageReference> {
        let mut seen = std::collections::HashSet::new();
        self.breadth_first()
            .into_iter()
            .filter_map(|idx| self.reference(idx))
            .filter(|r| seen.insert(r.name.as_str()))
            .cloned()
            .collect()
    }

    /// Print the hierarchy as an indented tree.
    ///
    /// `max_depth` counts top-level IPs as depth 1; `Some(0)` prints only the root marker.
    pub fn print_tree(&self, max_depth: Option<usize>, verbose: bool) -> String {
        let mut output = String::from(".\n");
        let top: Vec<NodeIndex> = self.graph[self.root].children().map(|(_, i)| i).collect();
        let count = top.len();
        for (i, idx) in top.into_iter().enumerate() {
            self.print_subtree(&mut output, idx, "", i == count - 1, max_depth, verbose);
        }
        output
    }

    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        max_depth: Option<usize>,
        verbose: bool,
    ) {
        let node = &self.graph[idx];
        if max_depth.is_some_and(|max| node.depth > max) {
            return;
        }
        let connector = if is_last { "└── " } else { "├── " };
        if let Some(r) = node.itself() {
            output.push_str(&format!("{prefix}{connector}{}\n", r.label(verbose)));
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let count = node.children.len();
        for (i, (_, child)) in node.children.iter().enumerate() {
            self.print_subtree(output, *child, &child_prefix, i == count - 1, max_depth, verbose);
        }
    }

    /// Graphviz rendering of the hierarchy.
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::with_config(&self.graph, &[Config::EdgeNoLabel]))
    }

    /// Number of IP nodes (excluding root).
    pub fn len(&self) -> usize {
        self.graph.node_count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DependencyTree {
    fn default() -> Self {
        Self::new()
    }
}
