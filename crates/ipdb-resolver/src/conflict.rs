//! IP conflict detection and reporting.
//!
//! [`aggregate`] walks the tree breadth-first (level by level, left-to-right
//! in manifest order) and groups every occurrence of every IP name. That
//! order is the order conflicts are presented in and the order of the final
//! flat list.

use std::collections::HashMap;
use std::fmt;

use ipdb_core::package::PackageReference;
use petgraph::graph::NodeIndex;

use crate::graph::DependencyTree;

/// All occurrences of one IP name in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictGroup {
    pub name: String,
    pub occurrences: Vec<NodeIndex>,
}

impl ConflictGroup {
    /// More than one occurrence means a user (or policy) has to choose.
    pub fn is_conflict(&self) -> bool {
        self.occurrences.len() > 1
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// The occurrences annotated with where they were found.
    pub fn conflict<'a>(&'a self, tree: &'a DependencyTree) -> Conflict<'a> {
        let candidates = self
            .occurrences
            .iter()
            .enumerate()
            .filter_map(|(i, &node)| {
                Some(Candidate {
                    position: i + 1,
                    node,
                    reference: tree.reference(node)?,
                    retrieved_from: tree.retrieved_from(node),
                })
            })
            .collect();
        Conflict {
            name: &self.name,
            candidates,
        }
    }
}

/// Occurrence groups keyed by IP name, in first-discovery order.
#[derive(Debug, Clone, Default)]
pub struct ConflictGroups {
    groups: Vec<ConflictGroup>,
    index: HashMap<String, usize>,
}

impl ConflictGroups {
    fn push(&mut self, name: &str, node: NodeIndex) {
        match self.index.get(name) {
            Some(&pos) => self.groups[pos].occurrences.push(node),
            None => {
                self.index.insert(name.to_string(), self.groups.len());
                self.groups.push(ConflictGroup {
                    name: name.to_string(),
                    occurrences: vec![node],
                });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ConflictGroup> {
        self.index.get(name).map(|&pos| &self.groups[pos])
    }

    /// Every group, conflicted or not, in first-discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &ConflictGroup> {
        self.groups.iter()
    }

    /// Only the groups with more than one occurrence.
    pub fn conflicts(&self) -> impl Iterator<Item = &ConflictGroup> {
        self.groups.iter().filter(|g| g.is_conflict())
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts().count()
    }

    /// Number of distinct IP names.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// A printable summary of all conflicts.
    pub fn report<'a>(&'a self, tree: &'a DependencyTree, verbose: bool) -> ConflictReport<'a> {
        ConflictReport {
            groups: self,
            tree,
            verbose,
        }
    }
}

/// Group every IP node of `tree` by name, in breadth-first order.
pub fn aggregate(tree: &DependencyTree) -> ConflictGroups {
    let mut groups = ConflictGroups::default();
    for idx in tree.breadth_first() {
        if let Some(reference) = tree.reference(idx) {
            groups.push(&reference.name, idx);
        }
    }
    tracing::debug!(
        "Aggregated {} ip names, {} in conflict",
        groups.len(),
        groups.conflict_count()
    );
    groups
}

/// A conflicted IP name together with its candidates, as shown to a decider.
#[derive(Debug, Clone)]
pub struct Conflict<'a> {
    pub name: &'a str,
    pub candidates: Vec<Candidate<'a>>,
}

/// One occurrence of a conflicted IP.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    /// 1-based position, as typed by the user.
    pub position: usize,
    pub node: NodeIndex,
    pub reference: &'a PackageReference,
    /// The IP whose manifest listed this one; `None` for the local root list.
    pub retrieved_from: Option<&'a PackageReference>,
}

impl Candidate<'_> {
    /// `group/name @ commit (retrieved from ...)`.
    pub fn describe(&self, verbose: bool) -> String {
        match self.retrieved_from {
            Some(father) => format!(
                "{} (retrieved from {})",
                self.reference.label(verbose),
                father.label(verbose)
            ),
            None => format!(
                "{} (retrieved from local root repository)",
                self.reference.label(verbose)
            ),
        }
    }
}

impl fmt::Display for Conflict<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Conflict for IP {}", self.name)?;
        for c in &self.candidates {
            writeln!(f, "  {}. {}", c.position, c.describe(false))?;
        }
        Ok(())
    }
}

/// Display adapter listing every conflict with its candidates.
pub struct ConflictReport<'a> {
    groups: &'a ConflictGroups,
    tree: &'a DependencyTree,
    verbose: bool,
}

impl fmt::Display for ConflictReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.groups.conflict_count();
        if count == 0 {
            return writeln!(f, "No IP conflicts.");
        }
        writeln!(f, "IP conflicts ({count}):")?;
        for group in self.groups.conflicts() {
            let conflict = group.conflict(self.tree);
            writeln!(f, "  {}", conflict.name)?;
            for c in &conflict.candidates {
                writeln!(f, "    {}. {}", c.position, c.describe(self.verbose))?;
            }
        }
        Ok(())
    }
}
