//! Conflict resolution: one occurrence per IP name.
//!
//! Unconflicted names are taken as-is. For every conflicted name a
//! [`Decider`] is asked for a 1-based choice until it gives a valid one or
//! cancels. Cancelling drops every choice made so far and yields
//! [`Resolution::Aborted`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ipdb_core::package::PackageReference;
use miette::Diagnostic;
use petgraph::graph::NodeIndex;
use thiserror::Error;

use crate::conflict::{Conflict, ConflictGroups};
use crate::graph::DependencyTree;

/// What a decider answered for one conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Raw selector input, expected to be a 1-based candidate number.
    Choice(String),
    /// Leave the hierarchical flow altogether.
    Cancel,
}

impl Decision {
    pub fn index(position: usize) -> Self {
        Self::Choice(position.to_string())
    }
}

/// A selector input that does not name a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum InvalidSelection {
    #[error("Alternative selected is not a number.")]
    NotANumber { input: String },

    #[error("Alternative selected is not within 1-{count}.")]
    OutOfRange { input: String, count: usize },
}

/// Parse a 1-based selector against `count` candidates, returning a 0-based index.
pub fn parse_selection(input: &str, count: usize) -> Result<usize, InvalidSelection> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidSelection::NotANumber {
            input: input.to_string(),
        });
    }
    match trimmed.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
        _ => Err(InvalidSelection::OutOfRange {
            input: input.to_string(),
            count,
        }),
    }
}

/// Chooses among the candidates of a conflict.
pub trait Decider {
    fn decide(&mut self, conflict: &Conflict<'_>) -> Decision;

    /// Called when the last answer for `conflict` was not a valid choice.
    /// The same conflict is asked again afterwards.
    fn rejected(&mut self, _conflict: &Conflict<'_>, _error: &InvalidSelection) {}
}

impl<F> Decider for F
where
    F: FnMut(&Conflict<'_>) -> Decision,
{
    fn decide(&mut self, conflict: &Conflict<'_>) -> Decision {
        self(conflict)
    }
}

/// Always takes the first candidate: the one discovered first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

impl Decider for FirstCandidate {
    fn decide(&mut self, _conflict: &Conflict<'_>) -> Decision {
        Decision::index(1)
    }
}

/// Shared flag used to abandon resolution from outside, e.g. on Ctrl+C.
///
/// Checked before each IP name, never in the middle of a decision.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a resolution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// One reference per IP name, in first-discovery order.
    Resolved(Vec<PackageReference>),
    /// Resolution was cancelled; nothing was selected.
    Aborted,
}

impl Resolution {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    pub fn into_packages(self) -> Option<Vec<PackageReference>> {
        match self {
            Self::Resolved(packages) => Some(packages),
            Self::Aborted => None,
        }
    }
}

/// Picks exactly one occurrence for every IP name.
#[derive(Debug, Clone, Default)]
pub struct ResolutionPolicy {
    cancel: CancelFlag,
}

impl ResolutionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_flag(cancel: CancelFlag) -> Self {
        Self { cancel }
    }

    pub fn resolve<D>(
        &self,
        tree: &DependencyTree,
        groups: &ConflictGroups,
        decider: &mut D,
    ) -> Resolution
    where
        D: Decider + ?Sized,
    {
        let mut selected: Vec<NodeIndex> = Vec::with_capacity(groups.len());

        for group in groups.iter() {
            if self.cancel.is_cancelled() {
                tracing::info!("Resolution cancelled before ip '{}'", group.name);
                return Resolution::Aborted;
            }
            if !group.is_conflict() {
                selected.extend(group.occurrences.first().copied());
                continue;
            }

            let conflict = group.conflict(tree);
            match select(&conflict, decider) {
                Some(node) => selected.push(node),
                None => {
                    tracing::info!("Resolution cancelled at ip '{}'", group.name);
                    return Resolution::Aborted;
                }
            }
        }

        let packages: Vec<PackageReference> = selected
            .into_iter()
            .filter_map(|idx| tree.reference(idx).cloned())
            .collect();
        tracing::info!(
            "Resolved {} ips ({} conflicts)",
            packages.len(),
            groups.conflict_count()
        );
        Resolution::Resolved(packages)
    }
}

/// Ask `decider` until it names a candidate (`Some`) or cancels (`None`).
fn select<D>(conflict: &Conflict<'_>, decider: &mut D) -> Option<NodeIndex>
where
    D: Decider + ?Sized,
{
    loop {
        match decider.decide(conflict) {
            Decision::Cancel => return None,
            Decision::Choice(input) => {
                match parse_selection(&input, conflict.candidates.len()) {
                    Ok(i) => {
                        let chosen = &conflict.candidates[i];
                        tracing::debug!("{}: selected {}", conflict.name, chosen.reference);
                        return Some(chosen.node);
                    }
                    Err(err) => {
                        tracing::debug!("{}: rejected input {input:?}: {err}", conflict.name);
                        decider.rejected(conflict, &err);
                    }
                }
            }
        }
    }
}
