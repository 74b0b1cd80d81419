//! Deciders used by the command line: an interactive prompt, an
//! unattended fallback and one that always leaves the hierarchical flow.

use console::Style;
use dialoguer::Input;
use ipdb_resolver::conflict::Conflict;
use ipdb_resolver::policy::{CancelFlag, Decider, Decision, FirstCandidate, InvalidSelection};
use ipdb_util::errors::IpdbError;
use ipdb_util::progress::status_warn;

/// Asks the user on the terminal. Ctrl+C cancels the whole resolution.
pub struct PromptDecider {
    verbose: bool,
    cancel: CancelFlag,
    shown: Option<String>,
}

impl PromptDecider {
    pub fn new(verbose: bool, cancel: CancelFlag) -> Self {
        Self {
            verbose,
            cancel,
            shown: None,
        }
    }

    fn show(&mut self, conflict: &Conflict<'_>) {
        if self.shown.as_deref() == Some(conflict.name) {
            return;
        }
        let yellow = Style::new().yellow();
        eprintln!("{}", yellow.apply_to(format!("Conflict for IP {}", conflict.name)));
        for c in &conflict.candidates {
            eprintln!("  {}. {}", c.position, c.describe(self.verbose));
        }
        self.shown = Some(conflict.name.to_string());
    }
}

impl Decider for PromptDecider {
    fn decide(&mut self, conflict: &Conflict<'_>) -> Decision {
        self.show(conflict);
        let answer = Input::<String>::new()
            .with_prompt(format!(
                "Select the desired alternative (1-{}, CTRL+C to exit hierarchical flow)",
                conflict.candidates.len()
            ))
            .allow_empty(true)
            .interact_text();
        answer_decision(conflict.name, answer, self.cancel.is_cancelled())
    }

    fn rejected(&mut self, _conflict: &Conflict<'_>, error: &InvalidSelection) {
        status_warn("Invalid", &error.to_string());
    }
}

/// Map what the terminal returned to a decision.
///
/// A cancel raised while the user was typing wins over the typed answer. Any
/// prompt failure leaves the hierarchical flow; only non-interrupt failures
/// are logged.
fn answer_decision(
    name: &str,
    answer: Result<String, dialoguer::Error>,
    cancelled: bool,
) -> Decision {
    match answer {
        Ok(_) if cancelled => Decision::Cancel,
        Ok(input) => Decision::Choice(input),
        Err(e) => {
            let interrupted = matches!(
                &e,
                dialoguer::Error::IO(io) if io.kind() == std::io::ErrorKind::Interrupted
            );
            if !interrupted {
                let err = IpdbError::Prompt {
                    message: e.to_string(),
                };
                tracing::warn!("ip '{name}': {err}");
            }
            Decision::Cancel
        }
    }
}

/// Picks the first-discovered candidate and says so.
#[derive(Debug, Default)]
pub struct UnattendedDecider {
    verbose: bool,
}

impl UnattendedDecider {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Decider for UnattendedDecider {
    fn decide(&mut self, conflict: &Conflict<'_>) -> Decision {
        if let Some(first) = conflict.candidates.first() {
            status_warn(
                "Conflict",
                &format!(
                    "for IP {} (non-interactive, using {})",
                    conflict.name,
                    first.describe(self.verbose)
                ),
            );
        }
        FirstCandidate.decide(conflict)
    }
}

/// Leaves the hierarchical flow at the first conflict.
#[derive(Debug, Default)]
pub struct EscapeDecider;

impl Decider for EscapeDecider {
    fn decide(&mut self, conflict: &Conflict<'_>) -> Decision {
        tracing::info!("Conflict for ip '{}', not choosing", conflict.name);
        Decision::Cancel
    }
}

/// How conflicts are settled when nobody is asked explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictMode {
    /// Prompt on a terminal, otherwise take the first candidate.
    #[default]
    Ask,
    /// Always take the first-discovered candidate.
    First,
    /// Keep the top-level list as soon as a conflict shows up.
    Flat,
}

pub fn decider_for(verbose: bool, mode: ConflictMode, cancel: CancelFlag) -> Box<dyn Decider> {
    match mode {
        ConflictMode::Flat => Box::new(EscapeDecider),
        ConflictMode::Ask if console::user_attended() && console::user_attended_stderr() => {
            Box::new(PromptDecider::new(verbose, cancel))
        }
        ConflictMode::Ask | ConflictMode::First => Box::new(UnattendedDecider::new(verbose)),
    }
}
