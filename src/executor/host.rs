use tracing::info;

use crate::config::MutationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationDecision {
    Yes,
    No,
    /// Yes, and stop asking for the rest of the session.
    AllForSession,
}

/// The user-facing side of execution.
pub trait ExecutionHost {
    /// Blocks until the user answers.
    fn confirm(&self, kind: MutationKind, count: usize, entity_display_name: &str) -> ConfirmationDecision;
    fn progress(&self, message: &str, fraction: Option<f64>);
    /// Polled at every page, batch and row boundary.
    fn is_cancelled(&self) -> bool;
}

/// Host for unattended runs: approves everything, never cancels and logs progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ExecutionHost for AutoApprove {
    fn confirm(&self, kind: MutationKind, count: usize, entity_display_name: &str) -> ConfirmationDecision {
        info!(%kind, count, entity = entity_display_name, "auto-approving");
        ConfirmationDecision::Yes
    }

    fn progress(&self, message: &str, fraction: Option<f64>) {
        info!(?fraction, "{}", message);
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}
