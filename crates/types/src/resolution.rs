use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a confirmation attempt, and with it the session, failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum FailureReason {
    /// Every check ran out without the submission's effect becoming
    /// visible, including when the state query never answered
    UnknownConfirmationState,

    /// The request never made it to the ledger
    SubmitRejected { message: String },
}

impl FailureReason {
    /// Whether the user can go back to a prior screen and try again
    pub fn is_recoverable(&self) -> bool {
        match self {
            FailureReason::UnknownConfirmationState => true,
            FailureReason::SubmitRejected { .. } => true,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            FailureReason::UnknownConfirmationState => "unknown_confirmation_state",
            FailureReason::SubmitRejected { .. } => "submit_rejected",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SubmitRejected { message } => write!(f, "submit rejected: {message}"),
            other => f.write_str(other.as_label()),
        }
    }
}

/// Single-assignment outcome of a confirmation attempt.
///
/// Starts as `Pending` and moves to a terminal value at most once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum Resolution {
    #[default]
    Pending,
    Confirmed,
    Failed(FailureReason),
}

impl Resolution {
    pub fn is_pending(&self) -> bool {
        matches!(self, Resolution::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Resolution::Confirmed)
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            Resolution::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Detection channel that produced a terminal resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    /// Pending-set notification (channel A)
    AutomaticChecker,
    /// Delayed polling check (channel B)
    ManualCheck,
}

impl ResolvedBy {
    pub fn as_label(&self) -> &'static str {
        match self {
            ResolvedBy::AutomaticChecker => "automatic",
            ResolvedBy::ManualCheck => "manual",
        }
    }
}
