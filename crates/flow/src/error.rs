use ledger_wizard_confirmation::ConfirmationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid flow state: {0}")]
    InvalidState(String),

    #[error("session is closed")]
    SessionClosed,

    #[error("stage {stage_index} is a submit stage and needs a signed request")]
    MissingRequest { stage_index: usize },

    #[error("stage {stage_index} is an input stage and takes no request")]
    UnexpectedRequest { stage_index: usize },

    #[error("invalid flow template: {0}")]
    InvalidTemplate(String),

    #[error("confirmation error: {0}")]
    Confirmation(#[from] ConfirmationError),

    #[error("submit error: {0}")]
    Submit(#[from] SubmitError),
}

/// Failure reported by the submit transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The ledger refused the request
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),
}
