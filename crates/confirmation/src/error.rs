use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfirmationError {
    #[error("invalid confirmation state: {0}")]
    InvalidState(String),

    #[error("coordinator has been torn down")]
    TornDown,

    #[error("invalid confirmation config: {0}")]
    Config(String),
}

/// Failure reported by the remote state query collaborator.
///
/// Either kind counts as "not visible yet" and uses up a check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Worth asking again soon, including a query that timed out
    #[error("transient query failure: {0}")]
    Transient(String),

    /// The collaborator cannot serve the account right now; logged at error
    #[error("remote state unavailable: {0}")]
    Unavailable(String),
}
