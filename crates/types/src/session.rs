use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{FailureReason, Resolution};

/// Identifier of one wizard session, used to correlate logs and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a wizard session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SessionState {
    /// Waiting for the user to advance the current stage
    Active,

    /// A submit stage is waiting for its confirmation
    Watching { cycle: u64 },

    /// Walked past the last stage
    Completed,

    /// Terminal failure; the session must be discarded
    Failed { reason: FailureReason },

    /// Torn down before completion
    Abandoned,
}

impl SessionState {
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed { .. } | SessionState::Abandoned
        )
    }

    pub fn is_watching(&self) -> bool {
        matches!(self, SessionState::Watching { .. })
    }
}

/// A built and signed request, opaque to the wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    /// Account the request is submitted from
    pub source: String,

    /// Short operation label ("delegation", "stake", ...)
    pub operation: String,

    /// Encoded, signed payload handed to the submit transport
    pub payload: Vec<u8>,
}

impl SignedRequest {
    pub fn new(source: impl Into<String>, operation: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            operation: operation.into(),
            payload,
        }
    }
}

/// Identifier returned by the ledger for a submitted request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub String);

impl OperationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record of one submit stage entered during a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub stage_index: usize,
    pub cycle: u64,
    pub operation_id: Option<OperationId>,
    pub resolution: Resolution,
}
