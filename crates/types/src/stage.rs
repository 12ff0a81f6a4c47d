use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which slice of a flow a session walks through.
///
/// Fixed when the session starts. `Abbreviated` is used when the account
/// already satisfies the leading stages (e.g. it already has a delegate) and
/// drops every stage marked as full-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchVariant {
    Full,
    Abbreviated,
}

impl BranchVariant {
    /// Pick the variant from the account's starting condition
    pub fn for_existing_delegate(has_delegate: bool) -> Self {
        if has_delegate {
            BranchVariant::Abbreviated
        } else {
            BranchVariant::Full
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BranchVariant::Full => "full",
            BranchVariant::Abbreviated => "abbreviated",
        }
    }
}

impl fmt::Display for BranchVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown branch variant: {0}")]
pub struct ParseVariantError(pub String);

impl FromStr for BranchVariant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(BranchVariant::Full),
            "abbreviated" => Ok(BranchVariant::Abbreviated),
            other => Err(ParseVariantError(other.to_string())),
        }
    }
}

/// What a stage asks of the session when it is advanced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// User-input screen; advancing only moves the cursor
    Input,
    /// Submits a request and waits until its effect is visible remotely
    Submit,
}

impl StageKind {
    pub fn is_submit(&self) -> bool {
        matches!(self, StageKind::Submit)
    }
}

/// Position of a stage within the pruned sequence, for progress indicators.
///
/// `step` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub step: usize,
    pub total: usize,
}

impl StageProgress {
    pub fn new(step: usize, total: usize) -> Self {
        Self { step, total }
    }

    pub fn is_last(&self) -> bool {
        self.step == self.total
    }
}

impl fmt::Display for StageProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.step, self.total)
    }
}
