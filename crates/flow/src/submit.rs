use async_trait::async_trait;
use ledger_wizard_types::{OperationId, SignedRequest};

use crate::SubmitError;

/// Transport that hands a signed request to the ledger.
///
/// Called exactly once per submit stage; any retrying of the request
/// itself belongs to the implementation.
#[async_trait]
pub trait SubmitAdapter: Send + Sync {
    async fn submit(&self, request: &SignedRequest) -> Result<OperationId, SubmitError>;
}
