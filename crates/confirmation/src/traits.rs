use async_trait::async_trait;
use futures::stream::BoxStream;
use ledger_wizard_types::RemoteStateSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::QueryError;

/// One published state of the pending set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSnapshot {
    /// Monotonic publish counter; later snapshots carry larger revisions
    pub revision: u64,

    /// Addresses with at least one outstanding submission
    pub addresses: BTreeSet<String>,
}

impl PendingSnapshot {
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }
}

/// Observable set of addresses with in-flight submissions.
///
/// Delivery is at least once; subscribers react to containment changes,
/// never to the raw number of snapshots.
pub trait PendingSetNotifier: Send + Sync {
    /// Stream of pending-set snapshots published after the call
    fn subscribe(&self, address: &str) -> BoxStream<'static, PendingSnapshot>;

    /// Revision of the most recently published snapshot
    fn revision(&self) -> u64;
}

/// Fetches the current remote facts for an account
#[async_trait]
pub trait RemoteStateQuery: Send + Sync {
    async fn fetch(&self, address: &str) -> Result<RemoteStateSnapshot, QueryError>;
}
