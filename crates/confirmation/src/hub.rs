use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::{PendingSetNotifier, PendingSnapshot};

/// In-memory pending set for hosts that track their own submissions.
///
/// Counts outstanding submissions per address; an address stays in the set
/// until every submission made from it has been cleared.
pub struct PendingSetHub {
    state: RwLock<HubState>,
    snapshot_tx: broadcast::Sender<PendingSnapshot>,
}

#[derive(Debug, Default)]
struct HubState {
    revision: u64,
    outstanding: BTreeMap<String, usize>,
}

impl HubState {
    fn snapshot(&self) -> PendingSnapshot {
        PendingSnapshot {
            revision: self.revision,
            addresses: self.outstanding.keys().cloned().collect(),
        }
    }
}

impl PendingSetHub {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// `capacity` bounds how far a slow subscriber may fall behind
    pub fn with_capacity(capacity: usize) -> Self {
        let (snapshot_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            state: RwLock::new(HubState::default()),
            snapshot_tx,
        }
    }

    /// Record a new outstanding submission from `address`
    pub fn mark_pending(&self, address: &str) -> PendingSnapshot {
        self.mutate(|outstanding| {
            *outstanding.entry(address.to_string()).or_insert(0) += 1;
        })
    }

    /// Record that one submission from `address` has left the pool
    pub fn mark_cleared(&self, address: &str) -> PendingSnapshot {
        self.mutate(|outstanding| {
            if let Some(count) = outstanding.get_mut(address) {
                *count -= 1;
                if *count == 0 {
                    outstanding.remove(address);
                }
            }
        })
    }

    /// Replace the whole set, as reported by an external source
    pub fn publish(&self, addresses: BTreeSet<String>) -> PendingSnapshot {
        self.mutate(|outstanding| {
            outstanding.retain(|address, _| addresses.contains(address));
            for address in addresses {
                outstanding.entry(address).or_insert(1);
            }
        })
    }

    /// Re-send the current set without changing it
    pub fn republish(&self) -> PendingSnapshot {
        self.mutate(|_| {})
    }

    pub fn current(&self) -> PendingSnapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub fn is_pending(&self, address: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .outstanding
            .contains_key(address)
    }

    pub fn subscriber_count(&self) -> usize {
        self.snapshot_tx.receiver_count()
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, usize>)) -> PendingSnapshot {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut state.outstanding);
        state.revision += 1;
        let snapshot = state.snapshot();

        // Sent under the lock so subscribers see revisions in order
        let _ = self.snapshot_tx.send(snapshot.clone());
        debug!(
            revision = snapshot.revision,
            pending = snapshot.addresses.len(),
            "Published pending set"
        );
        snapshot
    }
}

impl Default for PendingSetHub {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingSetNotifier for PendingSetHub {
    fn subscribe(&self, address: &str) -> BoxStream<'static, PendingSnapshot> {
        let receiver = self.snapshot_tx.subscribe();
        let address = address.to_string();

        stream::unfold(receiver, move |mut receiver| {
            let address = address.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(snapshot) => return Some((snapshot, receiver)),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(address = %address, skipped, "Pending set subscriber lagged");
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        })
        .boxed()
    }

    fn revision(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .revision
    }
}
