use serde::{Deserialize, Serialize};

/// Observable facts about an account on the remote ledger.
///
/// Fetched fresh for every query and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStateSnapshot {
    /// Account the snapshot describes
    pub address: String,

    /// Current delegate, if any
    pub delegate: Option<String>,

    /// Staked balance in base units
    pub staked: u128,

    /// Ledger height the snapshot was read at
    pub height: u64,
}

impl RemoteStateSnapshot {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            delegate: None,
            staked: 0,
            height: 0,
        }
    }

    pub fn with_delegate(mut self, delegate: impl Into<String>) -> Self {
        self.delegate = Some(delegate.into());
        self
    }

    pub fn with_staked(mut self, staked: u128) -> Self {
        self.staked = staked;
        self
    }

    pub fn at_height(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    pub fn has_delegate(&self, delegate: &str) -> bool {
        self.delegate.as_deref() == Some(delegate)
    }

    pub fn has_nonzero_stake(&self) -> bool {
        self.staked > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_predicates() {
        let snapshot = RemoteStateSnapshot::new("addr1").with_delegate("baker1");

        assert!(snapshot.has_delegate("baker1"));
        assert!(!snapshot.has_delegate("baker2"));
        assert!(!snapshot.has_nonzero_stake());

        let staked = snapshot.with_staked(5);
        assert!(staked.has_nonzero_stake());
    }

    #[test]
    fn test_snapshot_serde() {
        let snapshot = RemoteStateSnapshot::new("addr1")
            .with_delegate("baker1")
            .with_staked(1_000_000)
            .at_height(42);

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: RemoteStateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
