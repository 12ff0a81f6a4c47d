use ledger_wizard_types::RemoteStateSnapshot;

/// Predicate answering "has this submission's effect become visible yet?".
///
/// Implementations must be pure: the coordinator may evaluate the same
/// check several times for one cycle, from either detection channel.
pub trait SemanticCheck: Send + Sync {
    fn holds(&self, snapshot: &RemoteStateSnapshot, cycle: u64) -> bool;

    /// Short label used in logs
    fn describe(&self) -> String {
        "custom".to_string()
    }
}

impl<F> SemanticCheck for F
where
    F: Fn(&RemoteStateSnapshot, u64) -> bool + Send + Sync,
{
    fn holds(&self, snapshot: &RemoteStateSnapshot, cycle: u64) -> bool {
        self(snapshot, cycle)
    }
}

/// Holds once the account delegates to the given delegate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateIs {
    pub delegate: String,
}

impl DelegateIs {
    pub fn new(delegate: impl Into<String>) -> Self {
        Self {
            delegate: delegate.into(),
        }
    }
}

impl SemanticCheck for DelegateIs {
    fn holds(&self, snapshot: &RemoteStateSnapshot, _cycle: u64) -> bool {
        snapshot.has_delegate(&self.delegate)
    }

    fn describe(&self) -> String {
        format!("delegate_is({})", self.delegate)
    }
}

/// Holds once the staked balance exceeds a baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeAbove {
    pub baseline: u128,
}

impl StakeAbove {
    pub fn new(baseline: u128) -> Self {
        Self { baseline }
    }

    /// Any stake at all
    pub fn nonzero() -> Self {
        Self { baseline: 0 }
    }
}

impl SemanticCheck for StakeAbove {
    fn holds(&self, snapshot: &RemoteStateSnapshot, _cycle: u64) -> bool {
        snapshot.staked > self.baseline
    }

    fn describe(&self) -> String {
        format!("stake_above({})", self.baseline)
    }
}
