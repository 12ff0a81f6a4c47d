//! Confirmation coordination for submitted ledger requests
//!
//! A submitted request is considered effective once a semantic check over
//! freshly fetched remote state holds. Two channels race to establish that:
//!
//! - channel A listens to the pending-set notifier and checks as soon as the
//!   watched address leaves the set
//! - channel B is a delayed polling check with a bounded retry schedule
//!
//! Whichever channel gets there first resolves the attempt; the other one
//! becomes a no-op.

pub mod check;
pub mod coordinator;
pub mod error;
pub mod hub;
pub mod schedule;
pub mod traits;

pub use check::{DelegateIs, SemanticCheck, StakeAbove};
pub use coordinator::{AttemptStats, ConfirmationCoordinator, ConfirmationHandle, ConfirmationOutcome};
pub use error::{ConfirmationError, QueryError};
pub use hub::PendingSetHub;
pub use schedule::{ConfirmationConfig, RecheckSchedule};
pub use traits::{PendingSetNotifier, PendingSnapshot, RemoteStateQuery};
