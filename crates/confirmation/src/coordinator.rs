use futures::StreamExt;
use ledger_wizard_types::{FailureReason, RemoteStateSnapshot, Resolution, ResolvedBy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    ConfirmationConfig, ConfirmationError, PendingSetNotifier, PendingSnapshot, QueryError,
    RecheckSchedule, RemoteStateQuery, SemanticCheck,
};

// ═══════════════════════════════════════════════════════════════════════════
// PUBLIC TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// Terminal result of one confirmation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationOutcome {
    pub cycle: u64,
    pub resolution: Resolution,
    pub resolved_by: ResolvedBy,
    /// Checks consumed from the budget, including a failed automatic check
    pub checks: u32,
    pub elapsed: Duration,
}

/// Completion signal of an attempt started with
/// [`ConfirmationCoordinator::begin_watching`]
#[derive(Debug)]
pub struct ConfirmationHandle {
    cycle: u64,
    receiver: oneshot::Receiver<ConfirmationOutcome>,
}

impl ConfirmationHandle {
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Wait for the terminal resolution.
    ///
    /// Returns `None` when the attempt was discarded by teardown or
    /// abandonment instead of being resolved.
    pub async fn wait(self) -> Option<ConfirmationOutcome> {
        self.receiver.await.ok()
    }
}

/// Point-in-time view of the current (or last) attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptStats {
    pub cycle: u64,
    pub checks: u32,
    pub handled_by_automatic_checker: bool,
    pub observed_pending: bool,
    pub timer_armed: bool,
    pub resolution: Resolution,
}

// ═══════════════════════════════════════════════════════════════════════════
// ATTEMPT STATE
// ═══════════════════════════════════════════════════════════════════════════

/// A spawned check task tagged with the generation it was started under
struct Tracked {
    generation: u64,
    task: JoinHandle<()>,
}

/// State shared by both channels; only ever touched under the slot lock
struct Attempt {
    cycle: u64,
    check: Arc<dyn SemanticCheck>,
    baseline_revision: u64,
    started_at: Instant,
    resolved: Resolution,
    handled_by_automatic_checker: bool,
    observed_pending: bool,
    checks: u32,
    timer: Option<Tracked>,
    automatic: Option<Tracked>,
    latest_snapshot: Option<RemoteStateSnapshot>,
    completion: Option<oneshot::Sender<ConfirmationOutcome>>,
}

impl Attempt {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.task.abort();
        }
    }

    fn cancel_tasks(&mut self) {
        self.cancel_timer();
        if let Some(automatic) = self.automatic.take() {
            automatic.task.abort();
        }
    }

    fn stats(&self) -> AttemptStats {
        AttemptStats {
            cycle: self.cycle,
            checks: self.checks,
            handled_by_automatic_checker: self.handled_by_automatic_checker,
            observed_pending: self.observed_pending,
            timer_armed: self.timer.is_some(),
            resolution: self.resolved.clone(),
        }
    }
}

#[derive(Default)]
struct Slot {
    attempt: Option<Attempt>,
    last_cycle: u64,
    task_generation: u64,
}

impl Slot {
    /// The attempt for `cycle`, if it is still unresolved
    fn pending(&mut self, cycle: u64) -> Option<&mut Attempt> {
        self.attempt
            .as_mut()
            .filter(|attempt| attempt.cycle == cycle && attempt.resolved.is_pending())
    }

    fn next_generation(&mut self) -> u64 {
        self.task_generation += 1;
        self.task_generation
    }
}

enum Decision {
    Confirm,
    Retry,
    Ignore,
}

// ═══════════════════════════════════════════════════════════════════════════
// COORDINATOR
// ═══════════════════════════════════════════════════════════════════════════

/// Watches one address and resolves at most one submission at a time.
///
/// The pending-set subscription is taken once, at construction, and lives
/// until [`teardown`](Self::teardown) or drop. Must be created inside a
/// tokio runtime.
pub struct ConfirmationCoordinator {
    inner: Arc<Inner>,
    listener: JoinHandle<()>,
}

struct Inner {
    address: String,
    notifier: Arc<dyn PendingSetNotifier>,
    query: Arc<dyn RemoteStateQuery>,
    schedule: RecheckSchedule,
    query_timeout: Duration,
    alive: AtomicBool,
    slot: Mutex<Slot>,
}

impl ConfirmationCoordinator {
    pub fn new(
        address: impl Into<String>,
        notifier: Arc<dyn PendingSetNotifier>,
        query: Arc<dyn RemoteStateQuery>,
        config: ConfirmationConfig,
    ) -> Result<Self, ConfirmationError> {
        config.validate()?;

        let inner = Arc::new(Inner {
            address: address.into(),
            notifier,
            query,
            schedule: config.schedule(),
            query_timeout: config.query_timeout,
            alive: AtomicBool::new(true),
            slot: Mutex::new(Slot::default()),
        });
        let listener = Inner::spawn_listener(&inner);

        debug!(address = %inner.address, "Confirmation coordinator started");
        Ok(Self { inner, listener })
    }

    pub fn address(&self) -> &str {
        &self.inner.address
    }

    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    /// Start watching for the effect of submission `cycle`.
    ///
    /// Arms the first manual check immediately; it fires after the first
    /// check delay regardless of what the pending set does. Pending-set
    /// snapshots published before this call are ignored for this attempt.
    pub fn begin_watching(
        &self,
        cycle: u64,
        check: Arc<dyn SemanticCheck>,
    ) -> Result<ConfirmationHandle, ConfirmationError> {
        if !self.inner.is_alive() {
            return Err(ConfirmationError::TornDown);
        }

        let mut slot = self.inner.lock();
        if let Some(attempt) = slot.attempt.as_ref() {
            if attempt.resolved.is_pending() {
                return Err(ConfirmationError::InvalidState(format!(
                    "cycle {} is still being watched",
                    attempt.cycle
                )));
            }
        }
        if cycle <= slot.last_cycle {
            return Err(ConfirmationError::InvalidState(format!(
                "cycle {} is not newer than cycle {}",
                cycle, slot.last_cycle
            )));
        }

        let (completion, receiver) = oneshot::channel();
        let description = check.describe();
        slot.last_cycle = cycle;
        slot.attempt = Some(Attempt {
            cycle,
            check,
            baseline_revision: self.inner.notifier.revision(),
            started_at: Instant::now(),
            resolved: Resolution::Pending,
            handled_by_automatic_checker: false,
            observed_pending: false,
            checks: 0,
            timer: None,
            automatic: None,
            latest_snapshot: None,
            completion: Some(completion),
        });

        if let Some(delay) = self.inner.schedule.delay_for(1) {
            self.inner.arm_timer(&mut slot, delay);
        }

        info!(
            address = %self.inner.address,
            cycle,
            check = %description,
            max_checks = self.inner.schedule.max_checks(),
            "Watching for submission effect"
        );

        Ok(ConfirmationHandle { cycle, receiver })
    }

    /// Drop the unresolved attempt for `cycle` without resolving it.
    ///
    /// Used when the submission itself never reached the ledger.
    pub fn abandon_attempt(&self, cycle: u64) -> bool {
        let mut slot = self.inner.lock();
        let matches = slot
            .attempt
            .as_ref()
            .map(|attempt| attempt.cycle == cycle && attempt.resolved.is_pending())
            .unwrap_or(false);
        if !matches {
            return false;
        }

        if let Some(mut attempt) = slot.attempt.take() {
            attempt.cancel_tasks();
        }
        info!(address = %self.inner.address, cycle, "Confirmation attempt abandoned");
        true
    }

    /// Resolution of the current or most recent attempt
    pub fn resolution(&self) -> Option<Resolution> {
        self.inner
            .lock()
            .attempt
            .as_ref()
            .map(|attempt| attempt.resolved.clone())
    }

    pub fn attempt_stats(&self) -> Option<AttemptStats> {
        self.inner.lock().attempt.as_ref().map(Attempt::stats)
    }

    /// Cancel the subscription and every timer; discard any attempt in
    /// flight without resolving it. Idempotent.
    pub fn teardown(&self) {
        if self.shutdown() {
            info!(address = %self.inner.address, "Confirmation coordinator torn down");
        }
    }

    fn shutdown(&self) -> bool {
        if !self.inner.alive.swap(false, Ordering::SeqCst) {
            return false;
        }

        self.listener.abort();
        let mut slot = self.inner.lock();
        if let Some(mut attempt) = slot.attempt.take() {
            attempt.cancel_tasks();
            if attempt.resolved.is_pending() {
                debug!(
                    address = %self.inner.address,
                    cycle = attempt.cycle,
                    "Discarding unresolved attempt"
                );
            }
        }
        true
    }
}

impl Drop for ConfirmationCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn spawn_listener(inner: &Arc<Self>) -> JoinHandle<()> {
        let mut pending = inner.notifier.subscribe(&inner.address);
        let weak = Arc::downgrade(inner);
        let address = inner.address.clone();

        tokio::spawn(async move {
            while let Some(snapshot) = pending.next().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if !inner.is_alive() {
                    break;
                }
                inner.on_pending_snapshot(snapshot);
            }
            debug!(address = %address, "Pending set subscription ended");
        })
    }

    /// Replace any armed timer with one firing after `delay`
    fn arm_timer(self: &Arc<Self>, slot: &mut Slot, delay: Duration) {
        let generation = slot.next_generation();
        let Some(attempt) = slot.attempt.as_mut() else {
            return;
        };
        attempt.cancel_timer();

        let cycle = attempt.cycle;
        let weak = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.on_timer(cycle, generation).await;
            }
        });
        attempt.timer = Some(Tracked { generation, task });

        debug!(
            address = %self.address,
            cycle,
            delay_ms = delay.as_millis() as u64,
            next_check = attempt.checks + 1,
            "Manual check scheduled"
        );
    }

    /// Fetch the remote state, giving up after the query timeout
    async fn fetch(&self) -> Result<RemoteStateSnapshot, QueryError> {
        match tokio::time::timeout(self.query_timeout, self.query.fetch(&self.address)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Transient(format!(
                "no answer within {}ms",
                self.query_timeout.as_millis()
            ))),
        }
    }

    fn report_query_error(&self, cycle: u64, channel: ResolvedBy, err: &QueryError) {
        match err {
            QueryError::Transient(reason) => warn!(
                address = %self.address,
                cycle,
                channel = channel.as_label(),
                query_error = %reason,
                "Remote state query failed"
            ),
            QueryError::Unavailable(reason) => error!(
                address = %self.address,
                cycle,
                channel = channel.as_label(),
                query_error = %reason,
                "Remote state unavailable"
            ),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CHANNEL A: PENDING SET
    // ═══════════════════════════════════════════════════════════════════════

    fn on_pending_snapshot(self: &Arc<Self>, snapshot: PendingSnapshot) {
        let present = snapshot.contains(&self.address);

        let mut slot = self.lock();
        let generation = slot.next_generation();
        let Some(attempt) = slot.attempt.as_mut() else {
            return;
        };
        if !attempt.resolved.is_pending() {
            return;
        }
        if snapshot.revision <= attempt.baseline_revision {
            debug!(
                address = %self.address,
                cycle = attempt.cycle,
                revision = snapshot.revision,
                "Ignoring stale pending set snapshot"
            );
            return;
        }

        if present {
            attempt.handled_by_automatic_checker = false;
            if !attempt.observed_pending {
                attempt.observed_pending = true;
                debug!(address = %self.address, cycle = attempt.cycle, "Address entered pending set");
            }
            return;
        }

        if !attempt.observed_pending {
            // Nothing of ours was seen outstanding yet; channel B covers it
            return;
        }

        // The armed manual check stays in place as the ceiling
        attempt.observed_pending = false;
        attempt.handled_by_automatic_checker = true;
        info!(
            address = %self.address,
            cycle = attempt.cycle,
            timer_armed = attempt.timer.is_some(),
            "Address left pending set, running automatic check"
        );

        let cycle = attempt.cycle;
        let check = attempt.check.clone();
        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            if let Some(inner) = weak.upgrade() {
                inner.run_automatic_check(cycle, generation, check).await;
            }
        });
        if let Some(previous) = attempt.automatic.replace(Tracked { generation, task }) {
            previous.task.abort();
        }
    }

    async fn run_automatic_check(
        self: &Arc<Self>,
        cycle: u64,
        generation: u64,
        check: Arc<dyn SemanticCheck>,
    ) {
        let fetched = self.fetch().await;

        let mut slot = self.lock();
        if !self.is_alive() {
            return;
        }
        let decision = match slot.pending(cycle) {
            None => Decision::Ignore,
            Some(attempt) => {
                match &attempt.automatic {
                    Some(automatic) if automatic.generation == generation => {}
                    _ => {
                        debug!(address = %self.address, cycle, "Superseded automatic check ignored");
                        return;
                    }
                }
                attempt.automatic = None;

                let snapshot = match fetched {
                    Ok(snapshot) => {
                        attempt.latest_snapshot = Some(snapshot.clone());
                        Some(snapshot)
                    }
                    Err(err) => {
                        self.report_query_error(cycle, ResolvedBy::AutomaticChecker, &err);
                        attempt.latest_snapshot.clone()
                    }
                };

                match snapshot {
                    Some(snapshot) if check.holds(&snapshot, cycle) => Decision::Confirm,
                    _ => {
                        attempt.handled_by_automatic_checker = false;
                        info!(
                            address = %self.address,
                            cycle,
                            checks = attempt.checks,
                            "Automatic check not satisfied, falling back to manual checks"
                        );
                        if attempt.checks == 0 {
                            // Stands in for the first manual check
                            attempt.checks = 1;
                            Decision::Retry
                        } else {
                            // A manual check is armed or running and decides next
                            Decision::Ignore
                        }
                    }
                }
            }
        };

        self.apply(&mut slot, cycle, decision, ResolvedBy::AutomaticChecker);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CHANNEL B: MANUAL CHECKS
    // ═══════════════════════════════════════════════════════════════════════

    async fn on_timer(self: &Arc<Self>, cycle: u64, generation: u64) {
        let check = {
            let mut slot = self.lock();
            if !self.is_alive() {
                return;
            }
            let Some(attempt) = slot.pending(cycle) else {
                return;
            };
            match &attempt.timer {
                Some(timer) if timer.generation == generation => {}
                _ => {
                    debug!(address = %self.address, cycle, "Superseded manual check ignored");
                    return;
                }
            }
            attempt.timer = None;

            attempt.checks += 1;
            info!(
                address = %self.address,
                cycle,
                check = attempt.checks,
                max_checks = self.schedule.max_checks(),
                "Running manual confirmation check"
            );
            attempt.check.clone()
        };

        let fetched = self.fetch().await;

        let mut slot = self.lock();
        if !self.is_alive() {
            return;
        }
        let decision = match slot.pending(cycle) {
            None => Decision::Ignore,
            Some(attempt) => match fetched {
                Ok(snapshot) => {
                    let holds = check.holds(&snapshot, cycle);
                    attempt.latest_snapshot = Some(snapshot);
                    if holds {
                        Decision::Confirm
                    } else {
                        Decision::Retry
                    }
                }
                Err(err) => {
                    self.report_query_error(cycle, ResolvedBy::ManualCheck, &err);
                    Decision::Retry
                }
            },
        };

        self.apply(&mut slot, cycle, decision, ResolvedBy::ManualCheck);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RESOLUTION
    // ═══════════════════════════════════════════════════════════════════════

    fn apply(self: &Arc<Self>, slot: &mut Slot, cycle: u64, decision: Decision, channel: ResolvedBy) {
        match decision {
            Decision::Ignore => {}
            Decision::Confirm => {
                self.resolve(slot, cycle, Resolution::Confirmed, channel);
            }
            Decision::Retry => {
                let Some(attempt) = slot.pending(cycle) else {
                    return;
                };
                let delay = if self.schedule.exhausted(attempt.checks) {
                    None
                } else {
                    self.schedule.delay_for(attempt.checks + 1)
                };
                match delay {
                    Some(delay) => self.arm_timer(slot, delay),
                    None => {
                        self.resolve(
                            slot,
                            cycle,
                            Resolution::Failed(FailureReason::UnknownConfirmationState),
                            channel,
                        );
                    }
                }
            }
        }
    }

    /// Single-assignment guard: moves the attempt out of `Pending` at most
    /// once and fires the completion signal.
    fn resolve(&self, slot: &mut Slot, cycle: u64, resolution: Resolution, channel: ResolvedBy) -> bool {
        if !self.is_alive() {
            return false;
        }
        let Some(attempt) = slot.pending(cycle) else {
            debug!(address = %self.address, cycle, "Attempt already resolved");
            return false;
        };

        attempt.resolved = resolution.clone();
        if channel == ResolvedBy::AutomaticChecker {
            attempt.handled_by_automatic_checker = true;
        }
        attempt.cancel_tasks();

        let outcome = ConfirmationOutcome {
            cycle,
            resolution: resolution.clone(),
            resolved_by: channel,
            checks: attempt.checks,
            elapsed: attempt.started_at.elapsed(),
        };

        match &resolution {
            Resolution::Confirmed => info!(
                address = %self.address,
                cycle,
                channel = channel.as_label(),
                checks = outcome.checks,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Submission confirmed"
            ),
            _ => warn!(
                address = %self.address,
                cycle,
                channel = channel.as_label(),
                checks = outcome.checks,
                resolution = ?resolution,
                "Submission could not be confirmed"
            ),
        }

        if let Some(completion) = attempt.completion.take() {
            let _ = completion.send(outcome);
        }
        true
    }
}
