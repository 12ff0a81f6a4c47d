use ledger_wizard_confirmation::{ConfirmationCoordinator, ConfirmationHandle, ConfirmationOutcome};
use ledger_wizard_types::{
    BranchVariant, FailureReason, OperationId, ProgressSink, Resolution, SessionId, SessionState,
    SignedRequest, StageKind, SubmissionRecord, WizardEvent,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{FlowError, FlowTemplate, StageDescriptor, SubmitAdapter, SubmitError};

// ═══════════════════════════════════════════════════════════════════════════
// INPUTS AND OUTCOMES
// ═══════════════════════════════════════════════════════════════════════════

/// What the user supplies to leave the current stage
#[derive(Debug, Clone)]
pub enum StageInput {
    /// Leave an input stage
    Proceed,
    /// Submit the request of a submit stage
    Submit(SignedRequest),
}

/// Immediate result of [`StepFlowEngine::advance`]
#[derive(Debug)]
pub enum Advance {
    /// Now on this stage
    Moved(StageDescriptor),
    /// Walked past the last stage
    Finished,
    /// Request submitted; the stage completes once confirmed
    Watching(PendingStage),
}

/// Result of a watched submit stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Completed { next: StageDescriptor },
    Finished,
    Failed(FailureReason),
    /// The session was torn down before the confirmation resolved
    Discarded,
}

/// A submit stage waiting for its confirmation.
///
/// The session advances on its own whether or not this is awaited.
#[derive(Debug)]
pub struct PendingStage {
    stage_index: usize,
    cycle: u64,
    operation_id: OperationId,
    receiver: oneshot::Receiver<StageOutcome>,
}

impl PendingStage {
    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    pub async fn outcome(self) -> StageOutcome {
        self.receiver.await.unwrap_or(StageOutcome::Discarded)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════

/// Drives one wizard session through its pruned stage list.
///
/// Owns the session's confirmation coordinator; tearing the engine down
/// (or dropping it) cancels every timer and subscription of the session.
/// Sinks are invoked with the session lock held and must not call back
/// into the engine.
pub struct StepFlowEngine {
    shared: Arc<Shared>,
}

struct Shared {
    session_id: SessionId,
    address: String,
    variant: BranchVariant,
    stages: Vec<StageDescriptor>,
    coordinator: ConfirmationCoordinator,
    submitter: Arc<dyn SubmitAdapter>,
    sink: Arc<dyn ProgressSink>,
    alive: AtomicBool,
    session: Mutex<Session>,
}

struct Session {
    current_index: usize,
    submission_cycle: u64,
    state: SessionState,
    history: Vec<SubmissionRecord>,
    continuation: Option<JoinHandle<()>>,
}

impl Session {
    fn record_mut(&mut self, cycle: u64) -> Option<&mut SubmissionRecord> {
        self.history.iter_mut().rev().find(|record| record.cycle == cycle)
    }
}

impl StepFlowEngine {
    /// Start a session for `address`, keeping the stages of `template`
    /// that apply to `variant`
    pub fn start(
        session_id: SessionId,
        address: impl Into<String>,
        variant: BranchVariant,
        template: &FlowTemplate,
        coordinator: ConfirmationCoordinator,
        submitter: Arc<dyn SubmitAdapter>,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Self, FlowError> {
        let address = address.into();
        template.validate()?;

        if coordinator.address() != address {
            return Err(FlowError::InvalidState(format!(
                "coordinator watches {} but the session is for {}",
                coordinator.address(),
                address
            )));
        }
        if !coordinator.is_alive() {
            return Err(FlowError::SessionClosed);
        }

        let stages = template.prune(variant);
        let Some(first) = stages.first().cloned() else {
            return Err(FlowError::InvalidTemplate(format!(
                "template '{}' has no stages for the {} variant",
                template.name(),
                variant
            )));
        };

        info!(
            session_id = %session_id,
            address = %address,
            variant = %variant,
            template = template.name(),
            stages = stages.len(),
            "Starting wizard session"
        );

        sink.emit(WizardEvent::SessionStarted {
            session_id,
            variant,
            total_stages: stages.len(),
        });
        sink.emit(WizardEvent::StageEntered {
            stage_index: first.index,
            kind: first.kind,
        });

        Ok(Self {
            shared: Arc::new(Shared {
                session_id,
                address,
                variant,
                stages,
                coordinator,
                submitter,
                sink,
                alive: AtomicBool::new(true),
                session: Mutex::new(Session {
                    current_index: 0,
                    submission_cycle: 0,
                    state: SessionState::Active,
                    history: Vec::new(),
                    continuation: None,
                }),
            }),
        })
    }

    /// Leave the current stage.
    ///
    /// Input stages move on immediately. Submit stages start watching for
    /// the effect, submit the request once and return
    /// [`Advance::Watching`]; the session moves on when the confirmation
    /// resolves.
    pub async fn advance(&self, input: StageInput) -> Result<Advance, FlowError> {
        let shared = &self.shared;

        let (stage, cycle, request, handle) = {
            let mut session = shared.lock();
            shared.ensure_ready(&session)?;

            let stage = shared.stages[session.current_index].clone();
            match (stage.kind, input) {
                (StageKind::Input, StageInput::Proceed) => {
                    return Ok(match shared.step_forward(&mut session) {
                        Some(next) => Advance::Moved(next),
                        None => Advance::Finished,
                    });
                }
                (StageKind::Input, StageInput::Submit(_)) => {
                    return Err(FlowError::UnexpectedRequest {
                        stage_index: stage.index,
                    });
                }
                (StageKind::Submit, StageInput::Proceed) => {
                    return Err(FlowError::MissingRequest {
                        stage_index: stage.index,
                    });
                }
                (StageKind::Submit, StageInput::Submit(request)) => {
                    let check = stage.check().cloned().ok_or_else(|| {
                        FlowError::InvalidState(format!("submit stage '{}' has no check", stage.id))
                    })?;

                    session.submission_cycle += 1;
                    let cycle = session.submission_cycle;

                    // Watch first so no pending-set transition caused by the
                    // submission can be missed
                    let handle = shared.coordinator.begin_watching(cycle, check)?;

                    session.state = SessionState::Watching { cycle };
                    session.history.push(SubmissionRecord {
                        stage_index: stage.index,
                        cycle,
                        operation_id: None,
                        resolution: Resolution::Pending,
                    });
                    (stage, cycle, request, handle)
                }
            }
        };

        info!(
            session_id = %shared.session_id,
            stage_index = stage.index,
            stage = %stage.id,
            cycle,
            operation = %request.operation,
            "Submitting request"
        );

        match shared.submitter.submit(&request).await {
            Ok(operation_id) => {
                let mut session = shared.lock();
                if !shared.is_alive() {
                    return Err(FlowError::SessionClosed);
                }
                if let Some(record) = session.record_mut(cycle) {
                    record.operation_id = Some(operation_id.clone());
                }

                let (reply, receiver) = oneshot::channel();
                let continuation = tokio::spawn(Shared::await_confirmation(
                    Arc::clone(shared),
                    handle,
                    reply,
                ));
                session.continuation = Some(continuation);

                debug!(
                    session_id = %shared.session_id,
                    cycle,
                    operation_id = %operation_id,
                    "Request submitted, waiting for confirmation"
                );

                Ok(Advance::Watching(PendingStage {
                    stage_index: stage.index,
                    cycle,
                    operation_id,
                    receiver,
                }))
            }
            Err(submit_error) => {
                shared.coordinator.abandon_attempt(cycle);
                shared.fail_submission(stage.index, cycle, &submit_error);
                Err(FlowError::Submit(submit_error))
            }
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.shared.session_id
    }

    pub fn address(&self) -> &str {
        &self.shared.address
    }

    pub fn variant(&self) -> BranchVariant {
        self.shared.variant
    }

    pub fn stages(&self) -> &[StageDescriptor] {
        &self.shared.stages
    }

    /// The stage the session is on; stays on the last stage once completed
    pub fn current_stage(&self) -> StageDescriptor {
        let index = self.shared.lock().current_index;
        self.shared.stages[index].clone()
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state.clone()
    }

    pub fn submission_cycle(&self) -> u64 {
        self.shared.lock().submission_cycle
    }

    pub fn history(&self) -> Vec<SubmissionRecord> {
        self.shared.lock().history.clone()
    }

    pub fn coordinator(&self) -> &ConfirmationCoordinator {
        &self.shared.coordinator
    }

    pub fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }

    /// Dismiss the session. An outstanding confirmation is discarded
    /// without being resolved. Idempotent.
    pub fn teardown(&self) {
        self.shared.shutdown();
    }
}

impl Drop for StepFlowEngine {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn ensure_ready(&self, session: &Session) -> Result<(), FlowError> {
        if !self.is_alive() {
            return Err(FlowError::SessionClosed);
        }
        match &session.state {
            SessionState::Active => Ok(()),
            SessionState::Watching { cycle } => {
                error!(
                    session_id = %self.session_id,
                    stage_index = session.current_index,
                    cycle,
                    "Advance requested while a submission is being watched"
                );
                Err(FlowError::InvalidState(format!(
                    "stage {} is still waiting for cycle {}",
                    session.current_index, cycle
                )))
            }
            SessionState::Completed | SessionState::Failed { .. } | SessionState::Abandoned => {
                Err(FlowError::SessionClosed)
            }
        }
    }

    /// Complete the current stage and enter the next one, or complete the
    /// session after the last stage
    fn step_forward(&self, session: &mut Session) -> Option<StageDescriptor> {
        let index = session.current_index;
        self.sink.emit(WizardEvent::StageCompleted { stage_index: index });

        let Some(next) = self.stages.get(index + 1).cloned() else {
            session.state = SessionState::Completed;
            self.sink.emit(WizardEvent::SessionCompleted);
            info!(session_id = %self.session_id, "Wizard session completed");
            return None;
        };

        session.current_index = next.index;
        session.state = SessionState::Active;
        self.sink.emit(WizardEvent::StageEntered {
            stage_index: next.index,
            kind: next.kind,
        });
        debug!(
            session_id = %self.session_id,
            stage_index = next.index,
            stage = %next.id,
            progress = %next.progress,
            "Entered stage"
        );
        Some(next)
    }

    fn fail_submission(&self, stage_index: usize, cycle: u64, submit_error: &SubmitError) {
        let reason = FailureReason::SubmitRejected {
            message: submit_error.to_string(),
        };

        let mut session = self.lock();
        if !self.is_alive() || session.state != (SessionState::Watching { cycle }) {
            return;
        }
        if let Some(record) = session.record_mut(cycle) {
            record.resolution = Resolution::Failed(reason.clone());
        }
        session.state = SessionState::Failed {
            reason: reason.clone(),
        };
        self.sink
            .emit(WizardEvent::TerminalFailure { stage_index, reason });

        warn!(
            session_id = %self.session_id,
            stage_index,
            cycle,
            error = %submit_error,
            "Submission failed, session is no longer usable"
        );
    }

    async fn await_confirmation(
        self: Arc<Self>,
        handle: ConfirmationHandle,
        reply: oneshot::Sender<StageOutcome>,
    ) {
        let outcome = match handle.wait().await {
            Some(outcome) => self.finish_watch(outcome),
            None => StageOutcome::Discarded,
        };
        let _ = reply.send(outcome);
    }

    fn finish_watch(&self, outcome: ConfirmationOutcome) -> StageOutcome {
        let mut session = self.lock();
        let cycle = outcome.cycle;
        if !self.is_alive() || session.state != (SessionState::Watching { cycle }) {
            debug!(session_id = %self.session_id, cycle, "Stale confirmation discarded");
            return StageOutcome::Discarded;
        }

        let stage_index = session.current_index;
        if let Some(record) = session.record_mut(cycle) {
            record.resolution = outcome.resolution.clone();
        }
        self.sink.emit(WizardEvent::ConfirmationResolved {
            stage_index,
            cycle,
            resolution: outcome.resolution.clone(),
            resolved_by: outcome.resolved_by,
            checks: outcome.checks,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
        });

        match outcome.resolution {
            Resolution::Confirmed => match self.step_forward(&mut session) {
                Some(next) => StageOutcome::Completed { next },
                None => StageOutcome::Finished,
            },
            Resolution::Failed(reason) => {
                session.state = SessionState::Failed {
                    reason: reason.clone(),
                };
                self.sink.emit(WizardEvent::TerminalFailure {
                    stage_index,
                    reason: reason.clone(),
                });
                warn!(
                    session_id = %self.session_id,
                    stage_index,
                    cycle,
                    reason = %reason,
                    "Confirmation failed, session is no longer usable"
                );
                StageOutcome::Failed(reason)
            }
            Resolution::Pending => {
                error!(session_id = %self.session_id, cycle, "Coordinator reported a pending outcome");
                StageOutcome::Discarded
            }
        }
    }

    fn shutdown(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        self.coordinator.teardown();

        let mut session = self.lock();
        if let Some(continuation) = session.continuation.take() {
            continuation.abort();
        }
        if !session.state.is_closed() {
            session.state = SessionState::Abandoned;
            self.sink.emit(WizardEvent::SessionAbandoned);
            info!(
                session_id = %self.session_id,
                stage_index = session.current_index,
                "Wizard session abandoned"
            );
        }
    }
}
