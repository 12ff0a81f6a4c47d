use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::{BranchVariant, FailureReason, Resolution, ResolvedBy, SessionId, StageKind};

/// State transitions a session reports to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum WizardEvent {
    SessionStarted {
        session_id: SessionId,
        variant: BranchVariant,
        total_stages: usize,
    },

    StageEntered {
        stage_index: usize,
        kind: StageKind,
    },

    /// Emitted right before the matching `StageCompleted` or `TerminalFailure`
    ConfirmationResolved {
        stage_index: usize,
        cycle: u64,
        resolution: Resolution,
        resolved_by: ResolvedBy,
        checks: u32,
        elapsed_ms: u64,
    },

    StageCompleted {
        stage_index: usize,
    },

    TerminalFailure {
        stage_index: usize,
        reason: FailureReason,
    },

    SessionCompleted,

    SessionAbandoned,
}

impl WizardEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WizardEvent::TerminalFailure { .. }
                | WizardEvent::SessionCompleted
                | WizardEvent::SessionAbandoned
        )
    }
}

/// Receives session events; implemented by whatever projects progress
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: WizardEvent);
}

impl ProgressSink for mpsc::UnboundedSender<WizardEvent> {
    fn emit(&self, event: WizardEvent) {
        // Receiver gone means nobody is projecting progress anymore
        let _ = self.send(event);
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for Arc<S> {
    fn emit(&self, event: WizardEvent) {
        (**self).emit(event)
    }
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: WizardEvent) {}
}

/// Forwards each event to several sinks, in order
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn ProgressSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ProgressSink for FanoutSink {
    fn emit(&self, event: WizardEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

/// Keeps every event in memory, for hosts that poll and for tests
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<WizardEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WizardEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: WizardEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
