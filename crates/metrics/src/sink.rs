use std::sync::Arc;
use std::time::Duration;

use ledger_wizard_types::{ProgressSink, WizardEvent};

use crate::MetricsCollector;

/// Progress sink that records every session event as metrics
#[derive(Clone)]
pub struct MetricsSink {
    collector: Arc<MetricsCollector>,
}

impl MetricsSink {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }

    pub fn collector(&self) -> &Arc<MetricsCollector> {
        &self.collector
    }
}

impl ProgressSink for MetricsSink {
    fn emit(&self, event: WizardEvent) {
        match event {
            WizardEvent::SessionStarted { variant, .. } => {
                self.collector.record_session_started(variant);
            }
            WizardEvent::StageEntered { kind, .. } => {
                self.collector.record_stage_entered(kind);
            }
            WizardEvent::ConfirmationResolved {
                resolution,
                resolved_by,
                checks,
                elapsed_ms,
                ..
            } => {
                self.collector.record_confirmation(
                    &resolution,
                    resolved_by,
                    checks,
                    Duration::from_millis(elapsed_ms),
                );
            }
            WizardEvent::StageCompleted { .. } => {}
            WizardEvent::TerminalFailure { reason, .. } => {
                self.collector.record_session_failed(&reason);
            }
            WizardEvent::SessionCompleted => self.collector.record_session_completed(),
            WizardEvent::SessionAbandoned => self.collector.record_session_abandoned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_wizard_types::{BranchVariant, Resolution, ResolvedBy, SessionId, StageKind};

    #[test]
    fn test_sink_records_session_lifecycle() {
        let collector = Arc::new(MetricsCollector::new());
        let sink = MetricsSink::new(collector.clone());

        sink.emit(WizardEvent::SessionStarted {
            session_id: SessionId::new(),
            variant: BranchVariant::Abbreviated,
            total_stages: 2,
        });
        sink.emit(WizardEvent::StageEntered {
            stage_index: 0,
            kind: StageKind::Submit,
        });
        sink.emit(WizardEvent::ConfirmationResolved {
            stage_index: 0,
            cycle: 1,
            resolution: Resolution::Confirmed,
            resolved_by: ResolvedBy::AutomaticChecker,
            checks: 0,
            elapsed_ms: 2_000,
        });
        sink.emit(WizardEvent::StageCompleted { stage_index: 0 });
        sink.emit(WizardEvent::SessionAbandoned);

        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("variant=\"abbreviated\""));
        assert!(metrics.contains("channel=\"automatic\""));
        assert!(metrics.contains("ledger_wizard_sessions_abandoned_total"));
    }
}
