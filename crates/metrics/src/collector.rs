use std::time::Duration;

use ledger_wizard_config::MetricsConfig;
use ledger_wizard_types::{BranchVariant, FailureReason, Resolution, ResolvedBy, StageKind};
use prometheus::{Encoder, TextEncoder};

use crate::metrics::*;

/// Metrics collector for wizard sessions and confirmations
pub struct MetricsCollector {
    namespace: String,
}

impl MetricsCollector {
    /// Create a new metrics collector exporting under the default namespace
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    /// Create a collector exporting metric names under `namespace`
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn from_config(config: &MetricsConfig) -> Self {
        Self::with_namespace(config.namespace.clone())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SESSION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a new session being started
    pub fn record_session_started(&self, variant: BranchVariant) {
        SESSIONS_STARTED.with_label_values(&[variant.as_str()]).inc();
        ACTIVE_SESSIONS.inc();
    }

    pub fn record_session_completed(&self) {
        SESSIONS_COMPLETED.inc();
        ACTIVE_SESSIONS.dec();
    }

    pub fn record_session_abandoned(&self) {
        SESSIONS_ABANDONED.inc();
        ACTIVE_SESSIONS.dec();
    }

    pub fn record_session_failed(&self, reason: &FailureReason) {
        SESSIONS_FAILED.with_label_values(&[reason.as_label()]).inc();
        ACTIVE_SESSIONS.dec();
    }

    pub fn record_stage_entered(&self, kind: StageKind) {
        let kind = match kind {
            StageKind::Input => "input",
            StageKind::Submit => "submit",
        };
        STAGE_TRANSITIONS.with_label_values(&[kind]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIRMATION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record the resolution of one confirmation attempt
    pub fn record_confirmation(
        &self,
        resolution: &Resolution,
        resolved_by: ResolvedBy,
        checks: u32,
        elapsed: Duration,
    ) {
        let outcome = match resolution {
            Resolution::Pending => "pending",
            Resolution::Confirmed => "confirmed",
            Resolution::Failed(reason) => reason.as_label(),
        };

        CONFIRMATIONS
            .with_label_values(&[outcome, resolved_by.as_label()])
            .inc();
        CONFIRMATION_CHECKS.observe(checks as f64);
        CONFIRMATION_LATENCY.observe(elapsed.as_millis() as f64);
    }

    /// Record a remote state query failure; `transient` failures are
    /// retried, the others fail the attempt
    pub fn record_query_error(&self, transient: bool) {
        let severity = if transient { "transient" } else { "unavailable" };
        QUERY_ERRORS.with_label_values(&[severity]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPORT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Export wizard metrics in Prometheus text format
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        let default_prefix = format!("{DEFAULT_NAMESPACE}_");
        let mut metric_families = prometheus::gather();
        metric_families.retain(|family| family.get_name().starts_with(&default_prefix));

        if self.namespace != DEFAULT_NAMESPACE {
            for family in &mut metric_families {
                let renamed = format!(
                    "{}_{}",
                    self.namespace,
                    &family.get_name()[default_prefix.len()..]
                );
                family.set_name(renamed);
            }
        }

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::EncodingError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingError(e.to_string()))
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics error types
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("encoding error: {0}")]
    EncodingError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new();
        assert_eq!(collector.namespace(), "ledger_wizard");
        assert!(collector.export_metrics().is_ok());
    }

    #[test]
    fn test_record_session_metrics() {
        let collector = MetricsCollector::new();

        collector.record_session_started(BranchVariant::Full);
        collector.record_stage_entered(StageKind::Submit);
        collector.record_session_failed(&FailureReason::UnknownConfirmationState);

        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("ledger_wizard_sessions_started_total"));
        assert!(metrics.contains("variant=\"full\""));
        assert!(metrics.contains("ledger_wizard_sessions_failed_total"));
        assert!(metrics.contains("ledger_wizard_stage_transitions_total"));
    }

    #[test]
    fn test_record_confirmation_metrics() {
        let collector = MetricsCollector::new();

        collector.record_confirmation(
            &Resolution::Confirmed,
            ResolvedBy::ManualCheck,
            2,
            Duration::from_secs(7),
        );
        collector.record_query_error(true);

        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("ledger_wizard_confirmations_total"));
        assert!(metrics.contains("channel=\"manual\""));
        assert!(metrics.contains("ledger_wizard_confirmation_latency_ms"));
        assert!(metrics.contains("ledger_wizard_query_errors_total"));
    }

    #[test]
    fn test_custom_namespace() {
        let collector = MetricsCollector::with_namespace("wallet");
        collector.record_session_completed();

        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("wallet_sessions_completed_total"));
        assert!(!metrics.contains("ledger_wizard_sessions_completed_total"));
    }
}
