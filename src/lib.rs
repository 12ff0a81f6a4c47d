//! Multi-step ledger operation wizard
//!
//! Walks a user through a pruned list of stages, submits signed requests on
//! submit stages and advances once the effect is confirmed by either the
//! pending-set notifier or a bounded polling fallback.
//!
//! [`SessionFactory`] wires configuration and the host's collaborators into
//! one [`StepFlowEngine`] per session.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

pub use ledger_wizard_config as config;
pub use ledger_wizard_confirmation as confirmation;
pub use ledger_wizard_flow as flow;
pub use ledger_wizard_metrics as metrics;
pub use ledger_wizard_types as types;

use ledger_wizard_config::{
    validate_config, AppConfig, ConfigLoader, ConfirmationSettings, ENV_PREFIX,
};
use ledger_wizard_confirmation::{
    ConfirmationConfig, ConfirmationCoordinator, PendingSetNotifier, RemoteStateQuery,
};
use ledger_wizard_flow::{FlowError, FlowTemplate, StepFlowEngine, SubmitAdapter};
use ledger_wizard_metrics::{MetricsCollector, MetricsSink, SessionSpan};
use ledger_wizard_types::{BranchVariant, FanoutSink, NullSink, ProgressSink, SessionId};

/// Builds wizard sessions sharing one set of collaborators
pub struct SessionFactory {
    config: AppConfig,
    notifier: Arc<dyn PendingSetNotifier>,
    query: Arc<dyn RemoteStateQuery>,
    submitter: Arc<dyn SubmitAdapter>,
    sink: Arc<dyn ProgressSink>,
    collector: Option<Arc<MetricsCollector>>,
}

impl SessionFactory {
    pub fn new(
        config: AppConfig,
        notifier: Arc<dyn PendingSetNotifier>,
        query: Arc<dyn RemoteStateQuery>,
        submitter: Arc<dyn SubmitAdapter>,
    ) -> Self {
        let collector = config
            .metrics
            .enabled
            .then(|| Arc::new(MetricsCollector::from_config(&config.metrics)));

        Self {
            config,
            notifier,
            query,
            submitter,
            sink: Arc::new(NullSink),
            collector,
        }
    }

    /// Load the config file at `path`, overlay `LEDGER_WIZARD_*`
    /// environment variables and validate the result
    pub fn from_config_file(
        path: &Path,
        notifier: Arc<dyn PendingSetNotifier>,
        query: Arc<dyn RemoteStateQuery>,
        submitter: Arc<dyn SubmitAdapter>,
    ) -> anyhow::Result<Self> {
        let config = ConfigLoader::from_file_with_env(path, ENV_PREFIX)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        validate_config(&config).context("invalid wizard configuration")?;

        Ok(Self::new(config, notifier, query, submitter))
    }

    /// Sink receiving the events of every session started afterwards
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Collector shared by every session, when metrics are enabled
    pub fn metrics(&self) -> Option<&Arc<MetricsCollector>> {
        self.collector.as_ref()
    }

    /// Start a session for `address`, with its own confirmation coordinator
    pub fn start_session(
        &self,
        address: &str,
        variant: BranchVariant,
        template: &FlowTemplate,
    ) -> Result<StepFlowEngine, FlowError> {
        let session_id = SessionId::new();
        let _span = SessionSpan::new(session_id, address, variant).enter();

        let coordinator = ConfirmationCoordinator::new(
            address,
            Arc::clone(&self.notifier),
            Arc::clone(&self.query),
            confirmation_config(&self.config.confirmation),
        )?;

        let sink: Arc<dyn ProgressSink> = match &self.collector {
            Some(collector) => Arc::new(
                FanoutSink::new()
                    .with(Arc::clone(&self.sink))
                    .with(Arc::new(MetricsSink::new(Arc::clone(collector)))),
            ),
            None => Arc::clone(&self.sink),
        };

        debug!(template = template.name(), "Building wizard session");

        StepFlowEngine::start(
            session_id,
            address,
            variant,
            template,
            coordinator,
            Arc::clone(&self.submitter),
            sink,
        )
    }
}

/// Map the configured confirmation timing onto the coordinator's config
pub fn confirmation_config(settings: &ConfirmationSettings) -> ConfirmationConfig {
    ConfirmationConfig {
        first_check_delay: settings.first_check_delay(),
        retry_delay: settings.retry_delay(),
        backoff_multiplier: settings.backoff_multiplier,
        max_checks: settings.max_checks,
        query_timeout: settings.query_timeout(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_confirmation_config_from_settings() {
        let config = confirmation_config(&ConfirmationSettings::default());
        assert_eq!(config, ConfirmationConfig::default());

        let config = confirmation_config(&ConfirmationSettings {
            first_check_delay_ms: 3000,
            retry_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_checks: 3,
            query_timeout_ms: 800,
        });
        assert_eq!(config.first_check_delay, Duration::from_secs(3));
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.max_checks, 3);
        assert_eq!(config.query_timeout, Duration::from_millis(800));
    }
}
