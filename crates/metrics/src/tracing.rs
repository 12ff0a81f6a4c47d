use std::sync::Arc;
use tracing::{field::Visit, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use ledger_wizard_config::LoggingConfig;
use ledger_wizard_types::{BranchVariant, SessionId};

use crate::collector::MetricsCollector;

/// Initialize tracing from the logging config
///
/// `RUST_LOG` takes precedence over `config.level` when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TracingError> {
    tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(config.json.then(|| fmt::layer().with_target(true).json()))
        .with((!config.json).then(|| fmt::layer().with_target(true)))
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))
}

/// Initialize tracing with metrics integration
pub fn init_tracing_with_metrics(
    config: &LoggingConfig,
    collector: Arc<MetricsCollector>,
) -> Result<(), TracingError> {
    tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(
            config
                .json
                .then(|| fmt::layer().with_target(true).with_thread_ids(true).json()),
        )
        .with((!config.json).then(|| fmt::layer().with_target(true)))
        .with(MetricsLayer::new(collector))
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))
}

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TracingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| TracingError::InitError(format!("invalid log level: {e}"))),
    }
}

/// Tracing layer that counts remote state query failures
///
/// Events carrying a `query_error` field are counted as transient at WARN
/// and as unavailable at ERROR.
pub struct MetricsLayer {
    collector: Arc<MetricsCollector>,
}

impl MetricsLayer {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }
}

impl<S> Layer<S> for MetricsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = QueryErrorVisitor::default();
        event.record(&mut visitor);

        if visitor.query_error.is_none() {
            return;
        }

        match *event.metadata().level() {
            Level::WARN => self.collector.record_query_error(true),
            Level::ERROR => self.collector.record_query_error(false),
            _ => {}
        }
    }
}

#[derive(Default)]
struct QueryErrorVisitor {
    query_error: Option<String>,
}

impl Visit for QueryErrorVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "query_error" {
            self.query_error = Some(format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "query_error" {
            self.query_error = Some(value.to_string());
        }
    }
}

/// Span context for one wizard session
#[derive(Debug, Clone)]
pub struct SessionSpan {
    pub session_id: SessionId,
    pub address: String,
    pub variant: BranchVariant,
}

impl SessionSpan {
    pub fn new(session_id: SessionId, address: impl Into<String>, variant: BranchVariant) -> Self {
        Self {
            session_id,
            address: address.into(),
            variant,
        }
    }

    /// Enter a tracing span for this session
    pub fn enter(&self) -> tracing::span::EnteredSpan {
        tracing::info_span!(
            "wizard_session",
            session_id = %self.session_id,
            address = %self.address,
            variant = %self.variant,
        )
        .entered()
    }
}

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
}
