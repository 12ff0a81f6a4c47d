//! Metrics and monitoring for the ledger operation wizard
//!
//! This crate provides metrics collection and logging setup for wizard
//! sessions and their confirmation attempts.
//!
//! # Features
//!
//! - Prometheus metrics exposition
//! - A progress sink that turns session events into metrics
//! - Tracing initialisation from the logging config
//! - Session spans for correlating log lines
//!
//! # Example
//!
//! ```no_run
//! use ledger_wizard_config::LoggingConfig;
//! use ledger_wizard_metrics::{init_tracing_with_metrics, MetricsCollector, MetricsSink};
//! use std::sync::Arc;
//!
//! let collector = Arc::new(MetricsCollector::new());
//! init_tracing_with_metrics(&LoggingConfig::default(), collector.clone()).unwrap();
//!
//! // Hand the sink to every session
//! let sink = MetricsSink::new(collector.clone());
//!
//! println!("{}", collector.export_metrics().unwrap());
//! ```

pub mod collector;
pub mod metrics;
pub mod sink;
pub mod tracing;

pub use collector::{MetricsCollector, MetricsError};
pub use sink::MetricsSink;
pub use self::tracing::{
    init_tracing, init_tracing_with_metrics, MetricsLayer, SessionSpan, TracingError,
};
