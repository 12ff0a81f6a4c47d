//! Core configuration structures for the ledger operation wizard

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Environment type (mainnet, testnet, local)
    #[serde(default)]
    pub environment: Environment,

    /// Confirmation timing
    #[serde(default)]
    pub confirmation: ConfirmationSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Stock settings for an environment
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Mainnet => Self {
                environment,
                logging: LoggingConfig {
                    json: true,
                    ..Default::default()
                },
                ..Default::default()
            },
            Environment::Testnet => Self {
                environment,
                logging: LoggingConfig {
                    level: "debug".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
            Environment::Local => Self {
                environment,
                logging: LoggingConfig {
                    level: "debug".to_string(),
                    ..Default::default()
                },
                metrics: MetricsConfig {
                    enabled: false,
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Mainnet,
    Testnet,
    #[default]
    Local,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Mainnet => "mainnet",
            Environment::Testnet => "testnet",
            Environment::Local => "local",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Environment::Mainnet),
            "testnet" => Ok(Environment::Testnet),
            "local" => Ok(Environment::Local),
            other => Err(ConfigError::ParseError(format!(
                "unknown environment '{other}'"
            ))),
        }
    }
}

/// Timing of manual confirmation checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationSettings {
    /// Delay before the first manual check, counted from submission
    #[serde(default = "default_first_check_delay_ms")]
    pub first_check_delay_ms: u64,

    /// Delay before each further manual check
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Growth factor applied to `retry_delay_ms` after the second check
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Manual checks made before giving up
    #[serde(default = "default_max_checks")]
    pub max_checks: u32,

    /// Longest wait for one remote state query
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl ConfirmationSettings {
    pub fn first_check_delay(&self) -> Duration {
        Duration::from_millis(self.first_check_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics collection
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prefix of every exported metric name
    #[serde(default = "default_metrics_namespace")]
    pub namespace: String,
}

// Default value functions
fn default_first_check_delay_ms() -> u64 {
    12_000
}

fn default_retry_delay_ms() -> u64 {
    5_000
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_checks() -> u32 {
    2
}

fn default_query_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_namespace() -> String {
    "ledger_wizard".to_string()
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            first_check_delay_ms: default_first_check_delay_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_checks: default_max_checks(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            namespace: default_metrics_namespace(),
        }
    }
}
