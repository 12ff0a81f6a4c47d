use std::time::Duration;

use crate::ConfirmationError;

/// Timing of the polling fallback
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationConfig {
    /// Delay from the start of an attempt to the first manual check.
    /// A hard ceiling, independent of when the pending set clears.
    pub first_check_delay: Duration,

    /// Delay before each check after a failed one
    pub retry_delay: Duration,

    /// Growth factor applied to `retry_delay` for every further retry
    pub backoff_multiplier: f64,

    /// Checks allowed before the attempt fails
    pub max_checks: u32,

    /// Longest wait for one remote state query; a query still unanswered
    /// counts as a transient failure
    pub query_timeout: Duration,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            first_check_delay: Duration::from_secs(12),
            retry_delay: Duration::from_secs(5),
            backoff_multiplier: 1.0,
            max_checks: 2,
            query_timeout: Duration::from_secs(5),
        }
    }
}

impl ConfirmationConfig {
    pub fn validate(&self) -> Result<(), ConfirmationError> {
        if self.first_check_delay.is_zero() {
            return Err(ConfirmationError::Config(
                "first check delay must be non-zero".to_string(),
            ));
        }
        if self.retry_delay.is_zero() {
            return Err(ConfirmationError::Config(
                "retry delay must be non-zero".to_string(),
            ));
        }
        if self.max_checks == 0 {
            return Err(ConfirmationError::Config(
                "at least one check is required".to_string(),
            ));
        }
        if self.query_timeout.is_zero() {
            return Err(ConfirmationError::Config(
                "query timeout must be non-zero".to_string(),
            ));
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(ConfirmationError::Config(
                "backoff multiplier must be >= 1.0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn schedule(&self) -> RecheckSchedule {
        RecheckSchedule::new(self)
    }
}

/// Delays before each manual check of one attempt.
///
/// Check 1 waits `first_check_delay`, check 2 waits `retry_delay`, later
/// checks grow by `backoff_multiplier`, capped at `first_check_delay`.
#[derive(Debug, Clone)]
pub struct RecheckSchedule {
    first: Duration,
    retry: Duration,
    multiplier: f64,
    max_checks: u32,
}

impl RecheckSchedule {
    pub fn new(config: &ConfirmationConfig) -> Self {
        Self {
            first: config.first_check_delay,
            retry: config.retry_delay,
            multiplier: config.backoff_multiplier,
            max_checks: config.max_checks,
        }
    }

    /// Delay before check number `check` (1-based), or `None` once the
    /// budget is spent
    pub fn delay_for(&self, check: u32) -> Option<Duration> {
        match check {
            0 => None,
            n if n > self.max_checks => None,
            1 => Some(self.first),
            n => {
                let exponent = (n - 2) as i32;
                let delay_ms = self.retry.as_millis() as f64 * self.multiplier.powi(exponent);
                let delay_ms = delay_ms.min(self.first.as_millis().max(self.retry.as_millis()) as f64);
                Some(Duration::from_millis(delay_ms as u64))
            }
        }
    }

    pub fn exhausted(&self, checks_made: u32) -> bool {
        checks_made >= self.max_checks
    }

    pub fn max_checks(&self) -> u32 {
        self.max_checks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let schedule = ConfirmationConfig::default().schedule();

        assert_eq!(schedule.delay_for(1), Some(Duration::from_secs(12)));
        assert_eq!(schedule.delay_for(2), Some(Duration::from_secs(5)));
        assert_eq!(schedule.delay_for(3), None);
        assert!(!schedule.exhausted(1));
        assert!(schedule.exhausted(2));
    }

    #[test]
    fn test_zero_is_not_a_check() {
        let schedule = ConfirmationConfig::default().schedule();
        assert_eq!(schedule.delay_for(0), None);
    }

    #[test]
    fn test_backoff_growth_is_capped() {
        let config = ConfirmationConfig {
            first_check_delay: Duration::from_secs(10),
            retry_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            max_checks: 6,
            ..Default::default()
        };
        let schedule = config.schedule();

        assert_eq!(schedule.delay_for(2), Some(Duration::from_secs(2)));
        assert_eq!(schedule.delay_for(3), Some(Duration::from_secs(4)));
        assert_eq!(schedule.delay_for(4), Some(Duration::from_secs(8)));
        assert_eq!(schedule.delay_for(5), Some(Duration::from_secs(10)));
        assert_eq!(schedule.delay_for(6), Some(Duration::from_secs(10)));
        assert_eq!(schedule.delay_for(7), None);
    }

    #[test]
    fn test_config_validation() {
        assert!(ConfirmationConfig::default().validate().is_ok());

        let no_checks = ConfirmationConfig {
            max_checks: 0,
            ..Default::default()
        };
        assert!(no_checks.validate().is_err());

        let shrinking = ConfirmationConfig {
            backoff_multiplier: 0.5,
            ..Default::default()
        };
        assert!(shrinking.validate().is_err());

        let instant = ConfirmationConfig {
            retry_delay: Duration::ZERO,
            ..Default::default()
        };
        assert!(instant.validate().is_err());

        let unbounded_wait = ConfirmationConfig {
            query_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(unbounded_wait.validate().is_err());
    }
}
