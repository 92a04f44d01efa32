//! Waits and retry budgets derived from configuration.

use std::time::Duration;

use crate::Config;

/// Wait intervals and retry budgets driving the lifecycle polling loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Wait after the graceful signal before re-checking.
    pub grace_period: Duration,
    /// Wait after the forceful signal before the final re-check.
    pub kill_wait: Duration,
    /// Wait after launching before looking for the process.
    pub settle: Duration,
    /// Pause between readiness probes.
    pub readiness_interval: Duration,
    /// Maximum number of readiness probes.
    pub readiness_attempts: u32,
    /// Timeout for a single TCP connection attempt.
    pub probe_timeout: Duration,
}

impl Timings {
    /// Collapses every wait to zero while keeping `attempts` probes.
    ///
    /// Handy for exercising the polling logic without real delays.
    #[must_use]
    pub const fn immediate(attempts: u32) -> Self {
        Self {
            grace_period: Duration::ZERO,
            kill_wait: Duration::ZERO,
            settle: Duration::ZERO,
            readiness_interval: Duration::ZERO,
            readiness_attempts: attempts,
            probe_timeout: Duration::from_millis(100),
        }
    }
}

impl Config {
    /// Converts the millisecond knobs into [`Timings`].
    #[must_use]
    pub const fn timings(&self) -> Timings {
        Timings {
            grace_period: Duration::from_millis(self.grace_period_ms),
            kill_wait: Duration::from_millis(self.kill_wait_ms),
            settle: Duration::from_millis(self.settle_ms),
            readiness_interval: Duration::from_millis(self.readiness_interval_ms),
            readiness_attempts: self.readiness_attempts,
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timings_match_documented_budget() {
        let timings = Config::default().timings();
        assert_eq!(timings.grace_period, Duration::from_secs(2));
        assert_eq!(timings.readiness_attempts, 60);
        assert_eq!(timings.readiness_interval, Duration::from_secs(1));
        assert_eq!(timings.probe_timeout, Duration::from_millis(500));
    }

    #[test]
    fn immediate_timings_keep_attempt_budget() {
        let timings = Timings::immediate(3);
        assert_eq!(timings.readiness_attempts, 3);
        assert_eq!(timings.readiness_interval, Duration::ZERO);
        assert_eq!(timings.settle, Duration::ZERO);
    }
}
