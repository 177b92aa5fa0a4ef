//! Configuration for lifecycle coordination.

use crate::{InvalidConfig, PollPolicy};
use std::time::Duration;

/// Configuration for submission, polling and provisioning.
///
/// The polling policy is deliberately demonstration-grade: a fixed cadence
/// with no backoff. It is not meant to be strengthened silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Wall-clock time between two status queries.
    pub poll_interval: Duration,

    /// Consecutive verifier errors tolerated before a poll is abandoned.
    ///
    /// `None` keeps polling through errors forever.
    pub max_consecutive_poll_errors: Option<u32>,

    /// Upper bound on how long table provisioning waits for confirmation.
    ///
    /// `None` waits forever.
    pub provisioning_timeout: Option<Duration>,

    /// Row cap for the post-confirmation refresh query.
    pub refresh_limit: Option<u32>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1500),
            max_consecutive_poll_errors: None,
            provisioning_timeout: Some(Duration::from_secs(120)),
            refresh_limit: None,
        }
    }
}

impl LifecycleConfig {
    /// Unbounded provisioning wait and unbounded error tolerance.
    pub fn unbounded() -> Self {
        Self {
            provisioning_timeout: None,
            ..Default::default()
        }
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Abandon a poll after this many consecutive verifier errors.
    pub fn with_max_consecutive_poll_errors(mut self, max: u32) -> Self {
        self.max_consecutive_poll_errors = Some(max);
        self
    }

    /// Set (or clear) the provisioning timeout.
    pub fn with_provisioning_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.provisioning_timeout = timeout;
        self
    }

    /// Cap the number of rows fetched on refresh.
    pub fn with_refresh_limit(mut self, limit: u32) -> Self {
        self.refresh_limit = Some(limit);
        self
    }

    /// Reject values the poller cannot run with.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.poll_interval.is_zero() {
            return Err(InvalidConfig::ZeroPollInterval);
        }
        Ok(())
    }

    /// The policy handed to the poller.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval,
            max_consecutive_errors: self.max_consecutive_poll_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(LifecycleConfig::default().validate(), Ok(()));
        assert_eq!(LifecycleConfig::unbounded().validate(), Ok(()));
    }

    #[test]
    fn test_zero_poll_interval_is_invalid() {
        let config = LifecycleConfig::default().with_poll_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(InvalidConfig::ZeroPollInterval));
    }
}
