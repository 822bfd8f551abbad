//! Runtime session settings

use crate::retry::RetryPolicy;
use std::time::Duration;
use strata_core::ClientConfig;

/// Session timing and resend policy, derived from [`ClientConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Session timeout requested from the partition
    pub timeout: Duration,
    /// How long each attempt waits for a response
    pub request_timeout: Duration,
    /// Capacity of each stream delivery channel
    pub stream_buffer: usize,
    /// Attempts at opening the session before giving up
    pub open_attempts: usize,
    /// Resend policy for transient failures
    pub retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for SessionConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.session.timeout_ms),
            request_timeout: Duration::from_millis(config.session.request_timeout_ms),
            stream_buffer: config.session.stream_buffer,
            open_attempts: config.session.open_attempts,
            retry: RetryPolicy::from(&config.retry),
        }
    }
}

impl SessionConfig {
    /// Set the session timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-attempt response timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the stream delivery channel capacity (at least 1)
    pub fn with_stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = capacity.max(1);
        self
    }

    /// Set the number of open attempts (at least 1)
    pub fn with_open_attempts(mut self, attempts: usize) -> Self {
        self.open_attempts = attempts.max(1);
        self
    }

    /// Set the resend policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Interval between keep-alives: half the session timeout
    pub fn keep_alive_interval(&self) -> Duration {
        (self.timeout / 2).max(Duration::from_millis(1))
    }
}
