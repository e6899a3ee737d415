//! Reconnection policy: exponential backoff with deterministic jitter.
//!
//! The broker connection is expected to outlive the process, so the default
//! policy retries indefinitely. The policy is an explicit, injectable value
//! rather than a hard-coded immediate-retry loop, so tests can bound it and
//! deployments can tune it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Serde helper that encodes a [`Duration`] as a `u64` millisecond count.
mod duration_millis {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Default reconnect initial delay: 100 ms.
const fn default_initial_delay() -> Duration {
    Duration::from_millis(100)
}

/// Default reconnect maximum delay: 30 seconds.
const fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

/// Default exponential backoff multiplier.
const fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Returns `true` (used for `#[serde(default)]` on boolean fields).
const fn default_true() -> bool {
    true
}

/// Exponential-backoff reconnection policy configuration.
///
/// When the broker connection is lost, the listener reconnects with
/// exponentially increasing delays between attempts, optionally capped at
/// `max_retries`. The default retries indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Whether automatic reconnection is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Initial delay before the first reconnection attempt.
    #[serde(default = "default_initial_delay", with = "duration_millis")]
    pub initial_delay: Duration,

    /// Maximum delay between reconnection attempts.
    #[serde(default = "default_max_delay", with = "duration_millis")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Optional upper bound on reconnection attempts.
    ///
    /// `None` means retry indefinitely.
    #[serde(default)]
    pub max_retries: Option<u32>,

    /// Whether to apply jitter to backoff delays.
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_retries: None,
            jitter: true,
        }
    }
}

/// Drives reconnection attempts for a single broker target.
pub struct ReconnectPolicy {
    /// Reconnection configuration.
    config: ReconnectConfig,
    /// Current retry attempt number.
    attempt: u32,
    /// Current backoff delay.
    current_delay: Duration,
}

impl ReconnectPolicy {
    /// Creates a new policy from the given configuration.
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        let initial_delay = config.initial_delay;
        Self {
            config,
            attempt: 0,
            current_delay: initial_delay,
        }
    }

    /// Returns the current retry attempt count.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns whether the maximum retry count has been exceeded.
    #[must_use]
    pub fn max_retries_exceeded(&self) -> bool {
        self.config
            .max_retries
            .is_some_and(|max| self.attempt >= max)
    }

    /// Resets the retry state after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current_delay = self.config.initial_delay;
        debug!("connection established, reset retry state");
    }

    /// Computes the next backoff delay and advances the retry state.
    ///
    /// Returns `None` if reconnection is disabled or max retries exceeded.
    /// Otherwise returns the duration to wait before the next attempt.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if !self.config.enabled {
            return None;
        }

        if self.max_retries_exceeded() {
            warn!(
                attempts = self.attempt,
                max = ?self.config.max_retries,
                "max reconnection retries exceeded"
            );
            return None;
        }

        self.attempt += 1;

        let delay = self.current_delay;

        // Deterministic jitter: ±25% of the delay, keyed on the attempt number.
        let delay = if self.config.jitter {
            let jitter_range = delay.as_millis() as f64 * 0.25;
            let jitter_offset =
                (f64::from(self.attempt) * 7.0 % jitter_range) - (jitter_range / 2.0);
            let jittered_ms = (delay.as_millis() as f64 + jitter_offset).max(1.0);
            Duration::from_millis(jittered_ms as u64)
        } else {
            delay
        };

        // Increase delay for the next attempt.
        let next_ms =
            (self.current_delay.as_millis() as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay = Duration::from_millis(next_ms).min(self.config.max_delay);

        debug!(
            attempt = self.attempt,
            delay_ms = delay.as_millis(),
            "scheduling reconnection attempt"
        );

        Some(delay)
    }
}

impl std::fmt::Debug for ReconnectPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectPolicy")
            .field("attempt", &self.attempt)
            .field("enabled", &self.config.enabled)
            .field("max_retries", &self.config.max_retries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ReconnectConfig {
        ReconnectConfig {
            enabled: true,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            max_retries: None,
            jitter: false,
        }
    }

    #[test]
    fn test_default_retries_indefinitely() {
        let config = ReconnectConfig::default();
        assert!(config.enabled);
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn test_exponential_backoff() {
        let mut policy = ReconnectPolicy::new(test_config());

        assert_eq!(policy.next_backoff().unwrap(), Duration::from_millis(100));
        assert_eq!(policy.next_backoff().unwrap(), Duration::from_millis(200));
        assert_eq!(policy.next_backoff().unwrap(), Duration::from_millis(400));
    }

    #[test]
    fn test_max_delay_cap() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(20),
            ..test_config()
        };
        let mut policy = ReconnectPolicy::new(config);

        policy.next_backoff(); // 20s
        let d2 = policy.next_backoff().unwrap(); // would be 40s, capped to 30s
        assert_eq!(d2, Duration::from_secs(30));
    }

    #[test]
    fn test_max_retries() {
        let config = ReconnectConfig {
            max_retries: Some(2),
            ..test_config()
        };
        let mut policy = ReconnectPolicy::new(config);

        assert!(policy.next_backoff().is_some()); // attempt 1
        assert!(policy.next_backoff().is_some()); // attempt 2
        assert!(policy.next_backoff().is_none()); // exceeded
    }

    #[test]
    fn test_reset() {
        let mut policy = ReconnectPolicy::new(test_config());

        policy.next_backoff();
        policy.next_backoff();
        assert_eq!(policy.attempt(), 2);

        policy.reset();
        assert_eq!(policy.attempt(), 0);
        assert_eq!(policy.next_backoff().unwrap(), Duration::from_millis(100));
    }

    #[test]
    fn test_disabled_reconnect() {
        let config = ReconnectConfig {
            enabled: false,
            ..test_config()
        };
        let mut policy = ReconnectPolicy::new(config);
        assert!(policy.next_backoff().is_none());
    }

    #[test]
    fn test_jitter_stays_near_delay() {
        let config = ReconnectConfig {
            jitter: true,
            ..test_config()
        };
        let mut policy = ReconnectPolicy::new(config);

        let d1 = policy.next_backoff().unwrap();
        assert!(d1.as_millis() > 0);
        assert!(d1.as_millis() <= 150); // within 25% + margin
    }

    #[test]
    fn test_serde_round_trip() {
        let config = ReconnectConfig {
            enabled: false,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 1.5,
            max_retries: Some(10),
            jitter: false,
        };

        let json = serde_json::to_string(&config).unwrap();
        let back: ReconnectConfig = serde_json::from_str(&json).unwrap();

        assert!(!back.enabled);
        assert_eq!(back.initial_delay, Duration::from_millis(500));
        assert_eq!(back.max_delay, Duration::from_secs(60));
        assert!((back.backoff_multiplier - 1.5).abs() < f64::EPSILON);
        assert_eq!(back.max_retries, Some(10));
        assert!(!back.jitter);
    }

    #[test]
    fn test_serde_defaults_applied() {
        let config: ReconnectConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.initial_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
        assert!(config.jitter);
    }
}
