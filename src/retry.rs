//! Error classification and retry backoff.
//!
//! Fetch failures are sorted into retryable and fatal classes by matching
//! well-known substrings in the error message, then fed through an
//! exponential backoff policy bounded by a validated configuration.

use std::time::Duration;

use anyhow::{bail, Result};

/// Substrings that mark an error as transient (expected to self-resolve).
/// Both spaced and hyphenated spellings are recognized.
const TRANSIENT_PATTERNS: &[&str] =
    &["timeout", "temporary", "connection reset", "connection-reset"];

/// Substrings that mark an error as rate-limited.
const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit",
    "rate-limit",
    "429",
    "too many requests",
    "too-many-requests",
];

/// Substrings that mark an error as a network failure.
const NETWORK_PATTERNS: &[&str] = &[
    "connection refused",
    "connection-refused",
    "no such host",
    "no-such-host",
    "network unreachable",
    "network-unreachable",
];

/// Classification of a fetch error for retry handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected to self-resolve; retried on the normal backoff schedule.
    Transient,
    /// Server-side throttling; honors a retry-after hint when present.
    RateLimited,
    /// Connectivity failure; retried at a doubled interval.
    NetworkError,
    /// Everything else; aborts the poll loop.
    Fatal,
}

impl ErrorClass {
    /// Classify an error message by substring matching.
    ///
    /// This is a textual heuristic, not protocol-aware: the fetch
    /// collaborator's wording determines the class. Matching is
    /// case-insensitive.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();

        let matches = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

        if matches(TRANSIENT_PATTERNS) {
            ErrorClass::Transient
        } else if matches(RATE_LIMIT_PATTERNS) {
            ErrorClass::RateLimited
        } else if matches(NETWORK_PATTERNS) {
            ErrorClass::NetworkError
        } else {
            ErrorClass::Fatal
        }
    }

    /// Whether this class of error should be retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorClass::Fatal)
    }

    /// Short label for retry notices.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::RateLimited => "rate-limited",
            ErrorClass::NetworkError => "network",
            ErrorClass::Fatal => "fatal",
        }
    }
}

/// Exponential backoff configuration.
///
/// Constructed once at setup, validated before polling starts, read-only
/// thereafter.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay for the first retry; lower bound for all delays.
    pub min_interval: Duration,
    /// Upper bound for all delays.
    pub max_interval: Duration,
    /// Growth factor per attempt. Must be greater than 1.0.
    pub multiplier: f64,
    /// Optional delay before the first fetch (Wait mode only).
    /// Duration is unsigned, so a negative initial delay is unrepresentable.
    pub initial_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            initial_delay: Duration::ZERO,
        }
    }
}

impl BackoffConfig {
    /// Validate the configuration, failing fast with a field-tagged error.
    pub fn validate(&self) -> Result<()> {
        if self.min_interval.is_zero() {
            bail!("min_interval: must be greater than zero");
        }
        if self.max_interval.is_zero() {
            bail!("max_interval: must be greater than zero");
        }
        if self.min_interval > self.max_interval {
            bail!("min_interval: must not exceed max_interval");
        }
        if !self.multiplier.is_finite() || self.multiplier <= 1.0 {
            bail!("multiplier: must be a finite value greater than 1.0");
        }
        Ok(())
    }

    /// Compute the delay before the next retry.
    ///
    /// `next_delay(0)` is always `min_interval`; delays grow by `multiplier`
    /// per attempt and are clamped to `[min_interval, max_interval]`.
    /// No jitter is applied.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let min = self.min_interval.as_secs_f64();
        let max = self.max_interval.as_secs_f64();
        let raw = min * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(raw.clamp(min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_transient() {
        assert_eq!(
            ErrorClass::classify("request timeout after 30s"),
            ErrorClass::Transient
        );
        assert_eq!(
            ErrorClass::classify("Temporary failure in name resolution"),
            ErrorClass::Transient
        );
        assert_eq!(
            ErrorClass::classify("read: connection reset by peer"),
            ErrorClass::Transient
        );
        assert_eq!(
            ErrorClass::classify("stream closed: connection-reset"),
            ErrorClass::Transient
        );
    }

    #[test]
    fn test_classify_rate_limited() {
        assert_eq!(
            ErrorClass::classify("HTTP 429 Too Many Requests"),
            ErrorClass::RateLimited
        );
        assert_eq!(
            ErrorClass::classify("rate limit exceeded"),
            ErrorClass::RateLimited
        );
        assert_eq!(
            ErrorClass::classify("rate-limited by upstream"),
            ErrorClass::RateLimited
        );
        assert_eq!(
            ErrorClass::classify("too-many-requests"),
            ErrorClass::RateLimited
        );
    }

    #[test]
    fn test_classify_network() {
        assert_eq!(
            ErrorClass::classify("dial tcp: connection refused"),
            ErrorClass::NetworkError
        );
        assert_eq!(
            ErrorClass::classify("lookup api.example.com: no such host"),
            ErrorClass::NetworkError
        );
        assert_eq!(
            ErrorClass::classify("network unreachable"),
            ErrorClass::NetworkError
        );
        assert_eq!(
            ErrorClass::classify("dial tcp: connection-refused"),
            ErrorClass::NetworkError
        );
        assert_eq!(
            ErrorClass::classify("lookup failed: no-such-host"),
            ErrorClass::NetworkError
        );
    }

    #[test]
    fn test_classify_fatal() {
        assert_eq!(
            ErrorClass::classify("invalid query syntax"),
            ErrorClass::Fatal
        );
        assert!(!ErrorClass::classify("permission denied").is_retryable());
    }

    #[test]
    fn test_first_delay_is_min_interval() {
        let cfg = BackoffConfig::default();
        assert_eq!(cfg.next_delay(0), cfg.min_interval);

        let cfg = BackoffConfig {
            min_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(cfg.next_delay(0), Duration::from_millis(250));
    }

    #[test]
    fn test_delay_sequence() {
        let cfg = BackoffConfig {
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            initial_delay: Duration::ZERO,
        };

        let expected = [1, 2, 4, 8, 10, 10, 10];
        for (attempt, secs) in expected.iter().enumerate() {
            assert_eq!(
                cfg.next_delay(attempt as u32),
                Duration::from_secs(*secs),
                "attempt {}",
                attempt
            );
        }
    }

    #[test]
    fn test_delays_non_decreasing_and_bounded() {
        let cfg = BackoffConfig {
            min_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(20),
            multiplier: 1.7,
            initial_delay: Duration::ZERO,
        };

        let mut prev = Duration::ZERO;
        for attempt in 0..32 {
            let delay = cfg.next_delay(attempt);
            assert!(delay >= prev, "attempt {}", attempt);
            assert!(delay >= cfg.min_interval);
            assert!(delay <= cfg.max_interval);
            prev = delay;
        }
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let zero_min = BackoffConfig {
            min_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(zero_min.validate().unwrap_err().to_string().contains("min_interval"));

        let zero_max = BackoffConfig {
            max_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(zero_max.validate().is_err());

        let inverted = BackoffConfig {
            min_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let flat = BackoffConfig {
            multiplier: 1.0,
            ..Default::default()
        };
        assert!(flat.validate().unwrap_err().to_string().contains("multiplier"));
    }

    #[test]
    fn test_validate_rejects_non_finite_multiplier() {
        // NaN compares false against every threshold, so it needs an
        // explicit finiteness check before the range check.
        for m in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let cfg = BackoffConfig {
                multiplier: m,
                ..Default::default()
            };
            assert!(
                cfg.validate().unwrap_err().to_string().contains("multiplier"),
                "{m} must be rejected"
            );
        }
    }

    #[test]
    fn test_validate_accepts_default() {
        assert!(BackoffConfig::default().validate().is_ok());
    }
}
