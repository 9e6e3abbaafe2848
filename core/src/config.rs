//! Ticket and rate-limit configuration.
//!
//! Configuration values are supplied by the application (see the server's
//! environment loader), not hardcoded. Defaults here are what a deployment
//! gets when it only provides a secret.

use chrono::Duration;
use std::fmt;

/// Operator passphrase from which the ticket cipher key is derived.
///
/// `Debug` output is redacted. Rotating the secret invalidates every
/// ticket issued under the old one.
#[derive(Clone, PartialEq, Eq)]
pub struct TicketSecret(String);

impl TicketSecret {
    /// Wrap a passphrase.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Access the raw passphrase.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the passphrase is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for TicketSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TicketSecret(***)")
    }
}

/// Fixed-window limit for one route class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Window length.
    pub window: Duration,
    /// Requests admitted per key per window.
    pub max_requests: u32,
}

impl WindowPolicy {
    /// Create a window policy.
    #[must_use]
    pub const fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
        }
    }
}

/// Rate-limit configuration for both route classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Broad API protection.
    ///
    /// Default: 100 requests per 15 minutes
    pub general: WindowPolicy,

    /// Token-guessing surface.
    ///
    /// Default: 10 requests per minute
    pub verification: WindowPolicy,

    /// Tracked key count above which `admit` sweeps idle windows inline.
    ///
    /// Default: 100 000
    pub max_tracked_keys: usize,
}

impl RateLimitConfig {
    /// Set the general route policy.
    #[must_use]
    pub const fn with_general(mut self, policy: WindowPolicy) -> Self {
        self.general = policy;
        self
    }

    /// Set the verification route policy.
    #[must_use]
    pub const fn with_verification(mut self, policy: WindowPolicy) -> Self {
        self.verification = policy;
        self
    }

    /// Set the inline sweep threshold.
    #[must_use]
    pub const fn with_max_tracked_keys(mut self, max: usize) -> Self {
        self.max_tracked_keys = max;
        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            general: WindowPolicy::new(Duration::minutes(15), 100),
            verification: WindowPolicy::new(Duration::minutes(1), 10),
            max_tracked_keys: 100_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = TicketSecret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "TicketSecret(***)");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_blank_secret() {
        assert!(TicketSecret::new("   ").is_blank());
        assert!(!TicketSecret::new("x").is_blank());
    }

    #[test]
    fn test_rate_limit_defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.general, WindowPolicy::new(Duration::minutes(15), 100));
        assert_eq!(config.verification, WindowPolicy::new(Duration::minutes(1), 10));
        assert_eq!(config.max_tracked_keys, 100_000);
    }

    #[test]
    fn test_rate_limit_builder() {
        let config = RateLimitConfig::default()
            .with_verification(WindowPolicy::new(Duration::seconds(30), 3))
            .with_max_tracked_keys(10);
        assert_eq!(config.verification.max_requests, 3);
        assert_eq!(config.max_tracked_keys, 10);
    }
}
