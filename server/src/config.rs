//! Server configuration loaded from environment variables.
//!
//! Every setting except the ticket secret has a default. Values that are
//! present but unparsable are errors rather than silently replaced by the
//! default.

use chrono::Duration;
use qrpass_core::{RateLimitConfig, TicketSecret, WindowPolicy};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use thiserror::Error;

/// Longest rate-limit window accepted, in seconds (one year).
pub const MAX_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset.
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("Invalid value for {key}: {reason}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// What was wrong with it
        reason: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Passphrase tickets are sealed under.
    pub secret: TicketSecret,
    /// Interface to bind.
    pub host: IpAddr,
    /// Port to bind.
    pub port: u16,
    /// Key clients by forwarded headers instead of the peer address.
    pub trust_proxy_headers: bool,
    /// Per-class limits and the tracked-key threshold.
    pub rate_limit: RateLimitConfig,
    /// Period of the idle-window sweeper.
    pub sweep_interval: std::time::Duration,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `QRPASS_SECRET` is missing or blank, or if
    /// any other variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("QRPASS_SECRET")
            .map(TicketSecret::new)
            .ok_or(ConfigError::Missing("QRPASS_SECRET"))?;
        if secret.is_blank() {
            return Err(ConfigError::Invalid {
                key: "QRPASS_SECRET",
                reason: "must not be empty".to_string(),
            });
        }

        let defaults = RateLimitConfig::default();
        let general = WindowPolicy::new(
            window(&lookup, "QRPASS_GENERAL_WINDOW_SECS", defaults.general.window)?,
            parse_or(&lookup, "QRPASS_GENERAL_MAX_REQUESTS", defaults.general.max_requests)?,
        );
        let verification = WindowPolicy::new(
            window(&lookup, "QRPASS_VERIFY_WINDOW_SECS", defaults.verification.window)?,
            parse_or(
                &lookup,
                "QRPASS_VERIFY_MAX_REQUESTS",
                defaults.verification.max_requests,
            )?,
        );
        let max_tracked_keys =
            parse_or(&lookup, "QRPASS_MAX_TRACKED_KEYS", defaults.max_tracked_keys)?;
        let rate_limit = defaults
            .with_general(general)
            .with_verification(verification)
            .with_max_tracked_keys(max_tracked_keys);

        let sweep_secs: u64 = parse_or(&lookup, "QRPASS_SWEEP_INTERVAL_SECS", 60)?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "QRPASS_SWEEP_INTERVAL_SECS",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            secret,
            host: parse_or(&lookup, "QRPASS_HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&lookup, "QRPASS_PORT", 8080)?,
            trust_proxy_headers: parse_or(&lookup, "QRPASS_TRUST_PROXY_HEADERS", false)?,
            rate_limit,
            sweep_interval: std::time::Duration::from_secs(sweep_secs),
        })
    }

    /// Address the HTTP listener binds.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

fn window<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let secs: i64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }
    })?;
    if !(1..=MAX_WINDOW_SECS).contains(&secs) {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("must be between 1 and {MAX_WINDOW_SECS} seconds"),
        });
    }
    Ok(Duration::seconds(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("QRPASS_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8080");
        assert!(!config.trust_proxy_headers);
        assert_eq!(config.rate_limit.general.window, Duration::minutes(15));
        assert_eq!(config.rate_limit.general.max_requests, 100);
        assert_eq!(config.rate_limit.verification.window, Duration::minutes(1));
        assert_eq!(config.rate_limit.verification.max_requests, 10);
        assert_eq!(config.rate_limit.max_tracked_keys, 100_000);
        assert_eq!(config.sweep_interval, std::time::Duration::from_secs(60));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("QRPASS_SECRET", "s3cret"),
            ("QRPASS_HOST", "127.0.0.1"),
            ("QRPASS_PORT", "9000"),
            ("QRPASS_TRUST_PROXY_HEADERS", "true"),
            ("QRPASS_VERIFY_WINDOW_SECS", "30"),
            ("QRPASS_VERIFY_MAX_REQUESTS", "5"),
            ("QRPASS_MAX_TRACKED_KEYS", "500"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:9000");
        assert!(config.trust_proxy_headers);
        assert_eq!(config.rate_limit.verification.window, Duration::seconds(30));
        assert_eq!(config.rate_limit.verification.max_requests, 5);
        assert_eq!(config.rate_limit.max_tracked_keys, 500);
    }

    #[test]
    fn test_secret_required() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("QRPASS_SECRET"));
        assert!(matches!(
            load(&[("QRPASS_SECRET", "   ")]),
            Err(ConfigError::Invalid { key: "QRPASS_SECRET", .. })
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (key, value) in [
            ("QRPASS_PORT", "http"),
            ("QRPASS_HOST", "localhost"),
            ("QRPASS_GENERAL_WINDOW_SECS", "0"),
            ("QRPASS_GENERAL_WINDOW_SECS", "10000000000000"),
            ("QRPASS_VERIFY_WINDOW_SECS", "31536001"),
            ("QRPASS_VERIFY_MAX_REQUESTS", "-1"),
            ("QRPASS_TRUST_PROXY_HEADERS", "yes"),
            ("QRPASS_SWEEP_INTERVAL_SECS", "0"),
        ] {
            let err = load(&[("QRPASS_SECRET", "s3cret"), (key, value)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: k, .. } if k == key),
                "{key}={value} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_one_year_window_accepted() {
        let config = load(&[
            ("QRPASS_SECRET", "s3cret"),
            ("QRPASS_GENERAL_WINDOW_SECS", "31536000"),
        ])
        .unwrap();
        assert_eq!(config.rate_limit.general.window, Duration::days(365));
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let config = load(&[("QRPASS_SECRET", "hunter2")]).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
