//! # QR Pass Testing
//!
//! Testing utilities for QR Pass crates.
//!
//! This crate provides:
//! - Deterministic clocks (`FixedClock`, `ManualClock`)
//! - Ticket fixtures under a shared test secret
//! - proptest strategies for tickets and secrets
//!
//! ## Example
//!
//! ```
//! use chrono::Duration;
//! use qrpass_core::{verify, Clock};
//! use qrpass_testing::{fixtures, ManualClock};
//!
//! let clock = ManualClock::new(fixtures::issued_at());
//! let token = fixtures::token_for(&fixtures::ticket(42, "evt-1"));
//!
//! assert!(verify(&token, &fixtures::cipher(), "evt-1", clock.now()).is_ok());
//! clock.advance(Duration::days(2));
//! assert!(verify(&token, &fixtures::cipher(), "evt-1", clock.now()).is_err());
//! ```

use chrono::{DateTime, Utc};
use qrpass_core::environment::Clock;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use qrpass_testing::mocks::FixedClock;
    /// use qrpass_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Used to step through rate-limit windows and ticket expiry without
    /// sleeping.
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward (or backward, for a negative duration).
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time.
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(crate::fixtures::issued_at())
    }
}

/// Ticket fixtures sealed under [`fixtures::TEST_SECRET`].
pub mod fixtures {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use qrpass_core::{issue, Ticket, TicketCipher};

    /// Passphrase shared by fixtures.
    pub const TEST_SECRET: &str = "qrpass-test-secret";

    /// Issue time of fixture tickets (2025-01-01 00:00:00 UTC).
    #[must_use]
    pub fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Expiration of fixture tickets: one day after [`issued_at`].
    #[must_use]
    pub fn expires_at() -> DateTime<Utc> {
        issued_at() + Duration::days(1)
    }

    /// Cipher keyed with [`TEST_SECRET`].
    #[must_use]
    pub fn cipher() -> TicketCipher {
        TicketCipher::from_secret(TEST_SECRET)
    }

    /// Ticket for `user_id` at `event_id`, expiring at [`expires_at`].
    #[must_use]
    pub fn ticket(user_id: i64, event_id: &str) -> Ticket {
        Ticket::new(
            user_id,
            format!("Attendee {user_id}"),
            event_id,
            format!("Event {event_id}"),
            expires_at(),
        )
    }

    /// Seal `ticket` under [`TEST_SECRET`].
    ///
    /// Returns an empty string if the ticket cannot be issued, which every
    /// verifier rejects as an invalid token.
    #[must_use]
    pub fn token_for(ticket: &Ticket) -> String {
        issue(ticket, &cipher()).unwrap_or_default()
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use qrpass_core::Ticket;

    /// Any UTC instant between 1970 and 2100 with millisecond precision.
    pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        (0_i64..4_102_444_800_000).prop_map(|millis| {
            Utc.timestamp_millis_opt(millis)
                .single()
                .unwrap_or(DateTime::UNIX_EPOCH)
        })
    }

    /// Any ticket with a non-empty event id.
    pub fn arb_ticket() -> impl Strategy<Value = Ticket> {
        (
            any::<i64>(),
            ".{0,40}",
            "[A-Za-z0-9_-]{1,24}",
            ".{0,60}",
            arb_timestamp(),
        )
            .prop_map(|(user_id, user_name, event_id, event_name, expiration_time)| {
                Ticket::new(user_id, user_name, event_id, event_name, expiration_time)
            })
    }

    /// Any passphrase, including the empty one.
    pub fn arb_secret() -> impl Strategy<Value = String> {
        ".{0,64}"
    }
}

/// Install a test-friendly tracing subscriber.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrpass=debug".into()),
        )
        .try_init();
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, ManualClock};
