//! # QR Pass Core
//!
//! Encrypted event tickets and the abuse guard in front of their
//! verification.
//!
//! ## Components
//!
//! - **Cipher** ([`cipher`]): AES-256-GCM keyed from an operator passphrase,
//!   fresh nonce per token
//! - **Ticket codec** ([`ticket`]): strict canonical JSON for ticket fields
//! - **Verifier** ([`verifier`]): pure decrypt → decode → event → expiry check
//! - **Rate limit guard** ([`rate_limit`]): fixed windows per client and
//!   route class
//! - **Attendance** ([`attendance`]): record-once contract for check-ins
//!
//! ## Flow
//!
//! ```text
//! issue:   Ticket ──serialize──▶ bytes ──encrypt──▶ token
//! verify:  request ──admit──▶ token ──decrypt──▶ bytes ──deserialize──▶ Ticket
//!                                                      ──event/expiry──▶ VerifiedTicket
//! ```
//!
//! ## Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use qrpass_core::{issue, verify, Ticket, TicketCipher, VerificationFailure};
//!
//! let cipher = TicketCipher::from_secret("operator passphrase");
//! let now = Utc::now();
//! let ticket = Ticket::valid_for(42, "Ada", "evt-1", "RustConf", now, Duration::hours(2)).unwrap();
//! let token = issue(&ticket, &cipher).unwrap();
//!
//! assert_eq!(verify(&token, &cipher, "evt-1", now).unwrap().user_id, 42);
//! assert_eq!(
//!     verify(&token, &cipher, "evt-2", now),
//!     Err(VerificationFailure::WrongEvent)
//! );
//! ```

pub mod attendance;
pub mod cipher;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod ticket;
pub mod verifier;

pub use attendance::{AttendanceError, AttendanceRecorder, CheckIn, InMemoryAttendance};
pub use cipher::TicketCipher;
pub use config::{RateLimitConfig, TicketSecret, WindowPolicy};
pub use environment::{Clock, SystemClock};
pub use error::{CipherError, CodecError, IssueError, VerificationFailure};
pub use rate_limit::{Admission, RateLimitGuard, RouteClass};
pub use ticket::{issue, Ticket};
pub use verifier::{verify, verify_with_secret, VerifiedTicket};

/// Time source injected into request handlers and background tasks.
///
/// Core operations take `now` explicitly; the boundary reads it from a
/// [`Clock`] so tests can substitute a fixed or manually advanced one.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
