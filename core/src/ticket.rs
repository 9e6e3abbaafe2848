//! Ticket data and its canonical byte encoding.
//!
//! A [`Ticket`] is encoded as compact JSON with a fixed key order:
//!
//! ```json
//! {"userId":42,"userName":"Ada","eventId":"evt-1","eventName":"RustConf","expirationTime":"2025-01-01T00:00:00Z"}
//! ```
//!
//! Decoding is strict. Every field must be present with the right type,
//! unknown fields are refused and `eventId` must not be empty. Nothing is
//! filled in with a default.

use crate::cipher::TicketCipher;
use crate::error::{CodecError, IssueError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Attendee ticket bound to one event and an expiration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Ticket {
    /// Ticket holder.
    pub user_id: i64,
    /// Holder display name (informational).
    pub user_name: String,
    /// Event the ticket admits to.
    pub event_id: String,
    /// Event display name (informational).
    pub event_name: String,
    /// Instant from which the ticket is rejected.
    pub expiration_time: DateTime<Utc>,
}

impl Ticket {
    /// Create a ticket with an absolute expiration time.
    #[must_use]
    pub fn new(
        user_id: i64,
        user_name: impl Into<String>,
        event_id: impl Into<String>,
        event_name: impl Into<String>,
        expiration_time: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
            event_id: event_id.into(),
            event_name: event_name.into(),
            expiration_time,
        }
    }

    /// Create a ticket that stays valid for `ttl` after `issued_at`.
    ///
    /// Returns `None` if the expiration would fall outside the representable
    /// date range.
    #[must_use]
    pub fn valid_for(
        user_id: i64,
        user_name: impl Into<String>,
        event_id: impl Into<String>,
        event_name: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<Self> {
        let expiration_time = issued_at.checked_add_signed(ttl)?;
        Some(Self::new(user_id, user_name, event_id, event_name, expiration_time))
    }

    fn validate(&self) -> Result<(), CodecError> {
        if self.event_id.trim().is_empty() {
            return Err(CodecError::MalformedTicket {
                reason: "eventId must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Encode a ticket to its canonical byte form.
///
/// # Errors
///
/// Returns [`CodecError::MalformedTicket`] for an empty `eventId`, so an
/// issuer can never produce a token that would fail to decode, and
/// [`CodecError::EncodeFailed`] if serialization fails.
pub fn serialize(ticket: &Ticket) -> Result<Vec<u8>, CodecError> {
    ticket.validate()?;
    serde_json::to_vec(ticket).map_err(|e| CodecError::EncodeFailed {
        reason: e.to_string(),
    })
}

/// Decode a ticket from its canonical byte form.
///
/// # Errors
///
/// Returns [`CodecError::MalformedTicket`] if the bytes are not JSON, a
/// field is missing or mistyped, an unknown field is present, or
/// `eventId` is empty.
pub fn deserialize(bytes: &[u8]) -> Result<Ticket, CodecError> {
    let ticket: Ticket =
        serde_json::from_slice(bytes).map_err(|e| CodecError::MalformedTicket {
            reason: e.to_string(),
        })?;
    ticket.validate()?;
    Ok(ticket)
}

/// Serialize, encrypt and encode a ticket as an opaque token string.
///
/// # Errors
///
/// Returns [`IssueError`] if the ticket fails validation or encryption.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use qrpass_core::{cipher::TicketCipher, ticket::{issue, Ticket}};
///
/// let cipher = TicketCipher::from_secret("operator passphrase");
/// let ticket = Ticket::valid_for(42, "Ada", "evt-1", "RustConf", Utc::now(), Duration::hours(6))
///     .unwrap();
/// let token = issue(&ticket, &cipher).unwrap();
/// assert!(!token.is_empty());
/// ```
pub fn issue(ticket: &Ticket, cipher: &TicketCipher) -> Result<String, IssueError> {
    let bytes = serialize(ticket)?;
    let token = cipher.seal(&bytes)?;

    tracing::debug!(
        user_id = ticket.user_id,
        event_id = %ticket.event_id,
        expiration_time = %ticket.expiration_time,
        "Issued ticket token"
    );

    Ok(token)
}
