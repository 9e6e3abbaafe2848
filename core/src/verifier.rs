//! Check-in verification of ticket tokens.
//!
//! [`verify`] is pure: it performs no I/O and keeps no state, so any number
//! of gates may call it concurrently. A successful result only says the
//! token is authentic, current and scoped to this event. Whether the holder
//! has already entered is the attendance recorder's decision.

use crate::cipher::TicketCipher;
use crate::error::VerificationFailure;
use crate::ticket::{self, Ticket};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ticket fields released after successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedTicket {
    /// Ticket holder.
    pub user_id: i64,
    /// Holder display name.
    pub user_name: String,
    /// Event the ticket was verified against.
    pub event_id: String,
    /// Event display name.
    pub event_name: String,
    /// Ticket expiration time.
    pub expires_at: DateTime<Utc>,
}

impl From<Ticket> for VerifiedTicket {
    fn from(ticket: Ticket) -> Self {
        Self {
            user_id: ticket.user_id,
            user_name: ticket.user_name,
            event_id: ticket.event_id,
            event_name: ticket.event_name,
            expires_at: ticket.expiration_time,
        }
    }
}

/// Verify a token for the event a gate is scoped to.
///
/// Checks run in order: decrypt, decode, event binding, expiration.
/// Expiration is exclusive: a ticket is rejected at exactly
/// `expiration_time`.
///
/// # Errors
///
/// - [`VerificationFailure::InvalidToken`] if the token cannot be decrypted
///   or does not decode to a well-formed ticket
/// - [`VerificationFailure::WrongEvent`] if the ticket is for another event
/// - [`VerificationFailure::Expired`] if `now >= expiration_time`
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use qrpass_core::{cipher::TicketCipher, ticket::{issue, Ticket}, verifier::verify};
///
/// let cipher = TicketCipher::from_secret("operator passphrase");
/// let now = Utc::now();
/// let ticket = Ticket::valid_for(42, "Ada", "evt-1", "RustConf", now, Duration::hours(1)).unwrap();
/// let token = issue(&ticket, &cipher).unwrap();
///
/// let verified = verify(&token, &cipher, "evt-1", now).unwrap();
/// assert_eq!(verified.user_id, 42);
/// ```
pub fn verify(
    token: &str,
    cipher: &TicketCipher,
    expected_event_id: &str,
    now: DateTime<Utc>,
) -> Result<VerifiedTicket, VerificationFailure> {
    let plaintext = cipher.open(token).map_err(|e| {
        tracing::debug!(stage = "decrypt", error = %e, "Ticket token rejected");
        VerificationFailure::from(e)
    })?;

    let ticket = ticket::deserialize(&plaintext).map_err(|e| {
        tracing::debug!(stage = "decode", error = %e, "Ticket token rejected");
        VerificationFailure::from(e)
    })?;

    if ticket.event_id != expected_event_id {
        tracing::debug!(
            ticket_event_id = %ticket.event_id,
            expected_event_id = %expected_event_id,
            "Ticket presented at wrong event"
        );
        return Err(VerificationFailure::WrongEvent);
    }

    if now >= ticket.expiration_time {
        tracing::debug!(
            user_id = ticket.user_id,
            expiration_time = %ticket.expiration_time,
            now = %now,
            "Ticket expired"
        );
        return Err(VerificationFailure::Expired);
    }

    Ok(VerifiedTicket::from(ticket))
}

/// Verify a token using a passphrase instead of a prepared cipher.
///
/// Derives the key on every call. Prefer [`verify`] with a shared
/// [`TicketCipher`] on hot paths.
///
/// # Errors
///
/// Same as [`verify`].
pub fn verify_with_secret(
    token: &str,
    secret: &str,
    expected_event_id: &str,
    now: DateTime<Utc>,
) -> Result<VerifiedTicket, VerificationFailure> {
    verify(
        token,
        &TicketCipher::from_secret(secret),
        expected_event_id,
        now,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ticket::issue;
    use chrono::{Duration, TimeZone};

    fn expiry() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 23, 0, 0).unwrap()
    }

    fn token(cipher: &TicketCipher) -> String {
        issue(
            &Ticket::new(42, "Ada", "evt-1", "RustConf", expiry()),
            cipher,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_ticket_verifies() {
        let cipher = TicketCipher::from_secret("s3cret");
        let verified = verify(&token(&cipher), &cipher, "evt-1", expiry() - Duration::seconds(1)).unwrap();

        assert_eq!(
            verified,
            VerifiedTicket {
                user_id: 42,
                user_name: "Ada".into(),
                event_id: "evt-1".into(),
                event_name: "RustConf".into(),
                expires_at: expiry(),
            }
        );
    }

    #[test]
    fn test_expiration_boundary_is_exclusive() {
        let cipher = TicketCipher::from_secret("s3cret");
        let token = token(&cipher);

        assert_eq!(
            verify(&token, &cipher, "evt-1", expiry()),
            Err(VerificationFailure::Expired)
        );
        assert!(verify(&token, &cipher, "evt-1", expiry() - Duration::milliseconds(1)).is_ok());
    }

    #[test]
    fn test_wrong_event() {
        let cipher = TicketCipher::from_secret("s3cret");
        assert_eq!(
            verify(&token(&cipher), &cipher, "evt-2", expiry() - Duration::hours(1)),
            Err(VerificationFailure::WrongEvent)
        );
    }

    #[test]
    fn test_wrong_event_checked_before_expiry() {
        let cipher = TicketCipher::from_secret("s3cret");
        assert_eq!(
            verify(&token(&cipher), &cipher, "evt-2", expiry() + Duration::hours(1)),
            Err(VerificationFailure::WrongEvent)
        );
    }

    #[test]
    fn test_other_secret_is_invalid_token() {
        let issuer = TicketCipher::from_secret("s3cret");
        let gate = TicketCipher::from_secret("rotated");
        assert_eq!(
            verify(&token(&issuer), &gate, "evt-1", expiry() - Duration::hours(1)),
            Err(VerificationFailure::InvalidToken)
        );
    }

    #[test]
    fn test_garbage_is_invalid_token() {
        let cipher = TicketCipher::from_secret("s3cret");
        for garbage in ["", "abc", "!!!!", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"] {
            assert_eq!(
                verify(garbage, &cipher, "evt-1", expiry()),
                Err(VerificationFailure::InvalidToken),
                "{garbage:?}"
            );
        }
    }

    #[test]
    fn test_authentic_but_malformed_is_invalid_token() {
        let cipher = TicketCipher::from_secret("s3cret");
        let token = cipher.seal(br#"{"userId":42}"#).unwrap();
        assert_eq!(
            verify(&token, &cipher, "evt-1", expiry()),
            Err(VerificationFailure::InvalidToken)
        );
    }

    #[test]
    fn test_verify_with_secret_matches_verify() {
        let cipher = TicketCipher::from_secret("s3cret");
        let token = token(&cipher);
        let now = expiry() - Duration::minutes(5);
        assert_eq!(
            verify_with_secret(&token, "s3cret", "evt-1", now),
            verify(&token, &cipher, "evt-1", now)
        );
    }
}
