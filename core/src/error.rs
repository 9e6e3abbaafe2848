//! Error types for ticket encryption, decoding and verification.
//!
//! The taxonomy is split by audience:
//!
//! - [`CipherError`] and [`CodecError`] are internal. They describe which
//!   stage of opening a token failed and are only ever logged.
//! - [`VerificationFailure`] is public. Cipher and codec failures collapse
//!   into [`VerificationFailure::InvalidToken`] so a caller cannot tell a
//!   forged token from one sealed under another secret.

use thiserror::Error;

/// Failure of the symmetric cipher layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    /// Ciphertext could not be opened.
    ///
    /// Truncated input, a bad authentication tag, invalid encoding and a
    /// wrong secret all produce this same variant.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// The AEAD primitive refused to encrypt.
    #[error("Encryption failed")]
    EncryptionFailed,
}

/// Failure of the ticket codec layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Decoded bytes are not a well-formed ticket.
    #[error("Malformed ticket: {reason}")]
    MalformedTicket {
        /// Which field or structural rule was violated
        reason: String,
    },

    /// A ticket could not be encoded.
    #[error("Failed to encode ticket: {reason}")]
    EncodeFailed {
        /// Underlying serializer message
        reason: String,
    },
}

/// Failure while issuing a token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IssueError {
    /// Ticket failed validation or encoding.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Ticket bytes could not be encrypted.
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// Public outcome of a failed verification.
///
/// `WrongEvent` and `Expired` carry operational meaning for the gate
/// ("wrong entrance", "ticket no longer valid"). Everything about the
/// token's cryptographic or structural state is folded into `InvalidToken`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationFailure {
    /// Token is forged, corrupted or sealed under a different secret.
    #[error("Invalid ticket")]
    InvalidToken,

    /// Ticket belongs to a different event.
    #[error("Ticket is not valid for this event")]
    WrongEvent,

    /// Ticket expiration time has passed.
    #[error("Ticket has expired")]
    Expired,
}

impl VerificationFailure {
    /// Stable machine-readable identifier, used as a metrics label and
    /// HTTP error code.
    ///
    /// # Examples
    ///
    /// ```
    /// # use qrpass_core::VerificationFailure;
    /// assert_eq!(VerificationFailure::Expired.as_str(), "expired");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidToken => "invalid_token",
            Self::WrongEvent => "wrong_event",
            Self::Expired => "expired",
        }
    }
}

impl From<CipherError> for VerificationFailure {
    fn from(_: CipherError) -> Self {
        Self::InvalidToken
    }
}

impl From<CodecError> for VerificationFailure {
    fn from(_: CodecError) -> Self {
        Self::InvalidToken
    }
}
