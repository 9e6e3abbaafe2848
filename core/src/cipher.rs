//! Symmetric encryption of ticket payloads.
//!
//! Tickets are sealed with AES-256-GCM. The 256-bit key is the SHA-256
//! digest of an operator-supplied passphrase, so any secret string is
//! accepted and maps deterministically to a key.
//!
//! # Wire format
//!
//! ```text
//! [nonce (12 bytes)][ciphertext (variable)][tag (16 bytes)]
//! ```
//!
//! Every call to [`TicketCipher::encrypt`] draws a fresh nonce from the OS
//! RNG. Two tickets with identical contents therefore never share a
//! ciphertext prefix.
//!
//! # Security
//!
//! Decryption reports a single [`CipherError::DecryptionFailed`] for every
//! failure (short input, tampered bytes, wrong key). Callers must not try
//! to recover a finer reason.

use crate::error::CipherError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of the AES-GCM nonce prepended to every ciphertext.
pub const NONCE_LEN: usize = 12;

/// Length of the AES-GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// AES-256-GCM cipher keyed from a passphrase.
///
/// Construct once at startup and share; the key schedule is computed in
/// [`TicketCipher::from_secret`].
///
/// # Example
///
/// ```
/// use qrpass_core::cipher::TicketCipher;
///
/// let cipher = TicketCipher::from_secret("correct horse battery staple");
/// let sealed = cipher.encrypt(b"hello").unwrap();
/// assert_eq!(cipher.decrypt(&sealed).unwrap(), b"hello");
/// ```
#[derive(Clone)]
pub struct TicketCipher {
    cipher: Aes256Gcm,
}

impl TicketCipher {
    /// Derive the cipher key from a passphrase.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        let key = Sha256::digest(secret.as_bytes());
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::EncryptionFailed`] if the AEAD primitive
    /// rejects the input (only possible for inputs beyond GCM's size limit).
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt data produced by [`TicketCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::DecryptionFailed`] for any input that is not
    /// an authentic ciphertext under this key.
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CipherError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::DecryptionFailed);
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)
    }

    /// Encrypt and encode as URL-safe base64 (no padding).
    ///
    /// # Errors
    ///
    /// See [`TicketCipher::encrypt`].
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        self.encrypt(plaintext)
            .map(|sealed| URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Decode a token produced by [`TicketCipher::seal`] and decrypt it.
    ///
    /// # Errors
    ///
    /// Invalid base64 and failed decryption both return
    /// [`CipherError::DecryptionFailed`].
    pub fn open(&self, token: &str) -> Result<Vec<u8>, CipherError> {
        let sealed = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| CipherError::DecryptionFailed)?;
        self.decrypt(&sealed)
    }
}

impl fmt::Debug for TicketCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketCipher")
            .field("algorithm", &"AES-256-GCM")
            .finish_non_exhaustive()
    }
}

/// Encrypt `plaintext` under `secret`.
///
/// Convenience over [`TicketCipher`] for one-off use; derives the key on
/// every call.
///
/// # Errors
///
/// See [`TicketCipher::encrypt`].
pub fn encrypt(plaintext: &[u8], secret: &str) -> Result<Vec<u8>, CipherError> {
    TicketCipher::from_secret(secret).encrypt(plaintext)
}

/// Decrypt `ciphertext` under `secret`.
///
/// # Errors
///
/// See [`TicketCipher::decrypt`].
pub fn decrypt(ciphertext: &[u8], secret: &str) -> Result<Vec<u8>, CipherError> {
    TicketCipher::from_secret(secret).decrypt(ciphertext)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let sealed = encrypt(b"ticket payload", "s3cret").unwrap();
        assert_eq!(decrypt(&sealed, "s3cret").unwrap(), b"ticket payload");
    }

    #[test]
    fn test_round_trip_empty_plaintext_and_secret() {
        let sealed = encrypt(b"", "").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + TAG_LEN);
        assert_eq!(decrypt(&sealed, "").unwrap(), b"");
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let cipher = TicketCipher::from_secret("s3cret");
        let first = cipher.encrypt(b"same plaintext").unwrap();
        let second = cipher.encrypt(b"same plaintext").unwrap();

        assert_ne!(first[..NONCE_LEN], second[..NONCE_LEN]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let sealed = encrypt(b"payload", "right").unwrap();
        assert_eq!(decrypt(&sealed, "wrong"), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn test_truncated_input_fails() {
        let sealed = encrypt(b"payload", "s3cret").unwrap();

        for len in [0, 1, NONCE_LEN, NONCE_LEN + TAG_LEN - 1, sealed.len() - 1] {
            assert_eq!(
                decrypt(&sealed[..len], "s3cret"),
                Err(CipherError::DecryptionFailed),
                "length {len} should fail"
            );
        }
    }

    #[test]
    fn test_flipped_byte_fails() {
        let mut sealed = encrypt(b"payload", "s3cret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert_eq!(decrypt(&sealed, "s3cret"), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn test_seal_open_text_form() {
        let cipher = TicketCipher::from_secret("s3cret");
        let token = cipher.seal(b"payload").unwrap();

        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(cipher.open(&token).unwrap(), b"payload");
    }

    #[test]
    fn test_open_rejects_invalid_base64() {
        let cipher = TicketCipher::from_secret("s3cret");
        assert_eq!(cipher.open("not base64!!"), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn test_debug_does_not_expose_key() {
        let cipher = TicketCipher::from_secret("s3cret");
        let rendered = format!("{cipher:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("AES-256-GCM"));
    }
}
