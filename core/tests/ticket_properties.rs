//! Property tests for the issue/verify pipeline.
//!
//! Covers round-tripping of arbitrary tickets under arbitrary secrets and
//! tamper sensitivity of sealed tokens.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use proptest::prelude::*;
use qrpass_core::{cipher, ticket, verify, TicketCipher, VerificationFailure};
use qrpass_testing::{fixtures, properties::{arb_secret, arb_ticket}};

proptest! {
    #[test]
    fn prop_ticket_survives_encrypt_decrypt(t in arb_ticket(), secret in arb_secret()) {
        let sealed = cipher::encrypt(&ticket::serialize(&t).unwrap(), &secret).unwrap();
        let opened = ticket::deserialize(&cipher::decrypt(&sealed, &secret).unwrap()).unwrap();
        prop_assert_eq!(opened, t);
    }

    #[test]
    fn prop_plaintext_survives_encrypt_decrypt(bytes in proptest::collection::vec(any::<u8>(), 0..512), secret in arb_secret()) {
        let sealed = cipher::encrypt(&bytes, &secret).unwrap();
        prop_assert_eq!(cipher::decrypt(&sealed, &secret).unwrap(), bytes);
    }

    #[test]
    fn prop_single_byte_flip_is_invalid_token(index in any::<prop::sample::Index>(), mask in 1_u8..=255) {
        let cipher = fixtures::cipher();
        let token = fixtures::token_for(&fixtures::ticket(42, "evt-1"));
        let mut sealed = URL_SAFE_NO_PAD.decode(&token).unwrap();

        let i = index.index(sealed.len());
        sealed[i] ^= mask;
        let tampered = URL_SAFE_NO_PAD.encode(&sealed);

        prop_assert_eq!(
            verify(&tampered, &cipher, "evt-1", fixtures::issued_at()),
            Err(VerificationFailure::InvalidToken)
        );
    }

    #[test]
    fn prop_other_secret_is_invalid_token(secret in arb_secret()) {
        prop_assume!(secret != fixtures::TEST_SECRET);
        let token = fixtures::token_for(&fixtures::ticket(42, "evt-1"));

        prop_assert_eq!(
            verify(&token, &TicketCipher::from_secret(&secret), "evt-1", fixtures::issued_at()),
            Err(VerificationFailure::InvalidToken)
        );
    }
}

#[test]
fn test_identical_tickets_produce_distinct_tokens() {
    let t = fixtures::ticket(42, "evt-1");
    let first = fixtures::token_for(&t);
    let second = fixtures::token_for(&t);

    assert_ne!(first, second);
    assert_ne!(first[..16], second[..16]);
}
