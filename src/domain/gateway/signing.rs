//! HMAC signing primitives shared by request building and notification
//! verification.
//!
//! Redsys signs each operation with a key derived from the merchant secret
//! and the operation's order reference, then MACs the serialized parameter
//! block with that derived key. The same construction runs on both sides:
//! outbound when signing a payment form, inbound when recomputing the
//! expected signature of a notification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of the gateway's merchant order identifier.
pub(crate) const ORDER_REFERENCE_LEN: usize = 12;

/// Canonicalizes an order number into the gateway's fixed-length numeric
/// reference: digits only, last twelve, left-padded with zeros.
///
/// The mapping is lossy (`ENC-2025-0134` and `WEB-2025-0134` collide), which
/// is acceptable because the reference is only used to correlate callbacks;
/// callers log the mapping for manual reconciliation.
pub fn canonical_order_reference(order_number: &str) -> String {
    let digits: String = order_number.chars().filter(|c| c.is_ascii_digit()).collect();
    let tail_start = digits.len().saturating_sub(ORDER_REFERENCE_LEN);
    format!("{:0>width$}", &digits[tail_start..], width = ORDER_REFERENCE_LEN)
}

/// Derives the per-order signing key: HMAC-SHA256 of the canonical order
/// reference under the merchant secret.
pub(crate) fn derive_order_key(secret: &[u8], order_reference: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(order_reference.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Computes the signature over a serialized parameter block with a derived
/// order key.
pub(crate) fn sign_parameters(order_key: &[u8], merchant_parameters: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(order_key).expect("HMAC accepts any key length");
    mac.update(merchant_parameters.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the
/// expected signature.
pub(crate) fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Order Reference Canonicalization Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn reference_extracts_digits_and_pads() {
        assert_eq!(canonical_order_reference("ENC-2025-0134"), "000020250134");
    }

    #[test]
    fn reference_keeps_only_the_last_twelve_digits() {
        assert_eq!(
            canonical_order_reference("9988-7766-5544-3322-1100"),
            "554433221100"
        );
    }

    #[test]
    fn reference_of_empty_input_is_all_zeros() {
        assert_eq!(canonical_order_reference("DRAFT"), "000000000000");
    }

    #[test]
    fn reference_is_always_twelve_chars() {
        for input in ["1", "ENC-1", "123456789012345678"] {
            assert_eq!(canonical_order_reference(input).len(), ORDER_REFERENCE_LEN);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Key Derivation and Signing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn derived_keys_differ_per_order() {
        let secret = b"merchant-secret";
        let key_a = derive_order_key(secret, "000000000001");
        let key_b = derive_order_key(secret, "000000000002");
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn derivation_is_deterministic() {
        let secret = b"merchant-secret";
        assert_eq!(
            derive_order_key(secret, "000020250134"),
            derive_order_key(secret, "000020250134")
        );
    }

    #[test]
    fn signature_depends_on_parameters() {
        let key = derive_order_key(b"secret", "000000000001");
        let sig_a = sign_parameters(&key, "eyJhIjoxfQ==");
        let sig_b = sign_parameters(&key, "eyJhIjoyfQ==");
        assert_ne!(sig_a, sig_b);
    }

    // ══════════════════════════════════════════════════════════════
    // Constant Time Comparison Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn constant_time_compare_equal_values() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
    }

    #[test]
    fn constant_time_compare_different_values() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
    }
}
