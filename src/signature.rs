//! HMAC-SHA256 payment signature check
//!
//! The payment provider signs a completed checkout as
//! `hex(HMAC-SHA256(key_secret, "{order_id}|{payment_id}"))`. The relay
//! recomputes the digest and never trusts the client's own claim of success.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the lowercase hex signature for an order/payment pair
#[must_use]
pub fn sign_payment(secret: &str, order_id: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    format!("{:x}", mac.finalize().into_bytes())
}

/// Verify a checkout signature against the shared secret
///
/// Returns `true` iff `signature` equals the recomputed hex digest.
///
/// # Examples
/// ```rust
/// use bgremove_relay::signature::{sign_payment, verify_payment_signature};
///
/// let signature = sign_payment("secret", "order_1", "pay_1");
/// assert!(verify_payment_signature("secret", "order_1", "pay_1", &signature));
/// assert!(!verify_payment_signature("secret", "order_1", "pay_2", &signature));
/// ```
#[must_use]
pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let expected = sign_payment(secret, order_id, payment_id);
    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4231 test case 2: key "Jefe", data "what do ya want for nothing?"
    #[test]
    fn test_known_vector() {
        assert_eq!(
            sign_payment("secret", "order_1", "pay_1"),
            "52115a0d3400de9e86aade1f1b6eba9e8974604f4e267a9e9a16633a4c8dd2cb"
        );
        assert_eq!(
            sign_payment("rzp_test_secret", "order_EKwxwAgItmmXdp", "pay_29QQoUBi66xm2f"),
            "dc197112558c4648cfbf70c2f7801e8007084ffb34c30de3e9523e3d810cb252"
        );
        assert!(verify_payment_signature(
            "secret",
            "order_1",
            "pay_1",
            "52115a0d3400de9e86aade1f1b6eba9e8974604f4e267a9e9a16633a4c8dd2cb"
        ));
    }

    #[test]
    fn test_separator_is_part_of_message() {
        let mut mac = HmacSha256::new_from_slice(b"Jefe").unwrap();
        mac.update(b"what do ya want | for nothing?");
        let manual = format!("{:x}", mac.finalize().into_bytes());

        assert_eq!(sign_payment("Jefe", "what do ya want ", " for nothing?"), manual);
    }

    #[test]
    fn test_signature_shape() {
        let signature = sign_payment("secret", "order_IluGWxBm9U8zJ8", "pay_IluGWxBm9U8zJ8");
        assert_eq!(signature.len(), 64);
        assert!(signature
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_verify_roundtrip() {
        let signature = sign_payment("s3cr3t", "order_1", "pay_1");
        assert!(verify_payment_signature("s3cr3t", "order_1", "pay_1", &signature));
    }

    #[test]
    fn test_single_character_mutations_fail() {
        let signature = sign_payment("s3cr3t", "order_1", "pay_1");

        assert!(!verify_payment_signature("s3cr3x", "order_1", "pay_1", &signature));
        assert!(!verify_payment_signature("s3cr3t", "order_2", "pay_1", &signature));
        assert!(!verify_payment_signature("s3cr3t", "order_1", "pay_2", &signature));

        let mut mutated: Vec<char> = signature.chars().collect();
        mutated[10] = if mutated[10] == 'a' { 'b' } else { 'a' };
        let mutated: String = mutated.into_iter().collect();
        assert!(!verify_payment_signature("s3cr3t", "order_1", "pay_1", &mutated));
    }

    #[test]
    fn test_swapped_ids_fail() {
        let signature = sign_payment("s3cr3t", "order_1", "pay_1");
        assert!(!verify_payment_signature("s3cr3t", "pay_1", "order_1", &signature));
    }

    #[test]
    fn test_uppercase_and_truncated_signatures_fail() {
        let signature = sign_payment("s3cr3t", "order_1", "pay_1");
        assert!(!verify_payment_signature(
            "s3cr3t",
            "order_1",
            "pay_1",
            &signature.to_uppercase()
        ));
        assert!(!verify_payment_signature(
            "s3cr3t",
            "order_1",
            "pay_1",
            &signature[..63]
        ));
        assert!(!verify_payment_signature("s3cr3t", "order_1", "pay_1", ""));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
