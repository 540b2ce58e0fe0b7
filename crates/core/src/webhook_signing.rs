//! HMAC signing and verification for inbound webhooks.
//!
//! The purchase processor signs every delivery with HMAC-SHA256 over the
//! raw request body; the hex-encoded signature arrives in a header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute an HMAC-SHA256 signature for a webhook payload.
///
/// Returns the hex-encoded signature string.
pub fn compute_webhook_hmac(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}

/// Verify a hex-encoded HMAC-SHA256 signature against a payload.
pub fn verify_webhook_hmac(secret: &str, payload: &[u8], signature: &str) -> bool {
    let expected = compute_webhook_hmac(secret, payload);
    // Both sides are fixed-length lowercase hex.
    expected == signature.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// hex encoding helper (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips() {
        let body = br#"{"event_id":"evt_1","user_id":7,"credits":50}"#;
        let sig = compute_webhook_hmac("secret", body);
        assert_eq!(sig.len(), 64);
        assert!(verify_webhook_hmac("secret", body, &sig));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let body = b"payload";
        let sig = compute_webhook_hmac("secret", body);
        assert!(!verify_webhook_hmac("other", body, &sig));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let sig = compute_webhook_hmac("secret", b"payload");
        assert!(!verify_webhook_hmac("secret", b"payload2", &sig));
    }

    #[test]
    fn verification_accepts_uppercase_hex() {
        let body = b"payload";
        let sig = compute_webhook_hmac("secret", body).to_uppercase();
        assert!(verify_webhook_hmac("secret", body, &sig));
    }
}
