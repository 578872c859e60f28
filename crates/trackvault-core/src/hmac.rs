use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over `message` with the shared secret, hex-encoded.
pub fn sign(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message);
    hex_encode(&mac.finalize().into_bytes())
}

/// Verify a hex-encoded HMAC-SHA256 signature.
///
/// Constant-time: invalid hex decodes to a zero MAC rather than returning
/// early, and the final comparison goes through `Mac::verify_slice`.
pub fn verify(secret: &[u8], message: &[u8], signature: &str) -> bool {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message);

    let expected = hex_decode(signature).unwrap_or_else(|| vec![0u8; 32]);
    mac.verify_slice(&expected).is_ok()
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let sig = sign(b"secret", b"tracks/demo.mp3:1700000000");
        assert!(verify(b"secret", b"tracks/demo.mp3:1700000000", &sig));
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = sign(b"secret-a", b"message");
        assert!(!verify(b"secret-b", b"message", &sig));
    }

    #[test]
    fn tampered_message_fails() {
        let sig = sign(b"secret", b"original");
        assert!(!verify(b"secret", b"tampered", &sig));
    }

    #[test]
    fn invalid_hex_fails_without_panicking() {
        assert!(!verify(b"secret", b"message", "zz-not-hex"));
    }
}
