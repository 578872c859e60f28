use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::AccessError;

/// Supported proof wire-format version.
pub const PROOF_VERSION: u32 = 1;

/// Caller-submitted payment proof.
///
/// Arrives as a single opaque value (base64-encoded JSON in the `X-PAYMENT`
/// header). Only the outer tags are interpreted here; the inner `payload` is
/// handed to the verifier untouched. [`PaymentProof::decode`] is the only way
/// to obtain one from transport input, so malformed submissions are rejected
/// before any use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    pub version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: serde_json::Value,
}

impl PaymentProof {
    /// Decode and validate a proof from its wire form.
    pub fn decode(raw: &str) -> Result<Self, AccessError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(raw.trim())
            .map_err(|e| AccessError::InvalidPaymentFormat(format!("invalid base64: {e}")))?;

        let proof: PaymentProof = serde_json::from_slice(&bytes)
            .map_err(|e| AccessError::InvalidPaymentFormat(format!("invalid JSON payload: {e}")))?;

        if proof.version != PROOF_VERSION {
            return Err(AccessError::InvalidPaymentFormat(format!(
                "unsupported proof version {}",
                proof.version
            )));
        }
        if proof.payload.is_null() {
            return Err(AccessError::InvalidPaymentFormat(
                "empty proof payload".to_string(),
            ));
        }

        Ok(proof)
    }

    /// Encode to the wire form (base64 JSON). Client-side helper.
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("proof serialization is infallible");
        base64::engine::general_purpose::STANDARD.encode(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PaymentProof {
        PaymentProof {
            version: 1,
            scheme: "exact".to_string(),
            network: "base".to_string(),
            payload: serde_json::json!({"authorization": "0xdead", "signature": "0xbeef"}),
        }
    }

    #[test]
    fn decode_roundtrip() {
        let decoded = PaymentProof::decode(&sample().encode()).unwrap();
        assert_eq!(decoded.version, 1);
        assert_eq!(decoded.scheme, "exact");
        assert_eq!(decoded.payload["signature"], "0xbeef");
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        let err = PaymentProof::decode("not-valid-base64!!!").unwrap_err();
        assert!(matches!(err, AccessError::InvalidPaymentFormat(_)));
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let raw = base64::engine::general_purpose::STANDARD.encode(b"this is not json");
        let err = PaymentProof::decode(&raw).unwrap_err();
        assert!(matches!(err, AccessError::InvalidPaymentFormat(_)));
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let mut proof = sample();
        proof.version = 2;
        let err = PaymentProof::decode(&proof.encode()).unwrap_err();
        match err {
            AccessError::InvalidPaymentFormat(msg) => assert!(msg.contains("version")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_null_payload() {
        let mut proof = sample();
        proof.payload = serde_json::Value::Null;
        let err = PaymentProof::decode(&proof.encode()).unwrap_err();
        assert!(matches!(err, AccessError::InvalidPaymentFormat(_)));
    }
}
