//! Payment verification contract.
//!
//! The verifier is an opaque external capability: it takes the
//! caller-submitted proof plus the **server-held** amount and recipient, and
//! returns a trusted yes/no with two opaque identifiers. The proof's own
//! declared amount or recipient is never consulted, so a proof cannot
//! substitute a lower amount or a different payout destination.

use serde::{Deserialize, Serialize};

use crate::error::AccessError;
use crate::proof::PaymentProof;

/// Settlement state of a recorded payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Confirmed,
    Completed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Confirmed => "CONFIRMED",
            TxStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CONFIRMED" => Some(TxStatus::Confirmed),
            "COMPLETED" => Some(TxStatus::Completed),
            _ => None,
        }
    }
}

/// Trusted output of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    /// External payment-network transaction reference.
    pub tx_ref: String,
    /// Unique token tied to this payment submission; the ledger's
    /// idempotency constraint hangs off it.
    pub idempotency_key: String,
    pub payer: Option<String>,
    pub status: TxStatus,
}

/// Outcome of a verification call.
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    Verified(VerifiedPayment),
    Rejected { reason: String },
}

/// Verifier capability, implemented by the payment-network adapter.
pub trait PaymentVerifier: Send + Sync {
    /// Verify a proof against the required amount and recipient.
    ///
    /// `required_amount_cents` and `required_recipient` always come from the
    /// server-held resource record, never from the proof.
    fn verify(
        &self,
        proof: &PaymentProof,
        required_amount_cents: u64,
        required_recipient: &str,
    ) -> impl std::future::Future<Output = Result<VerifyOutcome, AccessError>> + Send;
}

/// Wire response from the remote verifier's `/verify` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
}

impl VerifyResponse {
    /// Convert the untrusted wire response into a checked outcome.
    ///
    /// A "verified" response missing either identifier is treated as a
    /// verification failure, not a grant.
    pub fn into_outcome(self) -> Result<VerifyOutcome, AccessError> {
        if !self.verified {
            return Ok(VerifyOutcome::Rejected {
                reason: self
                    .invalid_reason
                    .unwrap_or_else(|| "payment not verified".to_string()),
            });
        }

        let (tx_ref, idempotency_key) = match (self.tx_ref, self.idempotency_key) {
            (Some(t), Some(k)) => (t, k),
            _ => {
                return Err(AccessError::PaymentVerificationFailed(
                    "verifier response missing transaction identifiers".to_string(),
                ))
            }
        };

        let status = if self.settled == Some(true) {
            TxStatus::Completed
        } else {
            TxStatus::Confirmed
        };

        Ok(VerifyOutcome::Verified(VerifiedPayment {
            tx_ref,
            idempotency_key,
            payer: self.payer,
            status,
        }))
    }
}

/// HTTP adapter for a remote verifier service.
///
/// Optionally signs the request body with HMAC when a shared secret is
/// configured, the same way the resource server authenticates to its
/// settlement backend.
pub struct HttpVerifier {
    client: reqwest::Client,
    base_url: String,
    hmac_secret: Option<Vec<u8>>,
}

impl HttpVerifier {
    pub fn new(base_url: &str, hmac_secret: Option<Vec<u8>>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            hmac_secret,
        }
    }
}

impl PaymentVerifier for HttpVerifier {
    async fn verify(
        &self,
        proof: &PaymentProof,
        required_amount_cents: u64,
        required_recipient: &str,
    ) -> Result<VerifyOutcome, AccessError> {
        let url = format!("{}/verify", self.base_url);
        let body = serde_json::json!({
            "proof": proof,
            "requiredAmountCents": required_amount_cents,
            "requiredRecipient": required_recipient,
        });
        let body_bytes = serde_json::to_vec(&body)
            .map_err(|e| AccessError::Internal(format!("verify request serialization: {e}")))?;

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(secret) = &self.hmac_secret {
            request = request.header("X-Verifier-Auth", crate::hmac::sign(secret, &body_bytes));
        }

        let resp = request.body(body_bytes).send().await.map_err(|e| {
            AccessError::PaymentVerificationFailed(format!("verifier request failed: {e}"))
        })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "verifier returned non-success response");
            return Err(AccessError::PaymentVerificationFailed(format!(
                "verifier returned {status}"
            )));
        }

        let parsed: VerifyResponse = resp.json().await.map_err(|e| {
            AccessError::PaymentVerificationFailed(format!("verifier response parse failed: {e}"))
        })?;

        parsed.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_response_carries_reason() {
        let resp = VerifyResponse {
            verified: false,
            tx_ref: None,
            idempotency_key: None,
            payer: None,
            settled: None,
            invalid_reason: Some("insufficient funds".to_string()),
        };
        match resp.into_outcome().unwrap() {
            VerifyOutcome::Rejected { reason } => assert_eq!(reason, "insufficient funds"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn rejected_response_without_reason_gets_default() {
        let resp = VerifyResponse {
            verified: false,
            tx_ref: None,
            idempotency_key: None,
            payer: None,
            settled: None,
            invalid_reason: None,
        };
        match resp.into_outcome().unwrap() {
            VerifyOutcome::Rejected { reason } => assert_eq!(reason, "payment not verified"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn verified_response_yields_payment() {
        let resp = VerifyResponse {
            verified: true,
            tx_ref: Some("0xtx".to_string()),
            idempotency_key: Some("key-1".to_string()),
            payer: Some("0xpayer".to_string()),
            settled: Some(true),
            invalid_reason: None,
        };
        match resp.into_outcome().unwrap() {
            VerifyOutcome::Verified(p) => {
                assert_eq!(p.tx_ref, "0xtx");
                assert_eq!(p.idempotency_key, "key-1");
                assert_eq!(p.status, TxStatus::Completed);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn unsettled_verified_response_is_confirmed() {
        let resp = VerifyResponse {
            verified: true,
            tx_ref: Some("0xtx".to_string()),
            idempotency_key: Some("key-1".to_string()),
            payer: None,
            settled: None,
            invalid_reason: None,
        };
        match resp.into_outcome().unwrap() {
            VerifyOutcome::Verified(p) => assert_eq!(p.status, TxStatus::Confirmed),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn verified_response_missing_identifiers_fails_closed() {
        let resp = VerifyResponse {
            verified: true,
            tx_ref: Some("0xtx".to_string()),
            idempotency_key: None,
            payer: None,
            settled: None,
            invalid_reason: None,
        };
        let err = resp.into_outcome().unwrap_err();
        assert!(matches!(err, AccessError::PaymentVerificationFailed(_)));
    }

    #[test]
    fn tx_status_roundtrip() {
        assert_eq!(TxStatus::parse("CONFIRMED"), Some(TxStatus::Confirmed));
        assert_eq!(TxStatus::parse("COMPLETED"), Some(TxStatus::Completed));
        assert_eq!(TxStatus::parse("PENDING"), None);
        assert_eq!(TxStatus::Completed.as_str(), "COMPLETED");
    }
}
