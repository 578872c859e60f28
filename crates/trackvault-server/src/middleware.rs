use actix_web::HttpRequest;
use base64::Engine;

use trackvault::{RecordedPayment, CALLER_HEADER, PAYMENT_HEADER};

/// Extract the caller identity injected by the upstream authentication layer.
pub fn extract_caller(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Extract the raw opaque payment proof, if submitted.
///
/// The value is not decoded here: the gate owns proof validation, so a
/// malformed submission gets the 400 path instead of a silent drop.
pub fn extract_proof(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(PAYMENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Build the `X-Payment-Response` receipt header for a freshly recorded
/// payment: base64-encoded JSON with the settlement reference.
pub fn payment_response_header(recorded: &RecordedPayment) -> String {
    let receipt = serde_json::json!({
        "txRef": recorded.transaction.tx_ref,
        "network": recorded.transaction.network,
        "status": recorded.transaction.status,
    });
    base64::engine::general_purpose::STANDARD.encode(receipt.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use trackvault::{Entitlement, LedgerTransaction, TxStatus};

    #[test]
    fn extracts_caller_and_proof() {
        let req = TestRequest::default()
            .insert_header((CALLER_HEADER, "user-1"))
            .insert_header((PAYMENT_HEADER, "b64proof"))
            .to_http_request();

        assert_eq!(extract_caller(&req).as_deref(), Some("user-1"));
        assert_eq!(extract_proof(&req).as_deref(), Some("b64proof"));
    }

    #[test]
    fn absent_or_empty_headers_yield_none() {
        let req = TestRequest::default()
            .insert_header((CALLER_HEADER, "  "))
            .to_http_request();

        assert_eq!(extract_caller(&req), None);
        assert_eq!(extract_proof(&req), None);
    }

    #[test]
    fn receipt_header_decodes_to_tx_ref() {
        let recorded = RecordedPayment {
            entitlement: Entitlement {
                caller_id: "alice".to_string(),
                resource_id: "trk-1".to_string(),
                created_at: 0,
            },
            transaction: LedgerTransaction {
                id: 1,
                resource_id: "trk-1".to_string(),
                caller_id: "alice".to_string(),
                amount_cents: 500,
                currency: "USDC".to_string(),
                recipient: "0xrecv".to_string(),
                network: "base".to_string(),
                tx_ref: "0xsettled".to_string(),
                idempotency_key: "key-1".to_string(),
                status: TxStatus::Completed,
                created_at: 0,
            },
        };

        let header = payment_response_header(&recorded);
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(header)
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(json["txRef"], "0xsettled");
        assert_eq!(json["network"], "base");
        assert_eq!(json["status"], "COMPLETED");
    }
}
