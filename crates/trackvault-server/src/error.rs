use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use trackvault::{
    AccessError, PaymentChallenge, AMOUNT_HEADER, CURRENCY_HEADER, NETWORK_HEADER,
    RECIPIENT_HEADER,
};

#[derive(Debug)]
pub enum ApiError {
    /// Gate outcome (including the 402 challenge path)
    Access(AccessError),
    /// Catalog database error
    Database(rusqlite::Error),
    /// Internal error
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Access(e) => write!(f, "{}", e),
            ApiError::Database(e) => write!(f, "database error: {}", e),
            ApiError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AccessError> for ApiError {
    fn from(e: AccessError) -> Self {
        ApiError::Access(e)
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Database(e)
    }
}

/// 402 body: the challenge itself plus a machine-readable error tag.
fn payment_required_response(challenge: &PaymentChallenge) -> HttpResponse {
    HttpResponse::PaymentRequired()
        .insert_header((AMOUNT_HEADER, challenge.amount.as_str()))
        .insert_header((CURRENCY_HEADER, challenge.currency.as_str()))
        .insert_header((NETWORK_HEADER, challenge.network.as_str()))
        .insert_header((RECIPIENT_HEADER, challenge.recipient.as_str()))
        .json(serde_json::json!({
            "error": "payment_required",
            "message": "Payment required to access this resource",
            "challenge": challenge,
        }))
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Access(AccessError::NotFound(id)) => {
                HttpResponse::NotFound().json(serde_json::json!({
                    "error": "resource_not_found",
                    "message": format!("Resource '{}' not found", id)
                }))
            }
            ApiError::Access(AccessError::AuthenticationRequired) => {
                HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "authentication_required",
                    "message": "Sign in to access this resource"
                }))
            }
            ApiError::Access(AccessError::PaymentsDisabled) => {
                HttpResponse::Forbidden().json(serde_json::json!({
                    "error": "payments_disabled",
                    "message": "Payments are currently disabled"
                }))
            }
            ApiError::Access(AccessError::PaymentRequired(challenge)) => {
                payment_required_response(challenge)
            }
            ApiError::Access(AccessError::InvalidPaymentFormat(msg)) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "invalid_payment",
                    "message": msg
                }))
            }
            ApiError::Access(AccessError::PaymentVerificationFailed(reason)) => {
                HttpResponse::PaymentRequired().json(serde_json::json!({
                    "error": "payment_failed",
                    "message": reason
                }))
            }
            ApiError::Access(AccessError::StorageUnavailable(msg)) => {
                tracing::error!("storage unavailable: {}", msg);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "storage_unavailable",
                    "message": "Failed to issue access URL"
                }))
            }
            // LedgerConflict is recovered inside the gate; infrastructure
            // faults all map to an opaque 500.
            ApiError::Access(e) => {
                tracing::error!("access error: {}", e);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                }))
            }
            ApiError::Database(e) => {
                tracing::error!("database error: {}", e);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                }))
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    fn challenge() -> PaymentChallenge {
        PaymentChallenge {
            resource_id: "trk-1".to_string(),
            amount: "5.00".to_string(),
            currency: "USDC".to_string(),
            network: "base".to_string(),
            recipient: "0xrecv".to_string(),
        }
    }

    fn status_of(err: AccessError) -> StatusCode {
        ApiError::Access(err).error_response().status()
    }

    #[test]
    fn status_mapping_matches_contract() {
        assert_eq!(
            status_of(AccessError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AccessError::AuthenticationRequired),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AccessError::PaymentsDisabled),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AccessError::PaymentRequired(challenge())),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(AccessError::InvalidPaymentFormat("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AccessError::PaymentVerificationFailed("no".to_string())),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(AccessError::StorageUnavailable("down".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AccessError::LedgerConflict),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn challenge_response_mirrors_fields_into_headers() {
        let resp = ApiError::Access(AccessError::PaymentRequired(challenge())).error_response();
        let headers = resp.headers();

        assert_eq!(headers.get(AMOUNT_HEADER).unwrap(), "5.00");
        assert_eq!(headers.get(CURRENCY_HEADER).unwrap(), "USDC");
        assert_eq!(headers.get(NETWORK_HEADER).unwrap(), "base");
        assert_eq!(headers.get(RECIPIENT_HEADER).unwrap(), "0xrecv");
    }
}
