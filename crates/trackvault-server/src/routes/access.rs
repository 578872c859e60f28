use actix_web::{web, HttpRequest, HttpResponse};

use trackvault::{AccessDecision, AccessError, ResourceKind, PAYMENT_RESPONSE_HEADER};

use crate::error::ApiError;
use crate::metrics::{
    ACCESS_REQUESTS, CHALLENGES_ISSUED, ENTITLEMENTS_CREATED, PAYMENTS_FAILED, PAYMENTS_TOTAL,
};
use crate::middleware::{extract_caller, extract_proof, payment_response_header};
use crate::state::AppState;

/// GET /tracks/{id}/stream - Gate a streamable track
pub async fn stream_track(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    serve(&req, &state, &path.into_inner(), ResourceKind::Track).await
}

/// GET /vault/{id}/download - Gate a downloadable vault asset
pub async fn download_vault_asset(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    serve(&req, &state, &path.into_inner(), ResourceKind::VaultAsset).await
}

async fn serve(
    req: &HttpRequest,
    state: &web::Data<AppState>,
    id: &str,
    kind: ResourceKind,
) -> Result<HttpResponse, ApiError> {
    // A kind mismatch is indistinguishable from a missing resource to the
    // caller: both are 404.
    let resource = state
        .db
        .get_resource(id)?
        .filter(|r| r.kind == kind)
        .ok_or_else(|| AccessError::NotFound(id.to_string()))?;

    let caller = extract_caller(req);
    let proof = extract_proof(req);
    let config = state.gate_config();

    let result = state
        .gate
        .request_access(&config, &resource, caller.as_deref(), proof.as_deref())
        .await;

    record_outcome(kind, &result);

    let grant = result?;

    let mut response = HttpResponse::Ok();
    if let Some(ref recorded) = grant.payment {
        response.insert_header((PAYMENT_RESPONSE_HEADER, payment_response_header(recorded)));
    }

    Ok(response.json(serde_json::json!({
        "url": grant.url,
        "decision": grant.decision,
    })))
}

fn record_outcome(
    kind: ResourceKind,
    result: &Result<trackvault::AccessGrant, AccessError>,
) {
    let outcome = match result {
        Ok(grant) => {
            if grant.decision == AccessDecision::NewlyEntitled {
                PAYMENTS_TOTAL.inc();
                ENTITLEMENTS_CREATED.inc();
            }
            match grant.decision {
                AccessDecision::FreePass => "free_pass",
                AccessDecision::AlreadyEntitled => "already_entitled",
                AccessDecision::NewlyEntitled => "newly_entitled",
            }
        }
        Err(AccessError::PaymentRequired(_)) => {
            CHALLENGES_ISSUED.inc();
            "challenge_issued"
        }
        Err(AccessError::PaymentVerificationFailed(_)) => {
            PAYMENTS_FAILED.inc();
            "payment_failed"
        }
        Err(AccessError::AuthenticationRequired) => "auth_required",
        Err(AccessError::PaymentsDisabled) => "payments_disabled",
        Err(AccessError::InvalidPaymentFormat(_)) => "invalid_payment",
        Err(AccessError::NotFound(_)) => "not_found",
        Err(_) => "error",
    };
    ACCESS_REQUESTS
        .with_label_values(&[kind.as_str(), outcome])
        .inc();
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/tracks/{id}/stream", web::get().to(stream_track))
        .route("/vault/{id}/download", web::get().to(download_vault_asset));
}
