//! CORS configuration for the access service.

use actix_cors::Cors;
use actix_web::http::header::{HeaderName, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

/// Build the CORS middleware from allowed origins.
///
/// Wildcard (`*`) is honored for dev setups; payment and challenge headers
/// are exposed so browser clients can drive the 402 retry loop.
pub fn build_cors(allowed_origins: &[String]) -> Cors {
    let allowed = allowed_origins.to_vec();
    Cors::default()
        .allowed_origin_fn(move |origin, _req_head| {
            let origin_str = origin.to_str().unwrap_or("");
            allowed.iter().any(|a| a == "*" || a == origin_str)
        })
        .allowed_methods(vec!["GET", "OPTIONS"])
        .allowed_headers(vec![
            AUTHORIZATION,
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static("x-payment"),
            HeaderName::from_static("x-caller-id"),
        ])
        .expose_headers(vec![
            HeaderName::from_static("x-payment-response"),
            HeaderName::from_static("x-payment-amount"),
            HeaderName::from_static("x-payment-currency"),
            HeaderName::from_static("x-payment-network"),
            HeaderName::from_static("x-payment-recipient"),
        ])
        .max_age(3600)
}
