//! Signed access URL issuance.
//!
//! The storage collaborator adapter: once the gate grants access, it mints a
//! short-lived HMAC-signed URL pointing at the media edge. The edge verifies
//! the same signature before serving bytes.

use trackvault::gate::AccessUrlIssuer;
use trackvault::{AccessError, ProtectedResource};

pub struct SignedUrlIssuer {
    base_url: String,
    secret: Vec<u8>,
    ttl_secs: u64,
}

impl SignedUrlIssuer {
    pub fn new(base_url: &str, secret: Vec<u8>, ttl_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret,
            ttl_secs,
        }
    }

    fn signature(&self, object_key: &str, expires_at: i64) -> String {
        trackvault::hmac::sign(&self.secret, format!("{object_key}:{expires_at}").as_bytes())
    }

    /// Validate a previously issued `exp`/`sig` pair for an object key.
    pub fn verify(&self, object_key: &str, expires_at: i64, signature: &str) -> bool {
        if expires_at < chrono::Utc::now().timestamp() {
            return false;
        }
        trackvault::hmac::verify(
            &self.secret,
            format!("{object_key}:{expires_at}").as_bytes(),
            signature,
        )
    }
}

impl AccessUrlIssuer for SignedUrlIssuer {
    async fn issue(&self, resource: &ProtectedResource) -> Result<String, AccessError> {
        if resource.object_key.is_empty() {
            return Err(AccessError::StorageUnavailable(format!(
                "resource {} has no object key",
                resource.id
            )));
        }

        let expires_at = chrono::Utc::now().timestamp() + self.ttl_secs as i64;
        let sig = self.signature(&resource.object_key, expires_at);

        Ok(format!(
            "{}/{}?exp={}&sig={}",
            self.base_url, resource.object_key, expires_at, sig
        ))
    }
}
