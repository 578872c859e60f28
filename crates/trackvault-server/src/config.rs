use std::env;

use url::Url;

const DEFAULT_PORT: u16 = 4080;
const DEFAULT_DB_PATH: &str = "./trackvault.db";
const DEFAULT_LEDGER_DB_PATH: &str = "./trackvault-ledger.db";
const DEFAULT_STORAGE_BASE_URL: &str = "https://media.trackvault.io";
const DEFAULT_URL_TTL_SECS: u64 = 300;
const DEFAULT_RATE_LIMIT_RPM: u32 = 120;

#[derive(Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,
    /// SQLite catalog database path
    pub db_path: String,
    /// SQLite ledger database path (entitlements + transactions)
    pub ledger_db_path: String,
    /// Kill switch: when false, the payment pathway is closed entirely
    pub payments_enabled: bool,
    /// Remote payment verifier base URL
    pub verifier_url: String,
    /// HMAC shared secret for verifier auth (None = dev mode)
    pub verifier_secret: Option<Vec<u8>>,
    /// Base URL the signed access URLs point at
    pub storage_base_url: String,
    /// Secret signing the access URLs
    pub storage_signing_secret: Vec<u8>,
    /// Signed URL lifetime in seconds
    pub url_ttl_secs: u64,
    /// CORS allowed origins
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute
    pub rate_limit_rpm: u32,
    /// Bearer token required for /metrics (None = public)
    pub metrics_token: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("db_path", &self.db_path)
            .field("ledger_db_path", &self.ledger_db_path)
            .field("payments_enabled", &self.payments_enabled)
            .field("verifier_url", &self.verifier_url)
            .field(
                "verifier_secret",
                &self.verifier_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("storage_base_url", &self.storage_base_url)
            .field("storage_signing_secret", &"[REDACTED]")
            .field("url_ttl_secs", &self.url_ttl_secs)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Required: verifier endpoint
        let verifier_url =
            env::var("VERIFIER_URL").map_err(|_| ConfigError::MissingRequired("VERIFIER_URL"))?;
        Url::parse(&verifier_url).map_err(|_| ConfigError::InvalidUrl(verifier_url.clone()))?;

        // Required: URL signing secret
        let storage_signing_secret = env::var("STORAGE_SIGNING_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.into_bytes())
            .ok_or(ConfigError::MissingRequired("STORAGE_SIGNING_SECRET"))?;

        let verifier_secret = env::var("VERIFIER_SHARED_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.into_bytes());

        if verifier_secret.is_none() {
            tracing::warn!(
                "VERIFIER_SHARED_SECRET not set — verifier requests will be unauthenticated"
            );
        }

        let payments_enabled = match env::var("PAYMENTS_ENABLED") {
            Ok(v) => parse_bool(&v).ok_or(ConfigError::InvalidBool("PAYMENTS_ENABLED"))?,
            Err(_) => true,
        };
        if !payments_enabled {
            tracing::warn!("PAYMENTS_ENABLED=false — paid resources are locked to entitled callers");
        }

        let storage_base_url = env::var("STORAGE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_STORAGE_BASE_URL.to_string());
        Url::parse(&storage_base_url)
            .map_err(|_| ConfigError::InvalidUrl(storage_base_url.clone()))?;

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let db_path = env::var("DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        let ledger_db_path =
            env::var("LEDGER_DB_PATH").unwrap_or_else(|_| DEFAULT_LEDGER_DB_PATH.to_string());

        let url_ttl_secs = env::var("URL_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_URL_TTL_SECS);

        let allowed_origins: Vec<String> = env::var("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| vec!["http://localhost:3000".to_string()]);

        let rate_limit_rpm = env::var("RATE_LIMIT_RPM")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_RPM);

        let metrics_token = env::var("METRICS_TOKEN").ok().filter(|s| !s.is_empty());
        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set — /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            port,
            db_path,
            ledger_db_path,
            payments_enabled,
            verifier_url,
            verifier_secret,
            storage_base_url,
            storage_signing_secret,
            url_ttl_secs,
            allowed_origins,
            rate_limit_rpm,
            metrics_token,
        })
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid boolean value for {0}")]
    InvalidBool(&'static str),
}
