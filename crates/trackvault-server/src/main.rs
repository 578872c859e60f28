use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackvault::{HttpVerifier, ResourceGate, SqliteLedger};
use trackvault_server::{
    config::ServerConfig, db::Database, metrics::register_metrics, routes,
    state::AppState, storage::SignedUrlIssuer,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().expect("Failed to load configuration");
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;

    tracing::info!("Starting trackvault-server on port {}", port);
    tracing::info!("Verifier URL: {}", config.verifier_url);
    tracing::info!(
        "Payments: {}",
        if config.payments_enabled {
            "enabled"
        } else {
            "DISABLED (kill switch engaged)"
        }
    );

    let db = Database::new(&config.db_path).expect("Failed to initialize catalog database");
    tracing::info!("Catalog database at: {}", config.db_path);

    let ledger =
        SqliteLedger::open(&config.ledger_db_path).expect("Failed to initialize ledger database");
    tracing::info!("Ledger database at: {}", config.ledger_db_path);

    let verifier = HttpVerifier::new(&config.verifier_url, config.verifier_secret.clone());
    let urls = SignedUrlIssuer::new(
        &config.storage_base_url,
        config.storage_signing_secret.clone(),
        config.url_ttl_secs,
    );
    let gate = ResourceGate::new(ledger, verifier, urls);

    register_metrics();

    let state = AppState::new(config, db, gate);
    let state_data = web::Data::new(state);

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm as u64)
        .finish()
        .expect("Failed to create rate limiter config");

    HttpServer::new(move || {
        let cors = trackvault_server::cors::build_cors(&allowed_origins);

        App::new()
            .app_data(state_data.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
            .configure(routes::health::configure)
            .configure(routes::access::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
