//! # kyc-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for driver identity verification.
//! Binds to configurable port (default 8080).

use std::sync::Arc;

use kyc_api::middleware::metrics::ApiMetrics;
use kyc_api::state::{AppConfig, AppState};
use kyc_api::store::Repositories;
use kyc_provider_client::{HttpVerificationProvider, ProviderConfig, VerificationProvider};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // LOG_FORMAT=json switches to one JSON object per line.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("invalid configuration: {e}");
        e
    })?;

    // Database is optional; absent means in-memory repositories.
    let db_pool = kyc_api::store::postgres::init_pool().await.map_err(|e| {
        tracing::error!("database initialization failed: {e}");
        e
    })?;
    let repos = match &db_pool {
        Some(pool) => Repositories::postgres(pool.clone()),
        None => Repositories::in_memory(),
    };

    let provider: Option<Arc<dyn VerificationProvider>> = match ProviderConfig::from_env() {
        Ok(provider_config) => {
            let client = HttpVerificationProvider::new(provider_config).map_err(|e| {
                tracing::error!("failed to create verification provider client: {e}");
                e
            })?;
            tracing::info!(provider = client.provider_name(), "verification provider configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(
                "verification provider not configured: {e}. Aadhaar and PAN endpoints will return 503."
            );
            None
        }
    };

    let metrics = ApiMetrics::try_new()?;
    let port = config.port;
    let state = AppState::new(config, repos, provider, db_pool, metrics);
    tracing::debug!(?state, "application state assembled");

    let app = kyc_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("kyc-api listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
