//! # kyc-api: Driver Identity Verification Service
//!
//! Gates driver onboarding on a sequence of independent identity checks.
//! Each check is a step verifier in [`pipeline`]; their flags roll up into a
//! single aggregate, and the finalization gate stamps completion once every
//! flag holds.
//!
//! ## API Surface
//!
//! | Path | Module | Identity |
//! |------|--------|----------|
//! | `/kyc/aadhaar/*`, `/kyc/pan/*`, `/kyc/dl/*` | [`routes::kyc`] | session or phone fallback |
//! | `/kyc/status` | [`routes::kyc`] | session only |
//! | `/driver/onboarding/finalize` | [`routes::onboarding`] | session or phone fallback |
//! | `/health/*`, `/metrics`, `/openapi.json` | this module, [`openapi`] | none |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer -> MetricsMiddleware -> BodyLimit -> Handler
//! ```
//!
//! Identity is resolved per handler by its extractor, not by middleware:
//! [`auth::SessionIdentity`] for strict endpoints and
//! [`extractors::OnboardingRequest`] for the ones that allow phone fallback.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod store;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Assemble the application router.
///
/// Health probes and `/metrics` sit outside the API router's body limit and
/// request metrics.
pub fn app(state: AppState) -> Router {
    let metrics_on = state.config.metrics_enabled;

    let mut api = Router::new()
        .merge(routes::kyc::router())
        .merge(routes::onboarding::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(state.metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(state.metrics.clone()));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(Extension(metrics): Extension<ApiMetrics>) -> impl IntoResponse {
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe: the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Checks the database when one is configured.
///
/// An unconfigured provider does not fail readiness: provider-backed
/// endpoints return 503 on their own and the rest keep serving.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}
