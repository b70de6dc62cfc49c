//! Onboarding finalization.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{AppError, ErrorBody};
use crate::extractors::{CarriesPhone, OnboardingRequest};
use crate::pipeline::FinalizeResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/driver/onboarding/finalize", post(finalize_onboarding))
}

/// Body of `POST /driver/onboarding/finalize`. The body itself is optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FinalizeRequest {
    pub phone_number: Option<String>,
}

impl CarriesPhone for FinalizeRequest {
    fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }
}

/// POST /driver/onboarding/finalize: Mark onboarding complete once every
/// verification flag holds.
#[utoipa::path(
    post,
    path = "/driver/onboarding/finalize",
    request_body = FinalizeRequest,
    responses(
        (status = 200, description = "Onboarding complete", body = FinalizeResponse),
        (status = 401, description = "No session and no usable phone fallback", body = ErrorBody),
        (status = 409, description = "Account not fully verified yet", body = ErrorBody),
    ),
    tag = "onboarding"
)]
pub async fn finalize_onboarding(
    State(state): State<AppState>,
    req: OnboardingRequest<FinalizeRequest>,
) -> Result<Json<FinalizeResponse>, AppError> {
    if req.identity.via_fallback() {
        tracing::info!(driver_id = %req.identity.driver_id(), "finalize requested via phone fallback");
    }
    Ok(Json(state.pipeline.finalize(req.identity.driver_id()).await?))
}
