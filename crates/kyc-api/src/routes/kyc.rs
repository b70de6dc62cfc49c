//! # KYC Step Routes
//!
//! One endpoint per step verifier plus a read-only status view. Step
//! endpoints take [`OnboardingRequest`] and so accept either a bearer
//! session or a verified `phoneNumber` in the body. `/kyc/status` takes
//! [`SessionIdentity`] and requires a session.
//!
//! | Method | Path | Pipeline operation |
//! |--------|------|--------------------|
//! | POST | `/kyc/aadhaar/generate-otp` | `generate_aadhaar_otp` |
//! | POST | `/kyc/aadhaar/verify-otp` | `verify_aadhaar_otp` |
//! | POST | `/kyc/pan/verify` | `verify_pan` |
//! | POST | `/kyc/pan/aadhaar-link-status` | `check_pan_aadhaar_link` |
//! | POST | `/kyc/dl/fake-verify` | `verify_driving_license` |
//! | GET | `/kyc/status` | `status` |

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::SessionIdentity;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{CarriesPhone, OnboardingRequest};
use crate::pipeline::{
    AadhaarVerifyResponse, KycStatusResponse, LicenseVerifyResponse, OtpGeneratedResponse,
    PanAadhaarLinkResponse, PanVerifyResponse,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/kyc/aadhaar/generate-otp", post(generate_aadhaar_otp))
        .route("/kyc/aadhaar/verify-otp", post(verify_aadhaar_otp))
        .route("/kyc/pan/verify", post(verify_pan))
        .route("/kyc/pan/aadhaar-link-status", post(pan_aadhaar_link_status))
        .route("/kyc/dl/fake-verify", post(verify_driving_license))
        .route("/kyc/status", get(kyc_status))
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------
//
// Every field defaults, so a missing value reaches domain validation (422)
// rather than failing deserialization (400).

/// Body of `POST /kyc/aadhaar/generate-otp`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateOtpRequest {
    /// 12-digit Aadhaar number; spaces and dashes are ignored.
    pub aadhaar_no: String,
    /// Fallback identity when no session is presented.
    pub phone_number: Option<String>,
}

/// Body of `POST /kyc/aadhaar/verify-otp`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyOtpRequest {
    pub otp: String,
    pub phone_number: Option<String>,
}

/// Body of `POST /kyc/pan/verify`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PanVerifyRequest {
    pub pan: String,
    pub phone_number: Option<String>,
}

/// Body of `POST /kyc/pan/aadhaar-link-status`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PanAadhaarLinkRequest {
    pub phone_number: Option<String>,
}

/// Body of `POST /kyc/dl/fake-verify`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LicenseVerifyRequest {
    pub driving_license_no: String,
    pub phone_number: Option<String>,
}

macro_rules! carries_phone {
    ($($ty:ty),+ $(,)?) => {
        $(impl CarriesPhone for $ty {
            fn phone_number(&self) -> Option<&str> {
                self.phone_number.as_deref()
            }
        })+
    };
}

carries_phone!(
    GenerateOtpRequest,
    VerifyOtpRequest,
    PanVerifyRequest,
    PanAadhaarLinkRequest,
    LicenseVerifyRequest,
);

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /kyc/aadhaar/generate-otp: Issue an Aadhaar OTP challenge.
#[utoipa::path(
    post,
    path = "/kyc/aadhaar/generate-otp",
    request_body = GenerateOtpRequest,
    responses(
        (status = 200, description = "OTP sent, or Aadhaar already verified", body = OtpGeneratedResponse),
        (status = 400, description = "Body is not valid JSON", body = ErrorBody),
        (status = 401, description = "No session and no usable phone fallback", body = ErrorBody),
        (status = 404, description = "Driver not found", body = ErrorBody),
        (status = 422, description = "Aadhaar number is not 12 digits", body = ErrorBody),
        (status = 502, description = "Verification provider failure", body = ErrorBody),
        (status = 503, description = "Verification provider not configured", body = ErrorBody),
    ),
    tag = "aadhaar"
)]
pub async fn generate_aadhaar_otp(
    State(state): State<AppState>,
    req: OnboardingRequest<GenerateOtpRequest>,
) -> Result<Json<OtpGeneratedResponse>, AppError> {
    let out = state
        .pipeline
        .generate_aadhaar_otp(req.identity.driver_id(), &req.body.aadhaar_no)
        .await?;
    Ok(Json(out))
}

/// POST /kyc/aadhaar/verify-otp: Confirm the outstanding OTP.
#[utoipa::path(
    post,
    path = "/kyc/aadhaar/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Aadhaar verified, or already verified", body = AadhaarVerifyResponse),
        (status = 401, description = "No session and no usable phone fallback", body = ErrorBody),
        (status = 404, description = "Driver not found", body = ErrorBody),
        (status = 409, description = "No OTP has been generated", body = ErrorBody),
        (status = 422, description = "OTP is empty", body = ErrorBody),
        (status = 502, description = "Verification provider failure", body = ErrorBody),
    ),
    tag = "aadhaar"
)]
pub async fn verify_aadhaar_otp(
    State(state): State<AppState>,
    req: OnboardingRequest<VerifyOtpRequest>,
) -> Result<Json<AadhaarVerifyResponse>, AppError> {
    let out = state
        .pipeline
        .verify_aadhaar_otp(req.identity.driver_id(), &req.body.otp)
        .await?;
    Ok(Json(out))
}

/// POST /kyc/pan/verify: Match PAN details.
#[utoipa::path(
    post,
    path = "/kyc/pan/verify",
    request_body = PanVerifyRequest,
    responses(
        (status = 200, description = "PAN verified, or already verified", body = PanVerifyResponse),
        (status = 401, description = "No session and no usable phone fallback", body = ErrorBody),
        (status = 404, description = "Driver not found", body = ErrorBody),
        (status = 409, description = "PAN not uploaded, or Aadhaar not verified yet", body = ErrorBody),
        (status = 422, description = "PAN is empty", body = ErrorBody),
        (status = 502, description = "Verification provider failure", body = ErrorBody),
    ),
    tag = "pan"
)]
pub async fn verify_pan(
    State(state): State<AppState>,
    req: OnboardingRequest<PanVerifyRequest>,
) -> Result<Json<PanVerifyResponse>, AppError> {
    let out = state
        .pipeline
        .verify_pan(req.identity.driver_id(), &req.body.pan)
        .await?;
    Ok(Json(out))
}

/// POST /kyc/pan/aadhaar-link-status: Fetch the PAN-Aadhaar link status.
#[utoipa::path(
    post,
    path = "/kyc/pan/aadhaar-link-status",
    request_body = PanAadhaarLinkRequest,
    responses(
        (status = 200, description = "Link status stored", body = PanAadhaarLinkResponse),
        (status = 401, description = "No session and no usable phone fallback", body = ErrorBody),
        (status = 404, description = "Driver not found", body = ErrorBody),
        (status = 409, description = "PAN or Aadhaar number not on record", body = ErrorBody),
        (status = 502, description = "Verification provider failure", body = ErrorBody),
    ),
    tag = "pan"
)]
pub async fn pan_aadhaar_link_status(
    State(state): State<AppState>,
    req: OnboardingRequest<PanAadhaarLinkRequest>,
) -> Result<Json<PanAadhaarLinkResponse>, AppError> {
    let out = state
        .pipeline
        .check_pan_aadhaar_link(req.identity.driver_id())
        .await?;
    Ok(Json(out))
}

/// POST /kyc/dl/fake-verify: Confirm the driving license without a
/// provider check.
#[utoipa::path(
    post,
    path = "/kyc/dl/fake-verify",
    request_body = LicenseVerifyRequest,
    responses(
        (status = 200, description = "License recorded", body = LicenseVerifyResponse),
        (status = 400, description = "Body is not valid JSON", body = ErrorBody),
        (status = 401, description = "No session and no usable phone fallback", body = ErrorBody),
        (status = 404, description = "Driver not found", body = ErrorBody),
        (status = 409, description = "License document not uploaded", body = ErrorBody),
        (status = 422, description = "License number is empty", body = ErrorBody),
    ),
    tag = "driving-license"
)]
pub async fn verify_driving_license(
    State(state): State<AppState>,
    req: OnboardingRequest<LicenseVerifyRequest>,
) -> Result<Json<LicenseVerifyResponse>, AppError> {
    let out = state
        .pipeline
        .verify_driving_license(req.identity.driver_id(), &req.body.driving_license_no)
        .await?;
    Ok(Json(out))
}

/// GET /kyc/status: Current verification state for the session's driver.
#[utoipa::path(
    get,
    path = "/kyc/status",
    responses(
        (status = 200, description = "Verification state", body = KycStatusResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
        (status = 404, description = "Driver not found", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "status"
)]
pub async fn kyc_status(
    State(state): State<AppState>,
    SessionIdentity(driver_id): SessionIdentity,
) -> Result<Json<KycStatusResponse>, AppError> {
    Ok(Json(state.pipeline.status(driver_id).await?))
}
