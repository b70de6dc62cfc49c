//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer session scheme to the document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Driver session token. Onboarding endpoints also accept a verified phoneNumber in the body.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "kyc-api",
        version = "0.3.0",
        description = "Driver identity verification: Aadhaar OTP, PAN match, PAN-Aadhaar link status, driving-license confirmation, and onboarding finalization.\n\nAuthentication: `Authorization: Bearer <session>`. Onboarding endpoints fall back to a verified `phoneNumber` in the JSON body when no session resolves; 401 responses carry `error.details.reason`.",
        license(name = "BUSL-1.1")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        crate::routes::kyc::generate_aadhaar_otp,
        crate::routes::kyc::verify_aadhaar_otp,
        crate::routes::kyc::verify_pan,
        crate::routes::kyc::pan_aadhaar_link_status,
        crate::routes::kyc::verify_driving_license,
        crate::routes::kyc::kyc_status,
        crate::routes::onboarding::finalize_onboarding,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::kyc::GenerateOtpRequest,
        crate::routes::kyc::VerifyOtpRequest,
        crate::routes::kyc::PanVerifyRequest,
        crate::routes::kyc::PanAadhaarLinkRequest,
        crate::routes::kyc::LicenseVerifyRequest,
        crate::routes::onboarding::FinalizeRequest,
        crate::pipeline::OtpGeneratedResponse,
        crate::pipeline::AadhaarVerifyResponse,
        crate::pipeline::PanVerifyResponse,
        crate::pipeline::PanAadhaarLinkResponse,
        crate::pipeline::LicenseVerifyResponse,
        crate::pipeline::KycStatusResponse,
        crate::pipeline::FinalizeResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "aadhaar", description = "Aadhaar OTP generation and confirmation"),
        (name = "pan", description = "PAN detail match and PAN-Aadhaar link status"),
        (name = "driving-license", description = "Driving-license confirmation"),
        (name = "status", description = "Read-only verification state"),
        (name = "onboarding", description = "Onboarding finalization gate"),
    )
)]
pub struct ApiDoc;

/// Serves the document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_generates() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.info.title, "kyc-api");
    }

    #[test]
    fn document_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in [
            "/kyc/aadhaar/generate-otp",
            "/kyc/aadhaar/verify-otp",
            "/kyc/pan/verify",
            "/kyc/pan/aadhaar-link-status",
            "/kyc/dl/fake-verify",
            "/kyc/status",
            "/driver/onboarding/finalize",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn document_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn document_serializes_to_json() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(json["components"]["schemas"]["ErrorBody"].is_object());
    }
}
