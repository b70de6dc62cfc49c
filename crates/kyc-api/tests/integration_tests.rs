//! # Integration Tests for kyc-api
//!
//! Drives the full router with in-memory repositories and the mock
//! provider: the onboarding walk from OTP to finalization, identity
//! resolution (session, phone fallback, 401 reasons), error mapping, and
//! the unauthenticated surfaces (health, metrics, OpenAPI).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use kyc_api::middleware::metrics::ApiMetrics;
use kyc_api::state::{AppConfig, AppState};
use kyc_api::store::memory::MemoryStores;
use kyc_api::store::Repositories;
use kyc_core::{Driver, DriverId, PhoneNumber};
use kyc_provider_client::{MockVerificationProvider, ProviderOperation, VerificationProvider};

const PHONE: &str = "+919876543210";
const TOKEN: &str = "session-token";

struct TestApp {
    stores: MemoryStores,
    provider: Arc<MockVerificationProvider>,
    router: axum::Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with(AppConfig::default(), Some(default_provider()))
    }

    fn with(config: AppConfig, provider: Option<MockVerificationProvider>) -> Self {
        let stores = MemoryStores::default();
        let provider = Arc::new(provider.unwrap_or_default());
        let configured = Some(provider.clone() as Arc<dyn VerificationProvider>);
        Self::build(stores, provider, configured, config)
    }

    fn without_provider() -> Self {
        let stores = MemoryStores::default();
        let provider = Arc::new(MockVerificationProvider::new());
        Self::build(stores, provider, None, AppConfig::default())
    }

    fn build(
        stores: MemoryStores,
        provider: Arc<MockVerificationProvider>,
        configured: Option<Arc<dyn VerificationProvider>>,
        config: AppConfig,
    ) -> Self {
        let state = AppState::new(
            config,
            Repositories::from_memory(stores.clone()),
            configured,
            None,
            ApiMetrics::try_new().unwrap(),
        );
        Self {
            stores,
            provider,
            router: kyc_api::app(state),
        }
    }

    /// Seed a registered driver with a verified phone and a live session.
    fn seed_driver(&self, edit: impl FnOnce(&mut Driver)) -> DriverId {
        let mut driver = Driver::registered(DriverId::new(), PhoneNumber::from_canonical(PHONE), true);
        edit(&mut driver);
        let id = driver.id;
        self.stores.drivers.insert(driver);
        self.stores.sessions.issue(TOKEN, id, Duration::hours(1));
        id
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(uri, "POST", token, Body::from(body.to_string())).await
    }

    async fn send(
        &self,
        uri: &str,
        method: &str,
        token: Option<&str>,
        body: Body,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let text = body_string(response).await;
        let json = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (status, json)
    }
}

fn default_provider() -> MockVerificationProvider {
    MockVerificationProvider::new().with_kyc_profile(Some("Ravi Kumar"), Some("02-11-1989"))
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_string(response).await)
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_endpoint() {
    let app = TestApp::new();
    let (status, body) = get(&app.router, "/health/liveness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_readiness_without_database() {
    let app = TestApp::without_provider();
    let (status, body) = get(&app.router, "/health/readiness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ready");
}

// -- Onboarding walk ----------------------------------------------------------

#[tokio::test]
async fn test_full_onboarding_flow() {
    let app = TestApp::new();
    let id = app.seed_driver(|d| {
        d.pan_card_file_key = Some("uploads/pan.jpg".into());
        d.driver_license_file_key = Some("uploads/dl.jpg".into());
        d.is_vehicle_plate_verified = true;
        d.is_insurance_verified = true;
    });

    let (status, body) = app
        .post("/kyc/aadhaar/generate-otp", Some(TOKEN), json!({"aadhaarNo": "1234 1234 1234"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["otpSent"], true);
    assert!(body["referenceId"].is_string());
    assert!(app.stores.drivers.snapshot(id).unwrap().aadhaar_otp_reference_id.is_some());

    let (status, body) = app
        .post("/kyc/aadhaar/verify-otp", Some(TOKEN), json!({"otp": "123456"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAadharVerified"], true);
    assert_eq!(body["isVerified"], false);
    let driver = app.stores.drivers.snapshot(id).unwrap();
    assert!(driver.aadhaar_otp_reference_id.is_none());
    assert_eq!(driver.name.as_deref(), Some("Ravi Kumar"));

    let (status, body) = app
        .post("/kyc/pan/verify", Some(TOKEN), json!({"pan": "ABCDE1234F"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);

    let (status, body) = app
        .post("/kyc/dl/fake-verify", Some(TOKEN), json!({"drivingLicenseNo": "KA01 20190001234"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isDriverLicenseVerified"], true);
    assert_eq!(body["isVerified"], true);

    let (status, body) = app
        .post("/driver/onboarding/finalize", Some(TOKEN), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isVerified"], true);
    let first = body["completedAt"].clone();
    assert!(first.is_string());

    // A repeat returns the stored timestamp.
    let (status, body) = app
        .post("/driver/onboarding/finalize", Some(TOKEN), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completedAt"], first);
    assert!(app.stores.verified.snapshot(id).unwrap().completed_at.is_some());
}

#[tokio::test]
async fn test_finalize_conflicts_until_all_flags_hold() {
    let app = TestApp::new();
    let id = app.seed_driver(|d| d.is_aadhar_verified = true);

    let (status, body) = app
        .post("/driver/onboarding/finalize", Some(TOKEN), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(body["error"]["message"], "account not fully verified yet");
    let row = app.stores.verified.snapshot(id).unwrap();
    assert!(!row.is_verified);
    assert!(row.completed_at.is_none());
}

#[tokio::test]
async fn test_finalize_accepts_empty_body() {
    let app = TestApp::new();
    app.seed_driver(|_| {});
    let (status, _) = app
        .send("/driver/onboarding/finalize", "POST", Some(TOKEN), Body::empty())
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// -- Step scenarios -----------------------------------------------------------

#[tokio::test]
async fn test_pan_before_aadhaar_is_conflict_without_provider_call() {
    let app = TestApp::new();
    app.seed_driver(|d| d.pan_card_file_key = Some("uploads/pan.jpg".into()));

    let (status, body) = app
        .post("/kyc/pan/verify", Some(TOKEN), json!({"pan": "ABCDE1234F"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "verify Aadhaar first");
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn test_repeat_otp_verify_short_circuits() {
    let app = TestApp::new();
    app.seed_driver(|d| d.is_aadhar_verified = true);

    // Even a malformed OTP returns alreadyVerified.
    let (status, body) = app
        .post("/kyc/aadhaar/verify-otp", Some(TOKEN), json!({"otp": "not-an-otp"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"alreadyVerified": true}));
    assert_eq!(app.provider.call_count(ProviderOperation::VerifyAadhaarOtp), 0);
}

#[tokio::test]
async fn test_otp_verify_without_challenge_is_conflict() {
    let app = TestApp::new();
    app.seed_driver(|_| {});
    let (status, body) = app
        .post("/kyc/aadhaar/verify-otp", Some(TOKEN), json!({"otp": "123456"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "generate OTP first");
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_aadhaar_number_is_422() {
    let app = TestApp::new();
    app.seed_driver(|_| {});
    let (status, body) = app
        .post("/kyc/aadhaar/generate-otp", Some(TOKEN), json!({"aadhaarNo": "12345"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_provider_failure_is_502_and_writes_nothing() {
    let app = TestApp::new();
    let id = app.seed_driver(|_| {});
    app.provider.fail(ProviderOperation::GenerateAadhaarOtp);

    let (status, body) = app
        .post("/kyc/aadhaar/generate-otp", Some(TOKEN), json!({"aadhaarNo": "123412341234"}))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
    let driver = app.stores.drivers.snapshot(id).unwrap();
    assert!(driver.aadhar_no.is_none());
    assert!(driver.aadhaar_otp_reference_id.is_none());
}

#[tokio::test]
async fn test_provider_backed_step_is_503_without_provider() {
    let app = TestApp::without_provider();
    app.seed_driver(|_| {});
    let (status, body) = app
        .post("/kyc/aadhaar/generate-otp", Some(TOKEN), json!({"aadhaarNo": "123412341234"}))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_license_step_runs_without_provider() {
    let app = TestApp::without_provider();
    app.seed_driver(|d| d.driver_license_file_key = Some("uploads/dl.jpg".into()));
    let (status, body) = app
        .post("/kyc/dl/fake-verify", Some(TOKEN), json!({"drivingLicenseNo": "DL-1"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isDriverLicenseVerified"], true);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = TestApp::new();
    app.seed_driver(|_| {});
    let (status, body) = app
        .send("/kyc/dl/fake-verify", "POST", Some(TOKEN), Body::from("{not json"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_link_status_is_stored() {
    let app = TestApp::with(
        AppConfig::default(),
        Some(default_provider().with_link_status(kyc_provider_client::types::PanAadhaarLinkData {
            pan_status: Some("Y".into()),
            ..Default::default()
        })),
    );
    let id = app.seed_driver(|d| {
        d.pan_card_no = Some("ABCDE1234F".into());
        d.aadhar_no = Some("123412341234".into());
    });

    let (status, body) = app
        .post("/kyc/pan/aadhaar-link-status", Some(TOKEN), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["panAadhaarLinkStatus"], "Y");
    assert_eq!(
        app.stores.drivers.snapshot(id).unwrap().pan_aadhaar_link_status.as_deref(),
        Some("Y")
    );
}

// -- Identity resolution ------------------------------------------------------

#[tokio::test]
async fn test_fallback_resolves_verified_phone() {
    let app = TestApp::new();
    let id = app.seed_driver(|d| d.driver_license_file_key = Some("uploads/dl.jpg".into()));

    let (status, _) = app
        .post(
            "/kyc/dl/fake-verify",
            None,
            json!({"drivingLicenseNo": "DL-1", "phoneNumber": "98765 43210"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.stores.drivers.snapshot(id).unwrap().is_driver_license_verified);
}

#[tokio::test]
async fn test_fallback_refuses_unverified_phone() {
    let app = TestApp::new();
    app.stores.drivers.insert(Driver::registered(
        DriverId::new(),
        PhoneNumber::from_canonical(PHONE),
        false,
    ));

    let (status, body) = app
        .post("/kyc/dl/fake-verify", None, json!({"drivingLicenseNo": "DL-1", "phoneNumber": PHONE}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["details"]["reason"], "phone_not_verified");
}

#[tokio::test]
async fn test_missing_session_and_phone_asks_for_phone() {
    let app = TestApp::new();
    app.seed_driver(|_| {});
    let (status, body) = app
        .post("/kyc/dl/fake-verify", Some("expired-token"), json!({"drivingLicenseNo": "DL-1"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["details"]["reason"], "phone_required");
}

#[tokio::test]
async fn test_session_wins_over_conflicting_phone() {
    let app = TestApp::new();
    let session_driver = app.seed_driver(|d| d.driver_license_file_key = Some("uploads/dl.jpg".into()));
    let other = Driver::registered(
        DriverId::new(),
        PhoneNumber::from_canonical("+919000000002"),
        true,
    );
    let other_id = other.id;
    app.stores.drivers.insert(other);

    let (status, _) = app
        .post(
            "/kyc/dl/fake-verify",
            Some(TOKEN),
            json!({"drivingLicenseNo": "DL-1", "phoneNumber": "+919000000002"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.stores.drivers.snapshot(session_driver).unwrap().is_driver_license_verified);
    assert!(!app.stores.drivers.snapshot(other_id).unwrap().is_driver_license_verified);
}

#[tokio::test]
async fn test_disabled_fallback_rejects_phone() {
    let config = AppConfig {
        phone_fallback_enabled: false,
        ..AppConfig::default()
    };
    let app = TestApp::with(config, Some(default_provider()));
    app.seed_driver(|d| d.driver_license_file_key = Some("uploads/dl.jpg".into()));

    let (status, body) = app
        .post("/kyc/dl/fake-verify", None, json!({"drivingLicenseNo": "DL-1", "phoneNumber": PHONE}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["details"]["reason"], "missing_session");
}

#[tokio::test]
async fn test_status_requires_session() {
    let app = TestApp::new();
    app.seed_driver(|_| {});

    let (status, body) = app.send("/kyc/status", "GET", None, Body::empty()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["details"]["reason"], "missing_session");

    let (status, body) = app.send("/kyc/status", "GET", Some(TOKEN), Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flags"]["phoneNumberVerified"], true);
    assert_eq!(body["flags"]["isAadharVerified"], false);
    assert_eq!(body["otpOutstanding"], false);
}

#[tokio::test]
async fn test_session_for_deleted_driver_is_404() {
    let app = TestApp::new();
    app.stores.sessions.issue("orphan", DriverId::new(), Duration::hours(1));
    let (status, body) = app
        .post("/kyc/dl/fake-verify", Some("orphan"), json!({"drivingLicenseNo": "DL-1"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// -- Metrics ------------------------------------------------------------------

#[tokio::test]
async fn test_metrics_endpoint_reports_requests() {
    let app = TestApp::new();
    app.seed_driver(|_| {});
    app.send("/kyc/status", "GET", Some(TOKEN), Body::empty()).await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    let body = body_string(response).await;
    assert!(body.contains("kyc_http_requests_total"));
    assert!(body.contains("/kyc/status"));
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let config = AppConfig {
        metrics_enabled: false,
        ..AppConfig::default()
    };
    let app = TestApp::with(config, None);
    let (status, _) = get(&app.router, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_json_served() {
    let app = TestApp::new();
    let (status, body) = get(&app.router, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    let doc: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(doc["info"]["title"], "kyc-api");
    assert!(doc["paths"]["/driver/onboarding/finalize"].is_object());
}
