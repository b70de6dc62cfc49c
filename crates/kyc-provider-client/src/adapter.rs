//! # Verification Provider Adapter Interface
//!
//! The `VerificationProvider` trait is the seam between the onboarding
//! pipeline and whichever provider backend is deployed. Production uses
//! [`HttpVerificationProvider`](crate::HttpVerificationProvider); tests and
//! credential-less development use [`MockVerificationProvider`].
//!
//! Implementations must be `Send + Sync` so they can be shared across
//! request handlers behind an `Arc`. The trait is object-safe.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ProviderError;
use crate::types::{
    AadhaarKycData, AadhaarOtpIssued, PanAadhaarLinkData, PanVerificationData, PanVerifyRequest,
};

/// External verification provider, as consumed by the pipeline.
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    /// Issue an OTP challenge to the mobile number linked with an Aadhaar.
    async fn generate_aadhaar_otp(
        &self,
        aadhaar_number: &str,
    ) -> Result<AadhaarOtpIssued, ProviderError>;

    /// Confirm an OTP against an outstanding challenge.
    async fn verify_aadhaar_otp(
        &self,
        reference_id: &str,
        otp: &str,
    ) -> Result<AadhaarKycData, ProviderError>;

    /// Match PAN, name, and date of birth.
    async fn verify_pan(
        &self,
        request: &PanVerifyRequest,
    ) -> Result<PanVerificationData, ProviderError>;

    /// Report whether a PAN is linked to an Aadhaar.
    async fn pan_aadhaar_link_status(
        &self,
        pan: &str,
        aadhaar_number: &str,
    ) -> Result<PanAadhaarLinkData, ProviderError>;

    /// Human-readable name of this implementation, for logs and readiness.
    fn provider_name(&self) -> &str;
}

/// The four provider operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    GenerateAadhaarOtp,
    VerifyAadhaarOtp,
    VerifyPan,
    PanAadhaarLinkStatus,
}

impl ProviderOperation {
    /// Endpoint label used in errors and metrics.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::GenerateAadhaarOtp => "POST /kyc/aadhaar/okyc/otp",
            Self::VerifyAadhaarOtp => "POST /kyc/aadhaar/okyc/otp/verify",
            Self::VerifyPan => "POST /kyc/pan/verify",
            Self::PanAadhaarLinkStatus => "POST /kyc/pan/aadhaar/status",
        }
    }
}

/// One recorded call on the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub operation: ProviderOperation,
    /// Arguments in call order. OTP values are recorded as given.
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<ProviderCall>,
    failing: HashSet<ProviderOperation>,
    kyc: AadhaarKycData,
    link: PanAadhaarLinkData,
    accepted_otp: Option<String>,
    next_reference: u64,
}

/// Mock provider for tests and development.
///
/// Succeeds for every call unless told otherwise. Each
/// `generate_aadhaar_otp` returns a fresh `MOCK-REF-<n>` reference. Failures
/// are reported as [`ProviderError::MissingPayload`], which is what a
/// provider error body looks like on the wire.
#[derive(Debug, Default)]
pub struct MockVerificationProvider {
    state: Mutex<MockState>,
}

impl MockVerificationProvider {
    /// A mock that accepts everything and returns empty payloads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this name and `DD-MM-YYYY` date of birth on OTP confirmation.
    pub fn with_kyc_profile(self, name: Option<&str>, date_of_birth: Option<&str>) -> Self {
        {
            let mut state = self.state.lock();
            state.kyc.name = name.map(str::to_string);
            state.kyc.date_of_birth = date_of_birth.map(str::to_string);
        }
        self
    }

    /// Return this payload from the link-status operation.
    pub fn with_link_status(self, data: PanAadhaarLinkData) -> Self {
        self.state.lock().link = data;
        self
    }

    /// Reject any OTP other than `otp`.
    pub fn accepting_only_otp(self, otp: &str) -> Self {
        self.state.lock().accepted_otp = Some(otp.to_string());
        self
    }

    /// Make `operation` fail from now on.
    pub fn fail(&self, operation: ProviderOperation) {
        self.state.lock().failing.insert(operation);
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls made to `operation`.
    pub fn call_count(&self, operation: ProviderOperation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Record the call and report whether it should fail.
    fn record(&self, operation: ProviderOperation, args: &[&str]) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(ProviderCall {
            operation,
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        if state.failing.contains(&operation) {
            return Err(mock_failure(operation, 503));
        }
        Ok(())
    }
}

fn mock_failure(operation: ProviderOperation, status: u16) -> ProviderError {
    ProviderError::MissingPayload {
        endpoint: operation.endpoint().to_string(),
        status,
        body: r#"{"code":"mock_failure"}"#.to_string(),
    }
}

#[async_trait]
impl VerificationProvider for MockVerificationProvider {
    async fn generate_aadhaar_otp(
        &self,
        aadhaar_number: &str,
    ) -> Result<AadhaarOtpIssued, ProviderError> {
        self.record(ProviderOperation::GenerateAadhaarOtp, &[aadhaar_number])?;
        let mut state = self.state.lock();
        state.next_reference += 1;
        Ok(AadhaarOtpIssued {
            reference_id: format!("MOCK-REF-{}", state.next_reference),
            message: Some("OTP sent successfully".to_string()),
        })
    }

    async fn verify_aadhaar_otp(
        &self,
        reference_id: &str,
        otp: &str,
    ) -> Result<AadhaarKycData, ProviderError> {
        self.record(ProviderOperation::VerifyAadhaarOtp, &[reference_id, otp])?;
        let state = self.state.lock();
        if let Some(accepted) = &state.accepted_otp {
            if accepted != otp {
                return Err(mock_failure(ProviderOperation::VerifyAadhaarOtp, 422));
            }
        }
        Ok(state.kyc.clone())
    }

    async fn verify_pan(
        &self,
        request: &PanVerifyRequest,
    ) -> Result<PanVerificationData, ProviderError> {
        self.record(
            ProviderOperation::VerifyPan,
            &[&request.pan, &request.name_as_per_pan, &request.date_of_birth],
        )?;
        Ok(PanVerificationData(serde_json::json!({
            "pan": request.pan,
            "status": "valid",
        })))
    }

    async fn pan_aadhaar_link_status(
        &self,
        pan: &str,
        aadhaar_number: &str,
    ) -> Result<PanAadhaarLinkData, ProviderError> {
        self.record(ProviderOperation::PanAadhaarLinkStatus, &[pan, aadhaar_number])?;
        Ok(self.state.lock().link.clone())
    }

    fn provider_name(&self) -> &str {
        "MockVerificationProvider"
    }
}
