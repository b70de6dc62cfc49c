//! Aadhaar OTP steps: issuing the challenge and confirming it.

use chrono::Utc;
use kyc_core::dob::parse_provider_dob;
use kyc_core::{AadhaarNumber, AadhaarProfile, DriverId, OtpCode, Step};
use kyc_provider_client::types::AadhaarKycData;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{KycError, KycPipeline};

/// Result of `POST /kyc/aadhaar/generate-otp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtpGeneratedResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_verified: Option<bool>,
}

/// Result of `POST /kyc/aadhaar/verify-otp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AadhaarVerifyResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_aadhar_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
}

impl AadhaarVerifyResponse {
    fn already_verified() -> Self {
        Self {
            already_verified: Some(true),
            is_aadhar_verified: None,
            is_verified: None,
        }
    }
}

fn already_verified_otp() -> OtpGeneratedResponse {
    OtpGeneratedResponse {
        otp_sent: None,
        reference_id: None,
        already_verified: Some(true),
    }
}

/// Name and date of birth from a confirmation payload. Blank names and
/// unparseable dates are dropped.
fn profile_from(data: &AadhaarKycData) -> AadhaarProfile {
    AadhaarProfile {
        name: data
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        dob: data.date_of_birth.as_deref().and_then(parse_provider_dob),
    }
}

impl KycPipeline {
    /// Issue an OTP challenge for `aadhaar_no` and store its reference.
    pub async fn generate_aadhaar_otp(
        &self,
        driver_id: DriverId,
        aadhaar_no: &str,
    ) -> Result<OtpGeneratedResponse, KycError> {
        let step = Step::GenerateAadhaarOtp;
        let aadhaar = AadhaarNumber::new(aadhaar_no)?;
        let driver = self.load_driver(driver_id).await?;

        if driver.is_aadhar_verified {
            self.metrics.record_step(step, "already_verified");
            return Ok(already_verified_otp());
        }
        step.check(&driver).map_err(|e| self.unmet(e))?;

        let issued = self
            .provider()?
            .generate_aadhaar_otp(aadhaar.as_str())
            .await
            .map_err(|e| self.provider_failed(step, driver_id, e))?;

        let stored = self
            .drivers
            .record_otp_challenge(driver_id, aadhaar.as_str(), &issued.reference_id, Utc::now())
            .await?
            .ok_or_else(|| Self::vanished(driver_id))?;

        // Confirmed by a concurrent request while the provider was issuing.
        if stored.is_aadhar_verified {
            tracing::debug!(driver_id = %driver_id, "aadhaar verified during OTP issue, challenge dropped");
            self.metrics.record_step(step, "already_verified");
            return Ok(already_verified_otp());
        }

        tracing::info!(
            driver_id = %driver_id,
            step = step.as_str(),
            replaced = driver.has_outstanding_otp(),
            "aadhaar OTP issued"
        );
        self.metrics.record_step(step, "success");

        Ok(OtpGeneratedResponse {
            otp_sent: Some(true),
            reference_id: Some(issued.reference_id),
            already_verified: None,
        })
    }

    /// Confirm the outstanding OTP challenge.
    pub async fn verify_aadhaar_otp(
        &self,
        driver_id: DriverId,
        otp: &str,
    ) -> Result<AadhaarVerifyResponse, KycError> {
        let step = Step::VerifyAadhaarOtp;
        // Only emptiness is checked here, so any non-empty value still
        // reaches the short-circuit below.
        let otp = OtpCode::new(otp)?;
        let driver = self.load_driver(driver_id).await?;

        if driver.is_aadhar_verified {
            self.metrics.record_step(step, "already_verified");
            return Ok(AadhaarVerifyResponse::already_verified());
        }
        step.check(&driver).map_err(|e| self.unmet(e))?;

        // Checked by the prerequisite above.
        let reference_id = driver.aadhaar_otp_reference_id.as_deref().unwrap_or_default();

        let data = self
            .provider()?
            .verify_aadhaar_otp(reference_id, otp.as_str())
            .await
            .map_err(|e| self.provider_failed(step, driver_id, e))?;

        let profile = profile_from(&data);
        if data.date_of_birth.is_some() && profile.dob.is_none() {
            tracing::debug!(driver_id = %driver_id, "ignoring unparseable date of birth from provider");
        }

        self.drivers
            .apply_aadhaar_verification(driver_id, &profile)
            .await?
            .ok_or_else(|| Self::vanished(driver_id))?;

        tracing::info!(driver_id = %driver_id, step = step.as_str(), "aadhaar verified");
        self.metrics.record_step(step, "success");

        let aggregate = self.recompute(driver_id).await?;
        Ok(AadhaarVerifyResponse {
            already_verified: None,
            is_aadhar_verified: Some(true),
            is_verified: Some(aggregate.is_verified),
        })
    }
}
