//! PAN steps: detail match and PAN-Aadhaar link lookup.

use chrono::Utc;
use kyc_core::dob::format_provider_dob;
use kyc_core::{DriverId, PanNumber, Step};
use kyc_provider_client::types::PanVerifyRequest;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{KycError, KycPipeline};

/// Result of `POST /kyc/pan/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PanVerifyResponse {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pan_card_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
}

/// Result of `POST /kyc/pan/aadhaar-link-status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PanAadhaarLinkResponse {
    pub pan_aadhaar_link_status: String,
}

impl KycPipeline {
    /// Match the submitted PAN against the stored name and date of birth.
    ///
    /// Any `data` payload from the provider counts as a match.
    pub async fn verify_pan(
        &self,
        driver_id: DriverId,
        pan: &str,
    ) -> Result<PanVerifyResponse, KycError> {
        let step = Step::VerifyPan;
        let pan = PanNumber::new(pan)?;
        let driver = self.load_driver(driver_id).await?;

        if driver.is_pan_card_verified {
            self.metrics.record_step(step, "already_verified");
            return Ok(PanVerifyResponse {
                verified: true,
                is_pan_card_verified: None,
                already_verified: Some(true),
                is_verified: None,
            });
        }
        step.check(&driver).map_err(|e| self.unmet(e))?;

        // DateOfBirthKnown was checked above.
        let date_of_birth = driver.dob.map(format_provider_dob).unwrap_or_default();
        let request = PanVerifyRequest {
            pan: pan.as_str().to_string(),
            name_as_per_pan: driver.name.clone().unwrap_or_default(),
            date_of_birth,
        };

        let data = self
            .provider()?
            .verify_pan(&request)
            .await
            .map_err(|e| self.provider_failed(step, driver_id, e))?;
        tracing::debug!(driver_id = %driver_id, payload = %data.0, "PAN provider payload");

        self.drivers
            .apply_pan_verification(driver_id, pan.as_str())
            .await?
            .ok_or_else(|| Self::vanished(driver_id))?;

        tracing::info!(driver_id = %driver_id, step = step.as_str(), "PAN verified");
        self.metrics.record_step(step, "success");

        let aggregate = self.recompute(driver_id).await?;
        Ok(PanVerifyResponse {
            verified: true,
            is_pan_card_verified: Some(true),
            already_verified: None,
            is_verified: Some(aggregate.is_verified),
        })
    }

    /// Fetch and store the PAN-Aadhaar link status. Informational only: no
    /// flag changes and no recompute.
    pub async fn check_pan_aadhaar_link(
        &self,
        driver_id: DriverId,
    ) -> Result<PanAadhaarLinkResponse, KycError> {
        let step = Step::CheckPanAadhaarLink;
        let driver = self.load_driver(driver_id).await?;
        step.check(&driver).map_err(|e| self.unmet(e))?;

        let pan = driver.pan_card_no.as_deref().unwrap_or_default();
        let aadhaar = driver.aadhar_no.as_deref().unwrap_or_default();

        let data = self
            .provider()?
            .pan_aadhaar_link_status(pan, aadhaar)
            .await
            .map_err(|e| self.provider_failed(step, driver_id, e))?;
        let status = data.status();

        self.drivers
            .apply_pan_aadhaar_link(driver_id, &status, Utc::now())
            .await?
            .ok_or_else(|| Self::vanished(driver_id))?;

        tracing::info!(
            driver_id = %driver_id,
            step = step.as_str(),
            status = %status,
            "PAN-Aadhaar link status stored"
        );
        self.metrics.record_step(step, "success");

        Ok(PanAadhaarLinkResponse {
            pan_aadhaar_link_status: status,
        })
    }
}
