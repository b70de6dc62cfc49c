//! Driving-license confirmation.
//!
//! No provider call: the step records the submitted number against an
//! uploaded license image and sets the flag directly.

use kyc_core::{DriverId, LicenseNumber, Step};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{KycError, KycPipeline};

/// Result of `POST /kyc/dl/fake-verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseVerifyResponse {
    pub is_driver_license_verified: bool,
    pub is_verified: bool,
}

impl KycPipeline {
    pub async fn verify_driving_license(
        &self,
        driver_id: DriverId,
        license_no: &str,
    ) -> Result<LicenseVerifyResponse, KycError> {
        let step = Step::ConfirmDrivingLicense;
        let license = LicenseNumber::new(license_no)?;
        let driver = self.load_driver(driver_id).await?;
        step.check(&driver).map_err(|e| self.unmet(e))?;

        self.drivers
            .apply_license_confirmation(driver_id, license.as_str())
            .await?
            .ok_or_else(|| Self::vanished(driver_id))?;

        tracing::info!(
            driver_id = %driver_id,
            step = step.as_str(),
            previously_verified = driver.is_driver_license_verified,
            "driving license confirmed"
        );
        self.metrics.record_step(step, "success");

        let aggregate = self.recompute(driver_id).await?;
        Ok(LicenseVerifyResponse {
            is_driver_license_verified: true,
            is_verified: aggregate.is_verified,
        })
    }
}

#[cfg(test)]
mod tests {
    use kyc_provider_client::MockVerificationProvider;

    use super::*;
    use crate::pipeline::test_support::{harness, seed};

    #[tokio::test]
    async fn license_needs_uploaded_document() {
        let h = harness(MockVerificationProvider::new());
        let id = seed(&h, |_| {});

        let err = h
            .pipeline
            .verify_driving_license(id, "MH1220110012345")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "upload driving license first");
        assert!(!h.stores.drivers.snapshot(id).unwrap().is_driver_license_verified);
    }

    #[tokio::test]
    async fn license_is_recorded_uppercased_without_provider() {
        let h = harness(MockVerificationProvider::new());
        let id = seed(&h, |d| d.driver_license_file_key = Some("uploads/dl.jpg".into()));

        let out = h
            .pipeline
            .verify_driving_license(id, " mh1220110012345 ")
            .await
            .unwrap();
        assert!(out.is_driver_license_verified);
        assert!(!out.is_verified);

        let driver = h.stores.drivers.snapshot(id).unwrap();
        assert_eq!(driver.driver_license_no.as_deref(), Some("MH1220110012345"));
        assert!(driver.is_driver_license_verified);
        assert!(h.provider.calls().is_empty());
        assert!(h.stores.verified.snapshot(id).is_some());
    }

    #[tokio::test]
    async fn completing_the_last_flag_reports_verified() {
        let h = harness(MockVerificationProvider::new());
        let id = seed(&h, |d| {
            d.driver_license_file_key = Some("uploads/dl.jpg".into());
            d.is_aadhar_verified = true;
            d.is_pan_card_verified = true;
            d.is_vehicle_plate_verified = true;
            d.is_insurance_verified = true;
        });

        let out = h.pipeline.verify_driving_license(id, "DL-0420").await.unwrap();
        assert!(out.is_verified);
        assert!(h.stores.verified.snapshot(id).unwrap().is_verified);
    }

    #[tokio::test]
    async fn missing_driver_is_not_found() {
        let h = harness(MockVerificationProvider::new());
        let err = h
            .pipeline
            .verify_driving_license(DriverId::new(), "DL-0420")
            .await
            .unwrap_err();
        assert!(matches!(err, KycError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_license_is_unprocessable() {
        let h = harness(MockVerificationProvider::new());
        let id = seed(&h, |d| d.driver_license_file_key = Some("uploads/dl.jpg".into()));
        let err = h.pipeline.verify_driving_license(id, "").await.unwrap_err();
        assert!(matches!(err, KycError::Unprocessable(_)));
    }
}
