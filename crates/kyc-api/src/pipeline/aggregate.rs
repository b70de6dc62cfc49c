//! The verification aggregate and the read-only status view.

use chrono::{DateTime, Utc};
use kyc_core::{DriverId, VerificationFlags};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{KycError, KycPipeline};

/// Outcome of a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResponse {
    pub is_verified: bool,
}

/// Result of `GET /kyc/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KycStatusResponse {
    #[schema(value_type = String, format = Uuid)]
    pub driver_id: DriverId,
    #[schema(value_type = Object)]
    pub flags: VerificationFlags,
    pub pan_aadhaar_link_status: Option<String>,
    pub otp_outstanding: bool,
    /// Stored aggregate; `None` until the first recompute.
    pub is_verified: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl KycPipeline {
    /// Derive `is_verified` from the driver's six flags and upsert it.
    ///
    /// Idempotent. Never writes `completed_at`.
    pub async fn recompute(&self, driver_id: DriverId) -> Result<AggregateResponse, KycError> {
        let flags = self.load_driver(driver_id).await?.flags();
        let is_verified = flags.all_verified();
        self.verified.upsert_verified(driver_id, is_verified).await?;

        tracing::debug!(
            driver_id = %driver_id,
            is_verified,
            missing = ?flags.missing(),
            "aggregate recomputed"
        );
        Ok(AggregateResponse { is_verified })
    }

    /// Current verification state. Reads only.
    pub async fn status(&self, driver_id: DriverId) -> Result<KycStatusResponse, KycError> {
        let driver = self.load_driver(driver_id).await?;
        let aggregate = self.verified.get(driver_id).await?;

        Ok(KycStatusResponse {
            driver_id,
            flags: driver.flags(),
            otp_outstanding: driver.has_outstanding_otp(),
            pan_aadhaar_link_status: driver.pan_aadhaar_link_status,
            is_verified: aggregate.as_ref().map(|row| row.is_verified),
            completed_at: aggregate.and_then(|row| row.completed_at),
        })
    }
}
