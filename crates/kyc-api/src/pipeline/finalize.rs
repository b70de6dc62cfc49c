//! Finalization gate: stamps `completed_at` once every flag holds.

use chrono::{DateTime, Utc};
use kyc_core::DriverId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{KycError, KycPipeline};
use crate::store::FinalizeOutcome;

/// Result of `POST /driver/onboarding/finalize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub is_verified: bool,
    /// The stored completion time. Repeat calls return the first one.
    pub completed_at: DateTime<Utc>,
}

impl KycPipeline {
    /// Recompute the aggregate and, if it holds, mark onboarding complete.
    ///
    /// The write only lands while `completed_at` is null, so concurrent and
    /// repeated calls all succeed with the same timestamp.
    pub async fn finalize(&self, driver_id: DriverId) -> Result<FinalizeResponse, KycError> {
        let aggregate = self.recompute(driver_id).await?;
        if !aggregate.is_verified {
            self.metrics.record_finalize("not_verified");
            return Err(KycError::Conflict("account not fully verified yet".to_string()));
        }

        let completed_at = match self.verified.mark_completed(driver_id, Utc::now()).await? {
            FinalizeOutcome::Completed(at) => {
                tracing::info!(driver_id = %driver_id, completed_at = %at, "onboarding finalized");
                self.metrics.record_finalize("completed");
                at
            }
            FinalizeOutcome::AlreadyCompleted(at) => {
                tracing::debug!(driver_id = %driver_id, "onboarding already finalized");
                self.metrics.record_finalize("already_completed");
                at
            }
            // The recompute above upserted the row.
            FinalizeOutcome::Missing => return Err(Self::vanished(driver_id)),
        };

        Ok(FinalizeResponse {
            is_verified: true,
            completed_at,
        })
    }
}
