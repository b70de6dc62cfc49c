//! # Verification Pipeline
//!
//! One [`KycPipeline`] method per operation. Each step verifier:
//!
//! 1. validates input (422),
//! 2. loads the driver (404),
//! 3. short-circuits if its flag is already set,
//! 4. checks the step's prerequisites from [`kyc_core::prerequisites`] (409),
//! 5. calls the provider, if the step needs one (502 on failure, nothing written),
//! 6. writes its own columns in one targeted update,
//! 7. recomputes the aggregate.
//!
//! | Module | Operations |
//! |--------|-----------|
//! | [`aadhaar`] | `generate_aadhaar_otp`, `verify_aadhaar_otp` |
//! | [`pan`] | `verify_pan`, `check_pan_aadhaar_link` |
//! | [`license`] | `verify_driving_license` |
//! | [`aggregate`] | `recompute`, `status` |
//! | [`finalize`] | `finalize` |

pub mod aadhaar;
pub mod aggregate;
pub mod finalize;
pub mod license;
pub mod pan;

use std::sync::Arc;

use kyc_core::{Driver, DriverId, Step, UnmetPrerequisite, ValidationError};
use kyc_provider_client::{ProviderError, VerificationProvider};

use crate::auth::UnauthenticatedReason;
use crate::middleware::metrics::ApiMetrics;
use crate::store::{DriverRepository, StoreError, VerifiedDriverRepository};

pub use aadhaar::{AadhaarVerifyResponse, OtpGeneratedResponse};
pub use aggregate::{AggregateResponse, KycStatusResponse};
pub use finalize::FinalizeResponse;
pub use license::LicenseVerifyResponse;
pub use pan::{PanAadhaarLinkResponse, PanVerifyResponse};

/// Pipeline failures. Each variant is one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum KycError {
    /// 401. No session and no usable phone fallback.
    #[error("{0}")]
    Unauthenticated(UnauthenticatedReason),

    /// 404.
    #[error("driver {0} not found")]
    NotFound(DriverId),

    /// 409. A prior step or document is missing.
    #[error(transparent)]
    Prerequisite(#[from] UnmetPrerequisite),

    /// 409. Any other state conflict.
    #[error("{0}")]
    Conflict(String),

    /// 422.
    #[error(transparent)]
    Unprocessable(#[from] ValidationError),

    /// 502. The provider failed or returned no usable payload.
    #[error("verification provider failure: {0}")]
    Provider(#[from] ProviderError),

    /// 503. No provider configured.
    #[error("verification provider is not configured")]
    ProviderUnavailable,

    /// 500.
    #[error("store error: {0}")]
    Internal(#[from] StoreError),
}

/// The verification pipeline over injected repositories and provider.
#[derive(Clone)]
pub struct KycPipeline {
    drivers: Arc<dyn DriverRepository>,
    verified: Arc<dyn VerifiedDriverRepository>,
    provider: Option<Arc<dyn VerificationProvider>>,
    metrics: ApiMetrics,
}

impl KycPipeline {
    pub fn new(
        drivers: Arc<dyn DriverRepository>,
        verified: Arc<dyn VerifiedDriverRepository>,
        provider: Option<Arc<dyn VerificationProvider>>,
        metrics: ApiMetrics,
    ) -> Self {
        Self {
            drivers,
            verified,
            provider,
            metrics,
        }
    }

    /// Whether provider-backed steps can run.
    pub fn provider_configured(&self) -> bool {
        self.provider.is_some()
    }

    async fn load_driver(&self, id: DriverId) -> Result<Driver, KycError> {
        self.drivers.get(id).await?.ok_or(KycError::NotFound(id))
    }

    fn provider(&self) -> Result<&dyn VerificationProvider, KycError> {
        self.provider.as_deref().ok_or(KycError::ProviderUnavailable)
    }

    /// Log and count a provider failure, then convert it.
    fn provider_failed(&self, step: Step, driver_id: DriverId, err: ProviderError) -> KycError {
        tracing::warn!(
            driver_id = %driver_id,
            step = step.as_str(),
            endpoint = err.endpoint().unwrap_or("unknown"),
            error = %err,
            "verification provider call failed"
        );
        self.metrics.record_provider_failure(step.as_str());
        self.metrics.record_step(step, "provider_failure");
        KycError::Provider(err)
    }

    /// Count an unmet prerequisite, then convert it.
    fn unmet(&self, unmet: UnmetPrerequisite) -> KycError {
        tracing::debug!(
            step = unmet.step.as_str(),
            reason = unmet.requirement.message(),
            "step prerequisite unmet"
        );
        self.metrics.record_step(unmet.step, "prerequisite_unmet");
        KycError::Prerequisite(unmet)
    }

    /// A targeted update matched no row: the driver vanished mid-request.
    fn vanished(driver_id: DriverId) -> KycError {
        KycError::NotFound(driver_id)
    }
}
