//! # Persistence Layer
//!
//! The pipeline reaches storage only through the three traits below. Each
//! has a Postgres implementation ([`postgres`]) used when `DATABASE_URL` is
//! set, and an in-memory implementation ([`memory`]) used in development
//! and tests.
//!
//! ## Targeted updates
//!
//! Driver mutations are one method per step rather than a generic "save".
//! Each writes only the columns its step owns, so two verifiers running
//! concurrently for the same driver cannot overwrite each other's flags.
//! Every mutation returns the updated record, or `None` if the driver does
//! not exist.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kyc_core::{AadhaarProfile, Driver, DriverId, PhoneNumber, VerifiedDriver};
use sha2::{Digest, Sha256};

/// Persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Driver rows. Registration happens elsewhere; this trait only reads
/// drivers and writes verification columns.
#[async_trait]
pub trait DriverRepository: Send + Sync {
    async fn get(&self, id: DriverId) -> Result<Option<Driver>, StoreError>;

    /// Exact match on the canonical phone number.
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Driver>, StoreError>;

    /// Store a new OTP challenge and the Aadhaar number it was issued for.
    ///
    /// Only writes while `is_aadhar_verified` is false. A driver verified in
    /// the meantime is returned as stored, with no challenge recorded.
    async fn record_otp_challenge(
        &self,
        id: DriverId,
        aadhar_no: &str,
        reference_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Driver>, StoreError>;

    /// Set the Aadhaar flag, clear the challenge, backfill present profile fields.
    async fn apply_aadhaar_verification(
        &self,
        id: DriverId,
        profile: &AadhaarProfile,
    ) -> Result<Option<Driver>, StoreError>;

    async fn apply_pan_verification(
        &self,
        id: DriverId,
        pan: &str,
    ) -> Result<Option<Driver>, StoreError>;

    async fn apply_pan_aadhaar_link(
        &self,
        id: DriverId,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Driver>, StoreError>;

    async fn apply_license_confirmation(
        &self,
        id: DriverId,
        license_no: &str,
    ) -> Result<Option<Driver>, StoreError>;
}

/// Result of stamping completion on a VerifiedDriver row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// This call wrote `completed_at`.
    Completed(DateTime<Utc>),
    /// `completed_at` was already set; it was left untouched.
    AlreadyCompleted(DateTime<Utc>),
    /// No VerifiedDriver row exists for the driver.
    Missing,
}

/// The derived aggregate rows.
#[async_trait]
pub trait VerifiedDriverRepository: Send + Sync {
    async fn get(&self, driver_id: DriverId) -> Result<Option<VerifiedDriver>, StoreError>;

    /// Create or update the row's `is_verified`. Never touches `completed_at`.
    async fn upsert_verified(
        &self,
        driver_id: DriverId,
        is_verified: bool,
    ) -> Result<VerifiedDriver, StoreError>;

    /// Set `completed_at` only if it is still null.
    async fn mark_completed(
        &self,
        driver_id: DriverId,
        at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome, StoreError>;
}

/// Read side of the session store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolve a bearer token. Unknown and expired tokens are `Ok(None)`.
    async fn lookup(&self, token: &str) -> Result<Option<DriverId>, StoreError>;
}

/// SHA-256 hex digest under which a session token is stored.
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// The three repositories the service runs against.
#[derive(Clone)]
pub struct Repositories {
    pub drivers: Arc<dyn DriverRepository>,
    pub verified: Arc<dyn VerifiedDriverRepository>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Repositories {
    /// Postgres-backed repositories sharing one pool.
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            drivers: Arc::new(postgres::PgDriverRepository::new(pool.clone())),
            verified: Arc::new(postgres::PgVerifiedDriverRepository::new(pool.clone())),
            sessions: Arc::new(postgres::PgSessionStore::new(pool)),
        }
    }

    /// Fresh, empty in-memory repositories.
    pub fn in_memory() -> Self {
        Self::from_memory(memory::MemoryStores::default())
    }

    /// Wrap existing in-memory stores, keeping the caller's handles usable
    /// for seeding and inspection.
    pub fn from_memory(stores: memory::MemoryStores) -> Self {
        Self {
            drivers: Arc::new(stores.drivers),
            verified: Arc::new(stores.verified),
            sessions: Arc::new(stores.sessions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_digest_is_lowercase_hex_sha256() {
        assert_eq!(
            token_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn token_digest_differs_per_token() {
        assert_ne!(token_digest("session-a"), token_digest("session-b"));
    }
}
