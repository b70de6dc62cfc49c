//! In-memory repositories for development and tests.
//!
//! All operations are synchronous under a `parking_lot` lock that is never
//! held across an `.await`. Every handle is cheaply cloneable and clones
//! share the same data, so a test can keep a handle for seeding and
//! inspection while the service holds another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use kyc_core::{AadhaarProfile, Driver, DriverId, PhoneNumber, VerifiedDriver};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    token_digest, DriverRepository, FinalizeOutcome, SessionStore, StoreError,
    VerifiedDriverRepository,
};

/// Thread-safe, cloneable map keyed by UUID.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// First record matching `pred`, in unspecified order.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// Run `f` on the record under the write lock. `None` if absent.
    pub fn update<R>(&self, id: &Uuid, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.data.write().get_mut(id).map(f)
    }

    /// Run `f` on the record, creating it with `init` first if absent.
    pub fn upsert<R>(&self, id: Uuid, init: impl FnOnce() -> T, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.data.write();
        f(guard.entry(id).or_insert_with(init))
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -- Drivers ------------------------------------------------------------------

/// In-memory [`DriverRepository`].
#[derive(Debug, Clone, Default)]
pub struct MemoryDriverRepository {
    drivers: Store<Driver>,
}

impl MemoryDriverRepository {
    /// Seed a driver, standing in for the registration flow.
    pub fn insert(&self, driver: Driver) {
        self.drivers.insert(*driver.id.as_uuid(), driver);
    }

    /// Snapshot of a driver, for assertions.
    pub fn snapshot(&self, id: DriverId) -> Option<Driver> {
        self.drivers.get(id.as_uuid())
    }

    fn mutate(&self, id: DriverId, f: impl FnOnce(&mut Driver)) -> Option<Driver> {
        self.drivers.update(id.as_uuid(), |d| {
            f(d);
            d.clone()
        })
    }
}

#[async_trait]
impl DriverRepository for MemoryDriverRepository {
    async fn get(&self, id: DriverId) -> Result<Option<Driver>, StoreError> {
        Ok(self.drivers.get(id.as_uuid()))
    }

    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Driver>, StoreError> {
        Ok(self.drivers.find(|d| d.phone_number == *phone))
    }

    async fn record_otp_challenge(
        &self,
        id: DriverId,
        aadhar_no: &str,
        reference_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Driver>, StoreError> {
        Ok(self.mutate(id, |d| {
            d.record_otp_challenge(aadhar_no, reference_id.to_string(), at);
        }))
    }

    async fn apply_aadhaar_verification(
        &self,
        id: DriverId,
        profile: &AadhaarProfile,
    ) -> Result<Option<Driver>, StoreError> {
        Ok(self.mutate(id, |d| d.apply_aadhaar_verification(profile)))
    }

    async fn apply_pan_verification(
        &self,
        id: DriverId,
        pan: &str,
    ) -> Result<Option<Driver>, StoreError> {
        Ok(self.mutate(id, |d| d.apply_pan_verification(pan)))
    }

    async fn apply_pan_aadhaar_link(
        &self,
        id: DriverId,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Driver>, StoreError> {
        Ok(self.mutate(id, |d| d.apply_pan_aadhaar_link(status, at)))
    }

    async fn apply_license_confirmation(
        &self,
        id: DriverId,
        license_no: &str,
    ) -> Result<Option<Driver>, StoreError> {
        Ok(self.mutate(id, |d| d.apply_license_confirmation(license_no)))
    }
}

// -- Verified drivers ---------------------------------------------------------

/// In-memory [`VerifiedDriverRepository`].
#[derive(Debug, Clone, Default)]
pub struct MemoryVerifiedDriverRepository {
    rows: Store<VerifiedDriver>,
}

impl MemoryVerifiedDriverRepository {
    pub fn snapshot(&self, driver_id: DriverId) -> Option<VerifiedDriver> {
        self.rows.get(driver_id.as_uuid())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl VerifiedDriverRepository for MemoryVerifiedDriverRepository {
    async fn get(&self, driver_id: DriverId) -> Result<Option<VerifiedDriver>, StoreError> {
        Ok(self.rows.get(driver_id.as_uuid()))
    }

    async fn upsert_verified(
        &self,
        driver_id: DriverId,
        is_verified: bool,
    ) -> Result<VerifiedDriver, StoreError> {
        Ok(self.rows.upsert(
            *driver_id.as_uuid(),
            || VerifiedDriver {
                driver_id,
                is_verified: false,
                completed_at: None,
            },
            |row| {
                row.is_verified = is_verified;
                row.clone()
            },
        ))
    }

    async fn mark_completed(
        &self,
        driver_id: DriverId,
        at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome, StoreError> {
        let outcome = self
            .rows
            .update(driver_id.as_uuid(), |row| match row.completed_at {
                Some(existing) => FinalizeOutcome::AlreadyCompleted(existing),
                None => {
                    row.completed_at = Some(at);
                    FinalizeOutcome::Completed(at)
                }
            });
        Ok(outcome.unwrap_or(FinalizeOutcome::Missing))
    }
}

// -- Sessions -----------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    driver_id: DriverId,
    expires_at: DateTime<Utc>,
}

/// In-memory [`SessionStore`]. Tokens are held by digest, as in Postgres.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemorySessionStore {
    /// Register `token` for `driver_id`, valid for `ttl` from now. A
    /// negative `ttl` yields an already-expired session.
    pub fn issue(&self, token: &str, driver_id: DriverId, ttl: Duration) {
        self.sessions.write().insert(
            token_digest(token),
            SessionEntry {
                driver_id,
                expires_at: Utc::now() + ttl,
            },
        );
    }

    /// Make every lookup fail with [`StoreError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn lookup(&self, token: &str) -> Result<Option<DriverId>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("session store offline".into()));
        }
        let now = Utc::now();
        Ok(self
            .sessions
            .read()
            .get(&token_digest(token))
            .filter(|s| s.expires_at > now)
            .map(|s| s.driver_id))
    }
}

/// Handles to a full set of in-memory repositories.
#[derive(Debug, Clone, Default)]
pub struct MemoryStores {
    pub drivers: MemoryDriverRepository,
    pub verified: MemoryVerifiedDriverRepository,
    pub sessions: MemorySessionStore,
}
