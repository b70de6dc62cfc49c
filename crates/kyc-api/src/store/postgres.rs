//! Postgres repositories via SQLx.
//!
//! All functions take the shared `PgPool` and use runtime-checked queries,
//! so the crate builds without a live database. Schema lives in
//! `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use kyc_core::{AadhaarProfile, Driver, DriverId, PhoneNumber, VerifiedDriver};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{
    token_digest, DriverRepository, FinalizeOutcome, SessionStore, StoreError,
    VerifiedDriverRepository,
};

/// Initialize the connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory mode).
/// Returns `Err` if the URL is set but connecting or migrating fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set; running with in-memory repositories. \
                 Verification state will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

const DRIVER_COLUMNS: &str = "id, phone_number, phone_number_verified, \
     aadhar_no, is_aadhar_verified, aadhaar_otp_reference_id, aadhaar_otp_generated_at, \
     name, dob, pan_card_no, is_pan_card_verified, pan_card_file_key, \
     pan_aadhaar_link_status, pan_aadhaar_link_checked_at, \
     driver_license_no, is_driver_license_verified, driver_license_file_key, \
     is_vehicle_plate_verified, is_insurance_verified";

#[derive(sqlx::FromRow)]
struct DriverRow {
    id: Uuid,
    phone_number: String,
    phone_number_verified: bool,
    aadhar_no: Option<String>,
    is_aadhar_verified: bool,
    aadhaar_otp_reference_id: Option<String>,
    aadhaar_otp_generated_at: Option<DateTime<Utc>>,
    name: Option<String>,
    dob: Option<NaiveDate>,
    pan_card_no: Option<String>,
    is_pan_card_verified: bool,
    pan_card_file_key: Option<String>,
    pan_aadhaar_link_status: Option<String>,
    pan_aadhaar_link_checked_at: Option<DateTime<Utc>>,
    driver_license_no: Option<String>,
    is_driver_license_verified: bool,
    driver_license_file_key: Option<String>,
    is_vehicle_plate_verified: bool,
    is_insurance_verified: bool,
}

impl DriverRow {
    fn into_record(self) -> Driver {
        Driver {
            id: DriverId::from_uuid(self.id),
            phone_number: PhoneNumber::from_canonical(self.phone_number),
            phone_number_verified: self.phone_number_verified,
            aadhar_no: self.aadhar_no,
            is_aadhar_verified: self.is_aadhar_verified,
            aadhaar_otp_reference_id: self.aadhaar_otp_reference_id,
            aadhaar_otp_generated_at: self.aadhaar_otp_generated_at,
            name: self.name,
            dob: self.dob,
            pan_card_no: self.pan_card_no,
            is_pan_card_verified: self.is_pan_card_verified,
            pan_card_file_key: self.pan_card_file_key,
            pan_aadhaar_link_status: self.pan_aadhaar_link_status,
            pan_aadhaar_link_checked_at: self.pan_aadhaar_link_checked_at,
            driver_license_no: self.driver_license_no,
            is_driver_license_verified: self.is_driver_license_verified,
            driver_license_file_key: self.driver_license_file_key,
            is_vehicle_plate_verified: self.is_vehicle_plate_verified,
            is_insurance_verified: self.is_insurance_verified,
        }
    }
}

/// Postgres [`DriverRepository`].
#[derive(Debug, Clone)]
pub struct PgDriverRepository {
    pool: PgPool,
}

impl PgDriverRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `UPDATE drivers` with the given SET clause, keyed on `$1`, returning the row.
fn update_sql(set_clause: &str) -> String {
    format!("UPDATE drivers SET {set_clause} WHERE id = $1 RETURNING {DRIVER_COLUMNS}")
}

#[async_trait]
impl DriverRepository for PgDriverRepository {
    async fn get(&self, id: DriverId) -> Result<Option<Driver>, StoreError> {
        let sql = format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = $1");
        let row = sqlx::query_as::<_, DriverRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(DriverRow::into_record))
    }

    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Driver>, StoreError> {
        let sql = format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE phone_number = $1");
        let row = sqlx::query_as::<_, DriverRow>(&sql)
            .bind(phone.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(DriverRow::into_record))
    }

    async fn record_otp_challenge(
        &self,
        id: DriverId,
        aadhar_no: &str,
        reference_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Driver>, StoreError> {
        let sql = format!(
            "UPDATE drivers SET aadhar_no = $2, aadhaar_otp_reference_id = $3, \
             aadhaar_otp_generated_at = $4 \
             WHERE id = $1 AND is_aadhar_verified = FALSE RETURNING {DRIVER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DriverRow>(&sql)
            .bind(*id.as_uuid())
            .bind(aadhar_no)
            .bind(reference_id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(row.into_record())),
            // Either the driver is gone or it was verified concurrently.
            None => self.get(id).await,
        }
    }

    async fn apply_aadhaar_verification(
        &self,
        id: DriverId,
        profile: &AadhaarProfile,
    ) -> Result<Option<Driver>, StoreError> {
        let sql = update_sql(
            "is_aadhar_verified = TRUE, aadhaar_otp_reference_id = NULL, \
             aadhaar_otp_generated_at = NULL, \
             name = COALESCE($2, name), dob = COALESCE($3, dob)",
        );
        let row = sqlx::query_as::<_, DriverRow>(&sql)
            .bind(*id.as_uuid())
            .bind(profile.name.as_deref())
            .bind(profile.dob)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(DriverRow::into_record))
    }

    async fn apply_pan_verification(
        &self,
        id: DriverId,
        pan: &str,
    ) -> Result<Option<Driver>, StoreError> {
        let sql = update_sql("pan_card_no = $2, is_pan_card_verified = TRUE");
        let row = sqlx::query_as::<_, DriverRow>(&sql)
            .bind(*id.as_uuid())
            .bind(pan)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(DriverRow::into_record))
    }

    async fn apply_pan_aadhaar_link(
        &self,
        id: DriverId,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Driver>, StoreError> {
        let sql = update_sql("pan_aadhaar_link_status = $2, pan_aadhaar_link_checked_at = $3");
        let row = sqlx::query_as::<_, DriverRow>(&sql)
            .bind(*id.as_uuid())
            .bind(status)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(DriverRow::into_record))
    }

    async fn apply_license_confirmation(
        &self,
        id: DriverId,
        license_no: &str,
    ) -> Result<Option<Driver>, StoreError> {
        let sql = update_sql("driver_license_no = $2, is_driver_license_verified = TRUE");
        let row = sqlx::query_as::<_, DriverRow>(&sql)
            .bind(*id.as_uuid())
            .bind(license_no)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(DriverRow::into_record))
    }
}

#[derive(sqlx::FromRow)]
struct VerifiedDriverRow {
    driver_id: Uuid,
    is_verified: bool,
    completed_at: Option<DateTime<Utc>>,
}

impl VerifiedDriverRow {
    fn into_record(self) -> VerifiedDriver {
        VerifiedDriver {
            driver_id: DriverId::from_uuid(self.driver_id),
            is_verified: self.is_verified,
            completed_at: self.completed_at,
        }
    }
}

/// Postgres [`VerifiedDriverRepository`].
#[derive(Debug, Clone)]
pub struct PgVerifiedDriverRepository {
    pool: PgPool,
}

impl PgVerifiedDriverRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerifiedDriverRepository for PgVerifiedDriverRepository {
    async fn get(&self, driver_id: DriverId) -> Result<Option<VerifiedDriver>, StoreError> {
        let row = sqlx::query_as::<_, VerifiedDriverRow>(
            "SELECT driver_id, is_verified, completed_at FROM verified_drivers WHERE driver_id = $1",
        )
        .bind(*driver_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(VerifiedDriverRow::into_record))
    }

    async fn upsert_verified(
        &self,
        driver_id: DriverId,
        is_verified: bool,
    ) -> Result<VerifiedDriver, StoreError> {
        let row = sqlx::query_as::<_, VerifiedDriverRow>(
            "INSERT INTO verified_drivers (driver_id, is_verified) VALUES ($1, $2)
             ON CONFLICT (driver_id) DO UPDATE SET is_verified = EXCLUDED.is_verified
             RETURNING driver_id, is_verified, completed_at",
        )
        .bind(*driver_id.as_uuid())
        .bind(is_verified)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into_record())
    }

    async fn mark_completed(
        &self,
        driver_id: DriverId,
        at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome, StoreError> {
        let written: Option<(DateTime<Utc>,)> = sqlx::query_as(
            "UPDATE verified_drivers SET completed_at = $2
             WHERE driver_id = $1 AND completed_at IS NULL
             RETURNING completed_at",
        )
        .bind(*driver_id.as_uuid())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((completed_at,)) = written {
            return Ok(FinalizeOutcome::Completed(completed_at));
        }

        let existing: Option<(Option<DateTime<Utc>>,)> =
            sqlx::query_as("SELECT completed_at FROM verified_drivers WHERE driver_id = $1")
                .bind(*driver_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match existing {
            None => Ok(FinalizeOutcome::Missing),
            Some((Some(completed_at),)) => Ok(FinalizeOutcome::AlreadyCompleted(completed_at)),
            // The conditional update matched nothing, so the column cannot be null.
            Some((None,)) => Err(StoreError::Corrupt(format!(
                "verified_drivers row for {driver_id} rejected completion with null completed_at"
            ))),
        }
    }
}

/// Postgres [`SessionStore`]. Tokens are looked up by SHA-256 digest.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn lookup(&self, token: &str) -> Result<Option<DriverId>, StoreError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT driver_id FROM driver_sessions
             WHERE token_sha256 = $1 AND expires_at > now()",
        )
        .bind(token_digest(token))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id,)| DriverId::from_uuid(id)))
    }
}
