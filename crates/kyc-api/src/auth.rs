//! # Identity Resolution
//!
//! Every request is resolved once to an [`Identity`], a tagged union of how
//! the driver was authenticated:
//!
//! ```text
//! Identity::Session(driver_id)                          bearer session
//! Identity::PhoneFallback { driver_id, phone_verified } verified phone, no session
//! ```
//!
//! ## Strict vs. fallback
//!
//! [`IdentityResolver::resolve_strict`] accepts only a live session.
//! [`IdentityResolver::resolve_or_phone_fallback`] additionally accepts a
//! phone number whose driver proved possession at registration. Fallback
//! exists so a driver whose session expired mid-onboarding can resume
//! without logging in again. It authenticates on a stored boolean with no
//! fresh proof, so it is only reachable through
//! [`OnboardingRequest`](crate::extractors::OnboardingRequest), which only
//! the verification-step and finalize handlers take.
//!
//! ## Session lookup is explicit
//!
//! [`IdentityResolver::lookup_session`] returns a [`SessionLookup`] rather
//! than an error for "no session". A session-store failure is a `StoreError`:
//! the strict path propagates it, the fallback path matches on it and moves
//! on to the phone number.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use kyc_core::{DriverId, PhoneNumber};
use zeroize::Zeroizing;

use crate::error::AppError;
use crate::pipeline::KycError;
use crate::state::AppState;
use crate::store::{DriverRepository, SessionStore, StoreError};

// -- Credentials --------------------------------------------------------------

/// What the request presented in its `Authorization` header.
#[derive(Clone, Default)]
pub enum Credentials {
    /// No `Authorization` header.
    #[default]
    Absent,
    /// A header that is not `Bearer <token>`.
    Malformed,
    /// A bearer token.
    Bearer(Zeroizing<String>),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => f.write_str("Credentials::Absent"),
            Self::Malformed => f.write_str("Credentials::Malformed"),
            Self::Bearer(_) => f.write_str("Credentials::Bearer([REDACTED])"),
        }
    }
}

impl Credentials {
    /// Parse an `Authorization` header value.
    pub fn from_header(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Absent;
        };
        let mut parts = value.trim().splitn(2, ' ');
        let scheme = parts.next().unwrap_or_default();
        let token = parts.next().map(str::trim).unwrap_or_default();
        if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
            Self::Bearer(Zeroizing::new(token.to_string()))
        } else {
            Self::Malformed
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Credentials {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION);
        Ok(match header.map(|v| v.to_str()) {
            None => Self::Absent,
            Some(Ok(value)) => Self::from_header(Some(value)),
            Some(Err(_)) => Self::Malformed,
        })
    }
}

// -- Identity -----------------------------------------------------------------

/// How the caller was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// A live session.
    Session(DriverId),
    /// No session; resolved from a phone number on a driver whose phone is
    /// verified.
    PhoneFallback {
        driver_id: DriverId,
        phone_verified: bool,
    },
}

impl Identity {
    pub fn driver_id(&self) -> DriverId {
        match self {
            Self::Session(id) => *id,
            Self::PhoneFallback { driver_id, .. } => *driver_id,
        }
    }

    pub fn via_fallback(&self) -> bool {
        matches!(self, Self::PhoneFallback { .. })
    }
}

/// Why no session resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoSession {
    /// Nothing was presented.
    Missing,
    /// A credential was presented but is malformed, unknown, or expired.
    Invalid,
}

/// Outcome of a session lookup that reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLookup {
    Active(DriverId),
    NoSession(NoSession),
}

/// Machine-readable reason attached to every 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    MissingSession,
    InvalidSession,
    /// No session and no phone number to fall back on. Clients should
    /// resend the request with `phoneNumber`.
    PhoneRequired,
    PhoneNotVerified,
    DriverNotFound,
}

impl UnauthenticatedReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingSession => "missing_session",
            Self::InvalidSession => "invalid_session",
            Self::PhoneRequired => "phone_required",
            Self::PhoneNotVerified => "phone_not_verified",
            Self::DriverNotFound => "driver_not_found",
        }
    }

    /// Client-facing message.
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingSession => "no session credential provided",
            Self::InvalidSession => "session is invalid or expired",
            Self::PhoneRequired => {
                "no valid session and no phone number provided; resend the request with phoneNumber"
            }
            Self::PhoneNotVerified => "phone number is not verified",
            Self::DriverNotFound => "no driver registered with this phone number",
        }
    }
}

impl From<NoSession> for UnauthenticatedReason {
    fn from(cause: NoSession) -> Self {
        match cause {
            NoSession::Missing => Self::MissingSession,
            NoSession::Invalid => Self::InvalidSession,
        }
    }
}

impl std::fmt::Display for UnauthenticatedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

// -- Resolver -----------------------------------------------------------------

/// Turns request credentials into an [`Identity`].
#[derive(Clone)]
pub struct IdentityResolver {
    sessions: Arc<dyn SessionStore>,
    drivers: Arc<dyn DriverRepository>,
    default_country_code: String,
    phone_fallback_enabled: bool,
}

impl IdentityResolver {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        drivers: Arc<dyn DriverRepository>,
        default_country_code: impl Into<String>,
        phone_fallback_enabled: bool,
    ) -> Self {
        Self {
            sessions,
            drivers,
            default_country_code: default_country_code.into(),
            phone_fallback_enabled,
        }
    }

    /// Look up the presented session without deciding what a miss means.
    pub async fn lookup_session(
        &self,
        credentials: &Credentials,
    ) -> Result<SessionLookup, StoreError> {
        match credentials {
            Credentials::Absent => Ok(SessionLookup::NoSession(NoSession::Missing)),
            Credentials::Malformed => Ok(SessionLookup::NoSession(NoSession::Invalid)),
            Credentials::Bearer(token) => Ok(match self.sessions.lookup(token).await? {
                Some(id) => SessionLookup::Active(id),
                None => SessionLookup::NoSession(NoSession::Invalid),
            }),
        }
    }

    /// Accept only a live session.
    pub async fn resolve_strict(&self, credentials: &Credentials) -> Result<DriverId, KycError> {
        match self.lookup_session(credentials).await? {
            SessionLookup::Active(id) => Ok(id),
            SessionLookup::NoSession(cause) => Err(KycError::Unauthenticated(cause.into())),
        }
    }

    /// Accept a live session, or else a verified phone number.
    ///
    /// A session that resolves wins even if `phone_number` names another
    /// driver. Any session-store failure is treated as "no session".
    pub async fn resolve_or_phone_fallback(
        &self,
        credentials: &Credentials,
        phone_number: Option<&str>,
    ) -> Result<Identity, KycError> {
        let cause = match self.lookup_session(credentials).await {
            Ok(SessionLookup::Active(id)) => return Ok(Identity::Session(id)),
            Ok(SessionLookup::NoSession(cause)) => cause,
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed, treating as no session");
                NoSession::Invalid
            }
        };

        if !self.phone_fallback_enabled {
            return Err(KycError::Unauthenticated(cause.into()));
        }

        let Some(raw) = phone_number.filter(|p| !p.trim().is_empty()) else {
            return Err(KycError::Unauthenticated(
                UnauthenticatedReason::PhoneRequired,
            ));
        };

        // A number that cannot be normalized cannot match any driver.
        let Ok(phone) = PhoneNumber::normalize(raw, &self.default_country_code) else {
            return Err(KycError::Unauthenticated(
                UnauthenticatedReason::DriverNotFound,
            ));
        };

        match self.drivers.find_by_phone(&phone).await? {
            None => Err(KycError::Unauthenticated(
                UnauthenticatedReason::DriverNotFound,
            )),
            Some(driver) if !driver.phone_number_verified => {
                tracing::info!(
                    driver_id = %driver.id,
                    reason = UnauthenticatedReason::PhoneNotVerified.as_str(),
                    "phone fallback refused"
                );
                Err(KycError::Unauthenticated(
                    UnauthenticatedReason::PhoneNotVerified,
                ))
            }
            Some(driver) => {
                tracing::warn!(
                    driver_id = %driver.id,
                    phone = %phone.masked(),
                    "authenticated via phone fallback"
                );
                Ok(Identity::PhoneFallback {
                    driver_id: driver.id,
                    phone_verified: true,
                })
            }
        }
    }
}

// -- Strict extractor ---------------------------------------------------------

/// Extractor for endpoints that require a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionIdentity(pub DriverId);

#[async_trait]
impl FromRequestParts<AppState> for SessionIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credentials = match Credentials::from_request_parts(parts, state).await {
            Ok(c) => c,
            Err(never) => match never {},
        };
        let id = state.resolver.resolve_strict(&credentials).await?;
        Ok(Self(id))
    }
}
