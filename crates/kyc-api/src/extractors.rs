//! # Custom Extractors
//!
//! [`OnboardingRequest`] is the only way a handler can reach the phone
//! fallback. It reads the bearer credential, parses the JSON body (an empty
//! body counts as `{}`), and resolves identity with the body's
//! `phoneNumber` as the fallback.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Request};
use serde::de::DeserializeOwned;

use crate::auth::{Credentials, Identity};
use crate::error::AppError;
use crate::state::AppState;

/// Request bodies that may carry a fallback phone number.
pub trait CarriesPhone {
    fn phone_number(&self) -> Option<&str>;
}

/// Parse a JSON body, treating an empty or whitespace-only body as `{}`.
///
/// Malformed JSON is [`AppError::BadRequest`]. Missing fields are left to
/// the body type's serde defaults and to domain validation.
pub fn parse_optional_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    let bytes = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        bytes
    };
    serde_json::from_slice(bytes).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
}

/// An onboarding request: resolved identity plus the parsed body.
#[derive(Debug)]
pub struct OnboardingRequest<T> {
    pub identity: Identity,
    pub body: T,
}

#[async_trait]
impl<T> FromRequest<AppState> for OnboardingRequest<T>
where
    T: DeserializeOwned + CarriesPhone + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let credentials = match Credentials::from_request_parts(&mut parts, state).await {
            Ok(c) => c,
            Err(never) => match never {},
        };

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let body: T = parse_optional_json(&bytes)?;

        let identity = state
            .resolver
            .resolve_or_phone_fallback(&credentials, body.phone_number())
            .await?;
        Ok(Self { identity, body })
    }
}
