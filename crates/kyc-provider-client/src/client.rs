//! # HTTP Verification Provider
//!
//! `reqwest` implementation of [`VerificationProvider`]. One shared client
//! carries the timeout and the credential headers; each operation is a JSON
//! POST whose `data` member is decoded into the operation's payload type.
//!
//! Provider responses are untrusted. The provider reports some failures
//! with a 2xx status and an error body, and some successes with odd status
//! codes, so the status is only logged. Presence of a non-null `data` member
//! is the single success criterion.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::adapter::{ProviderOperation, VerificationProvider};
use crate::config::{ConfigError, ProviderConfig};
use crate::error::ProviderError;
use crate::types::{
    AadhaarKycData, AadhaarOtpIssued, AadhaarOtpRequest, AadhaarOtpVerifyRequest,
    PanAadhaarLinkData, PanAadhaarLinkRequest, PanVerificationData, PanVerifyRequest,
};

/// Longest body excerpt kept in a [`ProviderError::MissingPayload`].
const BODY_EXCERPT_CHARS: usize = 256;

/// Live provider client.
#[derive(Debug, Clone)]
pub struct HttpVerificationProvider {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl HttpVerificationProvider {
    /// Build a client from configuration.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(config.api_key.as_str())
                .map_err(|_| ConfigError::InvalidHeader("x-api-key"))?,
        );
        if let Some(secret) = &config.api_secret {
            let mut value = HeaderValue::from_str(secret.as_str())
                .map_err(|_| ConfigError::InvalidHeader("Authorization"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|source| ProviderError::Http {
                endpoint: "client construction".to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// POST `body` for `operation` and decode the `data` member as `T`.
    async fn post<Req: Serialize + Sync, T: DeserializeOwned>(
        &self,
        operation: ProviderOperation,
        path: &str,
        body: &Req,
    ) -> Result<T, ProviderError> {
        let endpoint = operation.endpoint();
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;

        tracing::debug!(endpoint, status, "provider responded");

        let data = match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(serde_json::Value::Object(mut map)) => map.remove("data"),
            _ => None,
        }
        .filter(|d| !d.is_null());

        let Some(data) = data else {
            tracing::warn!(endpoint, status, "provider response carried no data payload");
            return Err(ProviderError::MissingPayload {
                endpoint: endpoint.to_string(),
                status,
                body: excerpt(&text),
            });
        };

        serde_json::from_value(data).map_err(|source| ProviderError::Deserialization {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    fn transport_error(&self, endpoint: &str, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            tracing::warn!(endpoint, timeout_secs = self.timeout_secs, "provider call timed out");
            ProviderError::Timeout {
                endpoint: endpoint.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            tracing::warn!(endpoint, error = %e, "provider call failed");
            ProviderError::Http {
                endpoint: endpoint.to_string(),
                source: e,
            }
        }
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[async_trait]
impl VerificationProvider for HttpVerificationProvider {
    async fn generate_aadhaar_otp(
        &self,
        aadhaar_number: &str,
    ) -> Result<AadhaarOtpIssued, ProviderError> {
        let req = AadhaarOtpRequest {
            aadhaar_number: aadhaar_number.to_string(),
        };
        self.post(
            ProviderOperation::GenerateAadhaarOtp,
            "/kyc/aadhaar/okyc/otp",
            &req,
        )
        .await
    }

    async fn verify_aadhaar_otp(
        &self,
        reference_id: &str,
        otp: &str,
    ) -> Result<AadhaarKycData, ProviderError> {
        let req = AadhaarOtpVerifyRequest {
            reference_id: reference_id.to_string(),
            otp: otp.to_string(),
        };
        self.post(
            ProviderOperation::VerifyAadhaarOtp,
            "/kyc/aadhaar/okyc/otp/verify",
            &req,
        )
        .await
    }

    async fn verify_pan(
        &self,
        request: &PanVerifyRequest,
    ) -> Result<PanVerificationData, ProviderError> {
        self.post(ProviderOperation::VerifyPan, "/kyc/pan/verify", request)
            .await
    }

    async fn pan_aadhaar_link_status(
        &self,
        pan: &str,
        aadhaar_number: &str,
    ) -> Result<PanAadhaarLinkData, ProviderError> {
        let req = PanAadhaarLinkRequest {
            pan: pan.to_string(),
            aadhaar_number: aadhaar_number.to_string(),
        };
        self.post(
            ProviderOperation::PanAadhaarLinkStatus,
            "/kyc/pan/aadhaar/status",
            &req,
        )
        .await
    }

    fn provider_name(&self) -> &str {
        "HttpVerificationProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(1000);
        let cut = excerpt(&long);
        assert_eq!(cut.len(), BODY_EXCERPT_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let body = "é".repeat(BODY_EXCERPT_CHARS + 10);
        let cut = excerpt(&body);
        assert_eq!(cut.chars().count(), BODY_EXCERPT_CHARS + 3);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let cfg = ProviderConfig::local_mock("http://127.0.0.1:9100/", "k").unwrap();
        let client = HttpVerificationProvider::new(cfg).unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:9100");
    }

    #[test]
    fn rejects_api_key_with_control_characters() {
        let cfg = ProviderConfig::local_mock("http://127.0.0.1:9100", "bad\nkey").unwrap();
        assert!(matches!(
            HttpVerificationProvider::new(cfg),
            Err(ProviderError::Config(ConfigError::InvalidHeader("x-api-key")))
        ));
    }
}
