//! Verification provider client configuration.
//!
//! Defaults point to the provider's production host. Override via
//! environment variables or explicit construction for staging and tests.

use url::Url;
use zeroize::Zeroizing;

/// Configuration for connecting to the verification provider.
///
/// Custom `Debug` implementation redacts credentials.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Provider base URL. Default: <https://api.sandbox.co.in>
    pub base_url: Url,
    /// API key sent as `x-api-key` on every request.
    pub api_key: Zeroizing<String>,
    /// Access token sent as `Authorization`, when the account requires one.
    pub api_secret: Option<Zeroizing<String>>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &self.api_secret.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `KYC_PROVIDER_URL` (default: `https://api.sandbox.co.in`)
    /// - `KYC_PROVIDER_API_KEY` (required)
    /// - `KYC_PROVIDER_API_SECRET` (optional)
    /// - `KYC_PROVIDER_TIMEOUT_SECS` (default: 15)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("KYC_PROVIDER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            base_url: env_url("KYC_PROVIDER_URL", "https://api.sandbox.co.in")?,
            api_key: Zeroizing::new(api_key),
            api_secret: std::env::var("KYC_PROVIDER_API_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(Zeroizing::new),
            timeout_secs: std::env::var("KYC_PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(15),
        })
    }

    /// Configuration pointing at a local mock server (for tests).
    pub fn local_mock(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?,
            api_key: Zeroizing::new(api_key.to_string()),
            api_secret: None,
            timeout_secs: 2,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("KYC_PROVIDER_API_KEY environment variable is required")]
    MissingApiKey,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("credential for {0} header contains invalid characters")]
    InvalidHeader(&'static str),
}
