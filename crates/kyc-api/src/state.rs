//! # Application State
//!
//! [`AppState`] is cloned into every handler. It holds the injected
//! repositories, the optional verification provider, the identity resolver,
//! and the pipeline built over them. All per-driver state lives in the
//! repositories. Nothing here is mutated after startup.

use std::sync::Arc;

use kyc_core::phone::validate_country_code;
use kyc_provider_client::VerificationProvider;

use crate::auth::IdentityResolver;
use crate::middleware::metrics::ApiMetrics;
use crate::pipeline::KycPipeline;
use crate::store::Repositories;

/// Service configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Prefix applied to phone numbers submitted without a leading `+`.
    pub default_country_code: String,
    /// Whether onboarding endpoints accept a verified phone number in place
    /// of a session.
    pub phone_fallback_enabled: bool,
    /// Whether `/metrics` and the request metrics middleware are mounted.
    pub metrics_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            default_country_code: "+91".to_string(),
            phone_fallback_enabled: true,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 8080)
    /// - `DEFAULT_COUNTRY_CODE` (default: `+91`)
    /// - `PHONE_FALLBACK_ENABLED` (default: `true`)
    /// - `KYC_METRICS_ENABLED` (default: `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => defaults.port,
        };

        let default_country_code = match lookup("DEFAULT_COUNTRY_CODE") {
            Some(raw) => validate_country_code(&raw)
                .map_err(|_| ConfigError::InvalidCountryCode(raw.clone()))?
                .to_string(),
            None => defaults.default_country_code,
        };

        Ok(Self {
            port,
            default_country_code,
            phone_fallback_enabled: flag(&lookup, "PHONE_FALLBACK_ENABLED", defaults.phone_fallback_enabled)?,
            metrics_enabled: flag(&lookup, "KYC_METRICS_ENABLED", defaults.metrics_enabled)?,
        })
    }
}

fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { key, value: raw }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PORT must be a port number, got \"{0}\"")]
    InvalidPort(String),
    #[error("DEFAULT_COUNTRY_CODE must look like +<digits>, got \"{0}\"")]
    InvalidCountryCode(String),
    #[error("{key} must be true or false, got \"{value}\"")]
    InvalidFlag { key: &'static str, value: String },
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repos: Repositories,
    /// Verification provider; `None` when unconfigured, in which case
    /// provider-backed steps return 503.
    pub provider: Option<Arc<dyn VerificationProvider>>,
    /// Postgres pool, when `DATABASE_URL` is set. Used by the readiness probe.
    pub db_pool: Option<sqlx::PgPool>,
    pub metrics: ApiMetrics,
    pub resolver: IdentityResolver,
    pub pipeline: KycPipeline,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field(
                "provider",
                &self.provider.as_ref().map(|p| p.provider_name().to_string()),
            )
            .field("db_pool", &self.db_pool.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repos: Repositories,
        provider: Option<Arc<dyn VerificationProvider>>,
        db_pool: Option<sqlx::PgPool>,
        metrics: ApiMetrics,
    ) -> Self {
        let resolver = IdentityResolver::new(
            repos.sessions.clone(),
            repos.drivers.clone(),
            config.default_country_code.clone(),
            config.phone_fallback_enabled,
        );
        let pipeline = KycPipeline::new(
            repos.drivers.clone(),
            repos.verified.clone(),
            provider.clone(),
            metrics.clone(),
        );
        Self {
            config,
            repos,
            provider,
            db_pool,
            metrics,
            resolver,
            pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.default_country_code, "+91");
        assert!(config.phone_fallback_enabled);
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("DEFAULT_COUNTRY_CODE", " +1 "),
            ("PHONE_FALLBACK_ENABLED", "false"),
            ("KYC_METRICS_ENABLED", "0"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.default_country_code, "+1");
        assert!(!config.phone_fallback_enabled);
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("PORT", "eighty")])),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("DEFAULT_COUNTRY_CODE", "91")])),
            Err(ConfigError::InvalidCountryCode(_))
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("PHONE_FALLBACK_ENABLED", "maybe")])),
            Err(ConfigError::InvalidFlag { key: "PHONE_FALLBACK_ENABLED", .. })
        ));
    }

    #[test]
    fn state_exposes_provider_absence() {
        let state = AppState::new(
            AppConfig::default(),
            Repositories::in_memory(),
            None,
            None,
            ApiMetrics::try_new().unwrap(),
        );
        assert!(!state.pipeline.provider_configured());
        assert!(format!("{state:?}").contains("provider: None"));
    }
}
