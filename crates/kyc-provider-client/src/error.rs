//! Verification provider error types.

/// Errors from verification provider calls.
///
/// Every variant is a provider failure from the pipeline's point of view and
/// surfaces to drivers as a retryable 502. The variants exist so logs say
/// which kind of failure it was.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport failure (connection refused, TLS, reset).
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The request did not complete within the configured timeout.
    #[error("provider {endpoint} timed out after {timeout_secs}s")]
    Timeout { endpoint: String, timeout_secs: u64 },
    /// The response carried no `data` member.
    #[error("provider {endpoint} returned {status} without a data payload: {body}")]
    MissingPayload {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// A `data` member was present but did not match the expected shape.
    #[error("failed to deserialize data from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: serde_json::Error,
    },
    /// Client construction failed.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl ProviderError {
    /// Endpoint label the error refers to, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Http { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::MissingPayload { endpoint, .. }
            | Self::Deserialization { endpoint, .. } => Some(endpoint),
            Self::Config(_) => None,
        }
    }
}
