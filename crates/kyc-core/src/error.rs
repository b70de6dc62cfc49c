//! # Validation Errors
//!
//! Structured input-validation failures, built with `thiserror`. Every
//! variant maps to a 422 at the API boundary.

use thiserror::Error;

/// Input failed a domain-primitive validation rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was missing or empty after normalization.
    #[error("{field} is required")]
    Required {
        /// Client-facing field name.
        field: &'static str,
    },

    /// Aadhaar number is not 12 digits.
    #[error("invalid Aadhaar number: expected 12 digits, got {digits}")]
    InvalidAadhaar {
        /// Number of digits found after stripping separators.
        digits: usize,
    },

    /// Phone number could not be normalized to international format.
    #[error("invalid phone number: \"{0}\"")]
    InvalidPhone(String),

    /// Country calling code is not of the form `+<1-3 digits>`.
    #[error("invalid country code: \"{0}\" (expected +<digits>)")]
    InvalidCountryCode(String),
}
