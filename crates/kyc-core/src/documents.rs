//! # Document Numbers
//!
//! Validated newtypes for the identifiers a driver submits during KYC.
//! Construction performs the normalization each step relies on, so a
//! verifier holding a [`PanNumber`] never has to re-trim or re-uppercase.
//!
//! | Type | Normalization | Rejects |
//! |------|---------------|---------|
//! | [`AadhaarNumber`] | strip spaces and dashes | anything but 12 digits |
//! | [`PanNumber`] | trim, uppercase | empty |
//! | [`LicenseNumber`] | trim, uppercase | empty |
//! | [`OtpCode`] | trim | empty |

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Indian Aadhaar number, stored as exactly 12 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AadhaarNumber(String);

impl AadhaarNumber {
    /// Validate and canonicalize an Aadhaar number.
    ///
    /// Accepts `"123412341234"`, `"1234 1234 1234"` and `"1234-1234-1234"`.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let compact: String = raw
            .trim()
            .chars()
            .filter(|c| *c != ' ' && *c != '-')
            .collect();
        if compact.is_empty() {
            return Err(ValidationError::Required { field: "aadhaarNo" });
        }
        if !compact.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidAadhaar { digits: 0 });
        }
        if compact.len() != 12 {
            return Err(ValidationError::InvalidAadhaar {
                digits: compact.len(),
            });
        }
        Ok(Self(compact))
    }

    /// The 12-digit canonical form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Permanent Account Number as submitted by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanNumber(String);

impl PanNumber {
    /// Trim and uppercase; reject empty input.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        upper_non_empty(raw, "pan").map(Self)
    }

    /// The normalized PAN.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Driving license number as submitted by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseNumber(String);

impl LicenseNumber {
    /// Trim and uppercase; reject empty input.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        upper_non_empty(raw, "drivingLicenseNo").map(Self)
    }

    /// The normalized license number.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One-time code typed by the driver in answer to an Aadhaar OTP challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Trim; reject empty input. The code's shape is left to the provider.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required { field: "otp" });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The trimmed code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OtpCode([REDACTED])")
    }
}

fn upper_non_empty(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    let value = raw.trim().to_uppercase();
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aadhaar_accepts_grouped_forms() {
        for raw in ["123412341234", "1234 1234 1234", " 1234-1234-1234 "] {
            assert_eq!(AadhaarNumber::new(raw).unwrap().as_str(), "123412341234");
        }
    }

    #[test]
    fn aadhaar_rejects_wrong_length() {
        assert_eq!(
            AadhaarNumber::new("12341234123"),
            Err(ValidationError::InvalidAadhaar { digits: 11 })
        );
        assert!(AadhaarNumber::new("1234123412345").is_err());
    }

    #[test]
    fn aadhaar_rejects_non_digits_and_empty() {
        assert!(AadhaarNumber::new("1234abcd1234").is_err());
        assert_eq!(
            AadhaarNumber::new(""),
            Err(ValidationError::Required { field: "aadhaarNo" })
        );
    }

    #[test]
    fn pan_is_trimmed_and_uppercased() {
        assert_eq!(PanNumber::new("  abcde1234f ").unwrap().as_str(), "ABCDE1234F");
    }

    #[test]
    fn pan_rejects_blank() {
        assert_eq!(
            PanNumber::new(" \t "),
            Err(ValidationError::Required { field: "pan" })
        );
    }

    #[test]
    fn license_is_trimmed_and_uppercased() {
        assert_eq!(
            LicenseNumber::new(" mh12 20110062821 ").unwrap().as_str(),
            "MH12 20110062821"
        );
        assert!(LicenseNumber::new("").is_err());
    }

    #[test]
    fn otp_is_trimmed_and_redacted_in_debug() {
        let otp = OtpCode::new(" 482913 ").unwrap();
        assert_eq!(otp.as_str(), "482913");
        assert!(!format!("{otp:?}").contains("482913"));
        assert!(OtpCode::new("   ").is_err());
    }
}
