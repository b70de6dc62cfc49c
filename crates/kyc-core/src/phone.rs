//! # Phone Numbers
//!
//! Canonical international phone numbers. The driver store keys phone
//! lookups on this canonical form, so every inbound phone number must pass
//! through [`PhoneNumber::normalize`] before it is compared.
//!
//! Normalization strips common separators (spaces, dashes, dots,
//! parentheses). A number that already carries a leading `+` is kept as-is;
//! any other number gets the deployment's default country calling code
//! prepended.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minimum digit count (country code included) accepted as a phone number.
const MIN_DIGITS: usize = 7;

/// E.164 maximum digit count, country code included.
const MAX_DIGITS: usize = 15;

/// A phone number in canonical `+<country><subscriber>` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize a caller-supplied phone number.
    ///
    /// `default_country_code` must look like `+91`; it is applied only when
    /// `raw` has no leading `+`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::Required`] if `raw` is empty after stripping.
    /// - [`ValidationError::InvalidCountryCode`] if the default prefix is malformed.
    /// - [`ValidationError::InvalidPhone`] for non-digit content or an
    ///   out-of-range digit count.
    pub fn normalize(raw: &str, default_country_code: &str) -> Result<Self, ValidationError> {
        let compact: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect();
        if compact.is_empty() {
            return Err(ValidationError::Required {
                field: "phoneNumber",
            });
        }

        let canonical = match compact.strip_prefix('+') {
            Some(rest) => {
                if !is_digits(rest) {
                    return Err(ValidationError::InvalidPhone(raw.to_string()));
                }
                compact
            }
            None => {
                if !is_digits(&compact) {
                    return Err(ValidationError::InvalidPhone(raw.to_string()));
                }
                let prefix = validate_country_code(default_country_code)?;
                format!("{prefix}{compact}")
            }
        };

        let digits = canonical.len() - 1;
        if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
            return Err(ValidationError::InvalidPhone(raw.to_string()));
        }
        Ok(Self(canonical))
    }

    /// Wrap a value already stored in canonical form (e.g. read from the
    /// driver table). No validation is performed.
    pub fn from_canonical(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The canonical string, including the leading `+`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form safe for log output: country prefix and last four digits only.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 7 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..3].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}{}{tail}", "*".repeat(chars.len() - 7))
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Check a `+<1-3 digits>` country calling code and return it trimmed.
pub fn validate_country_code(code: &str) -> Result<&str, ValidationError> {
    let code = code.trim();
    match code.strip_prefix('+') {
        Some(digits) if is_digits(digits) && digits.len() <= 3 => Ok(code),
        _ => Err(ValidationError::InvalidCountryCode(code.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_default_prefix_without_plus() {
        let phone = PhoneNumber::normalize("98765 43210", "+91").unwrap();
        assert_eq!(phone.as_str(), "+919876543210");
    }

    #[test]
    fn keeps_explicit_international_prefix() {
        let phone = PhoneNumber::normalize("+44 20-7946-0958", "+91").unwrap();
        assert_eq!(phone.as_str(), "+442079460958");
    }

    #[test]
    fn strips_parentheses_and_dots() {
        let phone = PhoneNumber::normalize("(987) 654.3210", "+91").unwrap();
        assert_eq!(phone.as_str(), "+919876543210");
    }

    #[test]
    fn empty_is_required_error() {
        assert_eq!(
            PhoneNumber::normalize("   ", "+91"),
            Err(ValidationError::Required {
                field: "phoneNumber"
            })
        );
    }

    #[test]
    fn rejects_letters() {
        assert!(matches!(
            PhoneNumber::normalize("98765abc10", "+91"),
            Err(ValidationError::InvalidPhone(_))
        ));
        assert!(matches!(
            PhoneNumber::normalize("+91abc", "+91"),
            Err(ValidationError::InvalidPhone(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_lengths() {
        assert!(PhoneNumber::normalize("12", "+91").is_err());
        assert!(PhoneNumber::normalize("+1234567890123456", "+91").is_err());
    }

    #[test]
    fn rejects_bad_default_country_code() {
        assert!(matches!(
            PhoneNumber::normalize("9876543210", "91"),
            Err(ValidationError::InvalidCountryCode(_))
        ));
        assert!(matches!(
            PhoneNumber::normalize("9876543210", "+9123"),
            Err(ValidationError::InvalidCountryCode(_))
        ));
    }

    #[test]
    fn masked_hides_subscriber_digits() {
        let phone = PhoneNumber::from_canonical("+919876543210");
        assert_eq!(phone.masked(), "+91******3210");
        assert!(!phone.masked().contains("98765"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Normalizing an already-canonical number is a no-op.
            #[test]
            fn normalize_is_idempotent(local in "[0-9]{7,12}") {
                let once = PhoneNumber::normalize(&local, "+91").unwrap();
                let twice = PhoneNumber::normalize(once.as_str(), "+91").unwrap();
                prop_assert_eq!(once, twice);
            }

            /// Separators never change the canonical result.
            #[test]
            fn separators_are_ignored(local in "[0-9]{10}") {
                let spaced = format!("{} {}-{}", &local[..3], &local[3..6], &local[6..]);
                prop_assert_eq!(
                    PhoneNumber::normalize(&spaced, "+91").unwrap(),
                    PhoneNumber::normalize(&local, "+91").unwrap()
                );
            }
        }
    }
}
