//! Request and response shapes on the provider wire.
//!
//! Response payloads are deliberately loose: every field the pipeline reads
//! is optional, and unknown fields are kept in `extra` rather than rejected.
//! The provider adds fields without notice.

use serde::{Deserialize, Deserializer, Serialize};

/// `POST /kyc/aadhaar/okyc/otp` body.
#[derive(Debug, Clone, Serialize)]
pub struct AadhaarOtpRequest {
    pub aadhaar_number: String,
}

/// `data` member of a successful OTP-issue response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AadhaarOtpIssued {
    /// Opaque handle for the challenge. The provider sends it as either a
    /// number or a string; it is always held as a string.
    #[serde(deserialize_with = "string_or_number")]
    pub reference_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /kyc/aadhaar/okyc/otp/verify` body.
#[derive(Clone, Serialize)]
pub struct AadhaarOtpVerifyRequest {
    pub reference_id: String,
    pub otp: String,
}

impl std::fmt::Debug for AadhaarOtpVerifyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AadhaarOtpVerifyRequest")
            .field("reference_id", &self.reference_id)
            .field("otp", &"[REDACTED]")
            .finish()
    }
}

/// `data` member of a successful OTP confirmation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AadhaarKycData {
    #[serde(default)]
    pub name: Option<String>,
    /// `DD-MM-YYYY` when present.
    #[serde(default, alias = "dob")]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `POST /kyc/pan/verify` body.
#[derive(Debug, Clone, Serialize)]
pub struct PanVerifyRequest {
    pub pan: String,
    pub name_as_per_pan: String,
    /// `DD-MM-YYYY`.
    pub date_of_birth: String,
}

/// `data` member of a PAN verification response, kept whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanVerificationData(pub serde_json::Value);

/// `POST /kyc/pan/aadhaar/status` body.
#[derive(Debug, Clone, Serialize)]
pub struct PanAadhaarLinkRequest {
    pub pan: String,
    pub aadhaar_number: String,
}

/// `data` member of a PAN-Aadhaar link status response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanAadhaarLinkData {
    #[serde(default)]
    pub pan_status: Option<String>,
    #[serde(default)]
    pub aadhaar_seeding_status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PanAadhaarLinkData {
    /// First non-blank of `pan_status`, `aadhaar_seeding_status`, `message`,
    /// or `"unknown"`.
    pub fn status(&self) -> String {
        [&self.pan_status, &self.aadhaar_seeding_status, &self.message]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("unknown")
            .to_string()
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected non-empty string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_id_accepts_number_or_string() {
        let a: AadhaarOtpIssued = serde_json::from_str(r#"{"reference_id": 4481203}"#).unwrap();
        assert_eq!(a.reference_id, "4481203");
        let b: AadhaarOtpIssued = serde_json::from_str(r#"{"reference_id": "ab-12"}"#).unwrap();
        assert_eq!(b.reference_id, "ab-12");
    }

    #[test]
    fn reference_id_rejects_null_and_blank() {
        assert!(serde_json::from_str::<AadhaarOtpIssued>(r#"{"reference_id": null}"#).is_err());
        assert!(serde_json::from_str::<AadhaarOtpIssued>(r#"{"reference_id": "  "}"#).is_err());
        assert!(serde_json::from_str::<AadhaarOtpIssued>(r#"{}"#).is_err());
    }

    #[test]
    fn kyc_data_accepts_dob_alias_and_keeps_extras() {
        let data: AadhaarKycData = serde_json::from_str(
            r#"{"name": "Ravi Kumar", "dob": "02-11-1989", "gender": "M"}"#,
        )
        .unwrap();
        assert_eq!(data.name.as_deref(), Some("Ravi Kumar"));
        assert_eq!(data.date_of_birth.as_deref(), Some("02-11-1989"));
        assert_eq!(data.extra.get("gender"), Some(&serde_json::json!("M")));
    }

    #[test]
    fn link_status_prefers_pan_status() {
        let data = PanAadhaarLinkData {
            pan_status: Some("LINKED".into()),
            aadhaar_seeding_status: Some("Y".into()),
            message: Some("ok".into()),
            ..Default::default()
        };
        assert_eq!(data.status(), "LINKED");
    }

    #[test]
    fn link_status_falls_through_blank_fields() {
        let data = PanAadhaarLinkData {
            pan_status: Some("  ".into()),
            aadhaar_seeding_status: None,
            message: Some("Aadhaar is not linked with PAN".into()),
            ..Default::default()
        };
        assert_eq!(data.status(), "Aadhaar is not linked with PAN");
    }

    #[test]
    fn link_status_defaults_to_unknown() {
        assert_eq!(PanAadhaarLinkData::default().status(), "unknown");
    }

    #[test]
    fn otp_is_redacted_in_debug() {
        let req = AadhaarOtpVerifyRequest {
            reference_id: "r-1".into(),
            otp: "123456".into(),
        };
        assert!(!format!("{req:?}").contains("123456"));
    }
}
