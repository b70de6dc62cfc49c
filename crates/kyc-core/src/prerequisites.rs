//! # Step Prerequisite Graph
//!
//! The verification steps must happen in an order: an OTP challenge before
//! its confirmation, a document upload before the document is verified, and
//! Aadhaar before PAN (PAN matching needs the date of birth the Aadhaar
//! provider returns). That ordering is modelled here as a static graph so
//! it can be checked, and tested, without any provider in the loop.
//!
//! ```text
//! GenerateAadhaarOtp  -> AadhaarOtpOutstanding, AadhaarNumberOnRecord
//! VerifyAadhaarOtp    -> DateOfBirthKnown
//! VerifyPan           -> PanNumberOnRecord
//! document upload     -> PanDocumentOnFile, LicenseDocumentOnFile
//!
//! VerifyAadhaarOtp      needs AadhaarOtpOutstanding
//! VerifyPan             needs PanDocumentOnFile, DateOfBirthKnown
//! CheckPanAadhaarLink   needs PanNumberOnRecord, AadhaarNumberOnRecord
//! ConfirmDrivingLicense needs LicenseDocumentOnFile
//! ```
//!
//! Each [`Step`] lists its [`Requirement`]s in the order they are checked;
//! the first unmet one is reported.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::Driver;

/// A verification step a driver can attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Request an Aadhaar OTP challenge.
    GenerateAadhaarOtp,
    /// Confirm the Aadhaar OTP.
    VerifyAadhaarOtp,
    /// Match PAN details.
    VerifyPan,
    /// Fetch the PAN-Aadhaar link status.
    CheckPanAadhaarLink,
    /// Confirm the driving license.
    ConfirmDrivingLicense,
}

impl Step {
    /// Every step, in onboarding order.
    pub const ALL: [Step; 5] = [
        Step::GenerateAadhaarOtp,
        Step::VerifyAadhaarOtp,
        Step::VerifyPan,
        Step::CheckPanAadhaarLink,
        Step::ConfirmDrivingLicense,
    ];

    /// Requirements that must hold before this step may run, in check order.
    pub fn prerequisites(self) -> &'static [Requirement] {
        match self {
            Step::GenerateAadhaarOtp => &[],
            Step::VerifyAadhaarOtp => &[Requirement::AadhaarOtpOutstanding],
            Step::VerifyPan => &[
                Requirement::PanDocumentOnFile,
                Requirement::DateOfBirthKnown,
            ],
            Step::CheckPanAadhaarLink => &[
                Requirement::PanNumberOnRecord,
                Requirement::AadhaarNumberOnRecord,
            ],
            Step::ConfirmDrivingLicense => &[Requirement::LicenseDocumentOnFile],
        }
    }

    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Step::GenerateAadhaarOtp => "aadhaar_otp_generate",
            Step::VerifyAadhaarOtp => "aadhaar_otp_verify",
            Step::VerifyPan => "pan_verify",
            Step::CheckPanAadhaarLink => "pan_aadhaar_link",
            Step::ConfirmDrivingLicense => "driving_license",
        }
    }

    /// Check this step's prerequisites against `driver`.
    ///
    /// # Errors
    ///
    /// Returns the first unmet requirement.
    pub fn check(self, driver: &Driver) -> Result<(), UnmetPrerequisite> {
        match self
            .prerequisites()
            .iter()
            .find(|req| !req.is_satisfied(driver))
        {
            Some(&requirement) => Err(UnmetPrerequisite {
                step: self,
                requirement,
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fact about the driver record that some step depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// An OTP reference is stored.
    AadhaarOtpOutstanding,
    /// A PAN card image has been uploaded.
    PanDocumentOnFile,
    /// The date of birth is known from Aadhaar.
    DateOfBirthKnown,
    /// A PAN number is stored.
    PanNumberOnRecord,
    /// An Aadhaar number is stored.
    AadhaarNumberOnRecord,
    /// A license image has been uploaded.
    LicenseDocumentOnFile,
}

impl Requirement {
    /// Whether `driver` currently satisfies this requirement.
    pub fn is_satisfied(self, driver: &Driver) -> bool {
        match self {
            Requirement::AadhaarOtpOutstanding => driver.aadhaar_otp_reference_id.is_some(),
            Requirement::PanDocumentOnFile => present(&driver.pan_card_file_key),
            Requirement::DateOfBirthKnown => driver.dob.is_some(),
            Requirement::PanNumberOnRecord => present(&driver.pan_card_no),
            Requirement::AadhaarNumberOnRecord => present(&driver.aadhar_no),
            Requirement::LicenseDocumentOnFile => present(&driver.driver_license_file_key),
        }
    }

    /// The step that establishes this requirement, or `None` when it comes
    /// from outside the pipeline (document upload).
    pub fn produced_by(self) -> Option<Step> {
        match self {
            Requirement::AadhaarOtpOutstanding | Requirement::AadhaarNumberOnRecord => {
                Some(Step::GenerateAadhaarOtp)
            }
            Requirement::DateOfBirthKnown => Some(Step::VerifyAadhaarOtp),
            Requirement::PanNumberOnRecord => Some(Step::VerifyPan),
            Requirement::PanDocumentOnFile | Requirement::LicenseDocumentOnFile => None,
        }
    }

    /// Client-facing instruction for satisfying this requirement.
    pub fn message(self) -> &'static str {
        match self {
            Requirement::AadhaarOtpOutstanding => "generate OTP first",
            Requirement::PanDocumentOnFile => "upload PAN first",
            Requirement::DateOfBirthKnown => "verify Aadhaar first",
            Requirement::PanNumberOnRecord => "PAN number not on record; verify PAN first",
            Requirement::AadhaarNumberOnRecord => {
                "Aadhaar number not on record; generate Aadhaar OTP first"
            }
            Requirement::LicenseDocumentOnFile => "upload driving license first",
        }
    }
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// A step was attempted before one of its requirements held.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{}", .requirement.message())]
pub struct UnmetPrerequisite {
    /// Step that was attempted.
    pub step: Step,
    /// First requirement found unmet.
    pub requirement: Requirement,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DriverId;
    use crate::phone::PhoneNumber;
    use chrono::{NaiveDate, Utc};
    use std::collections::HashSet;

    fn driver() -> Driver {
        Driver::registered(
            DriverId::new(),
            PhoneNumber::from_canonical("+919876543210"),
            true,
        )
    }

    #[test]
    fn otp_generation_has_no_prerequisites() {
        assert!(Step::GenerateAadhaarOtp.check(&driver()).is_ok());
    }

    #[test]
    fn otp_verify_requires_outstanding_challenge() {
        let mut d = driver();
        let err = Step::VerifyAadhaarOtp.check(&d).unwrap_err();
        assert_eq!(err.requirement, Requirement::AadhaarOtpOutstanding);
        assert_eq!(err.to_string(), "generate OTP first");

        d.record_otp_challenge("123412341234", "ref".into(), Utc::now());
        assert!(Step::VerifyAadhaarOtp.check(&d).is_ok());
    }

    #[test]
    fn pan_checks_document_before_date_of_birth() {
        let mut d = driver();
        let err = Step::VerifyPan.check(&d).unwrap_err();
        assert_eq!(err.requirement, Requirement::PanDocumentOnFile);
        assert_eq!(err.to_string(), "upload PAN first");

        d.pan_card_file_key = Some("drivers/pan/abc.jpg".into());
        let err = Step::VerifyPan.check(&d).unwrap_err();
        assert_eq!(err.requirement, Requirement::DateOfBirthKnown);
        assert_eq!(err.to_string(), "verify Aadhaar first");

        d.dob = NaiveDate::from_ymd_opt(1990, 1, 1);
        assert!(Step::VerifyPan.check(&d).is_ok());
    }

    #[test]
    fn blank_document_key_does_not_count_as_uploaded() {
        let mut d = driver();
        d.driver_license_file_key = Some("   ".into());
        assert_eq!(
            Step::ConfirmDrivingLicense.check(&d).unwrap_err().requirement,
            Requirement::LicenseDocumentOnFile
        );
    }

    #[test]
    fn link_check_reports_pan_before_aadhaar() {
        let mut d = driver();
        assert_eq!(
            Step::CheckPanAadhaarLink.check(&d).unwrap_err().requirement,
            Requirement::PanNumberOnRecord
        );
        d.pan_card_no = Some("ABCDE1234F".into());
        assert_eq!(
            Step::CheckPanAadhaarLink.check(&d).unwrap_err().requirement,
            Requirement::AadhaarNumberOnRecord
        );
        d.aadhar_no = Some("123412341234".into());
        assert!(Step::CheckPanAadhaarLink.check(&d).is_ok());
    }

    /// Following `produced_by` edges from any step never returns to it.
    #[test]
    fn graph_is_acyclic() {
        fn visit(step: Step, path: &mut Vec<Step>) {
            assert!(!path.contains(&step), "cycle through {step}: {path:?}");
            path.push(step);
            for req in step.prerequisites() {
                if let Some(producer) = req.produced_by() {
                    visit(producer, path);
                }
            }
            path.pop();
        }
        for step in Step::ALL {
            visit(step, &mut Vec::new());
        }
    }

    #[test]
    fn requirement_messages_are_distinct() {
        let all = [
            Requirement::AadhaarOtpOutstanding,
            Requirement::PanDocumentOnFile,
            Requirement::DateOfBirthKnown,
            Requirement::PanNumberOnRecord,
            Requirement::AadhaarNumberOnRecord,
            Requirement::LicenseDocumentOnFile,
        ];
        let messages: HashSet<_> = all.iter().map(|r| r.message()).collect();
        assert_eq!(messages.len(), all.len());
    }
}
