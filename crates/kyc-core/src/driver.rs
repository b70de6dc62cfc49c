//! # Driver Records and the Verification Aggregate
//!
//! [`Driver`] is the platform's mutable row for one driver. Registration
//! creates it elsewhere; this workspace only reads it and, for the
//! verification fields, writes it through the step verifiers.
//!
//! [`VerifiedDriver`] is the derived aggregate: one row per driver holding
//! the AND of the six [`VerificationFlags`] and the one-shot completion
//! instant stamped at finalization.
//!
//! ## Monotonicity
//!
//! No method here turns a verified flag from `true` to `false`. The
//! mutation helpers only ever set flags.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::DriverId;
use crate::phone::PhoneNumber;

/// A driver as stored on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    /// Platform identifier.
    pub id: DriverId,
    /// Canonical phone number (see [`PhoneNumber::normalize`]).
    pub phone_number: PhoneNumber,
    /// Whether phone possession was proven at registration.
    pub phone_number_verified: bool,

    /// Aadhaar number submitted when the OTP challenge was requested.
    pub aadhar_no: Option<String>,
    /// Aadhaar OTP confirmed by the provider.
    pub is_aadhar_verified: bool,
    /// Provider handle for the outstanding OTP challenge, if any.
    pub aadhaar_otp_reference_id: Option<String>,
    /// When the outstanding challenge was issued.
    pub aadhaar_otp_generated_at: Option<DateTime<Utc>>,
    /// Name as returned by the Aadhaar provider.
    pub name: Option<String>,
    /// Date of birth as returned by the Aadhaar provider.
    pub dob: Option<NaiveDate>,

    /// PAN recorded on successful verification.
    pub pan_card_no: Option<String>,
    /// PAN details matched by the provider.
    pub is_pan_card_verified: bool,
    /// Storage key of the uploaded PAN card image.
    pub pan_card_file_key: Option<String>,

    /// Last PAN-Aadhaar link status reported by the provider. Informational.
    pub pan_aadhaar_link_status: Option<String>,
    /// When the link status was last fetched.
    pub pan_aadhaar_link_checked_at: Option<DateTime<Utc>>,

    /// License number recorded on confirmation.
    pub driver_license_no: Option<String>,
    /// License confirmed.
    pub is_driver_license_verified: bool,
    /// Storage key of the uploaded license image.
    pub driver_license_file_key: Option<String>,

    /// Vehicle plate verified by the fleet-management flow.
    pub is_vehicle_plate_verified: bool,
    /// Insurance verified by the fleet-management flow.
    pub is_insurance_verified: bool,
}

impl Driver {
    /// A freshly registered driver with every verification field empty.
    pub fn registered(id: DriverId, phone_number: PhoneNumber, phone_number_verified: bool) -> Self {
        Self {
            id,
            phone_number,
            phone_number_verified,
            aadhar_no: None,
            is_aadhar_verified: false,
            aadhaar_otp_reference_id: None,
            aadhaar_otp_generated_at: None,
            name: None,
            dob: None,
            pan_card_no: None,
            is_pan_card_verified: false,
            pan_card_file_key: None,
            pan_aadhaar_link_status: None,
            pan_aadhaar_link_checked_at: None,
            driver_license_no: None,
            is_driver_license_verified: false,
            driver_license_file_key: None,
            is_vehicle_plate_verified: false,
            is_insurance_verified: false,
        }
    }

    /// The six flags that feed the aggregate.
    pub fn flags(&self) -> VerificationFlags {
        VerificationFlags {
            phone_number_verified: self.phone_number_verified,
            is_aadhar_verified: self.is_aadhar_verified,
            is_pan_card_verified: self.is_pan_card_verified,
            is_driver_license_verified: self.is_driver_license_verified,
            is_vehicle_plate_verified: self.is_vehicle_plate_verified,
            is_insurance_verified: self.is_insurance_verified,
        }
    }

    /// Whether an Aadhaar OTP challenge is outstanding.
    pub fn has_outstanding_otp(&self) -> bool {
        self.aadhaar_otp_reference_id.is_some()
    }

    /// Record a newly issued OTP challenge. Returns `false`, changing
    /// nothing, if Aadhaar is already verified.
    ///
    /// Replaces any outstanding reference; a regenerated OTP supersedes the
    /// previous one at the provider as well.
    pub fn record_otp_challenge(
        &mut self,
        aadhar_no: &str,
        reference_id: String,
        at: DateTime<Utc>,
    ) -> bool {
        if self.is_aadhar_verified {
            return false;
        }
        self.aadhar_no = Some(aadhar_no.to_string());
        self.aadhaar_otp_reference_id = Some(reference_id);
        self.aadhaar_otp_generated_at = Some(at);
        true
    }

    /// Mark Aadhaar verified and close the OTP challenge.
    ///
    /// The reference and its timestamp are cleared in the same mutation that
    /// sets the flag. Profile fields are only backfilled when present.
    pub fn apply_aadhaar_verification(&mut self, profile: &AadhaarProfile) {
        self.is_aadhar_verified = true;
        self.aadhaar_otp_reference_id = None;
        self.aadhaar_otp_generated_at = None;
        if let Some(name) = &profile.name {
            self.name = Some(name.clone());
        }
        if let Some(dob) = profile.dob {
            self.dob = Some(dob);
        }
    }

    /// Record a matched PAN.
    pub fn apply_pan_verification(&mut self, pan: &str) {
        self.pan_card_no = Some(pan.to_string());
        self.is_pan_card_verified = true;
    }

    /// Record a PAN-Aadhaar link status. Never touches a verified flag.
    pub fn apply_pan_aadhaar_link(&mut self, status: &str, at: DateTime<Utc>) {
        self.pan_aadhaar_link_status = Some(status.to_string());
        self.pan_aadhaar_link_checked_at = Some(at);
    }

    /// Record a confirmed driving license.
    pub fn apply_license_confirmation(&mut self, license_no: &str) {
        self.driver_license_no = Some(license_no.to_string());
        self.is_driver_license_verified = true;
    }
}

/// Identity details the Aadhaar provider may return on OTP confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AadhaarProfile {
    /// Full name on the Aadhaar record.
    pub name: Option<String>,
    /// Parsed date of birth; `None` when absent or unparseable.
    pub dob: Option<NaiveDate>,
}

/// The six independent outcomes that make up "fully verified".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationFlags {
    /// Phone possession proven.
    pub phone_number_verified: bool,
    /// Aadhaar OTP confirmed.
    pub is_aadhar_verified: bool,
    /// PAN details matched.
    pub is_pan_card_verified: bool,
    /// Driving license confirmed.
    pub is_driver_license_verified: bool,
    /// Vehicle plate verified.
    pub is_vehicle_plate_verified: bool,
    /// Insurance verified.
    pub is_insurance_verified: bool,
}

impl VerificationFlags {
    /// The aggregate rule: every flag must hold.
    pub fn all_verified(&self) -> bool {
        self.phone_number_verified
            && self.is_aadhar_verified
            && self.is_pan_card_verified
            && self.is_driver_license_verified
            && self.is_vehicle_plate_verified
            && self.is_insurance_verified
    }

    /// Client-facing names of the flags still false, in a stable order.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (self.phone_number_verified, "phoneNumberVerified"),
            (self.is_aadhar_verified, "isAadharVerified"),
            (self.is_pan_card_verified, "isPanCardVerified"),
            (self.is_driver_license_verified, "isDriverLicenseVerified"),
            (self.is_vehicle_plate_verified, "isVehiclePlateVerified"),
            (self.is_insurance_verified, "isInsuranceVerified"),
        ]
        .into_iter()
        .filter(|(set, _)| !set)
        .map(|(_, name)| name)
        .collect()
    }
}

/// Derived per-driver aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedDriver {
    /// Driver this aggregate belongs to (unique).
    pub driver_id: DriverId,
    /// AND of the six flags as of the last recompute.
    pub is_verified: bool,
    /// Set once by finalization, never overwritten.
    pub completed_at: Option<DateTime<Utc>>,
}
