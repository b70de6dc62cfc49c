//! # API Route Modules
//!
//! - `kyc`: the four step verifiers, Aadhaar OTP generation, and the
//!   status view.
//! - `onboarding`: the finalization gate.

pub mod kyc;
pub mod onboarding;
