#![deny(missing_docs)]

//! # kyc-core: Foundational Types for Driver Identity Verification
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It performs no I/O: no HTTP, no database, no clock reads outside of
//! what callers pass in. External dependencies are limited to `serde`,
//! `thiserror`, `chrono`, and `uuid`.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** A [`DriverId`] cannot be
//!    passed where a raw UUID is expected, and an [`AadhaarNumber`] is only
//!    constructible from 12 digits.
//!
//! 2. **One aggregate rule.** [`VerificationFlags::all_verified`] is the sole
//!    definition of "fully verified". Nothing else ANDs flags together.
//!
//! 3. **Prerequisites are data.** Step ordering (Aadhaar before PAN, upload
//!    before verification) lives in [`prerequisites`] as a static graph that
//!    can be checked against a [`Driver`] without touching the provider.

pub mod dob;
pub mod documents;
pub mod driver;
pub mod error;
pub mod ids;
pub mod phone;
pub mod prerequisites;

pub use documents::{AadhaarNumber, LicenseNumber, OtpCode, PanNumber};
pub use driver::{AadhaarProfile, Driver, VerificationFlags, VerifiedDriver};
pub use error::ValidationError;
pub use ids::DriverId;
pub use phone::PhoneNumber;
pub use prerequisites::{Requirement, Step, UnmetPrerequisite};
