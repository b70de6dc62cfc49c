//! # kyc-provider-client: Typed client for the KYC verification provider
//!
//! The onboarding pipeline never speaks HTTP to the verification provider
//! directly. It holds an `Arc<dyn VerificationProvider>` and this crate
//! supplies the two implementations:
//!
//! - [`HttpVerificationProvider`]: `reqwest` client against the live
//!   provider, configured from [`ProviderConfig`].
//! - [`MockVerificationProvider`]: in-process fake that records every call,
//!   used by tests and by local development without provider credentials.
//!
//! ## Operations
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/kyc/aadhaar/okyc/otp` | Issue an Aadhaar OTP challenge |
//! | POST | `/kyc/aadhaar/okyc/otp/verify` | Confirm an OTP by reference |
//! | POST | `/kyc/pan/verify` | Match PAN + name + date of birth |
//! | POST | `/kyc/pan/aadhaar/status` | PAN-Aadhaar link status |
//!
//! ## Trust Model
//!
//! Responses are untrusted. A body is only a success if it carries a `data`
//! member, whatever the HTTP status. Every call is bounded by the configured
//! timeout and none is retried here: the driver's client retries.

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use adapter::{MockVerificationProvider, ProviderCall, ProviderOperation, VerificationProvider};
pub use client::HttpVerificationProvider;
pub use config::ProviderConfig;
pub use error::ProviderError;
