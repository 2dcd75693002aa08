//! Stateless HMAC challenge-response authentication for protected file access.

pub mod verifier;

pub use verifier::{AuthVerifier, VerifyError, Verified, UNENCRYPTED_SENTINEL};
