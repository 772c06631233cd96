//! Shared building blocks for the kiosk synchronization workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): error location capture and secret handling
//! - **models**: pure data (moments, beats, envelopes)
//! - **sync-core**: transport, protocol, navigation and sync hooks
//! - **kiosk**: process wiring for hub, display and docent roles

pub mod error;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_token::RedactedToken;

#[cfg(test)]
mod tests;
