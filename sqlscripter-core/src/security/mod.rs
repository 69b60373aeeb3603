//! Security utilities for credential protection and secret-free exports.
//!
//! # Module Structure
//! - `credentials`: Secure credential container with automatic memory zeroing
//! - `redaction`: Replacement of generated login passwords in exported scripts

mod credentials;
mod redaction;

pub use credentials::Credentials;
pub use redaction::{CHANGEME_PASSWORD, redact_login_password, redact_login_script};
