//! Credential protection utilities.
//!
//! - `credentials`: secure credential container with automatic memory zeroing
//! - `connection`: connection URL parsing into connection targets
//!
//! # Security Guarantees
//! - Credentials are stored in `Zeroizing` containers
//! - Passwords never appear in `Debug`/`Display` output or error messages

mod connection;
mod credentials;

pub use connection::parse_connection_url;
pub use credentials::Credentials;
