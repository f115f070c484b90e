//! Secure credential container with automatic memory zeroing.
//!
//! # Security
//! - Username and password are stored in `Zeroizing<String>` containers
//! - Memory is cleared when the credentials go out of scope
//! - The password never appears in `Debug` output

use zeroize::{Zeroize, Zeroizing};

/// Database login that zeroes its memory on drop.
///
/// # Example
///
/// ```rust
/// use schemadiff_core::security::Credentials;
///
/// let creds = Credentials::new("admin".to_string(), "secret".to_string());
/// assert_eq!(creds.username(), "admin");
/// assert!(creds.has_password());
/// assert!(!format!("{creds:?}").contains("secret"));
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    ///
    /// An empty password is allowed for servers using trust or peer
    /// authentication.
    pub fn new(username: String, password: String) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Gets the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Checks if a non-empty password is present without exposing it.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Exposes the password for handing to the comparison engine.
    ///
    /// # Security
    /// Callers must never log or format the returned value.
    pub fn expose_password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username.as_str())
            .field("password", &if self.has_password() { "****" } else { "" })
            .finish()
    }
}
