//! Connection target describing one side of a comparison.
//!
//! A `ConnectionTarget` is built once, validated, and then only read. The
//! password is held inside [`Credentials`] and never rendered by `Display`
//! or `Debug`.

use crate::security::Credentials;

/// Port used when a target does not name one.
pub const DEFAULT_PORT: u16 = 5432;

/// One database endpoint handed to the comparison engine.
///
/// # Example
/// ```rust
/// use schemadiff_core::config::ConnectionTarget;
///
/// let target = ConnectionTarget::new("admin", "secret", "localhost", "app")
///     .with_port(5433)
///     .with_schema("public")
///     .with_encrypted_transport(true);
///
/// assert!(target.validate().is_ok());
/// assert_eq!(target.port(), 5433);
/// assert!(!target.to_string().contains("secret"));
/// ```
#[derive(Clone)]
pub struct ConnectionTarget {
    credentials: Credentials,
    host: String,
    port: Option<u16>,
    database: String,
    schema: Option<String>,
    use_encrypted_transport: bool,
}

impl ConnectionTarget {
    /// Creates a target with no schema restriction, the default port and
    /// unencrypted transport.
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Credentials::new(user.into(), password.into()),
            host: host.into(),
            port: None,
            database: database.into(),
            schema: None,
            use_encrypted_transport: false,
        }
    }

    /// Builder method to set port.
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to restrict the comparison to one schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Builder method to require TLS.
    pub const fn with_encrypted_transport(mut self, enabled: bool) -> Self {
        self.use_encrypted_transport = enabled;
        self
    }

    /// Builder method replacing the password, used when it arrives from a
    /// separate channel such as an environment variable or a prompt.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.credentials = Credentials::new(self.credentials.username().to_string(), password.into());
        self
    }

    /// Validates that the target can be handed to the engine.
    ///
    /// # Errors
    /// Returns a configuration error if user, host or database is empty, or
    /// the port is zero.
    pub fn validate(&self) -> crate::Result<()> {
        if self.credentials.username().is_empty() {
            return Err(crate::error::SchemaDiffError::configuration(
                "user cannot be empty",
            ));
        }

        if self.host.is_empty() {
            return Err(crate::error::SchemaDiffError::configuration(
                "host cannot be empty",
            ));
        }

        if self.database.is_empty() {
            return Err(crate::error::SchemaDiffError::configuration(
                "database cannot be empty",
            ));
        }

        if self.port == Some(0) {
            return Err(crate::error::SchemaDiffError::configuration(
                "port must be greater than 0",
            ));
        }

        if self.schema.as_deref().is_some_and(str::is_empty) {
            return Err(crate::error::SchemaDiffError::configuration(
                "schema cannot be empty when set",
            ));
        }

        Ok(())
    }

    /// Login user.
    pub fn user(&self) -> &str {
        self.credentials.username()
    }

    /// Credentials for this target.
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port with the default applied.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Schema restriction, if any.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Whether TLS is required.
    pub const fn use_encrypted_transport(&self) -> bool {
        self.use_encrypted_transport
    }

    /// libpq `sslmode` value matching the transport setting.
    pub const fn ssl_mode(&self) -> &'static str {
        if self.use_encrypted_transport {
            "require"
        } else {
            "disable"
        }
    }
}

impl std::fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port(), self.database)?;
        if let Some(schema) = &self.schema {
            write!(f, " (schema {schema})")?;
        }
        Ok(())
        // Intentionally omit user and password
    }
}

impl std::fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("credentials", &self.credentials)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("use_encrypted_transport", &self.use_encrypted_transport)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ConnectionTarget {
        ConnectionTarget::new("admin", "s3cret", "db.example.com", "inventory")
    }

    #[test]
    fn test_connection_target_defaults() {
        let target = target();
        assert_eq!(target.port(), DEFAULT_PORT);
        assert_eq!(target.schema(), None);
        assert!(!target.use_encrypted_transport());
        assert_eq!(target.ssl_mode(), "disable");
        assert!(target.validate().is_ok());
    }

    #[test]
    fn test_connection_target_builder() {
        let target = target()
            .with_port(6543)
            .with_schema("billing")
            .with_encrypted_transport(true);

        assert_eq!(target.port(), 6543);
        assert_eq!(target.schema(), Some("billing"));
        assert_eq!(target.ssl_mode(), "require");
    }

    #[test]
    fn test_connection_target_with_password_keeps_user() {
        let target = target().with_password("rotated");
        assert_eq!(target.user(), "admin");
        assert_eq!(target.credentials().expose_password(), "rotated");
    }

    #[test]
    fn test_connection_target_validation() {
        assert!(
            ConnectionTarget::new("", "p", "h", "d")
                .validate()
                .is_err()
        );
        assert!(
            ConnectionTarget::new("u", "p", "", "d")
                .validate()
                .is_err()
        );
        assert!(
            ConnectionTarget::new("u", "p", "h", "")
                .validate()
                .is_err()
        );
        assert!(target().with_port(0).validate().is_err());
        assert!(target().with_schema("").validate().is_err());

        // Empty password is allowed
        assert!(ConnectionTarget::new("u", "", "h", "d").validate().is_ok());
    }

    #[test]
    fn test_connection_target_display_no_credentials() {
        let display = target().with_schema("public").to_string();

        assert_eq!(display, "db.example.com:5432/inventory (schema public)");
        assert!(!display.contains("admin"));
        assert!(!display.contains("s3cret"));
    }

    #[test]
    fn test_connection_target_debug_no_password() {
        let debug = format!("{:?}", target());
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("db.example.com"));
    }
}
