//! Login credentials type.

use std::fmt;

/// Login credentials for password authentication.
///
/// The identity is a username or an email address; the backend decides
/// which fields of the auth collection it matches against.
///
/// The password is never exposed in Debug output.
///
/// # Example
///
/// ```
/// use filedeck_core::Credentials;
///
/// let creds = Credentials::new("alice", "correct horse");
/// assert_eq!(creds.identity(), "alice");
/// ```
#[derive(Clone)]
pub struct Credentials {
    identity: String,
    password: String,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(identity: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            password: password.into(),
        }
    }

    /// Returns the identity (username or email).
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the password.
    ///
    /// Only for building authentication requests; never log it.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_hides_password_in_debug() {
        let creds = Credentials::new("alice@example.com", "secret123");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice@example.com"));
        assert!(!debug.contains("secret123"));
        assert!(debug.contains("[REDACTED]"));
    }
}
