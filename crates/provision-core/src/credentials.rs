//! Directory bind credentials.
//!
//! Administrative operations (adding and deleting entries, reading every uid/gid in use) bind as
//! the directory administrator. Read-only lookups bind anonymously and need no credentials.

use secrecy::{ExposeSecret, SecretString};

/// Administrator DN and password used for simple binds.
#[derive(Debug)]
pub struct BindCredentials {
    bind_dn: String,
    password: SecretString,
}

impl BindCredentials {
    /// Create new bind credentials.
    ///
    /// # Arguments
    ///
    /// * `bind_dn` - The LDAP DN of the administrator account
    /// * `password` - The administrator password
    #[must_use]
    pub fn new(bind_dn: impl Into<String>, password: impl Into<String>) -> Self {
        let password: String = password.into();
        Self {
            bind_dn: bind_dn.into(),
            password: SecretString::from(password),
        }
    }

    /// Get the LDAP bind DN.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Get the LDAP bind password.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        self.password.expose_secret()
    }
}
