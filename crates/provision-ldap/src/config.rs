//! Connection and layout settings for the directory client.

use crate::{dn::DistinguishedName, Result};
use provision_core::config::ProvisionConfig;
use provision_core::credentials::BindCredentials;
use provision_core::Error;
use std::path::PathBuf;
use std::time::Duration;

/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Configuration for connecting to the directory.
#[derive(Debug)]
pub struct DirectoryConfig {
    url: String,
    credentials: Option<BindCredentials>,
    base_dn: DistinguishedName,
    people_base_dn: DistinguishedName,
    group_base_dn: DistinguishedName,
    computer_base_dn: DistinguishedName,
    tls_verify: bool,
    tls_ca_cert: Option<PathBuf>,
    connection_timeout_secs: u64,
    operation_timeout_secs: u64,
}

impl DirectoryConfig {
    /// Creates a configuration with the default `ou=People`, `ou=Group` and `ou=computers`
    /// containers below `base_dn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provided URL is invalid.
    pub fn new(url: impl Into<String>, base_dn: DistinguishedName) -> Result<Self> {
        let url_string = url.into();
        url::Url::parse(&url_string)?;

        Ok(Self {
            url: url_string,
            credentials: None,
            people_base_dn: base_dn.child("ou", "People"),
            group_base_dn: base_dn.child("ou", "Group"),
            computer_base_dn: base_dn.child("ou", "computers"),
            base_dn,
            tls_verify: true,
            tls_ca_cert: None,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        })
    }

    /// Builds the client configuration from the merged tool configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or any configured DN is invalid.
    pub fn from_provision_config(
        config: &ProvisionConfig,
        credentials: Option<BindCredentials>,
    ) -> Result<Self> {
        let base_dn = config
            .base_dn
            .parse::<DistinguishedName>()
            .map_err(|err| Error::ConfigError(format!("invalid base DN: {err}")))?;
        let layout = &config.layout;

        let mut directory = Self::new(config.url.clone(), base_dn.clone())?
            .with_people_base_dn(base_dn.child("ou", &layout.people_ou))
            .with_group_base_dn(base_dn.child("ou", &layout.group_ou))
            .with_computer_base_dn(base_dn.child("ou", &layout.computer_ou))
            .with_tls_verification(config.tls_verify)
            .with_connection_timeout_secs(config.connection_timeout_secs)
            .with_operation_timeout_secs(config.operation_timeout_secs);
        if let Some(path) = &config.tls_ca_cert {
            directory = directory.with_tls_ca_cert(path.clone());
        }
        if let Some(credentials) = credentials {
            directory = directory.with_credentials(credentials);
        }
        Ok(directory)
    }

    /// Returns the directory URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the admin credentials, if any were supplied.
    #[must_use]
    pub const fn credentials(&self) -> Option<&BindCredentials> {
        self.credentials.as_ref()
    }

    /// Returns the base distinguished name.
    #[must_use]
    pub const fn base_dn(&self) -> &DistinguishedName {
        &self.base_dn
    }

    /// Container of person entries.
    #[must_use]
    pub const fn people_base_dn(&self) -> &DistinguishedName {
        &self.people_base_dn
    }

    /// Container of per-user posix groups.
    #[must_use]
    pub const fn group_base_dn(&self) -> &DistinguishedName {
        &self.group_base_dn
    }

    /// Container of computer entries.
    #[must_use]
    pub const fn computer_base_dn(&self) -> &DistinguishedName {
        &self.computer_base_dn
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the operation timeout duration.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Returns whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Optional custom CA certificate path.
    #[must_use]
    pub fn tls_ca_cert(&self) -> Option<&PathBuf> {
        self.tls_ca_cert.as_ref()
    }

    /// Sets the credentials used for administrative binds.
    #[must_use]
    pub fn with_credentials(mut self, credentials: BindCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Overrides the people container.
    #[must_use]
    pub fn with_people_base_dn(mut self, dn: DistinguishedName) -> Self {
        self.people_base_dn = dn;
        self
    }

    /// Overrides the group container.
    #[must_use]
    pub fn with_group_base_dn(mut self, dn: DistinguishedName) -> Self {
        self.group_base_dn = dn;
        self
    }

    /// Overrides the computer container.
    #[must_use]
    pub fn with_computer_base_dn(mut self, dn: DistinguishedName) -> Self {
        self.computer_base_dn = dn;
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets the custom CA certificate path for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}
