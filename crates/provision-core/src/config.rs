//! Configuration for the provisioning tool.
//!
//! Values come from three layers: built-in defaults, an optional JSON configuration file, and
//! command-line flags or environment variables applied on top through the `with_*` builders.
//! [`ProvisionConfig::validated`] checks the merged result before anything touches the directory.

use crate::ids::DEFAULT_MIN_ID;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

/// Default location of the system-wide SSH known-hosts file.
pub const DEFAULT_KNOWN_HOSTS_PATH: &str = "/etc/ssh/ssh_known_hosts";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionConfig {
    /// Directory server URL (`ldap://` or `ldaps://`)
    #[validate(url)]
    pub url: String,

    /// Root of the directory tree (e.g. `dc=example,dc=org`)
    #[validate(length(min = 1))]
    pub base_dn: String,

    /// Administrator DN; defaults to `cn=admin,<base_dn>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_dn: Option<String>,

    /// Whether to verify TLS certificates
    pub tls_verify: bool,

    /// Optional path to custom CA certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Connection timeout in seconds
    #[validate(range(min = 1, max = 300))]
    pub connection_timeout_secs: u64,

    /// Per-operation timeout in seconds
    #[validate(range(min = 1, max = 300))]
    pub operation_timeout_secs: u64,

    /// Organizational units that hold each kind of entry
    #[validate(nested)]
    pub layout: LayoutConfig,

    /// Defaults applied to new POSIX accounts
    #[validate(nested)]
    pub accounts: AccountConfig,

    /// Where the generated known-hosts file is written
    pub known_hosts_path: PathBuf,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            base_dn: String::new(),
            admin_dn: None,
            tls_verify: true,
            tls_ca_cert: None,
            connection_timeout_secs: 10,
            operation_timeout_secs: 10,
            layout: LayoutConfig::default(),
            accounts: AccountConfig::default(),
            known_hosts_path: PathBuf::from(DEFAULT_KNOWN_HOSTS_PATH),
        }
    }
}

impl ProvisionConfig {
    /// Reads a JSON configuration file. Fields absent from the file keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            Error::ConfigError(format!("failed to read {}: {err}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            Error::ConfigError(format!("invalid configuration in {}: {err}", path.display()))
        })
    }

    /// Loads the file when given, otherwise starts from the defaults.
    ///
    /// # Errors
    ///
    /// See [`ProvisionConfig::from_file`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    /// Validates the merged configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] naming the offending fields.
    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;
        Ok(self)
    }

    /// Set the directory URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the base DN.
    #[must_use]
    pub fn with_base_dn(mut self, base_dn: impl Into<String>) -> Self {
        self.base_dn = base_dn.into();
        self
    }

    /// Set the administrator DN.
    #[must_use]
    pub fn with_admin_dn(mut self, admin_dn: impl Into<String>) -> Self {
        self.admin_dn = Some(admin_dn.into());
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set the known-hosts output path.
    #[must_use]
    pub fn with_known_hosts_path(mut self, path: PathBuf) -> Self {
        self.known_hosts_path = path;
        self
    }

    /// Administrator DN, falling back to `cn=admin,<base_dn>`.
    #[must_use]
    pub fn admin_dn(&self) -> String {
        self.admin_dn
            .clone()
            .unwrap_or_else(|| format!("cn=admin,{}", self.base_dn))
    }

    /// Get the connection timeout as a Duration.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Get the operation timeout as a Duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Organizational unit names below the base DN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// OU holding person entries
    #[validate(length(min = 1))]
    pub people_ou: String,

    /// OU holding per-user posix groups
    #[validate(length(min = 1))]
    pub group_ou: String,

    /// OU holding computer entries
    #[validate(length(min = 1))]
    pub computer_ou: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            people_ou: "People".to_string(),
            group_ou: "Group".to_string(),
            computer_ou: "computers".to_string(),
        }
    }
}

/// Values stamped onto every new POSIX account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct AccountConfig {
    /// Lowest uid/gid handed out
    #[validate(range(min = 1))]
    pub min_id: u32,

    /// `loginShell` attribute value
    #[validate(length(min = 1))]
    pub login_shell: String,

    /// Parent directory of home directories
    #[validate(length(min = 1))]
    pub home_base: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            min_id: DEFAULT_MIN_ID,
            login_shell: "/bin/bash".to_string(),
            home_base: "/home/nfs".to_string(),
        }
    }
}

impl AccountConfig {
    /// Home directory for the given login.
    #[must_use]
    pub fn home_directory(&self, login: &str) -> String {
        format!("{}/{login}", self.home_base.trim_end_matches('/'))
    }
}
