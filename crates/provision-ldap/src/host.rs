//! Computer entries and the host keys read back from them.

use serde::Serialize;
use tracing::warn;

use crate::client::LdapEntry;
use crate::config::DirectoryConfig;
use crate::entry::{EntryDescriptor, EntryLookup};
use crate::inventory::Record;
use crate::people::required;
use crate::Result;

/// Object classes of a provisioned computer.
pub const COMPUTER_OBJECT_CLASSES: &[&str] = &["top", "device", "ipHost", "ldapPublicKey"];

/// Builds the entry for one computer.
///
/// # Errors
///
/// Returns a validation error if `cn`, `ipHostNumber` or `sshPublicKey` is missing.
pub fn computer_entry(record: &Record, directory: &DirectoryConfig) -> Result<EntryDescriptor> {
    let hostname = required(record, "cn")?;
    required(record, "ipHostNumber")?;
    required(record, "sshPublicKey")?;

    let dn = directory.computer_base_dn().child("cn", hostname);
    Ok(EntryDescriptor::builder(dn, EntryLookup::new("device", "cn", hostname))
        .object_classes(COMPUTER_OBJECT_CLASSES)
        .attributes(record)
        .build())
}

/// One line of a known-hosts file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownHost {
    /// Host name (`cn`).
    pub hostname: String,
    /// Host address (`ipHostNumber`).
    pub address: String,
    /// Public key (`sshPublicKey`), e.g. `ssh-ed25519 AAAA...`.
    pub key: String,
}

impl KnownHost {
    /// Extracts the host from a directory entry, or `None` (with a warning) when an attribute
    /// is missing.
    #[must_use]
    pub fn from_entry(entry: &LdapEntry) -> Option<Self> {
        let field = |attribute: &str| {
            let value = entry.first(attribute).map(str::trim).filter(|v| !v.is_empty());
            if value.is_none() {
                warn!(dn = %entry.dn, attribute, "skipping host without attribute");
            }
            value.map(str::to_owned)
        };

        Some(Self {
            hostname: field("cn")?,
            address: field("ipHostNumber")?,
            key: field("sshPublicKey")?,
        })
    }

    /// Renders the known-hosts line (without trailing newline).
    #[must_use]
    pub fn line(&self) -> String {
        format!("{},{} {}", self.hostname, self.address, self.key)
    }
}
