//! LDAP side of the provisioning tool.
//!
//! This crate turns an inventory of people and computers into directory entry descriptors,
//! applies them through a pluggable LDAP session, and renders the SSH known-hosts file from the
//! host keys stored in the directory.

#![deny(missing_docs)]

mod client;
mod config;
mod dn;
mod entry;
mod host;
mod inventory;
mod known_hosts;
mod people;

pub use client::{DirectoryClient, LdapEntry, SearchScope, SyncReport};
pub use config::DirectoryConfig;
pub use dn::{DistinguishedName, DistinguishedNameError, RelativeDistinguishedName};
pub use entry::{EntryDescriptor, EntryDescriptorBuilder, EntryLookup};
pub use host::{computer_entry, KnownHost, COMPUTER_OBJECT_CLASSES};
pub use inventory::{attribute_for_field, Inventory, Record};
pub use known_hosts::{render_known_hosts, write_known_hosts};
pub use people::{group_entry, user_entry, GROUP_OBJECT_CLASSES, USER_OBJECT_CLASSES};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = provision_core::Result<T>;
