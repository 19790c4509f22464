//! # provision-core
//!
//! Core types shared by the LDAP provisioning crates.
//!
//! ## Modules
//!
//! - [`error`] - Error type and process exit code mapping
//! - [`config`] - File and environment driven configuration
//! - [`credentials`] - Bind credentials for the directory administrator
//! - [`ids`] - POSIX uid/gid allocation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod ids;

// Re-export commonly used types
pub use error::{Error, Result};
