//! Known-hosts file rendering.

use provision_core::Error;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::host::KnownHost;
use crate::Result;

/// Renders one `<hostname>,<address> <key>` line per host, in order.
#[must_use]
pub fn render_known_hosts(hosts: &[KnownHost]) -> String {
    hosts.iter().fold(String::new(), |mut out, host| {
        out.push_str(&host.line());
        out.push('\n');
        out
    })
}

/// Replaces the file at `path` with the rendered hosts.
///
/// # Errors
///
/// Returns [`Error::OutputError`] naming the path when it cannot be written.
pub fn write_known_hosts(path: &Path, hosts: &[KnownHost]) -> Result<()> {
    fs::write(path, render_known_hosts(hosts)).map_err(|err| {
        Error::OutputError(format!(
            "cannot write {}: {err}; check permissions",
            path.display()
        ))
    })?;
    info!(path = %path.display(), hosts = hosts.len(), "wrote known hosts");
    Ok(())
}
