//! Command-line arguments.

use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use provision_core::config::ProvisionConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ldap-provision", author, version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, value_name = "FILE", env = "LDAP_PROVISION_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory server URL, e.g. ldap://ldap.example.org
    #[arg(long, env = "LDAP_PROVISION_URL", global = true)]
    pub url: Option<String>,

    /// Root of the directory tree, e.g. dc=example,dc=org
    #[arg(long, value_name = "DN", env = "LDAP_PROVISION_BASE_DN", global = true)]
    pub base_dn: Option<String>,

    /// Administrator DN (defaults to cn=admin,<base dn>)
    #[arg(long, value_name = "DN", env = "LDAP_PROVISION_ADMIN_DN", global = true)]
    pub admin_dn: Option<String>,

    /// Read the administrator password from the first line of this file
    #[arg(long, value_name = "FILE", global = true)]
    pub password_file: Option<PathBuf>,

    /// Accept any TLS certificate
    #[arg(long, global = true)]
    pub no_tls_verify: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Insert or delete every person and computer of an inventory file
    Populate(PopulateArgs),
    /// Print a user's SSH public key
    UserKey {
        /// Login (uid) of the user
        login: String,
    },
    /// Regenerate the SSH known-hosts file from the computers in the directory
    KnownHosts {
        /// Output file (defaults to /etc/ssh/ssh_known_hosts)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("action").required(true).args(["insert", "delete"])))]
pub struct PopulateArgs {
    /// Inventory JSON file
    #[arg(value_name = "FILE")]
    pub inventory: PathBuf,

    /// Add every entry that does not exist yet
    #[arg(short, long)]
    pub insert: bool,

    /// Remove every entry that exists
    #[arg(short, long)]
    pub delete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Insert,
    Delete,
}

impl PopulateArgs {
    pub fn action(&self) -> Action {
        if self.delete {
            Action::Delete
        } else {
            Action::Insert
        }
    }
}

impl Cli {
    /// Merges defaults, the configuration file and command-line overrides.
    pub fn settings(&self) -> provision_core::Result<ProvisionConfig> {
        let mut settings = ProvisionConfig::load(self.config.as_deref())?;

        if let Some(url) = &self.url {
            settings = settings.with_url(url.clone());
        }
        if let Some(base_dn) = &self.base_dn {
            settings = settings.with_base_dn(base_dn.clone());
        }
        if let Some(admin_dn) = &self.admin_dn {
            settings = settings.with_admin_dn(admin_dn.clone());
        }
        if self.no_tls_verify {
            settings = settings.with_tls_verify(false);
        }
        if let Command::KnownHosts {
            output: Some(path),
        } = &self.command
        {
            settings = settings.with_known_hosts_path(path.clone());
        }

        settings.validated()
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
