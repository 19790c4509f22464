use anyhow::{Context, Result};
use provision_core::config::ProvisionConfig;
use provision_core::credentials::BindCredentials;
use provision_core::ids::IdPool;
use provision_core::Error;
use provision_ldap::{write_known_hosts, DirectoryClient, DirectoryConfig, Inventory};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::cli::{Action, Cli, Command, PopulateArgs};

const PASSWORD_ENV: &str = "LDAP_PROVISION_PASSWORD";
const PASSWORD_PROMPT: &str = "LDAP administrator password: ";

pub async fn run(cli: Cli) -> Result<()> {
    let settings = cli.settings()?;
    debug!(url = %settings.url, base_dn = %settings.base_dn, "resolved settings");

    match &cli.command {
        Command::Populate(args) => populate(&cli, &settings, args).await,
        Command::UserKey { login } => user_key(&settings, login).await,
        Command::KnownHosts { .. } => known_hosts(&settings).await,
    }
}

async fn populate(cli: &Cli, settings: &ProvisionConfig, args: &PopulateArgs) -> Result<()> {
    let inventory = Inventory::from_path(&args.inventory)
        .with_context(|| format!("loading inventory {}", args.inventory.display()))?;
    let directory = DirectoryConfig::from_provision_config(settings, None)?;

    // Reject a broken inventory before asking for a password.
    inventory.entries(&directory, &settings.accounts, &mut IdPool::new())?;
    if inventory.is_empty() {
        info!("inventory is empty, nothing to do");
        return Ok(());
    }

    let password = admin_password(cli.password_file.as_deref())?;
    let credentials = BindCredentials::new(settings.admin_dn(), password);
    let client = DirectoryClient::new(directory.with_credentials(credentials));

    let mut pool = client.load_id_pool().await?;
    let entries = inventory.entries(client.config(), &settings.accounts, &mut pool)?;

    let report = match args.action() {
        Action::Insert => client.insert_all(&entries).await?,
        Action::Delete => client.delete_all(&entries).await?,
    };
    println!("{report}");
    Ok(())
}

async fn user_key(settings: &ProvisionConfig, login: &str) -> Result<()> {
    let client = DirectoryClient::new(DirectoryConfig::from_provision_config(settings, None)?);
    let key = client.fetch_public_key(login).await?;
    println!("{key}");
    Ok(())
}

async fn known_hosts(settings: &ProvisionConfig) -> Result<()> {
    let client = DirectoryClient::new(DirectoryConfig::from_provision_config(settings, None)?);
    let hosts = client.known_hosts().await?;
    write_known_hosts(&settings.known_hosts_path, &hosts)?;
    println!(
        "{} hosts written to {}",
        hosts.len(),
        settings.known_hosts_path.display()
    );
    Ok(())
}

/// Where the administrator password comes from, in order of preference.
#[derive(Debug, PartialEq, Eq)]
enum PasswordSource<'a> {
    Environment(String),
    File(&'a Path),
    /// Interactive prompt without echo.
    Terminal,
    /// One line of piped stdin.
    Piped,
}

impl<'a> PasswordSource<'a> {
    fn select(env: Option<String>, file: Option<&'a Path>, stdin_is_terminal: bool) -> Self {
        match (env, file) {
            (Some(password), _) => Self::Environment(password),
            (None, Some(path)) => Self::File(path),
            (None, None) if stdin_is_terminal => Self::Terminal,
            (None, None) => Self::Piped,
        }
    }
}

fn admin_password(password_file: Option<&Path>) -> provision_core::Result<String> {
    let source = PasswordSource::select(
        std::env::var(PASSWORD_ENV).ok(),
        password_file,
        io::stdin().is_terminal(),
    );
    match source {
        PasswordSource::Environment(password) => non_empty(password),
        PasswordSource::File(path) => read_password_file(path),
        PasswordSource::Terminal => non_empty(rpassword::prompt_password(PASSWORD_PROMPT)?),
        PasswordSource::Piped => read_piped_password(&mut io::stdin().lock(), &mut io::stderr()),
    }
}

fn read_password_file(path: &Path) -> provision_core::Result<String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| Error::InputError(format!("cannot read {}: {err}", path.display())))?;
    non_empty(raw.lines().next().unwrap_or_default().to_string())
}

fn read_piped_password<R: BufRead, W: Write>(
    input: &mut R,
    prompt: &mut W,
) -> provision_core::Result<String> {
    write!(prompt, "{PASSWORD_PROMPT}")?;
    prompt.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    non_empty(line.trim_end_matches(['\r', '\n']).to_string())
}

fn non_empty(password: String) -> provision_core::Result<String> {
    if password.is_empty() {
        return Err(Error::InputError("empty administrator password".to_string()));
    }
    Ok(password)
}
