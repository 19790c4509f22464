//! `ldap-provision`: populate an LDAP directory from a JSON inventory, look up SSH keys and
//! regenerate the SSH known-hosts file.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use provision_core::error::EXIT_FAILURE;
use provision_core::Error;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let failed = err.use_stderr();
            // Help and version go to stdout with a zero exit.
            let _ = err.print();
            return if failed {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.log_filter());

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let failure = Failure::of(&err);
            if let Some(hint) = failure.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(failure.exit_code)
        }
    }
}

/// How a failed command is reported to the shell.
#[derive(Debug, PartialEq, Eq)]
struct Failure {
    exit_code: u8,
    hint: Option<&'static str>,
}

impl Failure {
    fn of(err: &anyhow::Error) -> Self {
        let Some(core) = err.downcast_ref::<Error>() else {
            return Self {
                exit_code: EXIT_FAILURE,
                hint: None,
            };
        };
        debug!(code = core.error_code(), "command failed");
        Self {
            exit_code: core.exit_code(),
            hint: core
                .is_directory_failure()
                .then_some("check --url and that the directory server is reachable"),
        }
    }
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use provision_core::error::EXIT_OUTPUT_FAILURE;

    #[test]
    fn directory_failure_gets_hint() {
        let err = anyhow::Error::new(Error::ExternalServiceError {
            service: "ldap".to_string(),
            message: "connection refused".to_string(),
        });
        let failure = Failure::of(&err);
        assert_eq!(failure.exit_code, EXIT_FAILURE);
        assert!(failure.hint.is_some());
    }

    #[test]
    fn output_failure_exits_two_through_context() {
        let err = Err::<(), _>(Error::OutputError("cannot write".to_string()))
            .context("writing known hosts")
            .unwrap_err();
        assert_eq!(
            Failure::of(&err),
            Failure {
                exit_code: EXIT_OUTPUT_FAILURE,
                hint: None
            }
        );
    }

    #[test]
    fn foreign_error_exits_one() {
        let failure = Failure::of(&anyhow::anyhow!("boom"));
        assert_eq!(failure.exit_code, EXIT_FAILURE);
        assert_eq!(failure.hint, None);
    }
}
