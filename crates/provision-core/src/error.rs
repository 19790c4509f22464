//! Error types for provisioning operations.
//!
//! Every failure the tool can report is one variant of [`Error`]. Each variant carries a stable
//! code for log aggregation and maps onto the small set of process exit codes the binary uses.

use thiserror::Error;

/// Exit code for input, configuration and directory failures.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code when the output file cannot be written.
pub const EXIT_OUTPUT_FAILURE: u8 = 2;

/// Main error type for provisioning operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Input file missing, unreadable or malformed
    #[error("Input error: {0}")]
    InputError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Entry not found in the directory
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict error
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// External service error
    #[error("External service error: {service}: {message}")]
    ExternalServiceError {
        /// Service name that failed
        service: String,
        /// Error message
        message: String,
    },

    /// Output file could not be written
    #[error("Output error: {0}")]
    OutputError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Specialized result type for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InputError(_) => "INPUT_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Timeout(_) => "TIMEOUT",
            Self::ExternalServiceError { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::OutputError(_) => "OUTPUT_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the process exit code the binary reports for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::OutputError(_) => EXIT_OUTPUT_FAILURE,
            _ => EXIT_FAILURE,
        }
    }

    /// Returns true if the failure came from talking to the directory server.
    #[must_use]
    pub const fn is_directory_failure(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ExternalServiceError { .. })
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid directory URL: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InputError(format!("malformed JSON: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::InputError(err.to_string())
    }
}
