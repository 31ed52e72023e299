//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        CliError::Application(e.into())
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => crate::exitcode::USAGE,
            CliError::Application(e) => match e {
                ApplicationError::InvalidObjectRef { .. } => crate::exitcode::USAGE,
                ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                ApplicationError::Domain(d) => match d {
                    DomainError::InvalidSyntheticDescription { .. } => crate::exitcode::DATAERR,
                    DomainError::InvalidCpuSet { .. }
                    | DomainError::IndexOutOfRange { .. }
                    | DomainError::CapacityExceeded { .. } => crate::exitcode::USAGE,
                    DomainError::TopologyInconsistency { .. }
                    | DomainError::CrossTopologyQuery
                    | DomainError::NotLoaded => crate::exitcode::SOFTWARE,
                },
            },
        }
    }
}
