//! CLI error type and exit-code mapping.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] kiln_config::ConfigError),

    #[error(transparent)]
    Build(#[from] kiln_builder::BuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this failure. Configuration problems get
    /// their own code so wrapper scripts can tell them from compile
    /// failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Build(_) => 1,
            CliError::Io(_) => 1,
        }
    }
}
