//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("source directory not found: {}\n\nHint: check `dir.src` or run kiln from the project root", .0.display())]
    SrcDirNotFound(PathBuf),

    #[error("unsupported configuration format: {0}\n\nHint: kiln reads kiln.config.toml or kiln.config.json")]
    UnsupportedFormat(String),

    #[error("invalid config value for '{field}': {hint}")]
    InvalidValue { field: String, hint: String },

    #[error("no build target enabled\n\nHint: enable at least one of `build.browser` or `build.weex`")]
    NoTargets,

    #[error("supported extension list is empty")]
    NoExtensions,
}
