//! Error types for the orchestration core.

use std::path::PathBuf;

use thiserror::Error;

use crate::target::Target;

pub type Result<T> = std::result::Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(#[from] kiln_config::ConfigError),

    #[error("Filesystem error: {0}")]
    Fs(#[from] kiln_fs::FsError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("no `{}` directory found in {}\n\nHint: create it or configure a route generator", .pages.display(), .src.display())]
    MissingPagesDir { pages: PathBuf, src: PathBuf },

    #[error("plugin not found: {}", .0.display())]
    PluginNotFound(PathBuf),

    /// Compilation failed and the adapter already printed its diagnostics.
    #[error("Build error for target {}", .target.name())]
    TargetFailed { target: Target },

    /// Compilation failed in quiet mode; the serialized diagnostic is the
    /// only record of what went wrong.
    #[error("Build error for target {}: {diagnostic}", .target.name())]
    TargetDiagnostic { target: Target, diagnostic: String },

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("build cancelled")]
    Cancelled,

    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("app template not found at {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("invalid template manifest {}: {message}", .path.display())]
    InvalidManifest { path: PathBuf, message: String },

    #[error("app template declares no files")]
    NoFiles,

    #[error("template file missing: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("could not compile template {}: {source}", .path.display())]
    Compile {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },

    #[error("template engine error: {0}")]
    Engine(#[from] minijinja::Error),

    #[error("missing template dependencies:\n{}\n\nInstall them with:\n  yarn add {}\n  npm i {}", .fixes.join("\n"), .fixes.join(" "), .fixes.join(" "))]
    MissingDependencies { fixes: Vec<String> },

    #[error("filesystem error: {0}")]
    Fs(#[from] kiln_fs::FsError),
}
