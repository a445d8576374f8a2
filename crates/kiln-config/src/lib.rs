//! # kiln-config
//!
//! Typed, defaulted configuration tree for the kiln build orchestrator.
//!
//! Everything in this crate is pure data: directory layout, per-target
//! enable flags, watch patterns, template and plugin declarations. The
//! builder, template engine and watchers all read from one [`KilnConfig`]
//! value resolved once at startup.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kiln_config::KilnConfig;
//!
//! let config = KilnConfig::load(".", None)?;
//! config.validate(".")?;
//! # Ok::<(), kiln_config::ConfigError>(())
//! ```

pub mod app;
pub mod build;
pub mod config;
pub mod dir;
pub mod error;
pub mod validation;

pub use app::{CustomTemplate, FrameworkOptions, PluginSpec};
pub use build::{BrowserOptions, BuildOptions, WeexOptions};
pub use config::KilnConfig;
pub use dir::{DirConfig, DistDirs};
pub use error::{ConfigError, Result};
