//! # kiln-builder
//!
//! Orchestration core of the kiln build system.
//!
//! A [`Builder`] drives a full build from clean state to done: directory
//! setup, template materialization, per-target bundler invocation and hook
//! dispatch. In dev mode it also owns the file watchers that trigger
//! template regeneration or a full process restart.
//!
//! The concrete bundler backends stay external: they plug in through the
//! [`BundlerAdapter`] contract and are treated as black boxes that compile
//! one target and report back.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kiln_builder::{BuildContext, Builder};
//! use kiln_config::KilnConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = KilnConfig::load(".", None)?;
//! let ctx = Arc::new(BuildContext::new(config, "."));
//! let builder = Builder::new(ctx, Vec::new())?;
//! builder.build().await?;
//! builder.close().await?;
//! # Ok(()) }
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod hooks;
pub mod manifest;
pub mod plugin;
pub mod status;
pub mod target;
pub mod template;
pub mod watch;

pub use builder::Builder;
pub use context::BuildContext;
pub use error::{BuildError, Result, TemplateError};
pub use hooks::{BuildHook, HookBus, RestartRequest, TemplateActivity};
pub use manifest::{ClientManifest, ServerManifest};
pub use plugin::{normalize_plugins, resolve_plugins, PluginDescriptor};
pub use status::BuildStatus;
pub use target::{BundlerAdapter, Target, TargetSet};
pub use template::{
    ResolvedTemplate, TemplateEngine, TemplateManifest, TemplateOrigin, TemplatePlan,
};
pub use watch::{WatchDomain, WatchEvent, WatchEventKind, WatchMultiplexer};
