//! Command-line interface definition, clap v4 derive.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// kiln - multi-target application build orchestrator
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Multi-target application build orchestrator",
    long_about = "kiln compiles a single source tree into browser, server-render and\n\
                  weex bundle targets: it materializes the generated entry sources,\n\
                  drives the configured bundler commands per target and, in dev mode,\n\
                  watches the project for template regeneration and restarts."
)]
pub struct Cli {
    /// Project root containing kiln.config.toml or kiln.config.json
    #[arg(short = 'c', long = "config", global = true, value_name = "DIR", default_value = ".")]
    pub config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a production build of every enabled target
    Build(BuildArgs),

    /// Start a development build with watchers and automatic restarts
    Dev(DevArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Ask the bundler backends for bundle-analysis reports
    #[arg(long)]
    pub analyze: bool,

    /// Suppress bundler diagnostics; failures carry the serialized error
    #[arg(long = "quiet-build")]
    pub quiet_build: bool,
}

#[derive(Args, Debug)]
pub struct DevArgs {
    /// Port the external dev listener should bind, exposed to the
    /// generated sources as KILN_DEV_PORT
    #[arg(short, long, default_value_t = 3000)]
    pub port: u16,
}
