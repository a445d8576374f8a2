//! # kiln-cli
//!
//! Process entry for the kiln build orchestrator: argument parsing,
//! logger setup, the `build` and `dev` commands, and the command-spawning
//! bundler adapter that delegates actual compilation to configured
//! external tools.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod process;

pub use error::CliError;
