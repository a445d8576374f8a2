//! Logging setup on the `tracing` ecosystem.
//!
//! `--verbose` raises kiln crates to debug, `--quiet` drops everything
//! but errors, and `RUST_LOG` overrides both defaults when neither flag
//! is set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. Call once, before any
/// logging happens.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("kiln_cli=debug,kiln_builder=debug,kiln_config=debug,kiln_fs=debug")
    } else if quiet {
        EnvFilter::new("kiln_cli=error,kiln_builder=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("kiln_cli=info,kiln_builder=info,kiln_config=info")
        })
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
