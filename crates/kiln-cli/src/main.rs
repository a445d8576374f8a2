//! kiln CLI entry point: argument parsing, logger initialization and
//! command dispatch.

use clap::Parser;
use console::style;

use kiln_cli::{cli, commands, logger};

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();
    logger::init_logger(args.verbose, args.quiet, args.no_color);

    let root = args.config.clone();
    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args, &root).await,
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args, &root).await,
    };

    if let Err(err) = result {
        if args.no_color {
            eprintln!("error: {err}");
        } else {
            eprintln!("{} {err}", style("error:").red().bold());
        }
        std::process::exit(err.exit_code());
    }
}
