//! Vellum CLI entry point

use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;
use vellum::cli::check::{CheckOptions, run_check};
use vellum::cli::{Command, args::Cli};

fn init_logging() {
    let filter = EnvFilter::try_from_env("VELLUM_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Command::Check {
            paths,
            format,
            filter,
            min_level,
            verbose,
        } => run_check(&CheckOptions {
            paths: &paths,
            config: &cli.config,
            format,
            color: cli.color,
            filter: filter.as_deref(),
            min_level,
            verbose,
        }),
        Command::List { format, filter } => {
            vellum::cli::list::run_list(&cli.config, format, filter.as_deref())
        }
    };

    process::exit(exit_code);
}
