//! fp CLI - declarative capability resolution

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Session;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("footprints=debug")
    } else {
        EnvFilter::new("footprints=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let session = Session::new(cli.config.as_deref(), !cli.no_color);

    match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args, &session),
        Commands::Entries(args) => commands::entries::execute(args, &session),
        Commands::Attrmap(args) => commands::attrmap::execute(args, &session),
        Commands::Priorities(args) => commands::priorities::execute(args, &session),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
