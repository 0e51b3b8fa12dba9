//! `fp priorities` command

use std::process::ExitCode;

use anyhow::Result;

use crate::cli::PrioritiesArgs;
use crate::commands::Session;
use footprints::core::priority;

pub fn execute(args: PrioritiesArgs, session: &Session) -> Result<ExitCode> {
    session.config.apply_priorities();
    let levels = priority::top().levels().to_vec();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&levels)?);
    } else {
        for (rank, name) in levels.iter().enumerate() {
            println!("{} {}", rank, name);
        }
    }
    Ok(ExitCode::SUCCESS)
}
