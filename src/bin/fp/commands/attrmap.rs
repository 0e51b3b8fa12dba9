//! `fp attrmap` command

use std::process::ExitCode;

use anyhow::Result;

use crate::cli::AttrmapArgs;
use crate::commands::Session;

pub fn execute(args: AttrmapArgs, session: &Session) -> Result<ExitCode> {
    let registry = session.open(&args.catalog, &args.tag)?;
    let only = (!args.only.is_empty()).then_some(args.only.as_slice());
    let map = registry.collector(&args.tag).attribute_map(only);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else if map.is_empty() {
        println!("no matching attributes under `{}`", args.tag);
    } else {
        print!("{}", map);
    }
    Ok(ExitCode::SUCCESS)
}
