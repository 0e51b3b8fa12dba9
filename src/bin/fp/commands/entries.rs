//! `fp entries` command

use std::process::ExitCode;

use anyhow::Result;

use crate::cli::EntriesArgs;
use crate::commands::Session;
use footprints::ops;

pub fn execute(args: EntriesArgs, session: &Session) -> Result<ExitCode> {
    let registry = session.open(&args.catalog, &args.tag)?;
    let rows = ops::entries(&registry, &args.tag);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(ExitCode::SUCCESS);
    }

    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for row in &rows {
        let mut line = format!("{:width$}  {:8}", row.name, row.priority, width = width);
        if !row.mandatory.is_empty() {
            line.push_str(&format!("  mandatory: {}", row.mandatory.join(", ")));
        }
        if !row.optional.is_empty() {
            line.push_str(&format!("  optional: {}", row.optional.join(", ")));
        }
        if !row.reusable {
            line.push_str("  (not reusable)");
        }
        println!("{}", line);
        println!("{:width$}  {}", "", row.info, width = width);
    }
    Ok(ExitCode::SUCCESS)
}
