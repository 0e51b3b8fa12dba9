//! `fp resolve` command

use std::process::ExitCode;

use anyhow::{Context as _, Result};

use crate::cli::ResolveArgs;
use crate::commands::Session;
use footprints::collector::Record;
use footprints::core::description::{parse_pair, render};
use footprints::core::Description;
use footprints::ops::{self, ResolveRequest};
use footprints::resolver::AmbiguityPolicy;
use footprints::util::config::ReportMode;
use footprints::util::diagnostic::{emit, render_report, suggestions};

pub fn execute(args: ResolveArgs, session: &Session) -> Result<ExitCode> {
    let mut config = session.config.clone();
    if args.strict {
        config.resolve.ambiguity = Some(AmbiguityPolicy::Error);
    }
    let session = Session {
        config,
        color: session.color,
    };
    let registry = session.open(&args.catalog, &args.tag)?;

    let description = parse_pairs(&args.attributes)?;
    let context = parse_pairs(&args.context)?;
    let request = ResolveRequest::new(&args.tag)
        .with_description(description)
        .with_context(session.config.context())
        .with_context(context);

    let outcome = ops::resolve(&registry, &request);
    let report = &outcome.report;

    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(exit_code(outcome.failed));
    }

    let mode = session.config.report_mode();
    if mode == ReportMode::Always {
        print!("{}", render_report(report));
    }
    if let Some(warning) = report.ambiguity_diagnostic() {
        emit(&warning, session.color);
    }

    if outcome.failed {
        if mode != ReportMode::Never {
            if report.is_match() {
                eprintln!(
                    "error: ambiguous `{}` resolution is configured as an error",
                    report.tag
                );
            } else {
                emit(&report.to_diagnostic(), session.color);
                eprintln!("{}", suggestions::NO_MATCH);
            }
        }
        return Ok(ExitCode::FAILURE);
    }

    let object = ops::instantiate(&registry, &request)?;
    let attributes = match object.payload::<Record>() {
        Some(record) => record.attributes.clone(),
        None => object.attributes(),
    };
    println!("{} {}", object.implementation(), render(&attributes));
    Ok(ExitCode::SUCCESS)
}

fn parse_pairs(pairs: &[String]) -> Result<Description> {
    let mut desc = Description::new();
    for pair in pairs {
        let (name, value) = parse_pair(pair).with_context(|| format!("invalid argument `{}`", pair))?;
        desc.insert(name, value);
    }
    Ok(desc)
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
