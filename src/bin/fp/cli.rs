//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// fp - pick the best implementation for a description
#[derive(Parser)]
#[command(name = "fp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Read configuration from this file instead of the default locations
    #[arg(long, global = true, env = "FOOTPRINTS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a description against the candidates of a tag
    Resolve(ResolveArgs),

    /// List the candidates registered under a tag
    Entries(EntriesArgs),

    /// Show which candidates declare which attributes
    Attrmap(AttrmapArgs),

    /// Show the priority levels, lowest first
    Priorities(PrioritiesArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Catalog file declaring the candidates
    pub catalog: PathBuf,

    /// Capability tag to resolve
    #[arg(short, long)]
    pub tag: String,

    /// Description attributes as name=value
    pub attributes: Vec<String>,

    /// Ambient context values for `only` rules, as name=value
    #[arg(short, long = "context", value_name = "NAME=VALUE")]
    pub context: Vec<String>,

    /// Treat an ambiguous resolution as a failure
    #[arg(long)]
    pub strict: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct EntriesArgs {
    /// Catalog file declaring the candidates
    pub catalog: PathBuf,

    /// Capability tag to list
    #[arg(short, long)]
    pub tag: String,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct AttrmapArgs {
    /// Catalog file declaring the candidates
    pub catalog: PathBuf,

    /// Capability tag to inspect
    #[arg(short, long)]
    pub tag: String,

    /// Restrict to these attribute names
    #[arg(long)]
    pub only: Vec<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct PrioritiesArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
