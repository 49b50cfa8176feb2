use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use prospect_core::SortKey;

/// Streams AI prospect analysis for a batch of records.
#[derive(Parser, Debug)]
#[command(name = "prospect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (RON). Defaults to ./prospect.ron when present.
    #[arg(short = 'c', long, env = "PROSPECT_CONFIG", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log destination: file, terminal or both
    #[arg(long, value_name = "DEST", global = true)]
    pub log: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an analysis job and follow its results
    Run(RunArgs),
    /// Show a saved result snapshot, or list saved snapshots
    History(HistoryArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON file with the job input (tableId, fieldList, dataItems, ...)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Endpoint prefix, e.g. https://host/api/data/
    #[arg(long, env = "PROSPECT_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Bearer token
    #[arg(long, env = "PROSPECT_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Whole-stream timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Where result snapshots are written
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not write a result snapshot
    #[arg(long)]
    pub no_save: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Snapshot file; lists saved snapshots when omitted
    pub file: Option<PathBuf>,

    /// Ordering: arrival, score, completeness, financing, employees, risk, founded
    #[arg(long, value_parser = parse_sort_key, default_value = "arrival")]
    pub sort: SortKey,

    /// Only show records whose name contains this text
    #[arg(long, default_value = "")]
    pub search: String,

    /// Directory to list snapshots from
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

pub fn parse_sort_key(name: &str) -> Result<SortKey, String> {
    SortKey::parse(name).ok_or_else(|| format!("unknown sort key `{name}`"))
}
