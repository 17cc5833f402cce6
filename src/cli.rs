//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use libcat_core::{Classifier, ConfigOverrides};

/// Rows shown by `libcat db` when no selection flag is given.
pub const DEFAULT_RECENT_ROWS: u32 = 10;

/// Resolve classification data for books from library catalogs.
///
/// Pass an ISBN to look up one book, or a `.txt` file with one ISBN per line.
#[derive(Parser, Debug)]
#[command(name = "libcat")]
#[command(author, version, about)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// ISBN, or path to a .txt file of ISBNs
    pub input: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Ledger database path
    #[arg(long, value_name = "PATH", global = true)]
    pub db: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Catalogs to search, in order (comma-separated short-codes)
    #[arg(long, value_delimiter = ',', value_name = "CODES")]
    pub catalogs: Option<Vec<String>>,

    /// Seconds to wait between retries and before each alternate ISBN
    #[arg(long, value_name = "SECS")]
    pub wait: Option<u64>,

    /// Retries per catalog request after the first attempt (0-10)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Accepted MARC language codes (comma-separated, e.g. eng,fre)
    #[arg(long, value_delimiter = ',', value_name = "CODES")]
    pub languages: Option<Vec<String>>,

    /// Classifiers to resolve (comma-separated: record,lcc,ddc,lcsh,isbn)
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub classifiers: Option<Vec<Classifier>>,

    /// Search alternate editions when catalogs come up short
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    pub alt_isbns: Option<bool>,

    /// Maximum alternate ISBNs to try
    #[arg(long, value_name = "N")]
    pub max_alts: Option<usize>,
}

impl Args {
    /// Collects the per-run configuration overrides.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            catalogs: self.catalogs.clone(),
            wait: self.wait,
            retries: self.retries,
            timeout: self.timeout,
            languages: self.languages.clone(),
            classifiers: self.classifiers.clone(),
            alt_isbns: self.alt_isbns,
            max_alts: self.max_alts,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show or export recorded jobs
    Db(DbArgs),
}

/// Ledger view selection; at most one flag applies.
#[derive(clap::Args, Debug, Default)]
#[group(multiple = false)]
pub struct DbArgs {
    /// Show the N most recent jobs (default 10)
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "10")]
    pub recent: Option<u32>,

    /// Show every job
    #[arg(long)]
    pub all: bool,

    /// Show the last top-level job and its list entries
    #[arg(long)]
    pub last: bool,

    /// Write every job to a CSV file
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}
