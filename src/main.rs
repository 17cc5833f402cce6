//! CLI entry point for libcat.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use libcat_core::config::default_db_path;
use libcat_core::ledger::FILE_OR_DIR_KEY;
use libcat_core::report::{format_resolution, format_table};
use libcat_core::{
    AppConfig, CatalogResolver, Database, Identifier, JobType, Ledger, ResolveRequest,
    parse_isbn_list,
};
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command, DEFAULT_RECENT_ROWS, DbArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Reports go to stdout; keep logs on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let ledger = open_ledger(args.db.as_deref()).await?;

    if let Some(Command::Db(db_args)) = &args.command {
        return show_jobs(&ledger, db_args).await;
    }

    let Some(input) = args.input.as_deref() else {
        info!("No input provided. Pass an ISBN or a .txt file of ISBNs.");
        info!("Example: libcat 9780140449136");
        return Ok(());
    };

    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_overrides(args.overrides());
    config.validate()?;

    let resolver = CatalogResolver::from_config(&config)?;
    info!(catalogs = ?resolver.catalog_names(), "libcat starting");

    if is_list_file(input) {
        resolve_list(&resolver, &ledger, Path::new(input)).await
    } else {
        let identifier = Identifier::isbn(input)?;
        let resolution = resolver.resolve(ResolveRequest::new(identifier)).await;
        let id = ledger
            .record_resolution(&resolution, JobType::Isbn, None)
            .await?;
        debug!(job = id, "job recorded");
        print!("{}", format_resolution(&resolution));
        Ok(())
    }
}

async fn open_ledger(explicit: Option<&Path>) -> Result<Ledger> {
    let path: PathBuf = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_db_path()
            .context("cannot determine the ledger location; pass --db <PATH>")?,
    };
    let db = Database::new(&path)
        .await
        .with_context(|| format!("cannot open ledger at {}", path.display()))?;
    Ok(Ledger::new(db))
}

fn is_list_file(input: &str) -> bool {
    Path::new(input)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

async fn resolve_list(resolver: &CatalogResolver, ledger: &Ledger, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read ISBN list {}", path.display()))?;
    let list = parse_isbn_list(&text);
    for (line, raw) in &list.rejected {
        warn!(line, value = %raw, "skipping line that is not an ISBN");
    }
    if list.isbns.is_empty() {
        info!(path = %path.display(), "no ISBNs found in list");
        return Ok(());
    }

    let source = path.display().to_string();
    let parent = ledger.begin_isbn_list(&source).await?;
    info!(isbns = list.isbns.len(), job = parent, "resolving ISBN list");

    for isbn in &list.isbns {
        let request = ResolveRequest::new(Identifier::isbn(isbn)?)
            .with_prefilled(FILE_OR_DIR_KEY, source.clone());
        let resolution = resolver.resolve(request).await;
        ledger
            .record_resolution(&resolution, JobType::ListIsbn, Some(parent))
            .await?;
        println!("{}", format_resolution(&resolution));
    }
    Ok(())
}

async fn show_jobs(ledger: &Ledger, args: &DbArgs) -> Result<()> {
    if let Some(path) = &args.export {
        let file = File::create(path)
            .with_context(|| format!("cannot create export file {}", path.display()))?;
        let count = ledger.export_csv(file).await?;
        info!(rows = count, path = %path.display(), "ledger exported");
        return Ok(());
    }

    let rows = if args.all {
        ledger.all().await?
    } else if args.last {
        match ledger.latest().await? {
            Some(job) => {
                let children = ledger.children(job.id).await?;
                std::iter::once(job).chain(children).collect()
            }
            None => Vec::new(),
        }
    } else {
        ledger
            .recent(args.recent.unwrap_or(DEFAULT_RECENT_ROWS))
            .await?
    };

    if rows.is_empty() {
        info!("no jobs recorded");
        return Ok(());
    }
    print!("{}", format_table(&rows));
    Ok(())
}
