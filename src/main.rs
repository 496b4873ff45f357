use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use jiff::Timestamp;
use lloggs::LoggingArgs;
use tracing::{error, info};

use cairn::{Durability, IngestConfig, IngestEvent, ingest_tree};

#[derive(Parser, Debug)]
#[command(name = "cairn")]
#[command(about = "Pack a dataset directory tree into an LMDB store")]
struct Args {
    /// Ingest configuration file (JSON)
    config: PathBuf,

    /// Maximum store size in gigabytes
    #[arg(long, short = 's')]
    size_gb: u64,

    /// Fsync every commit instead of relying on asynchronous flush
    #[arg(long)]
    durable: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    #[command(flatten)]
    logging: LoggingArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let _guard = args.logging.setup(|v| match v {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    })?;

    let durability = if args.durable {
        Durability::Full
    } else {
        Durability::Relaxed
    };
    let config = match IngestConfig::from_file(&args.config, args.size_gb, durability) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let store_path = config.store_path();
    info!(
        dataset = %config.dataset_name,
        root = %config.dataset_dir().display(),
        store = %store_path.display(),
        map_size = config.map_size_bytes,
        "starting ingestion"
    );

    let bar = if args.no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::no_length()
    };
    bar.set_style(
        ProgressStyle::with_template("[{bar:25}] {percent:>3}%  {pos}/{len}  {msg}")?
            .progress_chars("=>-"),
    );

    let started = Timestamp::now();
    let report = match ingest_tree(&config, |event| match event {
        IngestEvent::Discovered { total } => bar.set_length(total as u64),
        IngestEvent::Stored { key, .. } => {
            bar.set_message(key.to_string());
            bar.inc(1);
        }
        IngestEvent::Skipped { .. } | IngestEvent::Committed { .. } => {}
    }) {
        Ok(report) => report,
        Err(e) => {
            bar.abandon();
            error!("{}", e);
            std::process::exit(1);
        }
    };
    bar.finish_and_clear();
    let elapsed = Timestamp::now() - started;

    eprintln!("Store written to {:?}", store_path);
    eprintln!("  Files discovered: {}", report.discovered);
    eprintln!("  Records ingested: {}", report.ingested);
    eprintln!("  Commits: {}", report.commits);
    if !report.errors.is_empty() {
        eprintln!("  Skipped: {}", report.errors.len());
        for failure in &report.errors {
            eprintln!("    {}: {}", failure.path.display(), failure.error);
        }
    }
    eprintln!("  Elapsed: {elapsed:#}");

    Ok(())
}
