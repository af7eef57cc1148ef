use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use updraft::remote::{Destination, S3Store};
use updraft::sync::{ExcludeRules, SyncConfig, SyncEngine};

#[derive(Debug, Parser)]
#[command(
    name = "updraft",
    version,
    about = "Parallel one-way mirror of a local tree into S3-compatible object storage"
)]
struct Cli {
    /// Local source directory
    source: PathBuf,

    /// Destination, e.g. s3://bucket/prefix
    target: String,

    /// Amount of parallel uploads
    #[arg(long, default_value_t = 16)]
    workers: usize,

    /// Copy, but do not follow, symlinks
    #[arg(long)]
    copy_symlinks: bool,

    /// Exclude paths matching this shell-style glob (repeatable)
    #[arg(long = "exclude", value_name = "PATTERN")]
    excludes: Vec<String>,

    /// Skip directories with this exact name, no path separators (repeatable)
    #[arg(long = "exclude-dir", value_name = "NAME")]
    exclude_dirs: Vec<String>,

    /// Bucket region
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// Custom endpoint for S3-compatible providers
    #[arg(long)]
    endpoint: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if cli.workers == 0 {
        bail!("--workers must be a positive integer");
    }
    if !cli.source.is_dir() {
        bail!("Source {} is not a directory", cli.source.display());
    }
    let dest = Destination::parse(&cli.target)?;

    let store = S3Store::new(&dest.bucket, &cli.region, cli.endpoint.as_deref())?;
    let config = SyncConfig {
        workers: cli.workers,
        copy_symlinks: cli.copy_symlinks,
        exclude: ExcludeRules::new(&cli.excludes, &cli.exclude_dirs),
    };

    info!(
        bucket = store.bucket(),
        prefix = %dest.prefix,
        workers = cli.workers,
        "Syncing {} to {}",
        cli.source.display(),
        cli.target
    );
    let stats = SyncEngine::new(store, config).run(&cli.source, &dest).await?;

    println!("\nSync complete!");
    println!("Remote objects indexed: {}", stats.remote_objects);
    println!("Files scanned: {}", stats.scanned);
    println!("Excluded: {}", stats.excluded);
    println!("Already up to date: {}", stats.up_to_date);
    println!("Uploaded: {}", stats.uploaded);
    println!("Failed: {}", stats.failed);
    if stats.walk_errors > 0 {
        println!("Walk errors (skipped): {}", stats.walk_errors);
    }

    Ok(())
}
