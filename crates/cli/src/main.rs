use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tilescan_core::{
    load_config, validate_config, Aggregator, ClassifierTable, CommandProbe, Config, KeyCodec,
    LifecycleEngine, ObjectStore, OutcomeFilter, Probe, QueryEngine, ReasonCode, S3ObjectStore,
    WorkerDriver,
};

#[derive(Parser)]
#[command(name = "tilescan", version, about = "Track batch probe runs in an object store's key space")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "TILESCAN_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enroll items for processing
    Enroll {
        /// Item ids to enroll
        #[arg(required_unless_present = "from_file")]
        ids: Vec<String>,

        /// Read item ids from a file, one per line
        #[arg(long, value_name = "FILE")]
        from_file: Option<PathBuf>,
    },

    /// Probe unprocessed items and commit their outcomes
    Process {
        /// Cap on items attempted this pass (overrides config)
        #[arg(long)]
        max_items: Option<usize>,

        /// Concurrent probe attempts (overrides config)
        #[arg(long)]
        parallelism: Option<usize>,
    },

    /// List committed items matching a filter
    Query {
        /// Filter by outcome status
        #[arg(long)]
        status: Option<bool>,

        /// Filter by reason code
        #[arg(long)]
        reason: Option<String>,
    },

    /// Move committed items matching a filter back to unprocessed
    Reprocess {
        /// Filter by outcome status
        #[arg(long)]
        status: Option<bool>,

        /// Filter by reason code
        #[arg(long)]
        reason: Option<String>,
    },

    /// Show lifecycle counts
    Status,

    /// Download all committed outcomes as a JSON array
    Download {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::connect(&config.store).await);
    let codec = KeyCodec::new(config.store.prefix.clone());
    let engine = Arc::new(LifecycleEngine::new(Arc::clone(&store), codec.clone()));

    match cli.command {
        Command::Enroll { ids, from_file } => {
            let ids = collect_item_ids(ids, from_file)?;
            let report = engine.enroll(&ids).await?;
            print_json(&report, None)?;
        }
        Command::Process {
            max_items,
            parallelism,
        } => {
            let probe = build_probe(&config)?;
            let driver = WorkerDriver::new(engine, probe, config.worker.clone());
            let report = driver
                .attempt_batch(
                    max_items.unwrap_or(config.worker.max_items),
                    parallelism.unwrap_or(config.worker.parallelism),
                )
                .await?;
            print_json(&report, None)?;
        }
        Command::Query { status, reason } => {
            let filter = build_filter(status, reason)?;
            let query = QueryEngine::new(store, codec);
            let item_ids = query.find(&filter).await?;
            print_json(&item_ids, None)?;
        }
        Command::Reprocess { status, reason } => {
            let filter = build_filter(status, reason)?;
            if filter == OutcomeFilter::new() {
                bail!("Refusing to reprocess everything; pass --status and/or --reason");
            }
            let moved = engine.reprocess(&filter).await?;
            println!("{moved}");
        }
        Command::Status => {
            let aggregator = Aggregator::new(store, codec);
            let status = aggregator.status().await?;
            print_json(&status, None)?;
        }
        Command::Download { output } => {
            let aggregator = Aggregator::new(store, codec);
            let results = aggregator.download_all().await?;
            if results.skipped > 0 {
                info!("Skipped {} unreadable outcomes", results.skipped);
            }
            print_json(&results.outcomes, output.as_deref())?;
        }
    }

    Ok(())
}

/// Merge positional ids with ids read from a file, preserving order.
fn collect_item_ids(ids: Vec<String>, from_file: Option<PathBuf>) -> Result<Vec<String>> {
    let mut all = ids;
    if let Some(path) = from_file {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read item ids from {:?}", path))?;
        all.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    if all.is_empty() {
        bail!("No item ids given");
    }
    Ok(all)
}

fn build_filter(status: Option<bool>, reason: Option<String>) -> Result<OutcomeFilter> {
    let mut filter = OutcomeFilter::new();
    if let Some(status) = status {
        filter = filter.with_status(status);
    }
    if let Some(token) = reason {
        let reason = ReasonCode::parse(&token)
            .with_context(|| format!("Unknown reason code {:?}", token))?;
        filter = filter.with_reason(reason);
    }
    Ok(filter)
}

fn build_probe(config: &Config) -> Result<Arc<dyn Probe>> {
    let probe_config = config
        .probe
        .clone()
        .context("No [probe] section in config; `process` needs one")?;
    Ok(Arc::new(
        CommandProbe::new(probe_config).with_classifier(ClassifierTable::with_default_rules()),
    ))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T, output: Option<&std::path::Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match output {
        Some(path) => std::fs::write(path, json.as_bytes())
            .with_context(|| format!("Failed to write {:?}", path))?,
        None => println!("{json}"),
    }
    Ok(())
}
