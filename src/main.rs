//! Review-Harvest main entry point
//!
//! This is the command-line interface for the Review-Harvest listing and
//! review harvester.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use review_harvest::config::{load_config_with_hash, Config, RunOptions, Target};
use review_harvest::crawler::{AutoResolveSignal, ConsoleSignal, Orchestrator, ResolutionSignal};
use review_harvest::extract::SelectorExtractor;
use review_harvest::output::{load_statistics, print_report, print_statistics};
use review_harvest::render::{CookieJar, HttpRenderClient};
use review_harvest::storage::open_store;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Review-Harvest: a resumable listing and review harvester
///
/// Review-Harvest searches a marketplace for a keyword, or opens a single
/// product link, and collects the paginated reviews of every record. Progress
/// is checkpointed to a JSON file so an interrupted run can pick up where it
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "review-harvest")]
#[command(version)]
#[command(about = "A resumable listing and review harvester", long_about = None)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["keyword", "product_link", "stats"])
))]
struct Cli {
    /// Search keyword
    #[arg(short, long)]
    keyword: Option<String>,

    /// Link of a single product
    #[arg(short = 'l', long)]
    product_link: Option<String>,

    /// Maximum number of products taken from the search listing
    #[arg(short = 'n', long)]
    max_records: Option<usize>,

    /// Maximum number of reviews per product
    #[arg(short, long)]
    review_limit: Option<usize>,

    /// Collect each star rating separately
    #[arg(long)]
    all_star_types: bool,

    /// Maximum number of reviews per star rating
    #[arg(long)]
    star_limit_per_type: Option<usize>,

    /// Collect only reviews with images or videos
    #[arg(long, conflicts_with = "all_star_types")]
    media_only: bool,

    /// Continue from the saved review page of a product link
    #[arg(short = 'c', long = "continue")]
    resume: bool,

    /// Save the search listing without visiting product pages
    #[arg(long)]
    index_only: bool,

    /// Harvest listed products again even if reviews were already saved
    #[arg(long, conflicts_with = "index_only")]
    refresh: bool,

    /// Checkpoint file to write instead of the derived name
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not wait for confirmation when a challenge page appears
    #[arg(long)]
    unattended: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Also write a debug log file into this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Show statistics of a checkpoint file and exit
    #[arg(long, value_name = "FILE")]
    stats: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log_dir.as_deref())?;

    if let Some(path) = &cli.stats {
        handle_stats(path)?;
        return Ok(());
    }

    let config = load_configuration(cli.config.as_deref())?;
    let options = build_options(&cli, &config)?;
    handle_harvest(config, options, cli.unattended).await?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log directory, a second layer writes debug output to a
/// timestamped file regardless of the console level.
fn setup_logging(verbose: u8, quiet: bool, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("review_harvest=info,warn"),
            1 => EnvFilter::new("review_harvest=debug,info"),
            2 => EnvFilter::new("review_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_filter(filter);

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let name = format!(
                "harvest_{}.log",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            );
            let path = dir.join(name);
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new("review_harvest=debug,info")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();
    Ok(())
}

/// Loads the configuration file, or the built-in defaults without one
fn load_configuration(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Turns the command line into run options, overriding configured limits
fn build_options(cli: &Cli, config: &Config) -> anyhow::Result<RunOptions> {
    let target = match (&cli.keyword, &cli.product_link) {
        (Some(query), None) => {
            if cli.resume {
                tracing::warn!(
                    "--continue resumes review pages only for a product link; \
                     with a keyword it revisits saved products without reviews"
                );
            }
            Target::Query {
                query: query.clone(),
                rescrape_missing: cli.resume,
            }
        }
        (None, Some(url)) => Target::Record {
            url: url.clone(),
            resume: cli.resume,
        },
        _ => anyhow::bail!("Exactly one of --keyword and --product-link is required"),
    };

    let mut options = RunOptions::new(target, config);
    if let Some(n) = cli.max_records {
        options.max_records = n;
    }
    if let Some(n) = cli.review_limit {
        options.review_limit = n;
    }
    if let Some(n) = cli.star_limit_per_type {
        options.star_limit_per_type = n;
    }
    options.media_only = cli.media_only;
    options.all_star_types = cli.all_star_types;
    options.index_only = cli.index_only;
    options.refresh = cli.refresh;
    options.output = cli.output.clone();

    options.validate().context("Invalid options")?;
    Ok(options)
}

/// Handles the --stats mode: shows statistics of a checkpoint file
fn handle_stats(path: &Path) -> anyhow::Result<()> {
    println!("Checkpoint: {}\n", path.display());

    let stats = load_statistics(path)
        .with_context(|| format!("Failed to read checkpoint {}", path.display()))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, options: RunOptions, unattended: bool) -> anyhow::Result<()> {
    let checkpoint = options.checkpoint_path(&config.output);
    let store = open_store(&checkpoint)
        .with_context(|| format!("Failed to prepare checkpoint {}", checkpoint.display()))?;
    tracing::info!("Checkpoint file: {}", checkpoint.display());

    let site_url = match &options.target {
        Target::Record { url, .. } => url.clone(),
        Target::Query { .. } => options.search_url(&config).unwrap_or_default(),
    };
    let cookies = CookieJar::for_site(&config.output.cookies_path, &site_url);
    if cookies.is_none() {
        tracing::warn!("Cannot derive a cookie domain from {}, cookies will not persist", site_url);
    }

    let client = HttpRenderClient::new(config.site.user_agent.clone());
    let extractor = SelectorExtractor::new(
        config.site.selectors.clone(),
        config.vocabulary.magnitude_suffixes.clone(),
    );
    let signal: Box<dyn ResolutionSignal> = if unattended {
        Box::new(AutoResolveSignal)
    } else {
        Box::new(ConsoleSignal)
    };

    let orchestrator = Orchestrator::new(
        config,
        options,
        Box::new(client),
        Box::new(extractor),
        signal,
        Box::new(store),
        cookies,
    )?;

    match orchestrator.execute().await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
