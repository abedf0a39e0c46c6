//! Pagelens main entry point
//!
//! This is the command-line interface for the Pagelens page analyzer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pagelens::config::{load_config_with_hash, Config};
use pagelens::crawler::CrawlerService;
use pagelens::state::CrawlStatus;
use pagelens::storage::{SqliteStorage, Storage};
use pagelens::url::normalize_url;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Pagelens: a URL crawler and page analyzer
///
/// Pagelens queues URLs, crawls them with a small worker pool, and
/// records structural facts about each page: HTML version, headings,
/// internal/external/broken links, and login form presence.
#[derive(Parser, Debug)]
#[command(name = "pagelens")]
#[command(version = "0.1.0")]
#[command(about = "A URL crawler and page analyzer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the crawler service until interrupted
    Run,

    /// Queue one or more URLs for analysis
    Add {
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },

    /// List all items and their status
    List,

    /// Show an item with its analysis result and broken links
    Show { id: i64 },

    /// Reset an item and queue it for a fresh analysis
    Rerun { id: i64 },

    /// Delete an item and its analysis artifacts
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    let config = load_config(cli.config.as_deref())?;

    // Open storage
    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))
        .with_context(|| format!("failed to open database {}", config.storage.database_path))?;
    let storage = Arc::new(Mutex::new(storage));

    match cli.command {
        Command::Run => handle_run(config, storage).await?,
        Command::Add { urls } => handle_add(&storage, &urls)?,
        Command::List => handle_list(&storage)?,
        Command::Show { id } => handle_show(&storage, id)?,
        Command::Rerun { id } => {
            storage.lock().unwrap().reset_for_rerun(id)?;
            println!("Item {} reset and queued for rerun", id);
        }
        Command::Delete { id } => {
            storage.lock().unwrap().delete_item(id)?;
            println!("Item {} deleted", id);
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagelens=info,warn"),
            1 => EnvFilter::new("pagelens=debug,info"),
            2 => EnvFilter::new("pagelens=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, falling back to built-in defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}

/// Handles the run subcommand: starts the service and waits for Ctrl-C
async fn handle_run(config: Config, storage: Arc<Mutex<SqliteStorage>>) -> Result<()> {
    let mut service = CrawlerService::new(config.crawler.clone(), storage)?;
    service.start();

    tracing::info!("Press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    service.stop().await;
    Ok(())
}

/// Handles the add subcommand: validates and queues URLs
fn handle_add(storage: &Arc<Mutex<SqliteStorage>>, urls: &[String]) -> Result<()> {
    for raw in urls {
        let url = normalize_url(raw).with_context(|| format!("invalid URL: {}", raw))?;
        let item = storage.lock().unwrap().create_item(url.as_str())?;
        println!("Queued {} (id {})", item.url, item.id);
    }
    Ok(())
}

/// Handles the list subcommand: prints all items with a status summary
fn handle_list(storage: &Arc<Mutex<SqliteStorage>>) -> Result<()> {
    let storage = storage.lock().unwrap();
    let items = storage.list_items()?;

    if items.is_empty() {
        println!("No items");
        return Ok(());
    }

    println!("{:<6} {:<10} {:<27} URL", "ID", "STATUS", "CREATED");
    for item in &items {
        println!(
            "{:<6} {:<10} {:<27} {}",
            item.id, item.status, item.created_at, item.url
        );
    }

    let mut parts = Vec::new();
    for status in CrawlStatus::all_statuses() {
        let count = storage.count_by_status(status)?;
        if count > 0 {
            parts.push(format!("{} {}", count, status));
        }
    }
    println!("\n{} total ({})", items.len(), parts.join(", "));

    Ok(())
}

/// Handles the show subcommand: prints one item in full
fn handle_show(storage: &Arc<Mutex<SqliteStorage>>, id: i64) -> Result<()> {
    let storage = storage.lock().unwrap();
    let item = storage.get_item(id)?;

    println!("Item {}: {}", item.id, item.url);
    println!("  Status:    {}", item.status);
    println!("  Created:   {}", item.created_at);
    if let Some(started) = &item.started_at {
        println!("  Started:   {}", started);
    }
    if let Some(completed) = &item.completed_at {
        println!("  Completed: {}", completed);
    }
    if let Some(error) = &item.error_message {
        println!("  Error:     {}", error);
    }

    let Some(analysis) = storage.get_analysis(id)? else {
        return Ok(());
    };

    println!("\nAnalysis:");
    println!(
        "  HTML version: {}",
        analysis.html_version.as_deref().unwrap_or("-")
    );
    println!(
        "  Title:        {}",
        analysis.page_title.as_deref().unwrap_or("-")
    );
    println!(
        "  Headings:     h1={} h2={} h3={} h4={} h5={} h6={}",
        analysis.h1_count,
        analysis.h2_count,
        analysis.h3_count,
        analysis.h4_count,
        analysis.h5_count,
        analysis.h6_count
    );
    println!(
        "  Links:        {} internal, {} external, {} broken",
        analysis.internal_links_count,
        analysis.external_links_count,
        analysis.broken_links_count
    );
    println!(
        "  Login form:   {}",
        if analysis.has_login_form { "yes" } else { "no" }
    );

    let broken = storage.get_broken_links(id)?;
    if !broken.is_empty() {
        println!("\nBroken links:");
        for link in &broken {
            match (link.status_code, &link.error_message) {
                (Some(code), _) => println!("  {} (HTTP {})", link.link_url, code),
                (None, Some(error)) => println!("  {} ({})", link.link_url, error),
                (None, None) => println!("  {}", link.link_url),
            }
        }
    }

    Ok(())
}
