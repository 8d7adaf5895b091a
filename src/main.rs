//! Crawl-Admission main entry point
//!
//! Administrative command-line interface over the document identity store
//! and the host throttle cache.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crawl_admission::config::{load_config_with_hash, Config};
use crawl_admission::politeness::wait_for_url;
use crawl_admission::url::{Canonicalizer, UrlCanonicalizer};
use crawl_admission::{DocumentIdentityStore, FrontierError, HostThrottleCache};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Crawl-Admission: politeness and document identity for a crawl frontier
#[derive(Parser, Debug)]
#[command(name = "crawl-admission")]
#[command(version = "1.0.0")]
#[command(about = "Inspect and maintain crawl admission state", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

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
    /// Validate the configuration and print it
    Check,

    /// Show how many identities the store holds
    Stats,

    /// Print the doc id of a URL, if it has one
    Lookup {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Assign doc ids to URLs that do not have one yet
    Assign {
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,
    },

    /// Write every identity as a tab-separated "doc_id<TAB>url" line
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load identities from a file written by `export`
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run URLs through a fresh throttle cache, waiting the computed delays
    Politeness {
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Check => handle_check(&config, &config_hash),
        Command::Stats => handle_stats(&config),
        Command::Lookup { url } => handle_lookup(&config, &url),
        Command::Assign { urls } => handle_assign(&config, &urls),
        Command::Export { output } => handle_export(&config, output.as_deref()),
        Command::Import { file } => handle_import(&config, &file),
        Command::Politeness { urls } => {
            handle_politeness(&config, &urls).await;
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_admission=info,warn"),
            1 => EnvFilter::new("crawl_admission=debug,info"),
            2 => EnvFilter::new("crawl_admission=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Opens the identity store for an administrative command
///
/// Administrative commands never discard stored identities, so the store is
/// opened as resumable whatever the crawl itself is configured to do.
fn open_store(config: &Config) -> anyhow::Result<DocumentIdentityStore> {
    let mut storage = config.storage.clone();
    storage.resumable_crawling = true;
    DocumentIdentityStore::open(&storage).context("Failed to open document identity store")
}

fn handle_check(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    println!("=== Crawl-Admission Configuration ===\n");

    println!("Politeness:");
    println!("  Delay: {}ms", config.politeness.delay);
    println!(
        "  Maximum host entries: {}",
        config.politeness.maximum_host_entries
    );
    println!("  Entry expiry: {}ms", config.politeness.entry_expiry);

    println!("\nStorage:");
    println!("  Location: {}", config.storage.location.display());
    println!("  Resumable crawling: {}", config.storage.resumable_crawling);

    println!("\nConfig hash: {}", config_hash);
    println!("\n✓ Configuration is valid");

    Ok(())
}

fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;

    println!("Storage: {}", config.storage.location.display());
    println!("Identities: {}", store.count()?);

    store.close()?;
    Ok(())
}

fn handle_lookup(config: &Config, url: &str) -> anyhow::Result<()> {
    let canonical = UrlCanonicalizer.canonicalize(url)?;
    let store = open_store(config)?;

    match store.lookup(&canonical)? {
        Some(doc_id) => println!("{}\t{}", doc_id, canonical),
        None => println!("not seen\t{}", canonical),
    }

    store.close()?;
    Ok(())
}

fn handle_assign(config: &Config, urls: &[String]) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let mut failed = 0usize;

    for url in urls {
        let result = UrlCanonicalizer
            .canonicalize(url)
            .map_err(FrontierError::from)
            .and_then(|canonical| {
                store
                    .assign_if_absent(&canonical)
                    .map(|doc_id| (doc_id, canonical))
            });

        match result {
            Ok((doc_id, canonical)) => println!("{}\t{}", doc_id, canonical),
            // Storage failures are not per-URL; stop instead of repeating them.
            Err(e @ FrontierError::StorageIo(_)) => return Err(e.into()),
            Err(e) => {
                failed += 1;
                tracing::warn!("Skipping {}: {}", url, e);
            }
        }
    }

    store.close()?;
    if failed > 0 {
        anyhow::bail!("{} of {} URLs could not be assigned", failed, urls.len());
    }
    Ok(())
}

fn handle_export(config: &Config, output: Option<&Path>) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let identities = store.identities()?;

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);

    for identity in &identities {
        writeln!(writer, "{}\t{}", identity.doc_id, identity.canonical_url)?;
    }
    writer.flush()?;

    tracing::info!("Exported {} identities", identities.len());
    store.close()?;
    Ok(())
}

fn handle_import(config: &Config, file: &Path) -> anyhow::Result<()> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );
    let store = open_store(config)?;
    let mut imported = 0usize;
    let mut rejected = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((doc_id, url)) = line.split_once('\t') else {
            rejected += 1;
            tracing::warn!("Line {}: expected \"doc_id<TAB>url\"", index + 1);
            continue;
        };

        match store.assign_explicit(url.trim(), doc_id.trim()) {
            Ok(()) => imported += 1,
            Err(e @ FrontierError::StorageIo(_)) => return Err(e.into()),
            Err(e) => {
                rejected += 1;
                tracing::warn!("Line {}: {}", index + 1, e);
            }
        }
    }

    println!("Imported: {}", imported);
    println!("Rejected: {}", rejected);
    println!("Identities: {}", store.count()?);

    store.close()?;
    Ok(())
}

async fn handle_politeness(config: &Config, urls: &[String]) {
    let cache = HostThrottleCache::new(&config.politeness);

    for url in urls {
        let waited = wait_for_url(&cache, url).await;
        println!("{:>6}ms\t{}", waited.as_millis(), url);
    }

    tracing::debug!("Throttle cache holds {} hosts", cache.size());
}
