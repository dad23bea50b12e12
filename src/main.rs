//! site-canon main entry point
//!
//! This is the command-line interface for the site-canon page auditor.

use anyhow::{Context, Result};
use clap::Parser;
use site_canon::browser::{ChromiumBrowser, ContextOptions};
use site_canon::capture::{run_capture, CaptureOptions};
use site_canon::config::{load_config_with_hash, Config};
use site_canon::discovery::{
    discover_all, group_records, load_page_records, select_from_records, SiteDiscovery, SiteTarget,
};
use site_canon::output::{
    generate_markdown_summary, generate_report, load_statistics, print_report, print_statistics,
    AuditReport,
};
use site_canon::storage::{open_storage, RunKind, RunStatus, SqliteStorage, Storage};
use site_canon::{CanonicalSelection, ControlToken};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// site-canon: canonical page auditor
///
/// site-canon discovers the links of each configured site, picks one
/// canonical URL per page archetype and captures full-page screenshots of
/// the selections, resuming where an interrupted run stopped.
#[derive(Parser, Debug)]
#[command(name = "site-canon")]
#[command(version = "1.0.0")]
#[command(about = "Canonical page auditor for large website sets", long_about = None)]
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

    /// Run discovery and store the selections without capturing
    #[arg(long, conflicts_with = "capture_only")]
    discover_only: bool,

    /// Capture the stored selections without rediscovering
    #[arg(long, conflicts_with = "discover_only")]
    capture_only: bool,

    /// Skip pages already in the checkpoint log (default from config)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Clear the checkpoint log and capture everything again
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be audited without doing it
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate markdown summary from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

impl Cli {
    fn resume(&self, config: &Config) -> bool {
        if self.fresh {
            false
        } else {
            self.resume || config.capture.resume
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e).context("invalid configuration");
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &cli)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.export_summary {
        handle_export_summary(&config)
    } else {
        handle_audit(&config, &config_hash, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_canon=info,warn"),
            1 => EnvFilter::new("site_canon=debug,info"),
            2 => EnvFilter::new("site_canon=trace,debug"),
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

/// Ctrl-C cancels; on Unix SIGUSR1 toggles pause
fn install_signal_handlers(control: &ControlToken) {
    let token = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after in-flight steps");
            token.cancel();
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::user_defined1()) {
            Ok(mut pause_signal) => {
                let token = control.clone();
                tokio::spawn(async move {
                    while pause_signal.recv().await.is_some() {
                        if token.toggle_pause() {
                            info!("Paused (send SIGUSR1 again to resume)");
                        } else {
                            info!("Resumed");
                        }
                    }
                });
            }
            Err(e) => warn!("Pause signal unavailable: {}", e),
        }
    }
}

/// Handles the --dry-run mode: validates config and shows what would be audited
fn handle_dry_run(config: &Config, cli: &Cli) -> Result<()> {
    println!("=== site-canon Dry Run ===\n");

    println!("Browser:");
    println!(
        "  Executable: {}",
        config.browser.chrome_path.as_deref().unwrap_or("(auto-detect)")
    );
    println!("  Headless: {}", config.browser.headless);
    println!(
        "  Viewport: {}x{}",
        config.browser.viewport_width, config.browser.viewport_height
    );
    if let Some(proxy) = &config.browser.proxy {
        println!("  Proxy: {}", proxy);
    }

    println!("\nDiscovery:");
    println!("  Concurrent sites: {}", config.discovery.concurrency);
    println!(
        "  Indexability check: {}",
        config.discovery.check_indexability
    );
    if let Some(records) = &config.discovery.records_path {
        println!("  Page records: {}", records);
    }

    println!("\nCapture:");
    println!("  Concurrent contexts: {}", config.capture.concurrency);
    println!("  Max retries: {}", config.capture.max_retries);
    println!("  Page timeout: {}ms", config.capture.page_timeout_ms);
    println!(
        "  Wait policy: {}",
        if config.capture.strict_load_mode {
            "network idle"
        } else {
            "DOM ready"
        }
    );
    println!("  Resume: {}", cli.resume(config));

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Screenshots: {}", config.output.screenshot_root);
    println!("  Summary: {}", config.output.summary_path);

    println!("\nSites ({}):", config.sites.len());
    for entry in &config.sites {
        let target = SiteTarget::from_entry(entry);
        println!("  - {} [{}]", target.seed, target.project);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: generates markdown summary
fn handle_export_summary(config: &Config) -> Result<()> {
    println!("=== Exporting Audit Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let storage = open_storage(Path::new(&config.output.database_path))?;

    info!("Loading audit data from database...");
    let report = generate_report(&storage)?;
    let run = storage.get_latest_run(RunKind::Capture)?;

    generate_markdown_summary(&report, run.as_ref(), Path::new(&config.output.summary_path))?;

    println!("✓ Summary exported to: {}", config.output.summary_path);

    Ok(())
}

/// Runs discovery and/or capture
async fn handle_audit(config: &Config, config_hash: &str, cli: &Cli) -> Result<()> {
    let storage = Mutex::new(open_storage(Path::new(&config.output.database_path))?);
    let control = ControlToken::new();
    install_signal_handlers(&control);

    let live_discovery = !cli.capture_only && config.discovery.records_path.is_none();
    let browser = if live_discovery || !cli.discover_only {
        info!("Launching Chromium");
        let longest_navigation = Duration::from_millis(
            config.capture.page_timeout_ms.max(config.capture.fallback_timeout_ms),
        );
        Some(ChromiumBrowser::launch(&config.browser, longest_navigation).await?)
    } else {
        None
    };

    let outcome = run_stages(config, config_hash, cli, &storage, browser.as_ref(), &control).await;

    if let Some(browser) = browser {
        browser.shutdown().await;
    }

    outcome
}

async fn run_stages(
    config: &Config,
    config_hash: &str,
    cli: &Cli,
    storage: &Mutex<SqliteStorage>,
    browser: Option<&ChromiumBrowser>,
    control: &ControlToken,
) -> Result<()> {
    if !cli.capture_only {
        let selections = run_discovery(config, config_hash, storage, browser, control).await?;
        println!("Selected {} canonical pages", selections.len());
    }

    if cli.discover_only || control.is_cancelled() {
        return Ok(());
    }

    let browser = browser.context("capture needs a browser")?;
    let selections = lock(storage).load_selections()?;
    if selections.is_empty() {
        warn!("No selections stored; run discovery first");
        return Ok(());
    }

    let run_id = lock(storage).create_run(RunKind::Capture, config_hash)?;

    let mut options = CaptureOptions::from_config(&config.capture, &config.browser, &config.output);
    options.resume = cli.resume(config);

    let run = match run_capture(browser, &selections, storage, &options, control).await {
        Ok(run) => run,
        Err(e) => {
            lock(storage).update_run_status(run_id, RunStatus::Failed)?;
            return Err(e).context("capture failed");
        }
    };

    finish_run(storage, run_id, run.cancelled)?;

    let report = AuditReport::from_tasks(&run.tasks);
    print_report(&report);

    let record = lock(storage).get_run(run_id)?;
    generate_markdown_summary(&report, Some(&record), Path::new(&config.output.summary_path))?;
    info!("Summary written to {}", config.output.summary_path);

    Ok(())
}

async fn run_discovery(
    config: &Config,
    config_hash: &str,
    storage: &Mutex<SqliteStorage>,
    browser: Option<&ChromiumBrowser>,
    control: &ControlToken,
) -> Result<Vec<CanonicalSelection>> {
    let run_id = lock(storage).create_run(RunKind::Discovery, config_hash)?;

    let sites: Vec<SiteDiscovery> = match &config.discovery.records_path {
        Some(path) => {
            let records = load_page_records(Path::new(path))?;
            let groups = group_records(&records);
            if groups.skipped > 0 || groups.filtered > 0 {
                info!(
                    "Page records: {} skipped without URL, {} filtered by status or type",
                    groups.skipped, groups.filtered
                );
            }
            select_from_records(&groups)
        }
        None => {
            let browser = browser.context("live discovery needs a browser")?;
            let targets: Vec<SiteTarget> = config.sites.iter().map(SiteTarget::from_entry).collect();
            let viewport = ContextOptions::from_config(&config.browser);
            discover_all(browser, &targets, &config.discovery, &viewport, control).await
        }
    };

    let unreachable = sites.iter().filter(|s| !s.reachable).count();
    if unreachable > 0 {
        warn!("{} sites were unreachable", unreachable);
    }

    let selections: Vec<CanonicalSelection> = sites.into_iter().flat_map(|s| s.selections).collect();

    if control.is_cancelled() {
        warn!("Discovery interrupted; keeping the previously stored selections");
        finish_run(storage, run_id, true)?;
        return Ok(selections);
    }

    lock(storage).replace_selections(run_id, &selections)?;
    finish_run(storage, run_id, false)?;

    Ok(selections)
}

fn finish_run(storage: &Mutex<SqliteStorage>, run_id: i64, cancelled: bool) -> Result<()> {
    let mut storage = lock(storage);
    if cancelled {
        storage.update_run_status(run_id, RunStatus::Interrupted)?;
    } else {
        storage.complete_run(run_id)?;
    }
    Ok(())
}

fn lock(storage: &Mutex<SqliteStorage>) -> std::sync::MutexGuard<'_, SqliteStorage> {
    storage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
