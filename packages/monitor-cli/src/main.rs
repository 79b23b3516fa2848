//! `page-monitor` - check pages for changes from the command line.
//!
//! Checks and registered links are kept in a JSON file so repeated runs
//! compare against the previous observation. Logs go to stderr; results go
//! to stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use page_monitor::stores::FileStore;
use page_monitor::{
    CheckRecord, CheckStatus, Link, LinkStatus, LinkStore, Monitor, MonitorConfig,
    PipelineOutcome, ServiceHealth, SnapshotStore, StatusReport, Target,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_STORE: &str = ".page-monitor/checks.json";

#[derive(Parser)]
#[command(name = "page-monitor")]
#[command(about = "Detect and summarize changes to web pages", version)]
struct Cli {
    /// JSON file holding registered links and recorded checks
    #[arg(long, global = true, env = "PAGE_MONITOR_STORE", default_value = DEFAULT_STORE)]
    store: PathBuf,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a page to monitor
    Add {
        url: String,

        #[arg(long)]
        label: Option<String>,

        /// Free-form tags, e.g. "pricing, competitors"
        #[arg(long)]
        tags: Option<String>,
    },

    /// List registered pages with their latest check
    List,

    /// Unregister a page and delete its history
    Remove {
        /// Link id or URL
        link: String,
    },

    /// Fetch pages and compare against their last snapshot.
    /// Without URLs every registered page is checked.
    Check {
        urls: Vec<String>,

        /// Pages checked at once (overrides MONITOR_CONCURRENCY)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Show recorded checks for a page, newest first
    History {
        /// Link id or URL
        url: String,
    },

    /// Report store and LLM health
    Status,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,page_monitor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = MonitorConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Add { url, label, tags } => {
            let monitor = Monitor::from_config(&config, FileStore::new(&cli.store))
                .context("Failed to build HTTP client")?;
            let link = monitor
                .add_link(&url, label.as_deref(), tags.as_deref())
                .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&link)?);
            } else {
                println!("Added {} ({})", link.url, link.id);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::List => {
            let monitor = Monitor::from_config(&config, FileStore::new(&cli.store))
                .context("Failed to build HTTP client")?;
            let statuses = monitor
                .list_links()
                .await
                .with_context(|| format!("Failed to read {}", cli.store.display()))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else if statuses.is_empty() {
                println!("No links registered");
            } else {
                for status in &statuses {
                    print_link(status);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Remove { link } => {
            let monitor = Monitor::from_config(&config, FileStore::new(&cli.store))
                .context("Failed to build HTTP client")?;
            let removed = monitor.remove_link(&link).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&removed)?);
            } else {
                println!("Removed {} ({})", removed.url, removed.id);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { urls, concurrency } => {
            if let Some(concurrency) = concurrency {
                config = config.with_concurrency(concurrency);
            }
            let monitor = Monitor::from_config(&config, FileStore::new(&cli.store))
                .context("Failed to build HTTP client")?;

            let outcomes = if urls.is_empty() {
                monitor.check_links().await?
            } else {
                let links = monitor.store().links().await?;
                let targets: Vec<Target> = urls.iter().map(|u| resolve_target(&links, u)).collect();
                monitor.check_all(&targets).await
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else if outcomes.is_empty() {
                println!("No links registered; pass URLs or add some with `page-monitor add`");
            } else {
                for outcome in &outcomes {
                    print_outcome(outcome);
                }
            }

            let failed = outcomes.iter().filter(|o| o.is_failed()).count();
            tracing::info!(checked = outcomes.len(), failed, "Run complete");
            Ok(if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::History { url } => {
            let store = FileStore::new(&cli.store);
            let links = store
                .links()
                .await
                .with_context(|| format!("Failed to read {}", cli.store.display()))?;
            let records = store.history(&resolve_target(&links, &url).id).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No checks recorded for {}", url);
            } else {
                for record in &records {
                    print_record(record);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status => {
            let monitor = Monitor::from_config(&config, FileStore::new(&cli.store))
                .context("Failed to build HTTP client")?;
            let report = monitor.status().await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&report);
            }
            Ok(if report.store.ok && report.llm.ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Canonical URL string used as the target id. Unparseable input is kept
/// as-is so the failed check is still recorded under it.
fn target_id(raw: &str) -> String {
    url::Url::parse(raw.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| raw.trim().to_string())
}

/// A registered link's target when `raw` names one by id or URL, otherwise
/// a target keyed by the canonical URL.
fn resolve_target(links: &[Link], raw: &str) -> Target {
    let url = target_id(raw);
    links
        .iter()
        .find(|link| link.id == raw.trim() || link.url == url)
        .map(Link::target)
        .unwrap_or_else(|| Target::for_url(url))
}

fn status_label(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Baseline => "baseline",
        CheckStatus::Unchanged => "unchanged",
        CheckStatus::Changed => "changed",
        CheckStatus::Failed => "failed",
    }
}

fn print_outcome(outcome: &PipelineOutcome) {
    let title = outcome
        .title
        .as_deref()
        .map(|t| format!(" ({})", t))
        .unwrap_or_default();
    println!("[{}] {}{}", status_label(outcome.status), outcome.target_id, title);

    if let Some(diff) = &outcome.diff {
        println!("  +{} -{}  {}", diff.added, diff.removed, diff.snippet);
    }
    if let Some(summary) = &outcome.summary {
        println!("  {}", summary);
    }
    if let Some(error) = &outcome.error {
        println!("  error: {}", error);
    }
}

fn print_record(record: &CheckRecord) {
    println!(
        "{}  [{}]",
        record.checked_at.format("%Y-%m-%d %H:%M:%S UTC"),
        status_label(record.status)
    );
    if let Some(snippet) = record.snippet.as_deref().filter(|s| !s.is_empty()) {
        println!("  +{} -{}  {}", record.added, record.removed, snippet);
    }
    if let Some(summary) = &record.summary {
        println!("  {}", summary);
    }
    if let Some(error) = &record.error {
        println!("  error: {}", error);
    }
}

fn print_link(status: &LinkStatus) {
    let link = &status.link;
    let label = link
        .label
        .as_deref()
        .map(|l| format!(" ({})", l))
        .unwrap_or_default();
    println!("{}  {}{}", link.id, link.url, label);

    if let Some(tags) = &link.tags {
        println!("  tags: {}", tags);
    }
    match &status.latest_check {
        Some(check) => {
            println!(
                "  last checked {}  [{}]",
                check.checked_at.format("%Y-%m-%d %H:%M:%S UTC"),
                status_label(check.status)
            );
            if let Some(summary) = check.summary.as_deref().or(check.error.as_deref()) {
                println!("  {}", summary);
            }
        }
        None => println!("  never checked"),
    }
}

fn print_status(report: &StatusReport) {
    let line = |name: &str, health: &ServiceHealth| match (&health.error, health.ok) {
        (_, true) => println!("{:<8} ok ({} ms)", name, health.latency_ms),
        (Some(error), false) => println!("{:<8} down: {}", name, error),
        (None, false) => println!("{:<8} down", name),
    };
    line("backend", &report.backend);
    line("store", &report.store);
    line("llm", &report.llm);
}
