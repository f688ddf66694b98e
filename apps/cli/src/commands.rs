//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pubsync_core::export::{read_records, records_to_json, write_records};
use pubsync_core::{
    DocumentOutcome, DocumentReport, ProgressReporter, SyncOptions, SyncReport, apply_records,
    fetch_records, sync,
};
use pubsync_fetcher::FetcherChain;
use pubsync_shared::{AppConfig, PublicationRecord, init_config, resolve_config};

/// Number of ranked records echoed after a run.
const PREVIEW_COUNT: usize = 3;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// pubsync: keep publication pages in sync with a scholarly profile.
#[derive(Parser)]
#[command(
    name = "pubsync",
    version,
    about = "Fetch a researcher's publications and rewrite the publication lists of HTML pages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./pubsync.toml, then ~/.pubsync/pubsync.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch publications and update every configured document.
    Update {
        /// Profile identifier (overrides config and SCHOLAR_ID).
        #[arg(long)]
        profile: Option<String>,

        /// Author display name for the query client (overrides config).
        #[arg(long)]
        author: Option<String>,

        /// Render and locate anchors without writing any file.
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch and rank publications, printing them as JSON.
    Fetch {
        /// Write the JSON record set to a file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Profile identifier (overrides config and SCHOLAR_ID).
        #[arg(long)]
        profile: Option<String>,

        /// Author display name for the query client (overrides config).
        #[arg(long)]
        author: Option<String>,
    },

    /// Update documents from a previously exported record set (no network).
    Apply {
        /// JSON record set written by `pubsync fetch --out`.
        #[arg(long)]
        records: PathBuf,

        /// Render and locate anchors without writing any file.
        #[arg(long)]
        dry_run: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pubsync=info",
        1 => "pubsync=debug",
        _ => "pubsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Update {
            profile,
            author,
            dry_run,
        } => cmd_update(config_path, profile, author, dry_run).await,
        Command::Fetch {
            out,
            profile,
            author,
        } => cmd_fetch(config_path, out.as_deref(), profile, author).await,
        Command::Apply { records, dry_run } => cmd_apply(config_path, &records, dry_run),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Resolve config and apply command-line profile overrides on top.
fn load_with_overrides(
    config_path: Option<&Path>,
    profile: Option<String>,
    author: Option<String>,
) -> Result<AppConfig> {
    let mut config = resolve_config(config_path)?;
    if let Some(id) = profile {
        config.profile.id = id;
    }
    if let Some(name) = author {
        config.profile.display_name = name;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_update(
    config_path: Option<&Path>,
    profile: Option<String>,
    author: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let config = load_with_overrides(config_path, profile, author)?;
    let chain = FetcherChain::from_config(&config)?;
    let profile = config.profile();

    info!(
        %profile,
        strategies = %chain.names().join(", "),
        documents = config.documents.len(),
        dry_run,
        "updating publication documents"
    );

    let reporter = CliProgress::new();
    let options = SyncOptions { dry_run };

    let report = match sync(&chain, &profile, &config.documents, &options, &reporter).await {
        Ok(report) => report,
        Err(e) => {
            reporter.spinner.finish_and_clear();
            return Err(eyre!("no documents were modified: {e}"));
        }
    };

    print_report(&report);
    exit_status(&report)
}

async fn cmd_fetch(
    config_path: Option<&Path>,
    out: Option<&Path>,
    profile: Option<String>,
    author: Option<String>,
) -> Result<()> {
    let config = load_with_overrides(config_path, profile, author)?;
    let chain = FetcherChain::from_config(&config)?;

    let (strategy, records) = fetch_records(&chain, &config.profile()).await?;
    info!(%strategy, records = records.len(), "publications fetched");

    match out {
        Some(path) => {
            write_records(path, &records)?;
            println!("Wrote {} records to {}", records.len(), path.display());
        }
        None => println!("{}", records_to_json(&records)?),
    }

    Ok(())
}

fn cmd_apply(config_path: Option<&Path>, records_path: &Path, dry_run: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let records = read_records(records_path)?;

    info!(
        records = records.len(),
        path = %records_path.display(),
        dry_run,
        "applying record set"
    );

    let reporter = CliProgress::new();
    let report = apply_records(records, &config.documents, &SyncOptions { dry_run }, &reporter);

    print_report(&report);
    exit_status(&report)
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_report(report: &SyncReport) {
    println!();
    println!(
        "  {} publications via {}",
        report.records.len(),
        report.strategy
    );
    for record in report.records.iter().take(PREVIEW_COUNT) {
        print_record(record);
    }
    println!();

    for doc in &report.documents {
        let status = match &doc.outcome {
            DocumentOutcome::Updated { entries } => format!("updated ({entries} entries)"),
            DocumentOutcome::Unchanged { entries } => {
                format!("dry run ({entries} entries would be written)")
            }
            DocumentOutcome::Aborted { reason } => format!("aborted: {reason}"),
            DocumentOutcome::Failed { reason } => format!("failed: {reason}"),
        };
        println!("  {} [{}] {status}", doc.path.display(), doc.layout);
    }

    println!();
    println!("  Time: {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn print_record(record: &PublicationRecord) {
    println!("    {} ({})", record.title, record.year);
    if !record.authors.is_empty() {
        println!("      {}", record.authors);
    }
    if !record.venue.is_empty() {
        println!("      {}", record.venue);
    }
}

fn exit_status(report: &SyncReport) -> Result<()> {
    if report.has_failures() {
        return Err(eyre!(
            "{} of {} documents were not updated",
            report.failed_documents(),
            report.documents.len()
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_done(&self, report: &DocumentReport) {
        if report.is_failure() {
            self.spinner
                .println(format!("  ! {} not updated", report.path.display()));
        }
    }

    fn done(&self, _report: &SyncReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_flags_parse() {
        let cli = Cli::try_parse_from([
            "pubsync",
            "--config",
            "site/pubsync.toml",
            "-vv",
            "update",
            "--profile",
            "ABC123",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some(Path::new("site/pubsync.toml")));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Update {
                profile,
                author,
                dry_run,
            } => {
                assert_eq!(profile.as_deref(), Some("ABC123"));
                assert!(author.is_none());
                assert!(dry_run);
            }
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn apply_requires_records() {
        assert!(Cli::try_parse_from(["pubsync", "apply"]).is_err());
        assert!(Cli::try_parse_from(["pubsync", "apply", "--records", "r.json"]).is_ok());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pubsync", "fetch", "--log-format", "json"]).unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
    }
}
