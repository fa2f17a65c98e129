//! Expiry Check CLI Application
//!
//! A command-line interface that audits npm packages for maintainers whose
//! email domains are close to expiring. This CLI application provides a
//! user-friendly interface to the expiry-check-lib library.

mod ui;

use chrono::{Days, Local, NaiveDate};
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::Term;
use expiry_check_lib::{
    count_package_names, detect_command, detect_docker, load_env_config, read_packages_from_file,
    read_packages_from_reader, BatchEvent, BatchOrchestrator, BatchSummary, CancellationToken,
    CheckConfig, ConfigManager, ExpirationCache, FileConfig, ProviderConfig, ResolutionRow,
    RunOutcome,
};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Days ahead of today that count as "lapsing" when no date is given.
const DEFAULT_LAPSE_WINDOW_DAYS: u64 = 30;

/// Exit status after a cancelled run.
const EXIT_CANCELLED: i32 = 130;

/// CLI arguments for expiry-check
#[derive(Parser, Debug)]
#[command(name = "expiry-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Find npm maintainers whose email domains are about to expire")]
#[command(
    long_about = "Find npm maintainers whose email domains are about to expire.\n\nFor every package, the publisher and maintainer email domains of the latest version are looked up over WHOIS. A lapsed domain can be re-registered to take over the maintainer's account."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Package names to check
    #[arg(value_name = "PACKAGES", help_heading = "Package Selection")]
    pub packages: Vec<String>,

    /// Input file with package names, one per line ("-" reads stdin)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help_heading = "Package Selection"
    )]
    pub file: Option<String>,

    /// Use the built-in WHOIS client (default)
    #[arg(long = "native", help_heading = "Providers")]
    pub native: bool,

    /// Do not use the built-in WHOIS client
    #[arg(long = "no-native", help_heading = "Providers")]
    pub no_native: bool,

    /// Fall back to `docker run --rm dentych/whois`
    #[arg(long = "docker", help_heading = "Providers")]
    pub docker: bool,

    /// Fall back to a local WHOIS command, e.g. "whois"
    #[arg(long = "custom", value_name = "CMD", help_heading = "Providers")]
    pub custom: Option<String>,

    /// Enable docker and the custom command when they are installed
    #[arg(long = "detect", help_heading = "Providers")]
    pub detect: bool,

    /// Max domains resolved at once per package (default: 4, max: 32)
    #[arg(short = 'c', long = "concurrency", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Output results in CSV format
    #[arg(long = "csv", help_heading = "Output Format")]
    pub csv: bool,

    /// Highlight domains expiring on or before this date (default: 30 days from today)
    #[arg(
        long = "expiring-before",
        value_name = "YYYY-MM-DD",
        help_heading = "Output Format"
    )]
    pub expiring_before: Option<NaiveDate>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logs
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// Everything a run needs after all configuration layers are applied.
#[derive(Debug, Clone)]
struct Settings {
    providers: ProviderConfig,
    check: CheckConfig,
    format: OutputFormat,
    lapsing_by: NaiveDate,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(&args);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "expiry-check starting");

    match run_expiry_check(args).await {
        Ok(outcome) => process::exit(exit_code(&outcome)),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.packages.is_empty() && args.file.is_none() {
        return Err("You must specify package names or a file with --file".to_string());
    }

    let output_formats = [args.json, args.csv].iter().filter(|&&x| x).count();
    if output_formats > 1 {
        return Err("Cannot specify multiple output formats (--json, --csv)".to_string());
    }

    if args.native && args.no_native {
        return Err("Cannot specify both --native and --no-native".to_string());
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > 32 {
            return Err("Concurrency must be between 1 and 32".to_string());
        }
    }

    if let Some(command) = &args.custom {
        if command.trim().is_empty() {
            return Err("--custom needs a command".to_string());
        }
    }

    Ok(())
}

/// Route library and CLI logs to stderr.
///
/// `RUST_LOG` wins over `--verbose` / `--debug`.
fn init_logging(args: &Args) {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "expiry_check={level},expiry_check_lib={level}"
                ))
            }),
        )
        .with_writer(std::io::stderr)
        .with_target(args.debug)
        .init();
}

fn exit_code(outcome: &RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Completed => 0,
        RunOutcome::Cancelled => EXIT_CANCELLED,
        RunOutcome::Failed(_) => 1,
    }
}

/// Main batch logic
async fn run_expiry_check(args: Args) -> Result<RunOutcome, Box<dyn std::error::Error>> {
    let settings = build_settings(&args).await?;
    let packages = get_packages(&args)?;
    let is_table = settings.format == OutputFormat::Table;

    let cache = Arc::new(ExpirationCache::new());
    let orchestrator =
        BatchOrchestrator::from_config(&settings.providers, settings.check.clone(), cache)?;

    let package_count = count_package_names(&packages);
    if is_table {
        ui::print_header(
            package_count,
            &settings.providers.enabled(),
            settings.check.concurrency,
        );
    }

    let start_time = Instant::now();
    let mut handle = orchestrator.spawn(packages)?;
    watch_for_interrupt(handle.cancellation_token());

    // Spinner::start returns None if stderr isn't a TTY.
    let spinner = if is_table {
        ui::Spinner::start(format!("Resolving {} packages...", package_count))
    } else {
        None
    };

    let mut rows: Vec<ResolutionRow> = Vec::new();
    while let Some(event) = handle.next_event().await {
        match event {
            BatchEvent::Row(row) => {
                tracing::debug!(package = %row.package, domain = %row.domain, expiration = %row.expiration, "row");
                rows.push(row);
            }
            BatchEvent::Progress(progress) => {
                if let Some(s) = &spinner {
                    s.set_message(ui::progress_message(&progress));
                }
            }
        }
    }
    let outcome = handle.wait().await;

    // Stop spinner before printing results
    if let Some(s) = spinner {
        s.stop().await;
    }

    display_results(&rows, &settings, &outcome, start_time.elapsed())?;

    Ok(outcome)
}

/// First Ctrl-C cancels the batch, a second one exits immediately.
fn watch_for_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("cancellation requested, finishing in-flight lookups");
        token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            process::exit(EXIT_CANCELLED);
        }
    });
}

/// Build the run settings from every configuration layer.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments (explicit user input)
/// 2. Provider detection (--detect)
/// 3. Environment variables (EXPIRY_*)
/// 4. Config file (--config, or discovered files)
/// 5. Built-in defaults
async fn build_settings(args: &Args) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut providers = ProviderConfig::default();
    let mut check = CheckConfig::default();

    let file_config = match &args.config {
        Some(path) => ConfigManager::new().load_file(path)?,
        None => ConfigManager::new().discover_and_load(),
    };
    file_config.apply(&mut providers, &mut check);

    load_env_config().apply(&mut providers, &mut check);

    if args.detect {
        detect_providers(&mut providers).await;
    }

    apply_cli_args(args, &mut providers, &mut check);
    providers.validate()?;

    Ok(Settings {
        providers,
        check,
        format: output_format(args, &file_config),
        lapsing_by: args.expiring_before.unwrap_or_else(default_lapse_date),
    })
}

/// Turn on docker and the custom command when they can be launched.
async fn detect_providers(providers: &mut ProviderConfig) {
    let term = Term::stderr();

    if detect_docker().await {
        providers.docker = true;
        let _ = term.write_line("Detected docker, enabling the docker provider");
    }

    let command = providers.custom_command.clone();
    if detect_command(&command).await {
        providers.custom = true;
        let _ = term.write_line(&format!(
            "Detected '{}', enabling the custom provider",
            command
        ));
    }
}

fn apply_cli_args(args: &Args, providers: &mut ProviderConfig, check: &mut CheckConfig) {
    if args.native {
        providers.native = true;
    }
    if args.no_native {
        providers.native = false;
    }
    if args.docker {
        providers.docker = true;
    }
    if let Some(command) = &args.custom {
        *providers = providers.clone().with_custom(command.trim());
    }
    if let Some(concurrency) = args.concurrency {
        *check = check.clone().with_concurrency(concurrency);
    }
}

fn output_format(args: &Args, file_config: &FileConfig) -> OutputFormat {
    if args.json {
        return OutputFormat::Json;
    }
    if args.csv {
        return OutputFormat::Csv;
    }
    match file_config.output_format() {
        Some("json") => OutputFormat::Json,
        Some("csv") => OutputFormat::Csv,
        _ => OutputFormat::Table,
    }
}

fn default_lapse_date() -> NaiveDate {
    let today = Local::now().date_naive();
    today
        .checked_add_days(Days::new(DEFAULT_LAPSE_WINDOW_DAYS))
        .unwrap_or(today)
}

/// Collect package lines from the arguments and the input file.
fn get_packages(args: &Args) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut packages = args.packages.clone();

    match args.file.as_deref() {
        Some("-") => packages.extend(read_packages_from_reader(std::io::stdin().lock())?),
        Some(path) => packages.extend(read_packages_from_file(path)?),
        None => {}
    }

    if count_package_names(&packages) == 0 {
        tracing::info!(lines = packages.len(), "input names no packages");
    }

    Ok(packages)
}

fn display_results(
    rows: &[ResolutionRow],
    settings: &Settings,
    outcome: &RunOutcome,
    duration: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    match settings.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Csv => print!("{}", format_csv(rows)),
        OutputFormat::Table => {
            ui::print_table(rows, settings.lapsing_by);
            let summary = BatchSummary::from_rows(rows, settings.lapsing_by);
            ui::print_summary(&summary, settings.lapsing_by, outcome, duration);
        }
    }

    if settings.format != OutputFormat::Table && *outcome != RunOutcome::Completed {
        eprintln!("{}", outcome);
    }

    Ok(())
}

/// Render rows as CSV with a header line.
fn format_csv(rows: &[ResolutionRow]) -> String {
    let mut out = String::from("package,domain,expiration\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{}\n",
            csv_field(&row.package),
            csv_field(&row.domain),
            row.expiration
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
