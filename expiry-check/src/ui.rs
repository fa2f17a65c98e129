//! Terminal display logic for the expiry-check CLI.
//!
//! This module handles the human-facing output: the progress spinner,
//! the run header, the expiration table and the closing summary. Progress
//! goes to stderr so stdout stays clean for the results.

use chrono::NaiveDate;
use console::{pad_str, style, Alignment, Term};
use expiry_check_lib::{BatchProgress, BatchSummary, ExpirationResult, ProviderKind, ResolutionRow, RunOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
pub struct Spinner {
    running: Arc<AtomicBool>,
    message: Arc<Mutex<String>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner, or return `None` when stderr is not a terminal.
    pub fn start(message: String) -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let message = Arc::new(Mutex::new(message));
        let running_clone = running.clone();
        let message_clone = message.clone();

        let handle = tokio::spawn(async move {
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let text = message_clone
                    .lock()
                    .map(|m| m.clone())
                    .unwrap_or_default();
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), text));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Some(Self {
            running,
            message,
            handle: Some(handle),
        })
    }

    /// Replace the text shown next to the spinner.
    pub fn set_message(&self, message: String) {
        if let Ok(mut current) = self.message.lock() {
            *current = message;
        }
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

/// Spinner text for a progress snapshot.
pub fn progress_message(progress: &BatchProgress) -> String {
    format!(
        "Resolving... {}/{} packages, {} domain{}",
        progress.completed_packages,
        progress.total_packages,
        progress.completed_domains,
        if progress.completed_domains == 1 { "" } else { "s" },
    )
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header to stderr at the start of a run.
pub fn print_header(package_count: usize, providers: &[ProviderKind], concurrency: usize) {
    let term = Term::stderr();
    let names: Vec<String> = providers.iter().map(|p| p.to_string()).collect();

    let _ = term.write_line(&format!(
        "{} {} {}",
        style("expiry-check").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "· {} package{}",
            package_count,
            if package_count == 1 { "" } else { "s" }
        ))
        .dim(),
    ));
    let _ = term.write_line(
        &style(format!(
            "Providers: {} | Concurrency: {}",
            names.join(" → "),
            concurrency
        ))
        .dim()
        .to_string(),
    );
    let _ = term.write_line("");
}

// ── Table ────────────────────────────────────────────────────────────────────

/// Rows ordered by expiration: soonest date first, then `Unknown`, then
/// `Error`. Ties keep their arrival order.
pub fn sorted_rows(rows: &[ResolutionRow]) -> Vec<&ResolutionRow> {
    let mut sorted: Vec<&ResolutionRow> = rows.iter().collect();
    sorted.sort_by_key(|row| match row.expiration {
        ExpirationResult::Known(date) => (0, Some(date)),
        ExpirationResult::Unknown => (1, None),
        ExpirationResult::Error => (2, None),
    });
    sorted
}

/// Print the results table to stdout.
pub fn print_table(rows: &[ResolutionRow], lapsing_by: NaiveDate) {
    let package_width = 32;
    let domain_width = 32;

    println!(
        "  {}  {}  {}",
        style(pad_str("PACKAGE", package_width, Alignment::Left, None)).bold(),
        style(pad_str("DOMAIN", domain_width, Alignment::Left, None)).bold(),
        style("EXPIRES").bold(),
    );

    for row in sorted_rows(rows) {
        let package = pad_str(&row.package, package_width, Alignment::Left, Some(".."));
        let domain = pad_str(&row.domain, domain_width, Alignment::Left, Some(".."));
        println!(
            "  {}  {}  {}",
            style(package).white(),
            style(domain).white(),
            styled_expiration(row.expiration, lapsing_by),
        );
    }
}

fn styled_expiration(expiration: ExpirationResult, lapsing_by: NaiveDate) -> String {
    match expiration {
        ExpirationResult::Known(date) if date <= lapsing_by => {
            style(expiration.to_string()).red().bold().to_string()
        }
        ExpirationResult::Known(_) => style(expiration.to_string()).green().to_string(),
        ExpirationResult::Unknown => style(expiration.to_string()).yellow().to_string(),
        ExpirationResult::Error => style(expiration.to_string()).red().dim().to_string(),
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the closing summary to stderr.
pub fn print_summary(
    summary: &BatchSummary,
    lapsing_by: NaiveDate,
    outcome: &RunOutcome,
    duration: Duration,
) {
    let term = Term::stderr();

    let _ = term.write_line("");
    let _ = term.write_line(&format!(
        "  {} domain{} in {:.1}s  {}  {}  {}  {}  {}  {}",
        style(summary.rows).bold(),
        if summary.rows == 1 { "" } else { "s" },
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} known", summary.known)).green(),
        style("|").dim(),
        style(format!("{} unknown", summary.unknown)).yellow(),
        style("|").dim(),
        style(format!("{} failed", summary.errors)).red(),
    ));

    if !summary.lapsing.is_empty() {
        let domains: Vec<&str> = summary.lapsing.iter().map(|r| r.domain.as_str()).collect();
        let _ = term.write_line(&format!(
            "  {} {} lapsing by {}: {}",
            style("!").red().bold(),
            summary.lapsing.len(),
            lapsing_by,
            format_list(&domains, 5),
        ));
    }

    let status = match outcome {
        RunOutcome::Completed => style(outcome.to_string()).green(),
        RunOutcome::Cancelled => style(outcome.to_string()).yellow(),
        RunOutcome::Failed(_) => style(outcome.to_string()).red(),
    };
    let _ = term.write_line(&format!("  {}", status));
}

/// Comma-separated list, truncated after `max_show` entries.
fn format_list(items: &[&str], max_show: usize) -> String {
    if items.len() <= max_show {
        items.join(", ")
    } else {
        format!(
            "{}, ... and {} more",
            items[..max_show].join(", "),
            items.len() - max_show
        )
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
