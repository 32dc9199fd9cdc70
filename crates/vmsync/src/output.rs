//! Output formatting: table, JSON, YAML.
//!
//! Renders run reports in the format selected by `--output`. Tables use
//! `tabled`, structured formats serialize the report itself via serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use vmsync_core::report::{BatchReport, ItemRef, MaintenanceReport, ReconcileReport};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a report: `table` via `table_fn`, the rest via serde.
pub fn render<T: serde::Serialize>(
    format: OutputFormat,
    data: &T,
    table_fn: impl Fn(&T) -> String,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table => table_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// One-line status message on stderr.
pub fn print_status(message: &str, quiet: bool, color: bool) {
    if quiet {
        return;
    }
    if color {
        eprintln!("{} {message}", "✓".green());
    } else {
        eprintln!("{message}");
    }
}

/// Warning line on stderr; shown even in quiet mode.
pub fn print_warning(message: &str, color: bool) {
    if color {
        eprintln!("{} {message}", "!".yellow().bold());
    } else {
        eprintln!("warning: {message}");
    }
}

// ── Report tables ────────────────────────────────────────────────────

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl OutcomeRow {
    fn ok(status: &'static str, item: &ItemRef) -> Self {
        Self {
            status,
            id: item.id.to_string(),
            name: item.name.clone(),
            detail: String::new(),
        }
    }
}

fn table<R: Tabled>(rows: Vec<R>, summary: &str) -> String {
    if rows.is_empty() {
        return summary.to_owned();
    }
    format!("{}\n{summary}", Table::new(rows).with(Style::rounded()))
}

pub fn reconcile_table(report: &ReconcileReport) -> String {
    let mut rows: Vec<OutcomeRow> = Vec::with_capacity(report.total());
    rows.extend(report.updated.iter().map(|i| OutcomeRow::ok("updated", i)));
    rows.extend(report.invalid.iter().map(|i| OutcomeRow {
        status: "invalid",
        id: i.id.to_string(),
        name: i.name.clone(),
        detail: i
            .fields
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    }));
    rows.extend(report.failed.iter().map(|f| OutcomeRow {
        status: "failed",
        id: f.id.to_string(),
        name: f.name.clone(),
        detail: f.message.clone(),
    }));
    rows.extend(report.unmatched.iter().map(|id| OutcomeRow {
        status: "unmatched",
        id: id.to_string(),
        name: String::new(),
        detail: "no live entity with this id".into(),
    }));
    rows.extend(report.abandoned.iter().map(|id| OutcomeRow {
        status: "skipped",
        id: id.to_string(),
        name: String::new(),
        detail: "batch aborted first".into(),
    }));

    let summary = format!(
        "{} updated, {} invalid, {} failed, {} unmatched, {} not attempted",
        report.updated.len(),
        report.invalid.len(),
        report.failed.len(),
        report.unmatched.len(),
        report.abandoned.len(),
    );
    table(rows, &summary)
}

#[derive(Tabled)]
struct UnitRow {
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

pub fn batch_table(report: &BatchReport) -> String {
    let mut rows: Vec<UnitRow> = report
        .completed
        .iter()
        .map(|u| UnitRow {
            status: "added",
            name: u.name.clone(),
            detail: u.hardware_path.clone(),
        })
        .collect();
    rows.extend(report.failed.iter().map(|u| UnitRow {
        status: "failed",
        name: u.name.clone(),
        detail: format!("{}: {}", u.address, u.reason),
    }));

    let elapsed = (report.finished_at - report.started_at).num_seconds();
    let summary = format!(
        "{} added, {} failed in {elapsed}s",
        report.completed.len(),
        report.failed.len()
    );
    table(rows, &summary)
}

pub fn maintenance_table(report: &MaintenanceReport) -> String {
    let mut rows: Vec<OutcomeRow> = report
        .succeeded
        .iter()
        .map(|i| OutcomeRow::ok("done", i))
        .collect();
    rows.extend(report.failed.iter().map(|f| OutcomeRow {
        status: "failed",
        id: f.id.to_string(),
        name: f.name.clone(),
        detail: f.message.clone(),
    }));
    let summary = format!(
        "{} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    table(rows, &summary)
}
