//! Output formatters for run reports
//!
//! Provides table, JSON, and summary output formats.

#![allow(dead_code)]

use crate::error::SwarmError;
use crate::models::{RunReport, RunStatus, UnitStatus};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }

    /// Resolve a user-supplied format name. Unknown names are
    /// configuration errors, not a silent fallback.
    pub fn parse(s: &str) -> Result<Self, SwarmError> {
        Self::from_str(s).ok_or_else(|| {
            SwarmError::config(format!(
                "unknown output format '{s}' (expected table, json, json-pretty, or summary)"
            ))
        })
    }
}

/// Run report formatter
pub struct ReportFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ReportFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn format_report(&self, report: &RunReport) -> String {
        match self.format {
            OutputFormat::Table => self.format_table(report),
            OutputFormat::Json => serde_json::to_string(report).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Summary => self.format_brief(report),
        }
    }

    fn format_table(&self, report: &RunReport) -> String {
        let mut output = String::new();

        output.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        output.push_str(&format!(
            "  Run {} ({} mode, {} unit(s))\n",
            report.run_id, report.mode, report.requested_count
        ));
        output.push_str("──────────────────────────────────────────────────────────────\n");

        for unit in &report.units {
            let status = self.status_cell(unit.status);
            let exit = unit
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            let artifacts = unit
                .artifact_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "(remote)".to_string());
            output.push_str(&format!(
                "  {:3}  {:22} exit {:>4}  {}\n",
                unit.index, status, exit, artifacts
            ));
        }

        output.push_str("──────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "  {}: {}/{} unit(s) succeeded\n",
            self.verdict_cell(report.overall),
            report.succeeded_count(),
            report.units.len()
        ));
        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        output
    }

    fn format_brief(&self, report: &RunReport) -> String {
        format!(
            "{} run {}: {} of {} unit(s) succeeded",
            report.overall,
            report.run_id,
            report.succeeded_count(),
            report.units.len()
        )
    }

    fn status_cell(&self, status: UnitStatus) -> String {
        let plain = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return plain;
        }
        match status {
            UnitStatus::Succeeded => format!("\x1b[32m{plain}\x1b[0m"),
            UnitStatus::Failed => format!("\x1b[31m{plain}\x1b[0m"),
            UnitStatus::Unknown => format!("\x1b[33m{plain}\x1b[0m"),
            _ => plain,
        }
    }

    fn verdict_cell(&self, verdict: RunStatus) -> String {
        if !self.colorize {
            return verdict.to_string();
        }
        match verdict {
            RunStatus::Success => format!("\x1b[32m{verdict}\x1b[0m"),
            RunStatus::Failure => format!("\x1b[31m{verdict}\x1b[0m"),
        }
    }
}
