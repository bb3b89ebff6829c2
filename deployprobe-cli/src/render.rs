//! Console rendering of diagnostic results

use std::io::IsTerminal;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use deployprobe_common::{
    ContainerLogs, DiagnosticReport, FailureReason, LogExcerpt, NetworkOutcome, NetworkReport,
    Phase, ProbeResult, StatusReport, FAILED_MARKER, NO_ERRORS_MARKER,
};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub color: bool,
    /// Show failure causes under the fixed markers
    pub detailed: bool,
}

impl RenderOptions {
    /// Colors only when stdout is a terminal and `NO_COLOR` is unset
    pub fn for_stdout(detailed: bool) -> Self {
        Self {
            color: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
            detailed,
        }
    }
}

pub fn serialize<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Text => anyhow::bail!("text output has no serialized form"),
    })
}

fn heading(title: &str, opts: RenderOptions) -> String {
    let line = format!("--- {} ---", title);
    if opts.color {
        line.bold().to_string()
    } else {
        line
    }
}

fn failed(text: &str, opts: RenderOptions) -> String {
    if opts.color {
        text.red().bold().to_string()
    } else {
        text.to_string()
    }
}

/// The orchestrator's own error text when there is one
fn failure_text(reason: &FailureReason) -> String {
    match reason {
        FailureReason::NonZeroExit { stderr, .. } if !stderr.is_empty() => stderr.clone(),
        other => other.to_string(),
    }
}

pub fn header(host: &str, generated_at: DateTime<Utc>, opts: RenderOptions) -> String {
    let title = format!("=== Deployment diagnostics: {} ===", host);
    let title = if opts.color { title.bold().to_string() } else { title };
    format!(
        "{}\nGenerated: {}\n",
        title,
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

pub fn connectivity(report: &NetworkReport, opts: RenderOptions) -> String {
    let mut out = heading(&format!("Network {}", report.network), opts);
    out.push('\n');

    match &report.outcome {
        NetworkOutcome::Members { members, missing } => {
            if members.is_empty() {
                out.push_str("(no containers attached)\n");
            }
            for member in members {
                out.push_str(member);
                out.push('\n');
            }
            if !missing.is_empty() {
                let names: Vec<&str> = missing.iter().map(|m| m.as_str()).collect();
                out.push_str(&failed(&format!("Missing from network: {}", names.join(", ")), opts));
                out.push('\n');
            }
        }
        NetworkOutcome::Failed { reason } => {
            out.push_str(&failed(&failure_text(reason), opts));
            out.push('\n');
        }
    }
    out
}

pub fn reachability(results: &[ProbeResult], opts: RenderOptions) -> String {
    let mut out = heading("Internal reachability", opts);
    out.push('\n');

    for result in results {
        if opts.detailed {
            out.push_str(&format!("{} ({}):\n", result.label, result.url));
        } else {
            out.push_str(&format!("{}:\n", result.label));
        }
        match result.outcome.reason() {
            None => out.push_str(result.outcome.display_line()),
            Some(reason) => {
                out.push_str(&failed(FAILED_MARKER, opts));
                if opts.detailed {
                    out.push_str(&format!("\n    cause: {}", reason));
                }
            }
        }
        out.push('\n');
    }
    out
}

pub fn logs(logs: &[ContainerLogs], opts: RenderOptions) -> String {
    let mut out = String::new();

    for entry in logs {
        out.push_str(&heading(&format!("Recent errors: {}", entry.container), opts));
        out.push('\n');
        match &entry.excerpt {
            LogExcerpt::Lines { lines } => {
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            LogExcerpt::NoErrors => {
                out.push_str(NO_ERRORS_MARKER);
                out.push('\n');
            }
            // Reported like the empty case unless causes were asked for
            LogExcerpt::FetchFailed { reason } => {
                out.push_str(NO_ERRORS_MARKER);
                if opts.detailed {
                    out.push_str(&failed(&format!(" (log fetch failed: {})", reason), opts));
                }
                out.push('\n');
            }
        }
    }
    out
}

#[derive(Tabled)]
struct StatusLine {
    #[tabled(rename = "NAMES")]
    name: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "PORTS")]
    ports: String,
}

pub fn status(report: &StatusReport, opts: RenderOptions) -> String {
    let mut out = heading("Container status", opts);
    out.push('\n');

    match report {
        StatusReport::Rows { rows } if rows.is_empty() => out.push_str("No running containers\n"),
        StatusReport::Rows { rows } => {
            let lines = rows.iter().map(|row| StatusLine {
                name: row.name.clone(),
                status: row.status.clone(),
                ports: row.ports.clone(),
            });
            let mut table = Table::new(lines);
            table.with(Style::blank());
            out.push_str(&table.to_string());
            out.push('\n');
        }
        StatusReport::Failed { reason } => {
            out.push_str(&failed(&failure_text(reason), opts));
            out.push('\n');
        }
    }
    out
}

/// Text for one phase of a report; empty when the phase has not run
pub fn phase(report: &DiagnosticReport, phase: Phase, opts: RenderOptions) -> String {
    match phase {
        Phase::Connectivity => report
            .connectivity
            .as_ref()
            .map(|c| connectivity(c, opts))
            .unwrap_or_default(),
        Phase::Reachability => reachability(&report.reachability, opts),
        Phase::Logs => logs(&report.logs, opts),
        Phase::Status => report
            .status
            .as_ref()
            .map(|s| status(s, opts))
            .unwrap_or_default(),
    }
}
