//! Parsing of orchestrator output
//!
//! All helpers are pure so they can be exercised without a remote host.

use crate::types::StatusRow;

/// Field separator used in the `docker ps --format` template
pub const STATUS_FIELD_SEPARATOR: char = '|';

/// First line of a command's output, or `None` when that line is blank.
///
/// A whitespace-only first line counts as empty output, even when later
/// lines carry text.
pub fn first_line(output: &str) -> Option<&str> {
    let line = output.lines().next()?.trim_end_matches('\r');
    if line.trim().is_empty() {
        None
    } else {
        Some(line)
    }
}

/// Last `max` lines of `text` containing `needle`, compared case-insensitively.
pub fn matching_tail(text: &str, needle: &str, max: usize) -> Vec<String> {
    let needle = needle.to_lowercase();
    let matching: Vec<&str> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| line.to_lowercase().contains(&needle))
        .collect();

    let skip = matching.len().saturating_sub(max);
    matching[skip..].iter().map(|line| line.to_string()).collect()
}

/// Container names printed one per line by `docker network inspect`
pub fn network_members(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rows printed by `docker ps` with a `name|status|ports` template.
///
/// A line without separators is kept with its text in the name column.
pub fn status_rows(output: &str) -> Vec<StatusRow> {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut fields = line.splitn(3, STATUS_FIELD_SEPARATOR);
            StatusRow {
                name: fields.next().unwrap_or_default().trim().to_string(),
                status: fields.next().unwrap_or_default().trim().to_string(),
                ports: fields.next().unwrap_or_default().trim().to_string(),
            }
        })
        .collect()
}
