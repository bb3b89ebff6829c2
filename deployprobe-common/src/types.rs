//! Report types produced by a diagnostic run
//!
//! Everything here is transient: built while a run progresses, printed or
//! serialized once, then dropped.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker printed for a reachability probe that did not produce a line
pub const FAILED_MARKER: &str = "FAILED";

/// Marker printed for a container without matching log lines
pub const NO_ERRORS_MARKER: &str = "No errors found";

/// Name of a container on the target host
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerRef(String);

impl ContainerRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerRef {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ContainerRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Why a remote step did not yield usable output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The ssh channel itself failed (spawn error, connection refused, auth)
    Transport { message: String },
    /// The remote command ran and exited non-zero
    NonZeroExit { code: i32, stderr: String },
    /// The remote command succeeded but printed nothing
    EmptyOutput,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Transport { message } => write!(f, "transport failure: {}", message),
            FailureReason::NonZeroExit { code, stderr } if stderr.is_empty() => {
                write!(f, "exit status {}", code)
            }
            FailureReason::NonZeroExit { code, stderr } => {
                write!(f, "exit status {}: {}", code, stderr)
            }
            FailureReason::EmptyOutput => write!(f, "empty output"),
        }
    }
}

/// Result of one reachability probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Ok { line: String },
    Failed { reason: FailureReason },
}

impl ProbeOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeOutcome::Ok { .. })
    }

    /// The line shown on the console: the response line or the failure marker
    pub fn display_line(&self) -> &str {
        match self {
            ProbeOutcome::Ok { line } => line,
            ProbeOutcome::Failed { .. } => FAILED_MARKER,
        }
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            ProbeOutcome::Ok { .. } => None,
            ProbeOutcome::Failed { reason } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub label: String,
    pub source: ContainerRef,
    pub destination: ContainerRef,
    pub url: String,
    pub outcome: ProbeOutcome,
}

/// Recent error lines of one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LogExcerpt {
    Lines { lines: Vec<String> },
    NoErrors,
    FetchFailed { reason: FailureReason },
}

impl LogExcerpt {
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, LogExcerpt::FetchFailed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerLogs {
    pub container: ContainerRef,
    pub excerpt: LogExcerpt,
}

/// Membership of the application network
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum NetworkOutcome {
    Members {
        members: Vec<String>,
        missing: Vec<ContainerRef>,
    },
    Failed {
        reason: FailureReason,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkReport {
    pub network: String,
    pub outcome: NetworkOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    pub name: String,
    pub status: String,
    pub ports: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StatusReport {
    Rows { rows: Vec<StatusRow> },
    Failed { reason: FailureReason },
}

/// Phases of a diagnostic run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Connectivity,
    Reachability,
    Logs,
    Status,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Connectivity,
        Phase::Reachability,
        Phase::Logs,
        Phase::Status,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connectivity => "connectivity",
            Phase::Reachability => "reachability",
            Phase::Logs => "logs",
            Phase::Status => "status",
        };
        f.write_str(name)
    }
}

/// Everything one diagnostic run observed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub host: String,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<NetworkReport>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub reachability: Vec<ProbeResult>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub logs: Vec<ContainerLogs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusReport>,
}

impl DiagnosticReport {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            generated_at: Utc::now(),
            connectivity: None,
            reachability: Vec::new(),
            logs: Vec::new(),
            status: None,
        }
    }

    pub fn failed_probes(&self) -> usize {
        self.reachability.iter().filter(|p| !p.outcome.is_ok()).count()
    }

    /// True when any probe failed or any log fetch failed
    pub fn has_failures(&self) -> bool {
        self.failed_probes() > 0 || self.logs.iter().any(|l| l.excerpt.is_fetch_failure())
    }
}
