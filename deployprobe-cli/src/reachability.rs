//! Internal reachability phase
//!
//! Every probe in the matrix runs unconditionally and in order; one probe
//! failing never affects the next.

use deployprobe_common::{parse, FailureReason, ProbeOutcome, ProbeResult, ProbeSpec, ProberConfig};
use tracing::{debug, warn};

use crate::docker;
use crate::remote::{run_checked, RemoteExecutor};

pub async fn probe_all(exec: &dyn RemoteExecutor, config: &ProberConfig) -> Vec<ProbeResult> {
    let mut results = Vec::with_capacity(config.probes.len());
    for probe in &config.probes {
        results.push(probe_one(exec, config, probe).await);
    }
    results
}

async fn probe_one(exec: &dyn RemoteExecutor, config: &ProberConfig, probe: &ProbeSpec) -> ProbeResult {
    let url = config
        .probe_url(probe)
        .unwrap_or_else(|| format!("http://{}{}", probe.destination, probe.path));
    let label = probe.label();
    debug!("Probing {} at {}", label, url);

    let command = docker::http_probe(&probe.source, &url, config.probe_timeout_secs);
    let outcome = match run_checked(exec, &command).await {
        Ok(stdout) => match parse::first_line(&stdout) {
            Some(line) => ProbeOutcome::Ok {
                line: line.to_string(),
            },
            None => ProbeOutcome::Failed {
                reason: FailureReason::EmptyOutput,
            },
        },
        Err(reason) => ProbeOutcome::Failed { reason },
    };

    if let Some(reason) = outcome.reason() {
        warn!("Probe {} failed: {}", label, reason);
    }

    ProbeResult {
        label,
        source: probe.source.clone(),
        destination: probe.destination.clone(),
        url,
        outcome,
    }
}
