//! The `diagnose` command: connectivity, reachability, logs and status
//!
//! Phases run one after another in a fixed order. A failing phase is recorded
//! in the report and the run moves on.

use std::collections::BTreeSet;

use anyhow::Result;
use clap::{Args, ValueEnum};
use deployprobe_common::{DiagnosticReport, Phase, ProberConfig};
use tracing::info;

use crate::remote::RemoteExecutor;
use crate::render::{self, OutputFormat, RenderOptions};
use crate::{connectivity, logs, reachability, status, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    Connectivity,
    Reachability,
    Logs,
    Status,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Connectivity => Phase::Connectivity,
            PhaseArg::Reachability => Phase::Reachability,
            PhaseArg::Logs => Phase::Logs,
            PhaseArg::Status => Phase::Status,
        }
    }
}

#[derive(Debug, Args)]
pub struct DiagnoseArgs {
    /// Phase to run; repeat for several (default: all)
    #[arg(short, long = "phase", value_enum)]
    pub phases: Vec<PhaseArg>,
    /// Output format (text, json, yaml)
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Show why a probe or log fetch failed
    #[arg(short, long)]
    pub detailed: bool,
    /// Exit with status 2 when any probe or log fetch failed
    #[arg(long)]
    pub strict: bool,
}

/// Selected phases in execution order, all of them when none were named
pub fn selected_phases(args: &[PhaseArg]) -> Vec<Phase> {
    if args.is_empty() {
        return Phase::ALL.to_vec();
    }
    args.iter()
        .map(|&arg| Phase::from(arg))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Run `phases` in order, calling `on_phase` after each one completes
pub async fn run_diagnostics<F>(
    exec: &dyn RemoteExecutor,
    config: &ProberConfig,
    phases: &[Phase],
    mut on_phase: F,
) -> DiagnosticReport
where
    F: FnMut(Phase, &DiagnosticReport),
{
    let mut report = DiagnosticReport::new(config.host.clone());

    for &phase in phases {
        info!("Running {} phase", phase);
        match phase {
            Phase::Connectivity => {
                report.connectivity = Some(connectivity::inspect_network(exec, config).await);
            }
            Phase::Reachability => {
                report.reachability = reachability::probe_all(exec, config).await;
            }
            Phase::Logs => {
                report.logs = logs::collect_all(exec, config).await;
            }
            Phase::Status => {
                report.status = Some(status::running_containers(exec).await);
            }
        }
        on_phase(phase, &report);
    }

    report
}

pub async fn handle_command(
    args: DiagnoseArgs,
    config: &ProberConfig,
    exec: &dyn RemoteExecutor,
) -> Result<Verdict> {
    let phases = selected_phases(&args.phases);

    let report = match args.format {
        OutputFormat::Text => {
            let opts = RenderOptions::for_stdout(args.detailed);
            println!("{}", render::header(&config.host, chrono::Utc::now(), opts));
            run_diagnostics(exec, config, &phases, |phase, report| {
                println!("{}", render::phase(report, phase, opts));
            })
            .await
        }
        format => {
            let report = run_diagnostics(exec, config, &phases, |_, _| {}).await;
            println!("{}", render::serialize(&report, format)?);
            report
        }
    };

    info!(
        "Diagnostics finished: {} of {} probes failed",
        report.failed_probes(),
        report.reachability.len()
    );

    if args.strict && report.has_failures() {
        Ok(Verdict::Degraded)
    } else {
        Ok(Verdict::Pass)
    }
}
