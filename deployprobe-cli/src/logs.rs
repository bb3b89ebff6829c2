//! Log diagnostics phase: recent error lines per container

use deployprobe_common::{
    parse, ContainerLogs, ContainerRef, LogExcerpt, ProberConfig, MAX_LOG_EXCERPT_LINES,
};
use tracing::{debug, warn};

use crate::docker;
use crate::remote::{run_checked, RemoteExecutor};

pub async fn collect_all(exec: &dyn RemoteExecutor, config: &ProberConfig) -> Vec<ContainerLogs> {
    let mut logs = Vec::new();
    for container in config.containers() {
        logs.push(collect_one(exec, config, container).await);
    }
    logs
}

async fn collect_one(
    exec: &dyn RemoteExecutor,
    config: &ProberConfig,
    container: &ContainerRef,
) -> ContainerLogs {
    let command = docker::logs(container, config.log_scan_lines);
    let excerpt = match run_checked(exec, &command).await {
        Ok(history) => {
            let max = config.log_excerpt_lines.min(MAX_LOG_EXCERPT_LINES);
            let lines = parse::matching_tail(&history, &config.log_filter, max);
            debug!("{}: {} matching log lines", container, lines.len());
            if lines.is_empty() {
                LogExcerpt::NoErrors
            } else {
                LogExcerpt::Lines { lines }
            }
        }
        Err(reason) => {
            warn!("Fetching logs of {} failed: {}", container, reason);
            LogExcerpt::FetchFailed { reason }
        }
    };

    ContainerLogs {
        container: container.clone(),
        excerpt,
    }
}
