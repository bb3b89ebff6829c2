//! Connectivity phase: who is attached to the application network

use deployprobe_common::{parse, ContainerRef, NetworkOutcome, NetworkReport, ProberConfig};
use tracing::{info, warn};

use crate::docker;
use crate::remote::{run_checked, RemoteExecutor};

pub async fn inspect_network(exec: &dyn RemoteExecutor, config: &ProberConfig) -> NetworkReport {
    info!("Inspecting network {}", config.network_name);

    let outcome = match run_checked(exec, &docker::network_members(&config.network_name)).await {
        Ok(stdout) => {
            let members = parse::network_members(&stdout);
            let missing: Vec<ContainerRef> = config
                .containers()
                .filter(|name| !members.iter().any(|m| m == name.as_str()))
                .cloned()
                .collect();
            if !missing.is_empty() {
                warn!("Containers not attached to {}: {:?}", config.network_name, missing);
            }
            NetworkOutcome::Members { members, missing }
        }
        Err(reason) => {
            warn!("Network inspection failed: {}", reason);
            NetworkOutcome::Failed { reason }
        }
    };

    NetworkReport {
        network: config.network_name.clone(),
        outcome,
    }
}
