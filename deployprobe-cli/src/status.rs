//! Status phase: running containers and their published ports

use deployprobe_common::{parse, StatusReport};
use tracing::{info, warn};

use crate::docker;
use crate::remote::{run_checked, RemoteExecutor};

pub async fn running_containers(exec: &dyn RemoteExecutor) -> StatusReport {
    match run_checked(exec, &docker::running_containers()).await {
        Ok(stdout) => {
            let rows = parse::status_rows(&stdout);
            info!("{} running containers", rows.len());
            StatusReport::Rows { rows }
        }
        Err(reason) => {
            warn!("Listing containers failed: {}", reason);
            StatusReport::Failed { reason }
        }
    }
}
