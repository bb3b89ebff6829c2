//! Orchestrator command lines run on the target host

use deployprobe_common::parse::STATUS_FIELD_SEPARATOR;
use deployprobe_common::ContainerRef;

use crate::remote::RemoteCommand;

const NETWORK_MEMBERS_TEMPLATE: &str = "{{range .Containers}}{{println .Name}}{{end}}";

/// `docker network inspect`, one member name per line
pub fn network_members(network: &str) -> RemoteCommand {
    RemoteCommand::new([
        "docker",
        "network",
        "inspect",
        network,
        "--format",
        NETWORK_MEMBERS_TEMPLATE,
    ])
}

/// HTTP GET issued from inside `source`; non-2xx responses exit non-zero
pub fn http_probe(source: &ContainerRef, url: &str, timeout_secs: Option<u64>) -> RemoteCommand {
    let mut argv = vec![
        "docker".to_string(),
        "exec".to_string(),
        source.to_string(),
        "curl".to_string(),
        "-fsS".to_string(),
    ];
    if let Some(secs) = timeout_secs {
        argv.push("--max-time".to_string());
        argv.push(secs.to_string());
    }
    argv.push(url.to_string());
    RemoteCommand::new(argv)
}

/// Combined stdout/stderr log history of a container
pub fn logs(container: &ContainerRef, tail: Option<usize>) -> RemoteCommand {
    let mut argv = vec!["docker".to_string(), "logs".to_string()];
    if let Some(lines) = tail {
        argv.push("--tail".to_string());
        argv.push(lines.to_string());
    }
    argv.push(container.to_string());
    RemoteCommand::new(argv).merge_stderr()
}

/// Running containers as `name|status|ports` lines
pub fn running_containers() -> RemoteCommand {
    let sep = STATUS_FIELD_SEPARATOR;
    RemoteCommand::new([
        "docker".to_string(),
        "ps".to_string(),
        "--format".to_string(),
        format!("{{{{.Names}}}}{sep}{{{{.Status}}}}{sep}{{{{.Ports}}}}"),
    ])
}
