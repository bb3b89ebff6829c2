//! Remote execution over ssh
//!
//! Every orchestrator query runs as its own `ssh` process. Nothing is pooled
//! or kept open between commands.

use std::process::Stdio;

use async_trait::async_trait;
use deployprobe_common::{FailureReason, ProbeError, ProberConfig};
use tokio::process::Command;
use tracing::debug;

/// Exit status ssh reserves for its own failures
const SSH_ERROR_EXIT: i32 = 255;

/// A command line to run on the target host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    argv: Vec<String>,
    merge_stderr: bool,
}

impl RemoteCommand {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            merge_stderr: false,
        }
    }

    /// Redirect the remote stderr into stdout (`2>&1`)
    pub fn merge_stderr(mut self) -> Self {
        self.merge_stderr = true;
        self
    }

    /// The command as one string for the remote shell
    pub fn to_shell(&self) -> String {
        let mut line = self
            .argv
            .iter()
            .map(|arg| shell_quote(arg))
            .collect::<Vec<_>>()
            .join(" ");
        if self.merge_stderr {
            line.push_str(" 2>&1");
        }
        line
    }
}

/// Quote an argument for a POSIX shell, leaving plain words untouched
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Captured result of a finished remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[cfg(test)]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Stderr of a failed command. With `2>&1` the error lands on stdout, so
    /// the last non-blank stdout line stands in when stderr is empty.
    fn failure_text(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        self.stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string()
    }

    /// Stdout of a successful command, or why the command failed
    pub fn into_stdout(self) -> Result<String, FailureReason> {
        match self.exit_code {
            Some(0) => Ok(self.stdout),
            Some(SSH_ERROR_EXIT) => {
                let message = self.stderr.trim();
                Err(FailureReason::Transport {
                    message: if message.is_empty() {
                        format!("ssh exited with status {}", SSH_ERROR_EXIT)
                    } else {
                        message.to_string()
                    },
                })
            }
            Some(code) => Err(FailureReason::NonZeroExit {
                code,
                stderr: self.failure_text(),
            }),
            None => Err(FailureReason::Transport {
                message: "remote command terminated by signal".to_string(),
            }),
        }
    }
}

#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn run(&self, command: &RemoteCommand) -> Result<CommandOutput, ProbeError>;
}

/// Run a command, folding spawn and transport errors into a [`FailureReason`]
pub async fn run_checked(
    exec: &dyn RemoteExecutor,
    command: &RemoteCommand,
) -> Result<String, FailureReason> {
    match exec.run(command).await {
        Ok(output) => output.into_stdout(),
        Err(e) => Err(FailureReason::Transport {
            message: e.to_string(),
        }),
    }
}

/// Runs commands through the system ssh client
pub struct SshExecutor {
    program: String,
    destination: String,
    options: Vec<String>,
}

impl SshExecutor {
    pub fn from_config(config: &ProberConfig) -> Self {
        let mut options = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", config.connect_timeout_secs),
            "-p".to_string(),
            config.ssh_port.to_string(),
        ];
        if let Some(identity) = &config.identity_file {
            options.push("-i".to_string());
            options.push(identity.clone());
        }
        options.extend(config.ssh_options.iter().cloned());

        Self {
            program: config.ssh_program.clone(),
            destination: format!("{}@{}", config.ssh_user, config.host),
            options,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    fn args(&self, remote: &str) -> Vec<String> {
        let mut args = self.options.clone();
        args.push(self.destination.clone());
        args.push("--".to_string());
        args.push(remote.to_string());
        args
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run(&self, command: &RemoteCommand) -> Result<CommandOutput, ProbeError> {
        let remote = command.to_shell();
        debug!(destination = %self.destination, command = %remote, "running remote command");

        let output = Command::new(&self.program)
            .args(self.args(&remote))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        debug!(exit_code = ?output.status.code(), "remote command finished");
        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
