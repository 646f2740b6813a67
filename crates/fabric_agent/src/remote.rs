//! Remote-shell executor.

use crate::command::{FabricCommand, FabricOperation};
use crate::error::{FabricError, FabricResult};
use crate::executor::{CommandStatus, FabricExecutor};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

/// Connection settings for the fabric agent host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Host running the fabric controller.
    pub address: String,
    /// SSH port.
    pub port: u16,
    /// Remote user; the ssh client default when unset.
    pub username: Option<String>,
    /// Private key used to authenticate.
    pub ssh_key: Option<PathBuf>,
    /// Controller binary on the remote host.
    pub binary: String,
    /// Local ssh client program.
    pub ssh_program: String,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl AgentConfig {
    /// Creates a configuration for the given host.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Sets the remote user.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the private key path.
    pub fn with_ssh_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.ssh_key = Some(path.into());
        self
    }

    /// Sets the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the controller binary name.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the local ssh client program.
    pub fn with_ssh_program(mut self, program: impl Into<String>) -> Self {
        self.ssh_program = program.into();
        self
    }

    /// Sets the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Returns the connection timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: 22,
            username: None,
            ssh_key: None,
            binary: "opafmvf".to_string(),
            ssh_program: "ssh".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// Executes fabric commands on the agent host through the system ssh client.
///
/// Each command opens its own session and blocks until the remote side
/// reports an exit status. Commands are serialized so at most one is in
/// flight per executor; `abort` is the exception and may overlap a command
/// that hangs.
#[derive(Debug)]
pub struct RemoteShellExecutor {
    config: AgentConfig,
    in_flight: Mutex<()>,
}

impl RemoteShellExecutor {
    /// Creates an executor for the given agent.
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            in_flight: Mutex::new(()),
        }
    }

    /// Returns the agent configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Builds the arguments passed to the ssh client for a command.
    pub(crate) fn ssh_args(&self, command: &FabricCommand) -> Vec<String> {
        let config = &self.config;
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", config.connect_timeout_secs),
            "-p".to_string(),
            config.port.to_string(),
        ];
        if let Some(key) = &config.ssh_key {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        if let Some(user) = &config.username {
            args.push("-l".to_string());
            args.push(user.clone());
        }
        args.push(config.address.clone());
        args.push(remote_command_line(&command.argv(&config.binary)));
        args
    }
}

impl FabricExecutor for RemoteShellExecutor {
    fn execute(&self, command: &FabricCommand) -> FabricResult<CommandStatus> {
        // Abort has to reach a controller that is stuck on the command in flight.
        let _guard = (command.operation() != FabricOperation::Abort).then(|| self.in_flight.lock());
        let args = self.ssh_args(command);
        debug!("Dispatching fabric command '{}' to {}", command, self.config.address);

        let output = Command::new(&self.config.ssh_program)
            .args(&args)
            .stdin(Stdio::null())
            .output()?;

        match output.status.code() {
            Some(code) => {
                let status = CommandStatus(code);
                if !status.is_success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    debug!("Fabric command '{}' returned {}: {}", command, status, stderr.trim());
                }
                Ok(status)
            }
            None => {
                warn!("Fabric command '{}' ended without exit status", command);
                Err(FabricError::Terminated(output.status.to_string()))
            }
        }
    }
}

/// Joins words into a single remote shell command, quoting where needed.
fn remote_command_line(argv: &[String]) -> String {
    argv.iter()
        .map(|word| quote(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.:/=@,+".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
