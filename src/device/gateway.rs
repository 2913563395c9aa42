/// Device command gateway: runs adb with an explicit timeout and turns a
/// nonzero exit into a typed error.
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::DeviceConfig;
use crate::device::command::DeviceCommand;
use crate::errors::{AutobuyError, AutobuyResult};

/// Executes device commands. Returns stdout on success.
#[async_trait]
pub trait CommandGateway: Send + Sync {
    async fn run(&self, command: &DeviceCommand) -> AutobuyResult<String>;
}

pub struct AdbGateway {
    adb_path: String,
    serial: Option<String>,
    timeout: Duration,
}

impl AdbGateway {
    pub fn new(cfg: &DeviceConfig) -> Self {
        Self {
            adb_path: cfg.adb_path.clone(),
            serial: cfg.serial.clone(),
            timeout: cfg.command_timeout(),
        }
    }

    fn argv(&self, command: &DeviceCommand) -> Vec<String> {
        let mut argv = Vec::new();
        if let Some(serial) = &self.serial {
            argv.push("-s".to_string());
            argv.push(serial.clone());
        }
        argv.extend(command.args());
        argv
    }
}

#[async_trait]
impl CommandGateway for AdbGateway {
    async fn run(&self, command: &DeviceCommand) -> AutobuyResult<String> {
        let argv = self.argv(command);
        tracing::debug!(adb = %self.adb_path, args = ?argv, "running device command");

        let mut cmd = Command::new(&self.adb_path);
        cmd.args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Dropping the future on expiry kills the child.
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::error!(command = %command, secs = self.timeout.as_secs(), "device command timed out");
                return Err(AutobuyError::CommandTimeout {
                    command: command.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(command = %command, code = ?output.status.code(), stderr = %stderr, "device command failed");
            return Err(AutobuyError::Command {
                command: command.to_string(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
