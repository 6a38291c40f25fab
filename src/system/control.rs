//! Device-control CLI adapter
//!
//! Wraps the host-side control tool (`ffx` by default) for the three
//! operations that need it: listing targets, resolving a node name to its SSH
//! address, and flashing an image.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tether_interface::{
    CollaboratorError, ConnectionAddress, Connector, DeviceDescriptor, Discovery, ProvisionTarget,
    Provisioner, Result, Session,
};
use tokio::process::Command;
use tracing::{debug, info};

use super::ssh::{SshConfig, SshSession};
use crate::config::{AcquireConfig, ToolConfig};

/// Printed instead of a JSON listing when nothing is attached
const NO_DEVICES_MARKER: &str = "No devices found";

/// Control tool invoked as a child process
#[derive(Debug, Clone)]
pub struct ControlTool {
    tool: ToolConfig,
    ssh: SshConfig,
}

impl ControlTool {
    pub fn new(tool: ToolConfig, ssh: SshConfig) -> Self {
        Self { tool, ssh }
    }

    pub fn from_config(config: &AcquireConfig) -> Self {
        Self::new(config.tool.clone(), SshConfig::from_config(config))
    }

    fn describe(&self, args: &[OsString]) -> String {
        let mut parts = vec![self.tool.program.to_string_lossy().into_owned()];
        parts.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }

    /// Run the tool and return its stdout, bounded by `limit`
    async fn invoke(&self, args: Vec<OsString>, limit: Duration, operation: &str) -> Result<String> {
        let command = self.describe(&args);
        debug!(command = %command, timeout_secs = limit.as_secs(), "Running control tool");

        let child = Command::new(&self.tool.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(limit, child)
            .await
            .map_err(|_| CollaboratorError::Timeout {
                operation: operation.to_string(),
                detail: format!("`{}` gave no answer after {}s", command, limit.as_secs()),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(CollaboratorError::CommandFailed {
            command,
            code: output.status.code(),
            stderr,
        })
    }

    fn target_args(node_name: Option<&str>, rest: &[&str]) -> Vec<OsString> {
        let mut args = Vec::with_capacity(rest.len() + 2);
        if let Some(name) = node_name {
            args.push(OsString::from("--target"));
            args.push(OsString::from(name));
        }
        args.extend(rest.iter().map(OsString::from));
        args
    }
}

/// Parse the JSON listing printed by `target list --format json`
pub fn parse_target_list(stdout: &str) -> Result<Vec<DeviceDescriptor>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() || trimmed.starts_with(NO_DEVICES_MARKER) {
        return Ok(Vec::new());
    }

    serde_json::from_str(trimmed)
        .map_err(|e| CollaboratorError::Parse(format!("target listing: {}", e)))
}

#[async_trait]
impl Discovery for ControlTool {
    async fn list_targets(&self) -> Result<Vec<DeviceDescriptor>> {
        let args = Self::target_args(None, &["target", "list", "--format", "json"]);
        let limit = Duration::from_secs(self.tool.list_timeout_secs);

        match self.invoke(args, limit, "target list").await {
            Ok(stdout) => parse_target_list(&stdout),
            Err(CollaboratorError::CommandFailed { ref stderr, .. })
                if stderr.contains(NO_DEVICES_MARKER) =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Connector for ControlTool {
    async fn connection_address(&self, node_name: &str) -> Result<ConnectionAddress> {
        let args = Self::target_args(Some(node_name), &["target", "get-ssh-address"]);
        let limit = Duration::from_secs(self.tool.address_timeout_secs);

        let stdout = self.invoke(args, limit, "get-ssh-address").await?;
        let address = ConnectionAddress::parse(&stdout)?;
        debug!(node_name, address = %address, "Resolved SSH address");
        Ok(address)
    }

    async fn open_session(&self, address: &ConnectionAddress) -> Result<Box<dyn Session>> {
        let session = SshSession::connect(self.ssh.clone(), address.clone()).await?;
        Ok(Box::new(session))
    }
}

#[async_trait]
impl Provisioner for ControlTool {
    async fn provision(&self, target: ProvisionTarget<'_>, image_dir: &Path) -> Result<()> {
        let manifest = image_dir.join(&self.tool.flash_manifest);
        if !manifest.is_file() {
            return Err(CollaboratorError::Unavailable(format!(
                "flash manifest {} not found",
                manifest.display()
            )));
        }

        let mut args = Self::target_args(target.node_name(), &["target", "flash"]);
        args.push(manifest.into_os_string());
        let limit = Duration::from_secs(self.tool.flash_timeout_secs);

        info!(provision_target = ?target, image_dir = %image_dir.display(), "Flashing device");
        self.invoke(args, limit, "target flash").await?;
        info!(node_name = target.node_name().unwrap_or("-"), "Flash complete");
        Ok(())
    }
}
