//! SSH control session
//!
//! Holds a multiplexed OpenSSH master connection (`-M -S <socket>`) for the
//! life of the session so that every command run on the device reuses one
//! authenticated transport. The master is a child process killed on close.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tether_interface::{CollaboratorError, ConnectionAddress, Result, Session};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::config::AcquireConfig;

/// Distinguishes control sockets of sessions opened by one process
static SOCKET_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// SSH client settings shared by every session
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Client binary
    pub program: PathBuf,

    /// `-F` config file; carries identity and host-key settings
    pub config_file: Option<PathBuf>,

    /// Remote user, if the config file does not set one
    pub user: Option<String>,

    /// Connection timeout in seconds
    pub timeout_secs: u64,

    /// Where control sockets are created
    pub socket_dir: PathBuf,
}

impl SshConfig {
    pub fn from_config(config: &AcquireConfig) -> Self {
        Self {
            config_file: config.ssh_config.clone(),
            user: config.ssh.user.clone(),
            timeout_secs: config.ssh.connect_timeout_secs,
            ..Default::default()
        }
    }

    /// Set the connection timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn destination(&self, address: &ConnectionAddress) -> String {
        match self.user {
            Some(ref user) => format!("{}@{}", user, address.host),
            None => address.host.clone(),
        }
    }

    /// Arguments common to the master and every command
    fn base_args(&self, address: &ConnectionAddress, socket: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(ref file) = self.config_file {
            args.push("-F".into());
            args.push(file.into());
        }
        args.push("-S".into());
        args.push(socket.into());
        args.push("-p".into());
        args.push(address.port.to_string().into());
        args.push("-o".into());
        args.push(format!("ConnectTimeout={}", self.timeout_secs).into());
        args
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ssh"),
            config_file: None,
            user: None,
            timeout_secs: 30,
            socket_dir: std::env::temp_dir(),
        }
    }
}

/// An open control connection to one device
#[derive(Debug)]
pub struct SshSession {
    config: SshConfig,
    address: ConnectionAddress,
    socket: PathBuf,
    master: Mutex<Option<Child>>,
}

impl SshSession {
    /// Start the master connection and wait until the device answers
    pub async fn connect(config: SshConfig, address: ConnectionAddress) -> Result<Self> {
        let socket = config.socket_dir.join(format!(
            "tether-{}-{}.sock",
            std::process::id(),
            SOCKET_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let mut args = config.base_args(&address, &socket);
        args.push(OsString::from("-M"));
        args.push(OsString::from("-N"));
        args.push(config.destination(&address).into());

        debug!(address = %address, socket = %socket.display(), "Starting SSH master");
        let master = Command::new(&config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let mut session = Self {
            config,
            address,
            socket,
            master: Mutex::new(Some(master)),
        };

        if let Err(e) = session.probe().await {
            session.close();
            return Err(e);
        }
        Ok(session)
    }

    pub fn address(&self) -> &ConnectionAddress {
        &self.address
    }

    /// Run `true` on the device, bounded by the connection timeout
    async fn probe(&self) -> Result<()> {
        let limit = Duration::from_secs(self.config.timeout_secs);
        tokio::time::timeout(limit, self.run(&["true"]))
            .await
            .map_err(|_| CollaboratorError::Timeout {
                operation: "ssh connect".to_string(),
                detail: format!("{} did not answer within {}s", self.address, limit.as_secs()),
            })?
            .map(|_| ())
    }
}

#[async_trait]
impl Session for SshSession {
    async fn run(&self, argv: &[&str]) -> Result<String> {
        let mut args = self.config.base_args(&self.address, &self.socket);
        args.push(self.config.destination(&self.address).into());
        args.push("--".into());
        args.extend(argv.iter().map(OsString::from));

        let output = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        Err(CollaboratorError::CommandFailed {
            command: argv.join(" "),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn close(&mut self) {
        let master = match self.master.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(mut child) = master {
            debug!(address = %self.address, "Stopping SSH master");
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "Failed to stop SSH master");
            }
            let _ = std::fs::remove_file(&self.socket);
        }
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ConnectionAddress {
        ConnectionAddress::new("192.168.42.7", 8022)
    }

    #[test]
    fn test_base_args() {
        let config = SshConfig {
            config_file: Some(PathBuf::from("/out/ssh_config")),
            ..Default::default()
        }
        .with_timeout(5);
        let socket = PathBuf::from("/tmp/s.sock");

        let args = config.base_args(&address(), &socket);
        assert_eq!(
            args,
            vec![
                "-F",
                "/out/ssh_config",
                "-S",
                "/tmp/s.sock",
                "-p",
                "8022",
                "-o",
                "ConnectTimeout=5"
            ]
        );
    }

    #[test]
    fn test_destination_with_user() {
        let mut config = SshConfig::default();
        assert_eq!(config.destination(&address()), "192.168.42.7");

        config.user = Some("fuchsia".to_string());
        assert_eq!(config.destination(&address()), "fuchsia@192.168.42.7");
    }

    #[test]
    fn test_from_config() {
        let acquire = AcquireConfig {
            ssh_config: Some(PathBuf::from("mock_config")),
            ..Default::default()
        };
        let config = SshConfig::from_config(&acquire);
        assert_eq!(config.config_file, Some(PathBuf::from("mock_config")));
        assert_eq!(config.timeout_secs, acquire.ssh.connect_timeout_secs);
        assert_eq!(config.program, PathBuf::from("ssh"));
    }

    #[tokio::test]
    async fn test_connect_fails_without_client() {
        let config = SshConfig {
            program: PathBuf::from("/nonexistent/ssh"),
            ..Default::default()
        };
        let err = SshSession::connect(config, address()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Io(_)));
    }
}
