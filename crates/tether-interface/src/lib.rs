//! Tether Interface: Collaborator Contracts
//!
//! This crate defines the capabilities the device orchestrator consumes. Each
//! one is an independent async trait so that real adapters (a device-control
//! CLI, an SSH client) and in-memory test doubles can be swapped freely.
//!
//! # Architecture
//!
//! The contracts fall into four groups:
//!
//! 1. **Discovery**: enumerate the devices currently visible on the network
//! 2. **Connection**: resolve a node name to an address and open a session
//! 3. **Version**: hash a local system image, read the installed version
//! 4. **Provisioning**: flash a system image onto a device
//!
//! # Example
//!
//! ```rust,no_run
//! use tether_interface::{Connector, Discovery};
//!
//! async fn first_reachable<D: Discovery, C: Connector>(
//!     discovery: &D,
//!     connector: &C,
//! ) -> tether_interface::Result<()> {
//!     for device in discovery.list_targets().await? {
//!         if device.has_node_name() && device.is_reachable() {
//!             let address = connector.connection_address(&device.node_name).await?;
//!             println!("{} is at {}", device.node_name, address);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Node name reported by devices that have not identified themselves yet
pub const UNKNOWN_NODE_NAME: &str = "<unknown>";

/// Reachability marker reported for devices answering control-plane queries
const RCS_REACHABLE: &str = "Y";

/// Marker the control tool prints when a named device never answered
const REACH_TIMEOUT_MARKER: &str = "Timeout attempting to reach target";

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Timed out during {operation}: {detail}")]
    Timeout { operation: String, detail: String },

    #[error("Command `{command}` failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to parse collaborator output: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

impl CollaboratorError {
    /// Check whether this error means the device could not be reached in time
    ///
    /// The control tool reports a reachability timeout as an ordinary command
    /// failure, so failed commands are classified by their stderr as well.
    pub fn is_timeout(&self) -> bool {
        match self {
            CollaboratorError::Timeout { .. } => true,
            CollaboratorError::CommandFailed { stderr, .. } => {
                stderr.contains(REACH_TIMEOUT_MARKER)
            }
            CollaboratorError::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CollaboratorError>;

/// A device as reported by discovery
///
/// Only valid for the discovery call that produced it; reachability is carried
/// in `rcs_state` rather than by omitting unreachable devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Human-assigned node name, or [`UNKNOWN_NODE_NAME`]
    #[serde(rename = "nodename")]
    pub node_name: String,

    /// Remote control service state (`"Y"` when reachable)
    #[serde(default)]
    pub rcs_state: String,

    /// Serial number, usually `<unknown>` for network devices
    #[serde(default)]
    pub serial: String,

    /// Board/product type, e.g. `terminal.qemu-x64`
    #[serde(default)]
    pub target_type: String,

    /// Boot state, e.g. `Product` or `Fastboot`
    #[serde(default)]
    pub target_state: String,

    /// Network addresses in the order the tool reported them
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl DeviceDescriptor {
    /// Create a reachable descriptor with a single address
    pub fn new(node_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            rcs_state: RCS_REACHABLE.to_string(),
            serial: UNKNOWN_NODE_NAME.to_string(),
            target_type: String::new(),
            target_state: String::new(),
            addresses: vec![address.into()],
        }
    }

    /// Whether the device has reported a real node name
    pub fn has_node_name(&self) -> bool {
        !self.node_name.is_empty() && self.node_name != UNKNOWN_NODE_NAME
    }

    /// Whether the device answers control-plane queries
    pub fn is_reachable(&self) -> bool {
        self.rcs_state == RCS_REACHABLE
    }
}

/// Host and port of a device's control connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionAddress {
    pub host: String,
    pub port: u16,
}

impl ConnectionAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port` or `[v6addr]:port`
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError::Parse` when the port is missing or invalid.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (host, port) = if let Some(rest) = text.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| CollaboratorError::Parse(format!("unterminated IPv6 host: {text}")))?;
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| CollaboratorError::Parse(format!("missing port: {text}")))?;
            (host, port)
        } else {
            text.rsplit_once(':')
                .ok_or_else(|| CollaboratorError::Parse(format!("missing port: {text}")))?
        };

        if host.is_empty() {
            return Err(CollaboratorError::Parse(format!("missing host: {text}")));
        }
        let port = port
            .parse()
            .map_err(|_| CollaboratorError::Parse(format!("invalid port: {text}")))?;

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for ConnectionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// The device a provisioning run is aimed at
#[derive(Clone, Copy)]
pub enum ProvisionTarget<'a> {
    /// A device with an open control session
    Connected {
        node_name: Option<&'a str>,
        session: &'a dyn Session,
    },

    /// A named device that never answered; flashed without a session
    Unreachable { node_name: &'a str },
}

impl<'a> ProvisionTarget<'a> {
    /// Node name of the target, if one is known
    pub fn node_name(&self) -> Option<&'a str> {
        match self {
            ProvisionTarget::Connected { node_name, .. } => *node_name,
            ProvisionTarget::Unreachable { node_name } => Some(node_name),
        }
    }
}

impl fmt::Debug for ProvisionTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionTarget::Connected { node_name, .. } => f
                .debug_struct("Connected")
                .field("node_name", node_name)
                .finish_non_exhaustive(),
            ProvisionTarget::Unreachable { node_name } => f
                .debug_struct("Unreachable")
                .field("node_name", node_name)
                .finish(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 1. Discovery
// ═══════════════════════════════════════════════════════════════════════

/// Enumerates devices visible to the host
///
/// Implementations must be `Send + Sync + 'static` to work across async boundaries.
#[async_trait]
pub trait Discovery: Send + Sync + 'static {
    /// List every device the host can currently see
    ///
    /// May return an empty list. Unreachable devices are still listed, with
    /// their reachability reported in the descriptor.
    async fn list_targets(&self) -> Result<Vec<DeviceDescriptor>>;
}

// ═══════════════════════════════════════════════════════════════════════
// 2. Connection
// ═══════════════════════════════════════════════════════════════════════

/// Resolves node names to addresses and opens control sessions
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Resolve the control address of a named device
    ///
    /// # Errors
    ///
    /// Returns an error for which [`CollaboratorError::is_timeout`] holds when
    /// the device cannot be reached within the collaborator's bound.
    async fn connection_address(&self, node_name: &str) -> Result<ConnectionAddress>;

    /// Open a control session to a resolved address
    async fn open_session(&self, address: &ConnectionAddress) -> Result<Box<dyn Session>>;
}

/// An open control connection to a device
///
/// The owner is responsible for calling [`Session::close`] exactly when it is
/// done with the device; `close` must be safe to call more than once.
#[async_trait]
pub trait Session: Send + Sync {
    /// Run a command on the device and return its standard output
    async fn run(&self, argv: &[&str]) -> Result<String>;

    /// Tear the connection down
    ///
    /// Synchronous so it can run from `Drop`.
    fn close(&mut self);
}

// ═══════════════════════════════════════════════════════════════════════
// 3. Version Reconciliation
// ═══════════════════════════════════════════════════════════════════════

/// Reports the versions compared during reconciliation
#[async_trait]
pub trait VersionOracle: Send + Sync + 'static {
    /// Content hash (or version marker) of a local system image
    async fn local_image_version(&self, image_dir: &Path) -> Result<String>;

    /// Version string of the software installed on a connected device
    async fn installed_version(&self, session: &dyn Session) -> Result<String>;
}

// ═══════════════════════════════════════════════════════════════════════
// 4. Provisioning
// ═══════════════════════════════════════════════════════════════════════

/// Installs a system image onto a device
#[async_trait]
pub trait Provisioner: Send + Sync + 'static {
    /// Flash `image_dir` onto `target`
    ///
    /// Potentially long-running; any timeout or cancellation is owned by the
    /// implementation. A returned error is final for the run.
    async fn provision(&self, target: ProvisionTarget<'_>, image_dir: &Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_tool_json() {
        let json = r#"{
            "nodename": "device_name",
            "rcs_state": "Y",
            "serial": "<unknown>",
            "target_type": "terminal.qemu-x64",
            "target_state": "Product",
            "addresses": ["address"]
        }"#;

        let device: DeviceDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(device.node_name, "device_name");
        assert_eq!(device.target_type, "terminal.qemu-x64");
        assert_eq!(device.addresses, vec!["address".to_string()]);
        assert!(device.has_node_name());
        assert!(device.is_reachable());
    }

    #[test]
    fn test_descriptor_missing_optional_fields() {
        let device: DeviceDescriptor =
            serde_json::from_str(r#"{"nodename": "<unknown>"}"#).unwrap();
        assert!(!device.has_node_name());
        assert!(!device.is_reachable());
        assert!(device.addresses.is_empty());
    }

    #[test]
    fn test_connection_address_parse() {
        let addr = ConnectionAddress::parse("192.168.42.7:22\n").unwrap();
        assert_eq!(addr, ConnectionAddress::new("192.168.42.7", 22));

        let v6 = ConnectionAddress::parse("[fe80::1%qemu]:8022").unwrap();
        assert_eq!(v6.host, "fe80::1%qemu");
        assert_eq!(v6.port, 8022);
        assert_eq!(v6.to_string(), "[fe80::1%qemu]:8022");
    }

    #[test]
    fn test_connection_address_parse_rejects_garbage() {
        assert!(ConnectionAddress::parse("no-port").is_err());
        assert!(ConnectionAddress::parse(":22").is_err());
        assert!(ConnectionAddress::parse("host:http").is_err());
        assert!(ConnectionAddress::parse("[::1]").is_err());
    }

    #[test]
    fn test_timeout_classification() {
        let timeout = CollaboratorError::Timeout {
            operation: "get-ssh-address".to_string(),
            detail: "30s elapsed".to_string(),
        };
        assert!(timeout.is_timeout());

        let reach = CollaboratorError::CommandFailed {
            command: "ffx".to_string(),
            code: Some(1),
            stderr: "Timeout attempting to reach target \"mocknode\"".to_string(),
        };
        assert!(reach.is_timeout());

        let other = CollaboratorError::CommandFailed {
            command: "ffx".to_string(),
            code: Some(2),
            stderr: "unknown flag".to_string(),
        };
        assert!(!other.is_timeout());
        assert!(!CollaboratorError::Parse("bad".to_string()).is_timeout());
    }
}
