//! In-memory collaborators for testing
//!
//! Every mock is cheap to clone and shares its state between clones, so a test
//! can hand one copy to the orchestrator and keep another to script behavior
//! and inspect call counts afterwards.
//!
//! ## Example
//!
//! ```
//! use tether::testing::MockCollaborators;
//! use tether::{AcquireConfig, DeviceOrchestrator};
//! use tether_interface::ConnectionAddress;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mocks = MockCollaborators::new();
//! mocks.add_device("device_name", ConnectionAddress::new("address", 12345));
//!
//! let mut device = DeviceOrchestrator::new(AcquireConfig::default(), mocks.collaborators());
//! device.start().await.unwrap();
//!
//! assert_eq!(device.port(), Some(12345));
//! assert_eq!(mocks.discovery.calls(), 1);
//! # }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tether_interface::{
    CollaboratorError, ConnectionAddress, Connector, DeviceDescriptor, Discovery, ProvisionTarget,
    Provisioner, Result, Session, VersionOracle,
};

use crate::orchestrator::Collaborators;

/// Rebuild an error so a scripted failure can be returned more than once
fn replay(err: &CollaboratorError) -> CollaboratorError {
    match err {
        CollaboratorError::Timeout { operation, detail } => CollaboratorError::Timeout {
            operation: operation.clone(),
            detail: detail.clone(),
        },
        CollaboratorError::CommandFailed {
            command,
            code,
            stderr,
        } => CollaboratorError::CommandFailed {
            command: command.clone(),
            code: *code,
            stderr: stderr.clone(),
        },
        CollaboratorError::Parse(msg) => CollaboratorError::Parse(msg.clone()),
        CollaboratorError::Io(e) => {
            CollaboratorError::Io(std::io::Error::new(e.kind(), e.to_string()))
        }
        CollaboratorError::Unavailable(msg) => CollaboratorError::Unavailable(msg.clone()),
    }
}

/// The failure a real control tool reports for a name nobody answers to
pub fn reach_timeout(node_name: &str) -> CollaboratorError {
    CollaboratorError::CommandFailed {
        command: "ffx".to_string(),
        code: Some(1),
        stderr: format!("Timeout attempting to reach target \"{}\"", node_name),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Discovery
// ═══════════════════════════════════════════════════════════════════════

/// Scripted device listing
#[derive(Debug, Clone, Default)]
pub struct MockDiscovery {
    targets: Arc<Mutex<Vec<DeviceDescriptor>>>,
    failure: Arc<Mutex<Option<CollaboratorError>>>,
    calls: Arc<AtomicUsize>,
}

impl MockDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the listing returned by `list_targets`
    pub fn set_targets(&self, targets: Vec<DeviceDescriptor>) {
        *self.targets.lock().unwrap() = targets;
    }

    pub fn push_target(&self, target: DeviceDescriptor) {
        self.targets.lock().unwrap().push(target);
    }

    /// Make every listing fail with `err`
    pub fn fail_with(&self, err: CollaboratorError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    /// Number of `list_targets` calls
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Discovery for MockDiscovery {
    async fn list_targets(&self) -> Result<Vec<DeviceDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref err) = *self.failure.lock().unwrap() {
            return Err(replay(err));
        }
        Ok(self.targets.lock().unwrap().clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Connection
// ═══════════════════════════════════════════════════════════════════════

/// Scripted address book and session factory
///
/// Names without a scripted address fail the way an unreachable device does.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    addresses: Arc<Mutex<HashMap<String, ConnectionAddress>>>,
    failures: Arc<Mutex<HashMap<String, CollaboratorError>>>,
    session_failure: Arc<Mutex<Option<CollaboratorError>>>,
    session_output: Arc<Mutex<HashMap<String, String>>>,
    address_lookups: Arc<AtomicUsize>,
    sessions_opened: Arc<AtomicUsize>,
    sessions_closed: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_address(&self, node_name: &str, address: ConnectionAddress) {
        self.addresses
            .lock()
            .unwrap()
            .insert(node_name.to_string(), address);
    }

    /// Make address lookups for `node_name` fail with `err`
    pub fn fail_address(&self, node_name: &str, err: CollaboratorError) {
        self.failures
            .lock()
            .unwrap()
            .insert(node_name.to_string(), err);
    }

    /// Make every `open_session` fail with `err`
    pub fn fail_sessions(&self, err: CollaboratorError) {
        *self.session_failure.lock().unwrap() = Some(err);
    }

    /// Output sessions return for a command line (argv joined by spaces)
    pub fn set_output(&self, command: &str, output: &str) {
        self.session_output
            .lock()
            .unwrap()
            .insert(command.to_string(), output.to_string());
    }

    pub fn address_lookups(&self) -> usize {
        self.address_lookups.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    /// Total `close` calls across all sessions
    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    /// Command lines run on any session, in order
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connection_address(&self, node_name: &str) -> Result<ConnectionAddress> {
        self.address_lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().get(node_name) {
            return Err(replay(err));
        }
        self.addresses
            .lock()
            .unwrap()
            .get(node_name)
            .cloned()
            .ok_or_else(|| reach_timeout(node_name))
    }

    async fn open_session(&self, address: &ConnectionAddress) -> Result<Box<dyn Session>> {
        if let Some(ref err) = *self.session_failure.lock().unwrap() {
            return Err(replay(err));
        }
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            address: address.clone(),
            outputs: Arc::clone(&self.session_output),
            commands: Arc::clone(&self.commands),
            closed: Arc::clone(&self.sessions_closed),
            open: true,
        }))
    }
}

/// Session handed out by [`MockConnector`]
#[derive(Debug)]
pub struct MockSession {
    address: ConnectionAddress,
    outputs: Arc<Mutex<HashMap<String, String>>>,
    commands: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
    open: bool,
}

impl MockSession {
    pub fn address(&self) -> &ConnectionAddress {
        &self.address
    }
}

#[async_trait]
impl Session for MockSession {
    async fn run(&self, argv: &[&str]) -> Result<String> {
        if !self.open {
            return Err(CollaboratorError::Unavailable(format!(
                "session to {} is closed",
                self.address
            )));
        }
        let command = argv.join(" ");
        self.commands.lock().unwrap().push(command.clone());
        Ok(self
            .outputs
            .lock()
            .unwrap()
            .get(&command)
            .cloned()
            .unwrap_or_default())
    }

    fn close(&mut self) {
        self.open = false;
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Version Reconciliation
// ═══════════════════════════════════════════════════════════════════════

/// Fixed image and installed versions; both `"1.0"` unless scripted
#[derive(Debug, Clone)]
pub struct MockVersionOracle {
    versions: Arc<Mutex<(String, String)>>,
    local_failure: Arc<Mutex<Option<CollaboratorError>>>,
    calls: Arc<AtomicUsize>,
}

impl MockVersionOracle {
    pub fn new() -> Self {
        Self {
            versions: Arc::new(Mutex::new(("1.0".to_string(), "1.0".to_string()))),
            local_failure: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_versions(&self, image: &str, installed: &str) {
        *self.versions.lock().unwrap() = (image.to_string(), installed.to_string());
    }

    /// Make reading the local image fail
    pub fn fail_local_with(&self, err: CollaboratorError) {
        *self.local_failure.lock().unwrap() = Some(err);
    }

    /// Calls to either oracle method
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockVersionOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VersionOracle for MockVersionOracle {
    async fn local_image_version(&self, _image_dir: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref err) = *self.local_failure.lock().unwrap() {
            return Err(replay(err));
        }
        Ok(self.versions.lock().unwrap().0.clone())
    }

    async fn installed_version(&self, _session: &dyn Session) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.versions.lock().unwrap().1.clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Provisioning
// ═══════════════════════════════════════════════════════════════════════

/// A recorded `provision` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionCall {
    /// `"connected"` or `"unreachable"`
    pub kind: &'static str,
    pub node_name: Option<String>,
    pub image_dir: PathBuf,
}

/// Records provisioning requests
#[derive(Debug, Clone, Default)]
pub struct MockProvisioner {
    history: Arc<Mutex<Vec<ProvisionCall>>>,
    failure: Arc<Mutex<Option<CollaboratorError>>>,
}

impl MockProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, err: CollaboratorError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    pub fn history(&self) -> Vec<ProvisionCall> {
        self.history.lock().unwrap().clone()
    }

    /// `(kind, node_name)` of every call
    pub fn targets(&self) -> Vec<(String, Option<String>)> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .map(|c| (c.kind.to_string(), c.node_name.clone()))
            .collect()
    }
}

#[async_trait]
impl Provisioner for MockProvisioner {
    async fn provision(&self, target: ProvisionTarget<'_>, image_dir: &Path) -> Result<()> {
        let kind = match target {
            ProvisionTarget::Connected { .. } => "connected",
            ProvisionTarget::Unreachable { .. } => "unreachable",
        };
        self.history.lock().unwrap().push(ProvisionCall {
            kind,
            node_name: target.node_name().map(str::to_string),
            image_dir: image_dir.to_path_buf(),
        });

        match *self.failure.lock().unwrap() {
            Some(ref err) => Err(replay(err)),
            None => Ok(()),
        }
    }
}

/// One of each mock, sharing state with the [`Collaborators`] it builds
#[derive(Debug, Clone, Default)]
pub struct MockCollaborators {
    pub discovery: MockDiscovery,
    pub connector: MockConnector,
    pub oracle: MockVersionOracle,
    pub provisioner: MockProvisioner,
}

impl MockCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    /// List a reachable device and make its name resolve to `address`
    pub fn add_device(&self, node_name: &str, address: ConnectionAddress) {
        self.discovery
            .push_target(DeviceDescriptor::new(node_name, address.host.clone()));
        self.connector.set_address(node_name, address);
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            discovery: Arc::new(self.discovery.clone()),
            connector: Arc::new(self.connector.clone()),
            oracle: Arc::new(self.oracle.clone()),
            provisioner: Arc::new(self.provisioner.clone()),
        }
    }
}
