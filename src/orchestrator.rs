//! Device orchestrator: selects, connects, reconciles and provisions one device
//!
//! The orchestrator is a scoped resource. Construct it, call
//! [`DeviceOrchestrator::start`] once, then drop or [`release`] it; the
//! control session is closed on every exit path, including panics.
//!
//! [`release`]: DeviceOrchestrator::release
//!
//! # Example
//!
//! ```rust,no_run
//! use tether::{AcquireConfig, Collaborators, DeviceOrchestrator};
//!
//! # async fn example(collaborators: Collaborators) -> tether::Result<()> {
//! let config = AcquireConfig {
//!     node_name: Some("lab-nuc-3".to_string()),
//!     ..Default::default()
//! };
//!
//! let mut device = DeviceOrchestrator::new(config, collaborators);
//! device.start().await?;
//! println!("{:?} at {:?}:{:?}", device.node_name(), device.host(), device.port());
//! device.release();
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tether_interface::{
    CollaboratorError, ConnectionAddress, Connector, Discovery, ProvisionTarget, Provisioner,
    Session, VersionOracle,
};
use tracing::{debug, info, warn};

use crate::config::{AcquireConfig, VersionCheckMode};
use crate::error::{Result, TetherError};
use crate::lifecycle::{AcquireLifecycle, AcquireState, StateTransition};
use crate::selector::select_target;

/// The external capabilities a run depends on
#[derive(Clone)]
pub struct Collaborators {
    pub discovery: Arc<dyn Discovery>,
    pub connector: Arc<dyn Connector>,
    pub oracle: Arc<dyn VersionOracle>,
    pub provisioner: Arc<dyn Provisioner>,
}

/// Identity and address of the acquired device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    /// Node name; absent when the device was addressed by host only
    pub node_name: Option<String>,

    /// Control address; absent when the device was flashed without answering
    pub address: Option<ConnectionAddress>,
}

/// How the device was identified before connecting
enum Resolution {
    /// Host given explicitly; no lookup needed
    Direct {
        node_name: Option<String>,
        address: ConnectionAddress,
    },

    /// Node name that still has to be resolved to an address
    Named(String),
}

impl Resolution {
    fn node_name(&self) -> Option<&str> {
        match self {
            Resolution::Direct { node_name, .. } => node_name.as_deref(),
            Resolution::Named(name) => Some(name),
        }
    }
}

/// Drives one device acquisition from `Init` to `Ready` or `Failed`
pub struct DeviceOrchestrator {
    config: AcquireConfig,
    collaborators: Collaborators,
    lifecycle: AcquireLifecycle,
    target: Option<ResolvedTarget>,
    session: Option<Box<dyn Session>>,
    provisioned: bool,
}

impl DeviceOrchestrator {
    pub fn new(config: AcquireConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
            lifecycle: AcquireLifecycle::new(),
            target: None,
            session: None,
            provisioned: false,
        }
    }

    pub fn config(&self) -> &AcquireConfig {
        &self.config
    }

    pub fn state(&self) -> AcquireState {
        self.lifecycle.state()
    }

    pub fn transitions(&self) -> &[StateTransition] {
        self.lifecycle.transitions()
    }

    /// Resolved target; `None` until the run reaches `Ready`
    pub fn target(&self) -> Option<&ResolvedTarget> {
        self.target.as_ref()
    }

    pub fn node_name(&self) -> Option<&str> {
        self.target.as_ref()?.node_name.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        Some(self.target.as_ref()?.address.as_ref()?.host.as_str())
    }

    pub fn port(&self) -> Option<u16> {
        Some(self.target.as_ref()?.address.as_ref()?.port)
    }

    /// Whether this run flashed the device
    pub fn provisioned(&self) -> bool {
        self.provisioned
    }

    /// Open control session, for downstream steps that run on the device
    pub fn session(&self) -> Option<&dyn Session> {
        if self.state() != AcquireState::Ready {
            return None;
        }
        self.session.as_deref()
    }

    /// Run the acquisition workflow
    ///
    /// Valid only once, from `Init`. On success the resolved target is
    /// observable; on failure nothing is, and the original error is returned.
    pub async fn start(&mut self) -> Result<()> {
        if self.lifecycle.state() != AcquireState::Init {
            return Err(TetherError::InvalidState {
                expected: AcquireState::Init.as_str(),
                actual: self.lifecycle.state().as_str(),
            });
        }

        match self.drive().await {
            Ok(target) => {
                advance(&mut self.lifecycle, AcquireState::Ready)?;
                let address = target
                    .address
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "-".to_string());
                info!(
                    node_name = target.node_name.as_deref().unwrap_or("-"),
                    address = %address,
                    provisioned = self.provisioned,
                    "Device ready"
                );
                self.target = Some(target);
                Ok(())
            }
            Err(e) => {
                let failed_in = self.lifecycle.state();
                // Cannot fail: every non-terminal state has an edge to Failed
                let _ = self.lifecycle.advance(AcquireState::Failed);
                warn!(state = %failed_in, kind = e.kind(), error = %e, "Device acquisition failed");
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<ResolvedTarget> {
        advance(&mut self.lifecycle, AcquireState::Resolving)?;
        let requested = self.config.node_name.clone();
        let resolution = self.resolve().await?;

        advance(&mut self.lifecycle, AcquireState::Connecting)?;
        let node_name = resolution.node_name().map(str::to_string);
        let address = match self.connect(&resolution).await {
            Ok(address) => address,
            Err(e) if is_unreachable(&e) => match requested {
                Some(name) => return self.provision_unreachable(name, e).await,
                None => {
                    debug!(cause = %e, "Discovered device unreachable");
                    return Err(TetherError::DeviceNotFound { node_name });
                }
            },
            Err(e) => return Err(e),
        };

        let target = ResolvedTarget {
            node_name,
            address: Some(address),
        };

        let Some(image_dir) = self.reconcile_image_dir() else {
            debug!(os_check = %self.config.os_check, "Version reconciliation skipped");
            return Ok(target);
        };

        advance(&mut self.lifecycle, AcquireState::VersionCheck)?;
        let session = self
            .session
            .as_deref()
            .ok_or_else(|| TetherError::InvalidState {
                expected: "connected",
                actual: AcquireState::VersionCheck.as_str(),
            })?;

        let oracle = &self.collaborators.oracle;
        let image = oracle
            .local_image_version(&image_dir)
            .await
            .map_err(TetherError::Collaborator)?;
        let installed = oracle
            .installed_version(session)
            .await
            .map_err(|e| TetherError::from_collaborator(e, target.node_name.as_deref()))?;

        if image == installed {
            info!(version = %installed, "Installed software matches system image");
            return Ok(target);
        }

        if self.config.os_check == VersionCheckMode::Check {
            return Err(TetherError::VersionMismatch { image, installed });
        }

        info!(image = %image, installed = %installed, "Version mismatch, provisioning device");
        advance(&mut self.lifecycle, AcquireState::Provisioning)?;
        let provision_target = ProvisionTarget::Connected {
            node_name: target.node_name.as_deref(),
            session,
        };
        self.collaborators
            .provisioner
            .provision(provision_target, &image_dir)
            .await
            .map_err(|source| TetherError::ProvisionFailure {
                node_name: target.node_name.clone(),
                source,
            })?;
        self.provisioned = true;

        Ok(target)
    }

    async fn resolve(&self) -> Result<Resolution> {
        if let Some(ref host) = self.config.host {
            let address = ConnectionAddress::new(host.clone(), self.config.effective_port());
            debug!(address = %address, "Using explicit host, skipping discovery");
            return Ok(Resolution::Direct {
                node_name: self.config.node_name.clone(),
                address,
            });
        }

        if let Some(ref name) = self.config.node_name {
            debug!(node_name = %name, "Node name given, skipping discovery");
            return Ok(Resolution::Named(name.clone()));
        }

        let descriptors = self.collaborators.discovery.list_targets().await?;
        info!(count = descriptors.len(), "Discovered devices");
        let selected = select_target(descriptors, None)?;
        info!(node_name = %selected.node_name, "Selected device");
        Ok(Resolution::Named(selected.node_name))
    }

    /// Resolve the address and take ownership of the session
    async fn connect(&mut self, resolution: &Resolution) -> Result<ConnectionAddress> {
        let connector = &self.collaborators.connector;
        let node_name = resolution.node_name();

        let address = match resolution {
            Resolution::Direct { address, .. } => address.clone(),
            Resolution::Named(name) => connector
                .connection_address(name)
                .await
                .map_err(|e| TetherError::from_collaborator(e, Some(name)))?,
        };

        debug!(address = %address, "Opening control session");
        let session = connector
            .open_session(&address)
            .await
            .map_err(|e| TetherError::from_collaborator(e, node_name))?;
        self.session = Some(session);

        info!(node_name = node_name.unwrap_or("-"), address = %address, "Connected");
        Ok(address)
    }

    /// A named device never answered: flash it blind, or report it missing
    async fn provision_unreachable(
        &mut self,
        node_name: String,
        cause: TetherError,
    ) -> Result<ResolvedTarget> {
        let image_dir = match self.config.os_check {
            VersionCheckMode::Update => self.config.system_image_dir.clone(),
            _ => None,
        };
        let Some(image_dir) = image_dir else {
            debug!(node_name = %node_name, cause = %cause, "Named device unreachable");
            return Err(TetherError::DeviceNotFound {
                node_name: Some(node_name),
            });
        };

        warn!(
            node_name = %node_name,
            cause = %cause,
            "Named device unreachable, provisioning it from {}",
            image_dir.display()
        );
        advance(&mut self.lifecycle, AcquireState::Provisioning)?;
        self.collaborators
            .provisioner
            .provision(
                ProvisionTarget::Unreachable {
                    node_name: &node_name,
                },
                &image_dir,
            )
            .await
            .map_err(|source| TetherError::ProvisionFailure {
                node_name: Some(node_name.clone()),
                source,
            })?;
        self.provisioned = true;

        Ok(ResolvedTarget {
            node_name: Some(node_name),
            address: None,
        })
    }

    fn reconcile_image_dir(&self) -> Option<PathBuf> {
        if self.config.reconciliation_enabled() {
            self.config.system_image_dir.clone()
        } else {
            None
        }
    }

    /// Close the control session now instead of at drop
    pub fn release(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            debug!(state = %self.lifecycle.state(), "Closing control session");
            session.close();
        }
    }
}

impl Drop for DeviceOrchestrator {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn advance(lifecycle: &mut AcquireLifecycle, to: AcquireState) -> Result<()> {
    let from = lifecycle.state();
    lifecycle
        .advance(to)
        .map(|_| ())
        .ok_or(TetherError::InvalidState {
            expected: to.as_str(),
            actual: from.as_str(),
        })
}

/// Failures that, for a named device, mean "not there"
fn is_unreachable(err: &TetherError) -> bool {
    match err {
        TetherError::ConnectionTimeout { .. } => true,
        TetherError::Collaborator(e) => {
            e.is_timeout() || matches!(e, CollaboratorError::CommandFailed { .. })
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reach_timeout, MockCollaborators};
    use tether_interface::{DeviceDescriptor, UNKNOWN_NODE_NAME};

    fn update_config(node_name: Option<&str>) -> AcquireConfig {
        AcquireConfig {
            node_name: node_name.map(str::to_string),
            os_check: VersionCheckMode::Update,
            system_image_dir: Some(PathBuf::from("mockdir")),
            ..Default::default()
        }
    }

    fn check_config() -> AcquireConfig {
        AcquireConfig {
            os_check: VersionCheckMode::Check,
            ..update_config(None)
        }
    }

    fn one_device() -> MockCollaborators {
        let mocks = MockCollaborators::new();
        mocks.add_device("device_name", ConnectionAddress::new("address", 12345));
        mocks
    }

    #[tokio::test]
    async fn test_single_discovered_device() {
        let mocks = one_device();

        let mut device = DeviceOrchestrator::new(AcquireConfig::default(), mocks.collaborators());
        device.start().await.unwrap();

        assert_eq!(device.state(), AcquireState::Ready);
        assert_eq!(device.node_name(), Some("device_name"));
        assert_eq!(device.host(), Some("address"));
        assert_eq!(device.port(), Some(12345));
        assert!(!device.provisioned());
        assert_eq!(mocks.connector.sessions_opened(), 1);
        assert_eq!(
            device.lifecycle.path(),
            vec![
                AcquireState::Init,
                AcquireState::Resolving,
                AcquireState::Connecting,
                AcquireState::Ready,
            ]
        );
    }

    #[tokio::test]
    async fn test_ambiguous_discovery_leaves_target_unset() {
        let mocks = MockCollaborators::new();
        mocks.add_device("device_name1", ConnectionAddress::new("address1", 22));
        mocks.add_device("device_name2", ConnectionAddress::new("address2", 22));

        let mut device = DeviceOrchestrator::new(AcquireConfig::default(), mocks.collaborators());
        let err = device.start().await.unwrap_err();

        assert!(matches!(err, TetherError::AmbiguousTarget { .. }));
        assert_eq!(device.state(), AcquireState::Failed);
        assert!(device.node_name().is_none());
        assert!(device.host().is_none());
        assert_eq!(mocks.connector.address_lookups(), 0);
        assert_eq!(mocks.connector.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_unnamed_devices_not_found() {
        let mocks = MockCollaborators::new();
        mocks
            .discovery
            .set_targets(vec![DeviceDescriptor::new(UNKNOWN_NODE_NAME, "address")]);

        let mut device = DeviceOrchestrator::new(AcquireConfig::default(), mocks.collaborators());
        let err = device.start().await.unwrap_err();
        assert!(matches!(err, TetherError::DeviceNotFound { node_name: None }));
        assert!(device.target().is_none());
    }

    #[tokio::test]
    async fn test_named_device_skips_discovery() {
        let mocks = one_device();
        let config = AcquireConfig {
            node_name: Some("device_name".to_string()),
            ..Default::default()
        };

        let mut device = DeviceOrchestrator::new(config, mocks.collaborators());
        device.start().await.unwrap();

        assert_eq!(mocks.discovery.calls(), 0);
        assert_eq!(device.node_name(), Some("device_name"));
        assert_eq!(device.port(), Some(12345));
    }

    #[tokio::test]
    async fn test_named_device_timeout_is_not_found() {
        let mocks = one_device();
        let config = AcquireConfig {
            node_name: Some("wrong_device_name".to_string()),
            ..Default::default()
        };

        let mut device = DeviceOrchestrator::new(config, mocks.collaborators());
        let err = device.start().await.unwrap_err();

        assert!(matches!(
            err,
            TetherError::DeviceNotFound { node_name: Some(ref n) } if n == "wrong_device_name"
        ));
        assert!(device.node_name().is_none());
        assert_eq!(mocks.provisioner.calls(), 0);
    }

    #[tokio::test]
    async fn test_named_device_timeout_in_check_mode_without_image_is_not_found() {
        let mocks = MockCollaborators::new();
        let config = AcquireConfig {
            node_name: Some("mocknode".to_string()),
            os_check: VersionCheckMode::Check,
            ..Default::default()
        };

        let mut device = DeviceOrchestrator::new(config, mocks.collaborators());
        let err = device.start().await.unwrap_err();
        assert!(matches!(err, TetherError::DeviceNotFound { .. }));
        assert_eq!(mocks.provisioner.calls(), 0);
    }

    #[tokio::test]
    async fn test_named_device_timeout_in_check_mode_with_image_is_not_found() {
        let mocks = MockCollaborators::new();
        let config = AcquireConfig {
            node_name: Some("mocknode".to_string()),
            ..check_config()
        };

        let mut device = DeviceOrchestrator::new(config, mocks.collaborators());
        let err = device.start().await.unwrap_err();

        assert!(matches!(
            err,
            TetherError::DeviceNotFound { node_name: Some(ref n) } if n == "mocknode"
        ));
        assert_eq!(err.exit_code(), crate::error::EXIT_NOT_FOUND);
        assert_eq!(mocks.provisioner.calls(), 0);
        assert_eq!(mocks.oracle.calls(), 0);
        assert_eq!(device.state(), AcquireState::Failed);
    }

    #[tokio::test]
    async fn test_discovered_device_timeout_is_not_found() {
        let mocks = one_device();
        mocks
            .connector
            .fail_address("device_name", reach_timeout("device_name"));

        let mut device = DeviceOrchestrator::new(update_config(None), mocks.collaborators());
        let err = device.start().await.unwrap_err();

        assert!(matches!(
            err,
            TetherError::DeviceNotFound { node_name: Some(ref n) } if n == "device_name"
        ));
        assert_eq!(err.exit_code(), crate::error::EXIT_NOT_FOUND);
        assert_eq!(mocks.provisioner.calls(), 0);
        assert!(device.node_name().is_none());
    }

    #[tokio::test]
    async fn test_discovered_device_parse_error_propagates() {
        let mocks = one_device();
        mocks.connector.fail_address(
            "device_name",
            CollaboratorError::Parse("no address in output".to_string()),
        );

        let mut device = DeviceOrchestrator::new(AcquireConfig::default(), mocks.collaborators());
        let err = device.start().await.unwrap_err();
        assert!(matches!(
            err,
            TetherError::Collaborator(CollaboratorError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_local_image_timeout_is_not_a_connection_timeout() {
        let mocks = one_device();
        mocks.oracle.fail_local_with(CollaboratorError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "image volume stalled",
        )));

        let mut device = DeviceOrchestrator::new(update_config(None), mocks.collaborators());
        let err = device.start().await.unwrap_err();

        assert!(matches!(
            err,
            TetherError::Collaborator(CollaboratorError::Io(_))
        ));
        assert_eq!(err.exit_code(), crate::error::EXIT_FATAL);
        assert_eq!(mocks.provisioner.calls(), 0);
    }

    #[tokio::test]
    async fn test_matching_versions_skip_provisioning() {
        let mocks = one_device();
        mocks.oracle.set_versions("1.0", "1.0");

        let mut device = DeviceOrchestrator::new(update_config(None), mocks.collaborators());
        device.start().await.unwrap();

        assert_eq!(mocks.provisioner.calls(), 0);
        assert_eq!(mocks.oracle.calls(), 2);
        assert_eq!(
            device.lifecycle.path(),
            vec![
                AcquireState::Init,
                AcquireState::Resolving,
                AcquireState::Connecting,
                AcquireState::VersionCheck,
                AcquireState::Ready,
            ]
        );
    }

    #[tokio::test]
    async fn test_ignore_mode_never_consults_oracle() {
        let mocks = one_device();
        mocks.oracle.set_versions("2.0", "1.0");
        let config = AcquireConfig {
            os_check: VersionCheckMode::Ignore,
            ..update_config(None)
        };

        let mut device = DeviceOrchestrator::new(config, mocks.collaborators());
        device.start().await.unwrap();
        assert_eq!(mocks.oracle.calls(), 0);
        assert_eq!(mocks.provisioner.calls(), 0);
    }

    #[tokio::test]
    async fn test_check_mode_mismatch_fails() {
        let mocks = one_device();
        mocks.oracle.set_versions("2.0", "1.0");

        let mut device = DeviceOrchestrator::new(check_config(), mocks.collaborators());
        let err = device.start().await.unwrap_err();

        match err {
            TetherError::VersionMismatch { image, installed } => {
                assert_eq!(image, "2.0");
                assert_eq!(installed, "1.0");
            }
            other => panic!("expected VersionMismatch, got {:?}", other),
        }
        assert_eq!(mocks.provisioner.calls(), 0);
        assert!(device.target().is_none());
    }

    #[tokio::test]
    async fn test_update_mode_mismatch_provisions_connected_device() {
        let mocks = one_device();
        mocks.oracle.set_versions("2.0", "1.0");

        let mut device = DeviceOrchestrator::new(update_config(None), mocks.collaborators());
        device.start().await.unwrap();

        assert_eq!(
            mocks.provisioner.targets(),
            vec![("connected".to_string(), Some("device_name".to_string()))]
        );
        assert_eq!(mocks.provisioner.history()[0].image_dir, PathBuf::from("mockdir"));
        assert!(device.provisioned());
        assert_eq!(device.host(), Some("address"));
    }

    #[tokio::test]
    async fn test_unreachable_named_device_is_provisioned() {
        let mocks = MockCollaborators::new();

        let mut device =
            DeviceOrchestrator::new(update_config(Some("mocknode")), mocks.collaborators());
        device.start().await.unwrap();

        assert_eq!(
            mocks.provisioner.targets(),
            vec![("unreachable".to_string(), Some("mocknode".to_string()))]
        );
        assert_eq!(mocks.oracle.calls(), 0);
        assert_eq!(mocks.connector.address_lookups(), 1);
        assert_eq!(mocks.connector.sessions_opened(), 0);
        assert_eq!(device.node_name(), Some("mocknode"));
        assert!(device.host().is_none());
        assert!(device.provisioned());
        assert_eq!(device.state(), AcquireState::Ready);
    }

    #[tokio::test]
    async fn test_provision_failure_is_final() {
        let mocks = MockCollaborators::new();
        mocks
            .provisioner
            .fail_with(CollaboratorError::Unavailable("flash tool crashed".to_string()));

        let mut device =
            DeviceOrchestrator::new(update_config(Some("mocknode")), mocks.collaborators());
        let err = device.start().await.unwrap_err();

        assert!(matches!(err, TetherError::ProvisionFailure { .. }));
        assert_eq!(mocks.provisioner.calls(), 1);
        assert!(device.node_name().is_none());
        assert!(!device.provisioned());
    }

    #[tokio::test]
    async fn test_explicit_host_bypasses_lookup() {
        let mocks = MockCollaborators::new();
        let config = AcquireConfig {
            host: Some("192.168.42.7".to_string()),
            port: Some(8022),
            ..Default::default()
        };

        let mut device = DeviceOrchestrator::new(config, mocks.collaborators());
        device.start().await.unwrap();

        assert_eq!(mocks.discovery.calls(), 0);
        assert_eq!(mocks.connector.address_lookups(), 0);
        assert_eq!(mocks.connector.sessions_opened(), 1);
        assert_eq!(device.host(), Some("192.168.42.7"));
        assert_eq!(device.port(), Some(8022));
        assert_eq!(device.node_name(), None);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let mocks = one_device();

        let mut device = DeviceOrchestrator::new(AcquireConfig::default(), mocks.collaborators());
        device.start().await.unwrap();
        let err = device.start().await.unwrap_err();

        assert!(matches!(err, TetherError::InvalidState { .. }));
        assert_eq!(mocks.discovery.calls(), 1);
        assert_eq!(mocks.connector.sessions_opened(), 1);
        assert_eq!(device.state(), AcquireState::Ready);
    }

    #[tokio::test]
    async fn test_session_closed_once_on_failure() {
        let mocks = one_device();
        mocks.oracle.set_versions("2.0", "1.0");

        {
            let mut device = DeviceOrchestrator::new(check_config(), mocks.collaborators());
            assert!(device.start().await.is_err());
            assert!(device.session().is_none());
            assert_eq!(mocks.connector.sessions_closed(), 0);
        }
        assert_eq!(mocks.connector.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn test_release_closes_session_once() {
        let mocks = one_device();

        let mut device = DeviceOrchestrator::new(AcquireConfig::default(), mocks.collaborators());
        device.start().await.unwrap();
        assert!(device.session().is_some());
        device.release();
        assert_eq!(mocks.connector.sessions_closed(), 1);
    }

    #[test]
    fn test_unreachable_classification() {
        assert!(!is_unreachable(&TetherError::Collaborator(
            CollaboratorError::Parse("garbage".to_string())
        )));
        assert!(is_unreachable(&TetherError::ConnectionTimeout {
            node_name: None,
            detail: "30s".to_string()
        }));
        assert!(is_unreachable(&TetherError::Collaborator(
            CollaboratorError::CommandFailed {
                command: "ffx".to_string(),
                code: Some(1),
                stderr: "target rejected connection".to_string(),
            }
        )));
        assert!(!is_unreachable(&TetherError::Collaborator(
            CollaboratorError::Unavailable("ssh missing".to_string())
        )));
        assert!(!is_unreachable(&TetherError::Config("x".to_string())));
    }
}
