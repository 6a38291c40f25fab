/*!
 * Error types for Tether
 */

use std::fmt;
use std::io;

use tether_interface::CollaboratorError;

pub type Result<T> = std::result::Result<T, TetherError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
pub const EXIT_NOT_FOUND: i32 = 2;
pub const EXIT_AMBIGUOUS: i32 = 3;
pub const EXIT_MISMATCH: i32 = 4;
pub const EXIT_PROVISION: i32 = 5;

#[derive(Debug)]
pub enum TetherError {
    /// No device matched the selection criteria, or a named device was unreachable
    DeviceNotFound { node_name: Option<String> },

    /// Discovery found several candidates and no node name was given
    AmbiguousTarget { candidates: Vec<String> },

    /// Installed software differs from the local image (check mode)
    VersionMismatch { image: String, installed: String },

    /// The provisioner reported failure
    ProvisionFailure {
        node_name: Option<String>,
        source: CollaboratorError,
    },

    /// A discovered device did not answer within the collaborator's bound
    ConnectionTimeout {
        node_name: Option<String>,
        detail: String,
    },

    /// Any other collaborator failure, propagated unchanged
    Collaborator(CollaboratorError),

    /// `start()` called outside the state it is valid in
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Configuration error
    Config(String),

    /// I/O error
    Io(io::Error),
}

impl TetherError {
    /// Stable machine-readable tag for structured output
    pub fn kind(&self) -> &'static str {
        match self {
            TetherError::DeviceNotFound { .. } => "device_not_found",
            TetherError::AmbiguousTarget { .. } => "ambiguous_target",
            TetherError::VersionMismatch { .. } => "version_mismatch",
            TetherError::ProvisionFailure { .. } => "provision_failure",
            TetherError::ConnectionTimeout { .. } => "connection_timeout",
            TetherError::Collaborator(_) => "collaborator",
            TetherError::InvalidState { .. } => "invalid_state",
            TetherError::Config(_) => "config",
            TetherError::Io(_) => "io",
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TetherError::DeviceNotFound { .. } => EXIT_NOT_FOUND,
            TetherError::AmbiguousTarget { .. } => EXIT_AMBIGUOUS,
            TetherError::VersionMismatch { .. } => EXIT_MISMATCH,
            TetherError::ProvisionFailure { .. } => EXIT_PROVISION,
            _ => EXIT_FATAL,
        }
    }

    /// Check if the operator can resolve this by changing the invocation
    pub fn is_operator_error(&self) -> bool {
        matches!(
            self,
            TetherError::DeviceNotFound { .. }
                | TetherError::AmbiguousTarget { .. }
                | TetherError::VersionMismatch { .. }
                | TetherError::Config(_)
        )
    }

    /// Check if this error came from a device that did not answer in time
    pub fn is_timeout(&self) -> bool {
        match self {
            TetherError::ConnectionTimeout { .. } => true,
            TetherError::Collaborator(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Attach the node name to a collaborator error raised while talking to it
    pub fn from_collaborator(err: CollaboratorError, node_name: Option<&str>) -> Self {
        if err.is_timeout() {
            TetherError::ConnectionTimeout {
                node_name: node_name.map(str::to_string),
                detail: err.to_string(),
            }
        } else {
            TetherError::Collaborator(err)
        }
    }
}

impl fmt::Display for TetherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TetherError::DeviceNotFound { node_name } => match node_name {
                Some(name) => write!(f, "Could not find device. (node name: {})", name),
                None => write!(f, "Could not find device."),
            },
            TetherError::AmbiguousTarget { candidates } => {
                write!(
                    f,
                    "More than one device was discovered on the network ({}). \
                     Use --node-name <name> to specify the device to use.",
                    candidates.join(", ")
                )
            }
            TetherError::VersionMismatch { image, installed } => {
                write!(
                    f,
                    "Image and device version mismatch: image {}, installed {}",
                    image, installed
                )
            }
            TetherError::ProvisionFailure { node_name, source } => match node_name {
                Some(name) => write!(f, "Provisioning {} failed: {}", name, source),
                None => write!(f, "Provisioning failed: {}", source),
            },
            TetherError::ConnectionTimeout { node_name, detail } => match node_name {
                Some(name) => write!(f, "Timed out connecting to {}: {}", name, detail),
                None => write!(f, "Timed out connecting to device: {}", detail),
            },
            TetherError::Collaborator(err) => write!(f, "{}", err),
            TetherError::InvalidState { expected, actual } => {
                write!(
                    f,
                    "Invalid orchestrator state: expected {}, found {}",
                    expected, actual
                )
            }
            TetherError::Config(msg) => write!(f, "Configuration error: {}", msg),
            TetherError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for TetherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TetherError::ProvisionFailure { source, .. } => Some(source),
            TetherError::Collaborator(err) => Some(err),
            TetherError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TetherError {
    fn from(err: io::Error) -> Self {
        TetherError::Io(err)
    }
}

impl From<CollaboratorError> for TetherError {
    fn from(err: CollaboratorError) -> Self {
        TetherError::from_collaborator(err, None)
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(err: serde_json::Error) -> Self {
        TetherError::Config(format!("JSON parse error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_device_not_found_display() {
        let err = TetherError::DeviceNotFound { node_name: None };
        assert_eq!(err.to_string(), "Could not find device.");

        let named = TetherError::DeviceNotFound {
            node_name: Some("wrong_device_name".to_string()),
        };
        assert!(named.to_string().starts_with("Could not find device."));
        assert!(named.to_string().contains("wrong_device_name"));
    }

    #[test]
    fn test_ambiguous_target_names_candidates() {
        let err = TetherError::AmbiguousTarget {
            candidates: vec!["device_name1".to_string(), "device_name2".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("More than one device was discovered"));
        assert!(msg.contains("device_name1, device_name2"));
    }

    #[test]
    fn test_version_mismatch_reports_both_values() {
        let err = TetherError::VersionMismatch {
            image: "2.0".to_string(),
            installed: "1.0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Image and device version mismatch: image 2.0, installed 1.0"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            TetherError::DeviceNotFound { node_name: None }.exit_code(),
            EXIT_NOT_FOUND
        );
        assert_eq!(
            TetherError::AmbiguousTarget { candidates: vec![] }.exit_code(),
            EXIT_AMBIGUOUS
        );
        assert_eq!(
            TetherError::VersionMismatch {
                image: "a".to_string(),
                installed: "b".to_string()
            }
            .exit_code(),
            EXIT_MISMATCH
        );
        assert_eq!(
            TetherError::ProvisionFailure {
                node_name: None,
                source: CollaboratorError::Unavailable("flash".to_string()),
            }
            .exit_code(),
            EXIT_PROVISION
        );
        assert_eq!(TetherError::Config("x".to_string()).exit_code(), EXIT_FATAL);
        assert_eq!(EXIT_SUCCESS, 0);
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(
            TetherError::DeviceNotFound { node_name: None }.kind(),
            "device_not_found"
        );
        assert_eq!(
            TetherError::InvalidState {
                expected: "init",
                actual: "ready"
            }
            .kind(),
            "invalid_state"
        );
        assert_eq!(TetherError::Io(io::Error::other("x")).kind(), "io");
    }

    #[test]
    fn test_collaborator_timeout_becomes_connection_timeout() {
        let err = TetherError::from_collaborator(
            CollaboratorError::CommandFailed {
                command: "ffx".to_string(),
                code: Some(1),
                stderr: "Timeout attempting to reach target \"mocknode\"".to_string(),
            },
            Some("mocknode"),
        );
        assert!(matches!(
            err,
            TetherError::ConnectionTimeout { ref node_name, .. } if node_name.as_deref() == Some("mocknode")
        ));
        assert!(err.is_timeout());

        let passthrough: TetherError = CollaboratorError::Parse("bad json".to_string()).into();
        assert!(matches!(passthrough, TetherError::Collaborator(_)));
        assert!(!passthrough.is_timeout());
    }

    #[test]
    fn test_operator_errors() {
        assert!(TetherError::DeviceNotFound { node_name: None }.is_operator_error());
        assert!(TetherError::AmbiguousTarget { candidates: vec![] }.is_operator_error());
        assert!(!TetherError::Io(io::Error::other("x")).is_operator_error());
    }

    #[test]
    fn test_error_source() {
        let err = TetherError::ProvisionFailure {
            node_name: Some("dev".to_string()),
            source: CollaboratorError::Unavailable("flash tool missing".to_string()),
        };
        assert!(err.source().is_some());
        assert!(TetherError::DeviceNotFound { node_name: None }.source().is_none());
    }
}
