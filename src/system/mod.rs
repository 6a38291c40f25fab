//! Real collaborator implementations
//!
//! - `ControlTool`: discovery, address lookup and flashing through the
//!   device-control CLI
//! - `SshSession`: multiplexed SSH control session
//! - `ImageVersionOracle`: local image hashing and installed-version lookup
//!
//! In-memory doubles live in [`crate::testing`].

mod control;
mod image;
mod ssh;

use std::sync::Arc;

pub use control::{parse_target_list, ControlTool};
pub use image::{hash_image_dir, ImageVersionOracle, IMAGE_VERSION_FILE, INSTALLED_VERSION_PATH};
pub use ssh::{SshConfig, SshSession};

use crate::config::AcquireConfig;
use crate::orchestrator::Collaborators;

/// Collaborators backed by the control tool, SSH and the local filesystem
pub fn host_collaborators(config: &AcquireConfig) -> Collaborators {
    let control = Arc::new(ControlTool::from_config(config));
    Collaborators {
        discovery: control.clone(),
        connector: control.clone(),
        oracle: Arc::new(ImageVersionOracle::new()),
        provisioner: control,
    }
}
