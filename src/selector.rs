/*!
 * Target selection over discovery results
 *
 * Resolves a discovery listing to exactly one device. Devices that have not
 * reported a node name are never selectable.
 */

use tether_interface::DeviceDescriptor;
use tracing::debug;

use crate::error::{Result, TetherError};

/// Pick exactly one device from `descriptors`
///
/// With `requested` set, the first device carrying that node name wins.
/// Without it, the listing must contain exactly one named device.
///
/// # Errors
///
/// - `DeviceNotFound` when nothing matches
/// - `AmbiguousTarget` when several named devices remain and none was requested
pub fn select_target(
    descriptors: Vec<DeviceDescriptor>,
    requested: Option<&str>,
) -> Result<DeviceDescriptor> {
    let mut candidates: Vec<DeviceDescriptor> = descriptors
        .into_iter()
        .filter(|d| {
            let named = d.has_node_name();
            if !named {
                debug!(addresses = ?d.addresses, "Skipping device without a node name");
            }
            named
        })
        .collect();

    for candidate in &candidates {
        debug!(
            node_name = %candidate.node_name,
            rcs_state = %candidate.rcs_state,
            addresses = ?candidate.addresses,
            "Discovered candidate"
        );
    }

    if let Some(name) = requested {
        return candidates
            .into_iter()
            .find(|d| d.node_name == name)
            .ok_or_else(|| TetherError::DeviceNotFound {
                node_name: Some(name.to_string()),
            });
    }

    match candidates.len() {
        0 => Err(TetherError::DeviceNotFound { node_name: None }),
        1 => Ok(candidates.remove(0)),
        _ => Err(TetherError::AmbiguousTarget {
            candidates: candidates.into_iter().map(|d| d.node_name).collect(),
        }),
    }
}
