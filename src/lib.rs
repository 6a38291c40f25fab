/*!
 * Tether - device acquisition for on-device test runs
 *
 * Finds exactly one development device on the host's network, opens a
 * control session to it, and optionally makes sure it runs the system image
 * the tests were built against:
 * - Discovery and unambiguous selection of a target by node name
 * - Address resolution and a scoped SSH control session
 * - Version reconciliation (ignore / check / update) against a local image
 * - Flashing devices that are out of date or not answering at all
 *
 * Author: Shane Wall <shaneawall@gmail.com>
 */

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod selector;
pub mod system;
pub mod testing;

// Re-export commonly used types
pub use config::{AcquireConfig, VersionCheckMode};
pub use error::{Result, TetherError};
pub use lifecycle::AcquireState;
pub use orchestrator::{Collaborators, DeviceOrchestrator, ResolvedTarget};
pub use selector::select_target;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
