//! Acquisition lifecycle: the state machine a device run moves through
//!
//! ```text
//!     ┌──────┐ start()  ┌───────────┐        ┌────────────┐
//!     │ Init │ ───────> │ Resolving │ ─────> │ Connecting │ ──────────────┐
//!     └──────┘          └───────────┘        └─────┬──────┘               │
//!                                                  │ reconcile            │ unreachable,
//!                                           ┌──────▼───────┐              │ image configured
//!                                           │ VersionCheck │              │
//!                                           └──────┬───────┘              │
//!                                                  │ mismatch (update)    │
//!                                           ┌──────▼───────┐              │
//!                                           │ Provisioning │ <────────────┘
//!                                           └──────┬───────┘
//!                                           ┌──────▼───────┐
//!                                           │    Ready     │
//!                                           └──────────────┘
//! ```
//!
//! `Failed` is reachable from every non-terminal state. `Connecting` and
//! `VersionCheck` may also go straight to `Ready`.
//!
//! # Example
//!
//! ```
//! use tether::lifecycle::{AcquireLifecycle, AcquireState};
//!
//! let mut lifecycle = AcquireLifecycle::new();
//! assert!(lifecycle.advance(AcquireState::Resolving).is_some());
//! assert!(lifecycle.advance(AcquireState::Ready).is_none()); // must connect first
//! assert!(lifecycle.advance(AcquireState::Failed).is_some());
//! assert!(lifecycle.state().is_terminal());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant, SystemTime};
use tracing::debug;

/// States of one acquisition run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquireState {
    /// Constructed, `start()` not yet called
    Init,

    /// Choosing the device (discovery + selection, or the requested name)
    Resolving,

    /// Resolving the address and opening the control session
    Connecting,

    /// Comparing the installed version with the local image
    VersionCheck,

    /// Flashing the local image
    Provisioning,

    /// Target resolved and usable
    Ready,

    /// Run aborted; nothing resolved is exposed
    Failed,
}

impl AcquireState {
    /// String representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquireState::Init => "init",
            AcquireState::Resolving => "resolving",
            AcquireState::Connecting => "connecting",
            AcquireState::VersionCheck => "version_check",
            AcquireState::Provisioning => "provisioning",
            AcquireState::Ready => "ready",
            AcquireState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AcquireState::Ready | AcquireState::Failed)
    }

    /// Whether `self -> to` is an edge of the state machine
    pub fn can_transition_to(&self, to: AcquireState) -> bool {
        use AcquireState::*;

        if to == Failed {
            return !self.is_terminal();
        }

        matches!(
            (*self, to),
            (Init, Resolving)
                | (Resolving, Connecting)
                | (Connecting, VersionCheck)
                | (Connecting, Provisioning)
                | (Connecting, Ready)
                | (VersionCheck, Provisioning)
                | (VersionCheck, Ready)
                | (Provisioning, Ready)
        )
    }
}

impl fmt::Display for AcquireState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: AcquireState,
    pub to: AcquireState,
    pub at: SystemTime,
}

/// Tracks the current state and the history of one run
#[derive(Debug)]
pub struct AcquireLifecycle {
    state: AcquireState,
    state_entered_at: Instant,
    transitions: Vec<StateTransition>,
}

impl AcquireLifecycle {
    /// Create a lifecycle in the Init state
    pub fn new() -> Self {
        Self {
            state: AcquireState::Init,
            state_entered_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> AcquireState {
        self.state
    }

    /// Get time spent in the current state
    pub fn time_in_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// States visited so far, starting with Init
    pub fn path(&self) -> Vec<AcquireState> {
        std::iter::once(AcquireState::Init)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }

    /// Move to `to`, or return `None` if that edge does not exist
    pub fn advance(&mut self, to: AcquireState) -> Option<StateTransition> {
        if !self.state.can_transition_to(to) {
            return None;
        }

        let transition = StateTransition {
            from: self.state,
            to,
            at: SystemTime::now(),
        };

        debug!(
            from = %transition.from,
            to = %transition.to,
            elapsed_ms = self.time_in_state().as_millis() as u64,
            "Acquisition state change"
        );

        self.state = to;
        self.state_entered_at = Instant::now();
        self.transitions.push(transition.clone());

        Some(transition)
    }
}

impl Default for AcquireLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
