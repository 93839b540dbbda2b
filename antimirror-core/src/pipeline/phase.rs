//! Pipeline state machine.
//!
//! ```text
//!  Idle ──start──► Running
//!   ▲                 │
//!   └──────stop───────┘   (explicit stop, source ended, source detached)
//! ```

use std::time::Duration;

use tokio::time::Instant;

use crate::error::MirrorError;

/// Whether the pipeline currently has a frame source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelinePhase {
    /// No frame source; ticks do nothing.
    #[default]
    Idle,

    /// A frame source is active and the tick loop processes frames.
    Running {
        /// When capture started.
        since: Instant,
    },
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running { .. } => write!(f, "Running"),
        }
    }
}

impl PipelinePhase {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// How long capture has been running; `None` when idle.
    pub fn running_duration(&self) -> Option<Duration> {
        match self {
            Self::Running { since } => Some(since.elapsed()),
            Self::Idle => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Running`.
    ///
    /// Valid from: `Idle`.
    pub fn start(&mut self) -> Result<(), MirrorError> {
        match self {
            Self::Idle => {
                *self = Self::Running {
                    since: Instant::now(),
                };
                Ok(())
            }
            Self::Running { .. } => Err(MirrorError::InvalidTransition(
                "cannot start capture: already running",
            )),
        }
    }

    /// Transition to `Idle`.
    ///
    /// Valid from: `Running`.
    pub fn stop(&mut self) -> Result<(), MirrorError> {
        match self {
            Self::Running { .. } => {
                *self = Self::Idle;
                Ok(())
            }
            Self::Idle => Err(MirrorError::InvalidTransition(
                "cannot stop capture: not running",
            )),
        }
    }
}
