//! Elapsed-time model.
//!
//! A three-phase state machine over a monotonic clock. Time is passed in
//! explicitly so the model stays pure; the scheduler reads its clock once
//! per operation and hands the value down.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Running <-> Paused
//!    ^          |           |
//!    +--------(reset)-------+
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Stopped,
    Running,
    Paused,
}

impl TimerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerStatus::Stopped => "stopped",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
        }
    }
}

/// Exactly one of the start timestamp or the paused elapsed value is
/// authoritative, so each lives only in its own phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Stopped,
    Running { started_at_ms: u64 },
    Paused { elapsed_ms: u64 },
}

/// What a successful `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartKind {
    /// From Stopped. Fired flags must be cleared.
    Fresh,
    /// From Paused. Fired flags are kept.
    Resume { elapsed_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    phase: Phase,
}

impl TimerState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Stopped,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        match self.phase {
            Phase::Stopped => TimerStatus::Stopped,
            Phase::Running { .. } => TimerStatus::Running,
            Phase::Paused { .. } => TimerStatus::Paused,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    /// Clock reading (ms) the current run is anchored to, only while Running.
    pub fn start_timestamp_ms(&self) -> Option<u64> {
        match self.phase {
            Phase::Running { started_at_ms } => Some(started_at_ms),
            _ => None,
        }
    }

    /// Elapsed time held while not running. Zero while Running or Stopped.
    pub fn paused_elapsed_ms(&self) -> u64 {
        match self.phase {
            Phase::Paused { elapsed_ms } => elapsed_ms,
            _ => 0,
        }
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.phase {
            Phase::Stopped => 0,
            Phase::Running { started_at_ms } => now_ms.saturating_sub(started_at_ms),
            Phase::Paused { elapsed_ms } => elapsed_ms,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume. Returns `None` when already running.
    pub fn start(&mut self, now_ms: u64) -> Option<StartKind> {
        match self.phase {
            Phase::Running { .. } => None,
            Phase::Paused { elapsed_ms } => {
                // Anchor back in time so elapsed continues from where it paused.
                self.phase = Phase::Running {
                    started_at_ms: now_ms.saturating_sub(elapsed_ms),
                };
                Some(StartKind::Resume { elapsed_ms })
            }
            Phase::Stopped => {
                self.phase = Phase::Running {
                    started_at_ms: now_ms,
                };
                Some(StartKind::Fresh)
            }
        }
    }

    /// Freeze elapsed time. Returns the frozen value, or `None` unless running.
    pub fn pause(&mut self, now_ms: u64) -> Option<u64> {
        match self.phase {
            Phase::Running { .. } => {
                let elapsed_ms = self.elapsed_ms(now_ms);
                self.phase = Phase::Paused { elapsed_ms };
                Some(elapsed_ms)
            }
            _ => None,
        }
    }

    /// Back to Stopped with zero elapsed. Always succeeds.
    pub fn reset(&mut self) -> TimerStatus {
        let previous = self.status();
        self.phase = Phase::Stopped;
        previous
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}
