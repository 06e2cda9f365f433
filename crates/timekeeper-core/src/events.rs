use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::points::Urgency;
use crate::timer::TimerStatus;

/// Every state change in the scheduler produces an Event.
/// Commands return them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Fresh start from Stopped. Fired flags were cleared.
    TimerStarted {
        at: DateTime<Utc>,
    },
    TimerResumed {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        /// Deliveries that were still queued and got cancelled.
        cancelled: usize,
        at: DateTime<Utc>,
    },
    /// One or more points crossed during a detection pass.
    PointsDetected {
        elapsed_ms: u64,
        point_ids: Vec<Uuid>,
        at: DateTime<Utc>,
    },
    /// A point left the delivery queue and was handed to the delivery sink.
    PointFired {
        point_id: Uuid,
        time_ms: u64,
        label: String,
        urgency: Urgency,
        at: DateTime<Utc>,
    },
    PointAdded {
        point_id: Uuid,
        time_ms: u64,
        /// True when the point was already in the past on creation.
        fired: bool,
        at: DateTime<Utc>,
    },
    PointUpdated {
        point_id: Uuid,
        time_ms: u64,
        fired: bool,
        at: DateTime<Utc>,
    },
    PointRemoved {
        point_id: Uuid,
        at: DateTime<Utc>,
    },
    PresetApplied {
        preset_id: String,
        point_count: usize,
        /// Points pre-marked fired because the timer was already past them.
        already_passed: usize,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: TimerStatus,
        elapsed_ms: u64,
        pending_deliveries: usize,
        active_preset_id: Option<String>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Stable snake_case name of the variant, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerResumed { .. } => "timer_resumed",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerReset { .. } => "timer_reset",
            Event::PointsDetected { .. } => "points_detected",
            Event::PointFired { .. } => "point_fired",
            Event::PointAdded { .. } => "point_added",
            Event::PointUpdated { .. } => "point_updated",
            Event::PointRemoved { .. } => "point_removed",
            Event::PresetApplied { .. } => "preset_applied",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}
