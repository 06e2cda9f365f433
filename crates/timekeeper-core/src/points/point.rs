use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Shortest offset a user may configure (1 minute).
pub const MIN_POINT_MS: u64 = 60_000;
/// Longest offset a user may configure (480 minutes).
pub const MAX_POINT_MS: u64 = 480 * 60_000;
/// Labels longer than this are truncated.
pub const MAX_LABEL_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Info,
    Warning,
    Urgent,
}

impl Urgency {
    pub const ALL: [Urgency; 3] = [Urgency::Info, Urgency::Warning, Urgency::Urgent];

    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Info => "info",
            Urgency::Warning => "warning",
            Urgency::Urgent => "urgent",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Urgency::Info => "Info",
            Urgency::Warning => "Warning",
            Urgency::Urgent => "Urgent",
        }
    }

    /// Anything unrecognised maps to `Info`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl std::str::FromStr for Urgency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Urgency::Info),
            "warning" => Ok(Urgency::Warning),
            "urgent" => Ok(Urgency::Urgent),
            other => Err(ValidationError::InvalidValue {
                field: "urgency".into(),
                message: format!("expected info, warning or urgent, got '{other}'"),
            }),
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

// Stored records may carry urgencies from older builds or hand edits.
impl<'de> Deserialize<'de> for Urgency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => Urgency::parse_lenient(&s),
            _ => Urgency::Info,
        })
    }
}

/// A configured elapsed-time offset, delivered once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPoint {
    pub id: Uuid,
    pub time_ms: u64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub fired: bool,
}

impl NotificationPoint {
    /// Build an unfired point with a fresh id. No range check.
    pub fn new(time_ms: u64, label: impl Into<String>, urgency: Urgency) -> Self {
        Self {
            id: Uuid::new_v4(),
            time_ms,
            label: clean_label(&label.into()),
            urgency,
            fired: false,
        }
    }

    pub fn is_due(&self, elapsed_ms: u64) -> bool {
        !self.fired && elapsed_ms >= self.time_ms
    }
}

/// Fields for a user-created point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointDraft {
    pub time_ms: u64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub urgency: Urgency,
}

impl PointDraft {
    pub fn new(time_ms: u64, label: impl Into<String>, urgency: Urgency) -> Self {
        Self {
            time_ms,
            label: label.into(),
            urgency,
        }
    }
}

/// Partial update. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointPatch {
    pub time_ms: Option<u64>,
    pub label: Option<String>,
    pub urgency: Option<Urgency>,
}

/// Reject offsets outside the user-configurable range.
pub fn validate_time(time_ms: u64) -> Result<u64, ValidationError> {
    if (MIN_POINT_MS..=MAX_POINT_MS).contains(&time_ms) {
        Ok(time_ms)
    } else {
        Err(ValidationError::TimeOutOfRange {
            time_ms,
            min_ms: MIN_POINT_MS,
            max_ms: MAX_POINT_MS,
        })
    }
}

/// Trim and cap at `MAX_LABEL_CHARS` characters.
pub fn clean_label(label: &str) -> String {
    label.trim().chars().take(MAX_LABEL_CHARS).collect()
}
