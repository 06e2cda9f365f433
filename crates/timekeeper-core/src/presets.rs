//! Built-in preset catalog.
//!
//! A preset is an ordered list of point templates. Applying one replaces
//! every configured point; the `custom` preset is a marker for "whatever the
//! user set up" and carries no templates.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::points::{NotificationPoint, Urgency};

pub const CUSTOM_PRESET_ID: &str = "custom";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointTemplate {
    pub time_ms: u64,
    pub label: String,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub points: Vec<PointTemplate>,
}

impl Preset {
    pub fn is_custom(&self) -> bool {
        self.id == CUSTOM_PRESET_ID
    }

    /// Fresh, unfired points with new ids.
    pub fn instantiate(&self) -> Vec<NotificationPoint> {
        self.points
            .iter()
            .map(|t| NotificationPoint::new(t.time_ms, t.label.clone(), t.urgency))
            .collect()
    }

    /// Total length, i.e. the last template's offset.
    pub fn duration_ms(&self) -> u64 {
        self.points.iter().map(|t| t.time_ms).max().unwrap_or(0)
    }
}

fn template(minutes: u64, label: &str, urgency: Urgency) -> PointTemplate {
    PointTemplate {
        time_ms: minutes * 60_000,
        label: label.into(),
        urgency,
    }
}

pub fn builtin_presets() -> Vec<Preset> {
    use Urgency::{Info, Urgent, Warning};
    vec![
        Preset {
            id: "30min".into(),
            name: "30 min".into(),
            points: vec![
                template(15, "Halfway", Info),
                template(25, "5 min left", Warning),
                template(29, "1 min left", Urgent),
                template(30, "Time!", Urgent),
            ],
        },
        Preset {
            id: "60min".into(),
            name: "60 min".into(),
            points: vec![
                template(30, "Halfway", Info),
                template(45, "15 min left", Warning),
                template(55, "5 min left", Urgent),
                template(60, "Time!", Urgent),
            ],
        },
        Preset {
            id: "90min".into(),
            name: "90 min".into(),
            points: vec![
                template(45, "Halfway", Info),
                template(60, "30 min left", Info),
                template(80, "10 min left", Warning),
                template(88, "2 min left", Urgent),
                template(90, "Time!", Urgent),
            ],
        },
        Preset {
            id: CUSTOM_PRESET_ID.into(),
            name: "Custom".into(),
            points: Vec::new(),
        },
    ]
}

pub fn find_preset(id: &str) -> Result<Preset, ValidationError> {
    builtin_presets()
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| ValidationError::UnknownPreset(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_templates_are_sorted_and_in_range() {
        for preset in builtin_presets() {
            let times: Vec<u64> = preset.points.iter().map(|t| t.time_ms).collect();
            let mut sorted = times.clone();
            sorted.sort_unstable();
            assert_eq!(times, sorted, "{} is out of order", preset.id);
            for t in &preset.points {
                assert!(crate::points::validate_time(t.time_ms).is_ok());
            }
        }
    }

    #[test]
    fn instantiate_gives_fresh_ids() {
        let preset = find_preset("30min").unwrap();
        let a = preset.instantiate();
        let b = preset.instantiate();
        assert_eq!(a.len(), 4);
        assert!(a.iter().all(|p| !p.fired));
        assert_ne!(a[0].id, b[0].id);
        assert_eq!(preset.duration_ms(), 30 * 60_000);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        assert_eq!(
            find_preset("45min"),
            Err(ValidationError::UnknownPreset("45min".into()))
        );
        assert!(find_preset(CUSTOM_PRESET_ID).unwrap().is_custom());
    }
}
