//! User settings persisted between sessions.
//!
//! One JSON record under the [`SETTINGS_KEY`] namespace holds the theme,
//! the sound preferences, the active preset and the configured points.
//! Timer runtime state is never persisted. Loading is lenient: records
//! written by older builds or edited by hand are coerced field by field
//! instead of being rejected.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::data_dir;
use crate::delivery::SoundPrefs;
use crate::error::{PersistenceError, Result, ValidationError};
use crate::points::{clean_label, NotificationPoint, Urgency};

/// Storage namespace for the settings record.
pub const SETTINGS_KEY: &str = "timekeeper_settings";

const DEFAULT_VOLUME: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    /// system → light → dark → system
    pub fn next(self) -> Self {
        match self {
            Theme::System => Theme::Light,
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::System,
        }
    }
}

impl FromStr for Theme {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(ValidationError::InvalidValue {
                field: "theme".into(),
                message: format!("expected light, dark or system, got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The persisted settings record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSettings")]
pub struct Settings {
    pub theme: Theme,
    pub sound_enabled: bool,
    pub sound_volume: f64,
    pub active_preset_id: Option<String>,
    pub notification_points: Vec<NotificationPoint>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            sound_enabled: true,
            sound_volume: DEFAULT_VOLUME,
            active_preset_id: None,
            notification_points: Vec::new(),
        }
    }
}

impl Settings {
    pub fn sound_prefs(&self) -> SoundPrefs {
        SoundPrefs {
            enabled: self.sound_enabled,
            volume: self.sound_volume,
        }
    }

    pub fn set_sound(&mut self, enabled: Option<bool>, volume: Option<f64>) {
        if let Some(enabled) = enabled {
            self.sound_enabled = enabled;
        }
        if let Some(volume) = volume {
            self.sound_volume = clamp_volume(volume);
        }
    }

    /// Serialize as the namespaced record.
    pub fn to_record(&self) -> Result<String> {
        let mut record = serde_json::Map::new();
        record.insert(SETTINGS_KEY.to_string(), serde_json::to_value(self)?);
        Ok(serde_json::to_string_pretty(&Value::Object(record))?)
    }

    /// Parse a namespaced record. `None` when the namespace is absent.
    pub fn from_record(raw: &str) -> Result<Option<Self>> {
        let value: Value = serde_json::from_str(raw).map_err(PersistenceError::from)?;
        match value.get(SETTINGS_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(record) => {
                let settings =
                    Settings::deserialize(record).map_err(PersistenceError::from)?;
                Ok(Some(settings))
            }
        }
    }

    /// Load from `store`, falling back to defaults on any failure.
    pub fn load_or_default(store: &dyn SettingsStore) -> Self {
        match store.load() {
            Ok(Some(settings)) => settings,
            Ok(None) => Self::default(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable settings");
                Self::default()
            }
        }
    }
}

fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        DEFAULT_VOLUME
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    theme: Option<Value>,
    #[serde(alias = "soundEnabled")]
    sound_enabled: Option<Value>,
    #[serde(alias = "soundVolume")]
    sound_volume: Option<Value>,
    #[serde(alias = "activePresetId")]
    active_preset_id: Option<Value>,
    #[serde(alias = "notificationPoints")]
    notification_points: Option<Value>,
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        let defaults = Settings::default();
        let notification_points = match raw.notification_points {
            Some(Value::Array(items)) => items.iter().filter_map(coerce_point).collect(),
            _ => defaults.notification_points,
        };
        Settings {
            theme: raw
                .theme
                .as_ref()
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.theme),
            sound_enabled: raw
                .sound_enabled
                .as_ref()
                .and_then(Value::as_bool)
                .unwrap_or(defaults.sound_enabled),
            sound_volume: raw
                .sound_volume
                .as_ref()
                .and_then(Value::as_f64)
                .map(clamp_volume)
                .unwrap_or(defaults.sound_volume),
            active_preset_id: raw
                .active_preset_id
                .as_ref()
                .and_then(Value::as_str)
                .map(str::to_string),
            notification_points,
        }
    }
}

/// Coerce one stored point. Non-objects are dropped; every field of an
/// object falls back to something usable and `fired` always starts false.
fn coerce_point(value: &Value) -> Option<NotificationPoint> {
    let obj = value.as_object()?;
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let time_ms = obj
        .get("time_ms")
        .or_else(|| obj.get("timeMs"))
        .and_then(coerce_time)
        .unwrap_or(0);
    let label = obj
        .get("label")
        .and_then(Value::as_str)
        .map(clean_label)
        .unwrap_or_default();
    let urgency = obj
        .get("urgency")
        .and_then(Value::as_str)
        .map(Urgency::parse_lenient)
        .unwrap_or_default();
    Some(NotificationPoint {
        id,
        time_ms,
        label,
        urgency,
        fired: false,
    })
}

fn coerce_time(value: &Value) -> Option<u64> {
    if let Some(ms) = value.as_u64() {
        return Some(ms);
    }
    let ms = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (ms.is_finite() && ms >= 0.0).then(|| ms as u64)
}

/// Where the settings record lives.
pub trait SettingsStore: Send {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Settings>>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings as `timekeeper_settings.json` on disk.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The record file inside the application data directory.
    pub fn in_data_dir() -> Result<Self> {
        Ok(Self::new(data_dir()?.join(format!("{SETTINGS_KEY}.json"))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Option<Settings>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::ReadFailed {
                    path: self.path.clone(),
                    source,
                }
                .into())
            }
        };
        Settings::from_record(&raw)
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let record = settings.to_record()?;
        std::fs::write(&self.path, record).map_err(|source| PersistenceError::WriteFailed {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// In-memory key/value store. Clones share the same backing map.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    saves: Arc<AtomicUsize>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw record last written, if any.
    pub fn raw(&self) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(SETTINGS_KEY).cloned())
    }

    pub fn put_raw(&self, raw: impl Into<String>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(SETTINGS_KEY.to_string(), raw.into());
        }
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<Settings>> {
        match self.raw() {
            Some(raw) => Settings::from_record(&raw),
            None => Ok(None),
        }
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let record = settings.to_record()?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| crate::error::CoreError::environment("settings store", "lock poisoned"))?;
        entries.insert(SETTINGS_KEY.to_string(), record);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(body: Value) -> String {
        json!({ SETTINGS_KEY: body }).to_string()
    }

    #[test]
    fn defaults_match_first_run() {
        let s = Settings::default();
        assert_eq!(s.theme, Theme::System);
        assert!(s.sound_enabled);
        assert_eq!(s.sound_volume, 0.7);
        assert!(s.active_preset_id.is_none());
        assert!(s.notification_points.is_empty());
    }

    #[test]
    fn load_forces_unfired_and_sanitizes_urgency() {
        let raw = record(json!({
            "notification_points": [
                {"id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427", "time_ms": 60000,
                 "label": "a", "urgency": "urgent", "fired": true},
                {"time_ms": 120000, "label": "b", "urgency": "critical", "fired": true},
                {"time_ms": 180000}
            ]
        }));
        let s = Settings::from_record(&raw).unwrap().unwrap();
        let points = &s.notification_points;
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| !p.fired));
        assert_eq!(points[0].urgency, Urgency::Urgent);
        assert_eq!(
            points[0].id,
            Uuid::parse_str("1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap()
        );
        assert_eq!(points[1].urgency, Urgency::Info);
        assert_eq!(points[2].urgency, Urgency::Info);
        assert_eq!(points[2].label, "");
        assert_ne!(points[1].id, points[2].id);
    }

    #[test]
    fn load_coerces_bad_fields() {
        let raw = record(json!({
            "theme": "neon",
            "sound_enabled": "yes",
            "sound_volume": 3.5,
            "active_preset_id": 42,
            "notification_points": [
                {"id": "not-a-uuid", "time_ms": "90000"},
                {"time_ms": "soon"},
                {"time_ms": -5},
                "garbage"
            ]
        }));
        let s = Settings::from_record(&raw).unwrap().unwrap();
        assert_eq!(s.theme, Theme::System);
        assert!(s.sound_enabled);
        assert_eq!(s.sound_volume, 1.0);
        assert!(s.active_preset_id.is_none());
        let times: Vec<u64> = s.notification_points.iter().map(|p| p.time_ms).collect();
        assert_eq!(times, vec![90_000, 0, 0]);
    }

    #[test]
    fn load_accepts_camel_case_records() {
        let raw = record(json!({
            "theme": "dark",
            "soundEnabled": false,
            "soundVolume": 0.25,
            "activePresetId": "60min",
            "notificationPoints": [{"timeMs": 300000, "label": "five", "urgency": "warning"}]
        }));
        let s = Settings::from_record(&raw).unwrap().unwrap();
        assert_eq!(s.theme, Theme::Dark);
        assert!(!s.sound_enabled);
        assert_eq!(s.sound_volume, 0.25);
        assert_eq!(s.active_preset_id.as_deref(), Some("60min"));
        assert_eq!(s.notification_points[0].time_ms, 300_000);
        assert_eq!(s.notification_points[0].urgency, Urgency::Warning);
    }

    #[test]
    fn missing_namespace_is_none_and_bad_json_is_an_error() {
        assert!(Settings::from_record("{}").unwrap().is_none());
        assert!(matches!(
            Settings::from_record("{not json"),
            Err(crate::error::CoreError::Persistence(PersistenceError::Malformed(_)))
        ));
    }

    #[test]
    fn file_store_saves_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("timekeeper_settings.json"));
        assert!(store.load().unwrap().is_none());

        let mut settings = Settings::default();
        settings.theme = Theme::Light;
        settings.active_preset_id = Some("custom".into());
        let mut point = NotificationPoint::new(120_000, "two", Urgency::Warning);
        point.fired = true;
        settings.notification_points.push(point.clone());
        store.save(&settings).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.theme, Theme::Light);
        assert_eq!(loaded.notification_points[0].id, point.id);
        assert!(!loaded.notification_points[0].fired);
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timekeeper_settings.json");
        std::fs::write(&path, "[[[").unwrap();
        let store = FileSettingsStore::new(&path);
        assert!(store.load().is_err());
        assert_eq!(Settings::load_or_default(&store), Settings::default());
    }

    #[test]
    fn write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("missing").join("settings.json"));
        assert!(matches!(
            store.save(&Settings::default()),
            Err(crate::error::CoreError::Persistence(PersistenceError::WriteFailed { .. }))
        ));
    }

    #[test]
    fn memory_store_is_shared_between_clones() {
        let store = MemorySettingsStore::new();
        let other = store.clone();
        let mut settings = Settings::default();
        settings.set_sound(Some(false), Some(-1.0));
        store.save(&settings).unwrap();

        let loaded = other.load().unwrap().unwrap();
        assert!(!loaded.sound_enabled);
        assert_eq!(loaded.sound_volume, 0.0);
        assert_eq!(other.save_count(), 1);
    }

    #[test]
    fn theme_cycles_and_parses() {
        assert_eq!(Theme::System.next(), Theme::Light);
        assert_eq!(Theme::Light.next(), Theme::Dark);
        assert_eq!(Theme::Dark.next(), Theme::System);
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("neon".parse::<Theme>().is_err());
    }
}
