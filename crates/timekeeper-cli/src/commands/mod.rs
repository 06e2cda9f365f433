pub mod config;
pub mod points;
pub mod presets;
pub mod run;
pub mod settings;

use timekeeper_core::{FileSettingsStore, NotificationPoint, Settings, SettingsStore};
use uuid::Uuid;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Settings file in the data directory plus its current contents.
pub fn open_settings() -> Result<(FileSettingsStore, Settings), Box<dyn std::error::Error>> {
    let store = FileSettingsStore::in_data_dir()?;
    let settings = Settings::load_or_default(&store);
    Ok((store, settings))
}

pub fn save_settings(store: &FileSettingsStore, settings: &Settings) -> CliResult {
    store.save(settings)?;
    Ok(())
}

/// Parse `MIN[:SEC]` into milliseconds.
pub fn parse_offset(input: &str) -> Result<u64, String> {
    let (min, sec) = match input.split_once(':') {
        Some((min, sec)) => (min, sec),
        None => (input, "0"),
    };
    let min: u64 = min
        .trim()
        .parse()
        .map_err(|_| format!("invalid minutes in '{input}'"))?;
    let sec: u64 = sec
        .trim()
        .parse()
        .map_err(|_| format!("invalid seconds in '{input}'"))?;
    if sec >= 60 {
        return Err(format!("seconds must be below 60 in '{input}'"));
    }
    min.checked_mul(60)
        .and_then(|secs| secs.checked_add(sec))
        .and_then(|secs| secs.checked_mul(1000))
        .ok_or_else(|| format!("offset too large in '{input}'"))
}

/// Find a point by full id or unique id prefix.
pub fn resolve_point(points: &[NotificationPoint], query: &str) -> Result<Uuid, String> {
    if let Ok(id) = Uuid::parse_str(query) {
        return Ok(id);
    }
    let query = query.to_ascii_lowercase();
    let mut matches = points
        .iter()
        .filter(|p| p.id.to_string().starts_with(&query));
    match (matches.next(), matches.next()) {
        (Some(point), None) => Ok(point.id),
        (Some(_), Some(_)) => Err(format!("ambiguous point id '{query}'")),
        (None, _) => Err(format!("no point matches '{query}'")),
    }
}
