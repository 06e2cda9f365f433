use clap::Subcommand;
use timekeeper_core::points::PointStore;
use timekeeper_core::timer::format_offset;
use timekeeper_core::{builtin_presets, find_preset};

use super::{open_settings, save_settings, CliResult};

#[derive(Subcommand)]
pub enum PresetsAction {
    /// List built-in presets
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the configured points with a preset
    Apply {
        /// Preset ID (30min, 60min, 90min, custom)
        id: String,
    },
}

pub fn run(action: PresetsAction) -> CliResult {
    match action {
        PresetsAction::List { json } => {
            let presets = builtin_presets();
            if json {
                println!("{}", serde_json::to_string_pretty(&presets)?);
                return Ok(());
            }
            let (_, settings) = open_settings()?;
            for preset in presets {
                let marker = if settings.active_preset_id.as_deref() == Some(preset.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                let offsets: Vec<String> = preset
                    .points
                    .iter()
                    .map(|t| format_offset(t.time_ms))
                    .collect();
                println!("{marker} {:<7} {:<8} {}", preset.id, preset.name, offsets.join(", "));
            }
        }
        PresetsAction::Apply { id } => {
            let preset = find_preset(&id)?;
            let (store, mut settings) = open_settings()?;
            if !preset.is_custom() {
                let mut points = PointStore::new();
                points.replace_all(preset.instantiate(), None);
                settings.notification_points = points.list().to_vec();
            }
            settings.active_preset_id = Some(preset.id.clone());
            save_settings(&store, &settings)?;
            println!(
                "applied {} ({} points)",
                preset.id,
                settings.notification_points.len()
            );
        }
    }
    Ok(())
}
