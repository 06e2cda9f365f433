use clap::Subcommand;
use timekeeper_core::Theme;

use super::{open_settings, save_settings, CliResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the persisted settings as JSON
    Show,
    /// Sound preferences
    Sound {
        /// Play a sound when a point fires
        #[arg(long)]
        enabled: Option<bool>,
        /// Volume from 0.0 to 1.0
        #[arg(long)]
        volume: Option<f64>,
    },
    /// Set the theme, or cycle system → light → dark without an argument
    Theme {
        theme: Option<Theme>,
    },
}

pub fn run(action: SettingsAction) -> CliResult {
    let (store, mut settings) = open_settings()?;
    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            return Ok(());
        }
        SettingsAction::Sound { enabled, volume } => {
            settings.set_sound(enabled, volume);
            let prefs = settings.sound_prefs();
            println!(
                "sound {} at {:.0}%",
                if prefs.enabled { "on" } else { "off" },
                prefs.volume * 100.0
            );
        }
        SettingsAction::Theme { theme } => {
            let next = settings.theme.next();
            settings.theme = theme.unwrap_or(next);
            println!("theme {}", settings.theme);
        }
    }
    save_settings(&store, &settings)
}
