//! Notification point commands for CLI.
//!
//! Edits go straight to the persisted settings. A `timekeeper run` session
//! reads settings only when it starts and writes its own points back on
//! save, so edits made while a session is open are overwritten.

use clap::Subcommand;
use timekeeper_core::points::PointStore;
use timekeeper_core::presets::CUSTOM_PRESET_ID;
use timekeeper_core::timer::format_offset;
use timekeeper_core::{PointDraft, PointPatch, Urgency};

use super::{open_settings, parse_offset, resolve_point, save_settings, CliResult};

#[derive(Subcommand)]
pub enum PointsAction {
    /// List configured points
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a point
    Add {
        /// Offset from start as MIN or MIN:SEC
        #[arg(value_parser = parse_offset)]
        at: u64,
        /// Label shown in the alert (max 50 characters)
        #[arg(long, default_value = "")]
        label: String,
        /// info, warning or urgent
        #[arg(long, default_value = "info")]
        urgency: Urgency,
    },
    /// Update a point
    Update {
        /// Point ID or unique prefix
        id: String,
        /// New offset as MIN or MIN:SEC
        #[arg(long, value_parser = parse_offset)]
        at: Option<u64>,
        /// New label
        #[arg(long)]
        label: Option<String>,
        /// New urgency
        #[arg(long)]
        urgency: Option<Urgency>,
    },
    /// Remove a point
    Remove {
        /// Point ID or unique prefix
        id: String,
    },
}

pub fn run(action: PointsAction) -> CliResult {
    let (store, mut settings) = open_settings()?;
    let mut points = PointStore::from_points(std::mem::take(&mut settings.notification_points));

    match action {
        PointsAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(points.list())?);
            } else if points.is_empty() {
                println!("no notification points");
            } else {
                for point in points.list() {
                    println!(
                        "{}  {:>8}  {:<7}  {}",
                        &point.id.to_string()[..8],
                        format_offset(point.time_ms),
                        point.urgency,
                        point.label
                    );
                }
            }
            return Ok(());
        }
        PointsAction::Add { at, label, urgency } => {
            let point = points.add(PointDraft::new(at, label, urgency), None)?;
            println!("added {} at {}", point.id, format_offset(point.time_ms));
        }
        PointsAction::Update {
            id,
            at,
            label,
            urgency,
        } => {
            let id = resolve_point(points.list(), &id)?;
            let patch = PointPatch {
                time_ms: at,
                label,
                urgency,
            };
            let point = points.update(id, patch, None)?;
            println!("updated {} at {}", point.id, format_offset(point.time_ms));
        }
        PointsAction::Remove { id } => {
            let id = resolve_point(points.list(), &id)?;
            let point = points.remove(id)?;
            println!("removed {}", point.id);
        }
    }

    settings.notification_points = points.list().to_vec();
    settings.active_preset_id = Some(CUSTOM_PRESET_ID.to_string());
    save_settings(&store, &settings)
}
