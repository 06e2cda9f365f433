//! Foreground timer session.
//!
//! Reads one command per line from stdin while the scheduler service runs
//! in the background. Fired points are printed as they are delivered.

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use timekeeper_core::delivery::{AlertDispatcher, LogNotifier, TerminalBell};
use timekeeper_core::service::{self, ServiceHandle};
use timekeeper_core::timer::{format_clock, format_offset};
use timekeeper_core::{Config, CoreError, Event, FileSettingsStore, PointDraft, Urgency};

use super::{parse_offset, CliResult};

const HELP: &str = "commands: start | pause | reset | status | points | \
add MIN[:SEC] [info|warning|urgent] [label] | preset ID | hide | show | quit";

#[derive(Args)]
pub struct RunArgs {
    /// Apply a preset before the session begins
    #[arg(long)]
    preset: Option<String>,
    /// Start the timer immediately
    #[arg(long)]
    start: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum LineCommand {
    Start,
    Pause,
    Reset,
    Status,
    Points,
    Add {
        time_ms: u64,
        urgency: Urgency,
        label: String,
    },
    Preset(String),
    Hide,
    Show,
    Help,
    Quit,
}

fn parse_line(line: &str) -> Result<Option<LineCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let command = match verb.to_ascii_lowercase().as_str() {
        "start" | "resume" => LineCommand::Start,
        "pause" => LineCommand::Pause,
        "reset" => LineCommand::Reset,
        "status" => LineCommand::Status,
        "points" | "list" => LineCommand::Points,
        "add" => {
            let at = words.next().ok_or("add needs an offset")?;
            let time_ms = parse_offset(at)?;
            let rest: Vec<&str> = words.collect();
            let (urgency, label) = match rest.split_first() {
                Some((first, tail)) => match first.parse::<Urgency>() {
                    Ok(urgency) => (urgency, tail.join(" ")),
                    Err(_) => (Urgency::Info, rest.join(" ")),
                },
                None => (Urgency::Info, String::new()),
            };
            LineCommand::Add {
                time_ms,
                urgency,
                label,
            }
        }
        "preset" => {
            let id = words.next().ok_or("preset needs an id")?;
            LineCommand::Preset(id.to_string())
        }
        "hide" => LineCommand::Hide,
        "show" => LineCommand::Show,
        "help" | "?" => LineCommand::Help,
        "quit" | "exit" | "q" => LineCommand::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(command))
}

fn dispatcher(config: &Config) -> AlertDispatcher {
    let mut dispatcher = AlertDispatcher::new();
    if config.notifications.bell {
        dispatcher = dispatcher.with_sound(TerminalBell::stderr());
    }
    if config.notifications.desktop {
        #[cfg(feature = "desktop-notifications")]
        {
            dispatcher = dispatcher.with_notifier(timekeeper_core::delivery::DesktopNotifier);
        }
        #[cfg(not(feature = "desktop-notifications"))]
        {
            dispatcher = dispatcher.with_notifier(LogNotifier);
        }
    }
    dispatcher
}

pub fn run(args: RunArgs) -> CliResult {
    let config = Config::load()?;
    let store = FileSettingsStore::in_data_dir()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(session(args, config, store))
}

async fn session(args: RunArgs, config: Config, store: FileSettingsStore) -> CliResult {
    let delivery = dispatcher(&config);
    let handle = service::spawn(&config, Box::new(store), Box::new(delivery))?;

    if let Some(id) = args.preset {
        handle.apply_preset(id).await?;
    }
    if args.start {
        handle.start().await?;
    }
    println!("{HELP}");

    let mut events = handle.subscribe_events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Ok(Some(LineCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(e) = execute(&handle, command).await {
                            eprintln!("error: {e}");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            event = events.recv() => match event {
                Ok(Event::PointFired { time_ms, label, urgency, .. }) => {
                    println!("[{}] {urgency}: {}", format_offset(time_ms), display_label(&label, time_ms));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown().await?;
    Ok(())
}

fn display_label(label: &str, time_ms: u64) -> String {
    if label.is_empty() {
        format!("Timer reached {}", format_offset(time_ms))
    } else {
        label.to_string()
    }
}

async fn execute(handle: &ServiceHandle, command: LineCommand) -> Result<(), CoreError> {
    match command {
        LineCommand::Start => match handle.start().await? {
            Some(Event::TimerResumed { elapsed_ms, .. }) => {
                println!("resumed at {}", format_clock(elapsed_ms));
            }
            Some(_) => println!("started"),
            None => println!("already running"),
        },
        LineCommand::Pause => match handle.pause().await? {
            Some(Event::TimerPaused { elapsed_ms, .. }) => {
                println!("paused at {}", format_clock(elapsed_ms));
            }
            _ => println!("not running"),
        },
        LineCommand::Reset => {
            if let Event::TimerReset { cancelled, .. } = handle.reset().await? {
                println!("reset ({cancelled} pending alerts cancelled)");
            }
        }
        LineCommand::Status => {
            if let Event::StateSnapshot {
                status,
                elapsed_ms,
                pending_deliveries,
                active_preset_id,
                ..
            } = handle.snapshot().await?
            {
                println!(
                    "{} {} preset={} pending={}",
                    status.as_str(),
                    format_clock(elapsed_ms),
                    active_preset_id.as_deref().unwrap_or("-"),
                    pending_deliveries
                );
            }
        }
        LineCommand::Points => {
            for point in handle.points().await? {
                println!(
                    "{} {:>8} {:<7} {}",
                    if point.fired { "x" } else { " " },
                    format_offset(point.time_ms),
                    point.urgency,
                    point.label
                );
            }
        }
        LineCommand::Add {
            time_ms,
            urgency,
            label,
        } => {
            if let Event::PointAdded { time_ms, fired, .. } =
                handle.add_point(PointDraft::new(time_ms, label, urgency)).await?
            {
                let note = if fired { " (already passed)" } else { "" };
                println!("added point at {}{note}", format_offset(time_ms));
            }
        }
        LineCommand::Preset(id) => {
            if let Event::PresetApplied {
                preset_id,
                point_count,
                already_passed,
                ..
            } = handle.apply_preset(id).await?
            {
                println!("applied {preset_id}: {point_count} points, {already_passed} already passed");
            }
        }
        LineCommand::Hide => {
            handle.set_visibility(false).await?;
            println!("hidden");
        }
        LineCommand::Show => {
            handle.set_visibility(true).await?;
            println!("visible");
        }
        LineCommand::Help => println!("{HELP}"),
        LineCommand::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_verbs() {
        assert_eq!(parse_line("start"), Ok(Some(LineCommand::Start)));
        assert_eq!(parse_line("  PAUSE "), Ok(Some(LineCommand::Pause)));
        assert_eq!(parse_line("q"), Ok(Some(LineCommand::Quit)));
        assert_eq!(parse_line(""), Ok(None));
        assert!(parse_line("launch").is_err());
    }

    #[test]
    fn parses_add_with_optional_urgency() {
        assert_eq!(
            parse_line("add 5 urgent Stand up now"),
            Ok(Some(LineCommand::Add {
                time_ms: 300_000,
                urgency: Urgency::Urgent,
                label: "Stand up now".into(),
            }))
        );
        assert_eq!(
            parse_line("add 1:30 Stretch"),
            Ok(Some(LineCommand::Add {
                time_ms: 90_000,
                urgency: Urgency::Info,
                label: "Stretch".into(),
            }))
        );
        assert_eq!(
            parse_line("add 2"),
            Ok(Some(LineCommand::Add {
                time_ms: 120_000,
                urgency: Urgency::Info,
                label: String::new(),
            }))
        );
        assert!(parse_line("add").is_err());
        assert!(parse_line("add 1:99").is_err());
    }

    #[test]
    fn parses_preset() {
        assert_eq!(
            parse_line("preset 90min"),
            Ok(Some(LineCommand::Preset("90min".into())))
        );
        assert!(parse_line("preset").is_err());
    }

    #[test]
    fn empty_labels_fall_back_to_time() {
        assert_eq!(display_label("", 90_000), "Timer reached 1m 30s");
        assert_eq!(display_label("Go", 90_000), "Go");
    }
}
