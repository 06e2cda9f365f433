//! # Timekeeper Core Library
//!
//! This library provides the notification scheduling engine behind the
//! Timekeeper stopwatch. Users place notification points at offsets from
//! the start of a session; the engine detects when elapsed time crosses
//! each point and delivers one alert per crossing, staggered so that
//! simultaneous points never arrive at once.
//!
//! ## Architecture
//!
//! - **Timer**: A monotonic elapsed-time model (start, pause, resume, reset)
//! - **Points**: Validated, time-ordered notification points with a fired flag
//! - **Ticker**: Periodic tick sources on a background thread or the async
//!   runtime, with automatic fallback
//! - **Scheduler**: Crossing detection, visibility catch-up and the
//!   staggered delivery queue
//! - **Service**: A tokio task that drives the scheduler and persists settings
//!
//! ## Key Components
//!
//! - [`Scheduler`]: Core scheduling state machine
//! - [`ServiceHandle`]: Async handle to a running scheduler service
//! - [`Config`]: Application configuration management
//! - [`Settings`]: Persisted user settings

pub mod clock;
pub mod delivery;
pub mod error;
pub mod events;
pub mod points;
pub mod presets;
pub mod queue;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod ticker;
pub mod timer;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use delivery::{Alert, AlertDispatcher, Delivery, LogNotifier, SoundPrefs, TerminalBell};
pub use error::{ConfigError, CoreError, PersistenceError, ValidationError};
pub use events::Event;
pub use points::{NotificationPoint, PointDraft, PointPatch, Urgency};
pub use presets::{builtin_presets, find_preset, Preset};
pub use queue::DeliveryQueue;
pub use scheduler::Scheduler;
pub use service::ServiceHandle;
pub use storage::{Config, FileSettingsStore, MemorySettingsStore, Settings, SettingsStore, Theme};
pub use ticker::{Ticker, TickerKind, TickerMode};
pub use timer::{TimerState, TimerStatus};
