mod format;
mod state;

pub use format::{format_clock, format_offset, format_short};
pub use state::{StartKind, TimerState, TimerStatus};
