//! Periodic tick sources.
//!
//! Every ticker pushes [`Tick`] values into the same bounded channel, so the
//! scheduler consumes ticks from one place regardless of where they were
//! produced. A full channel drops the tick: detection is idempotent and the
//! next tick catches up.

mod interval;
mod thread;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

pub use interval::IntervalTicker;
pub use thread::ThreadTicker;

/// Nominal tick period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);
/// Capacity of the tick channel.
pub const TICK_CHANNEL_CAPACITY: usize = 4;

pub type TickSender = mpsc::Sender<Tick>;
pub type TickReceiver = mpsc::Receiver<Tick>;

pub fn tick_channel() -> (TickSender, TickReceiver) {
    mpsc::channel(TICK_CHANNEL_CAPACITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Per-ticker sequence number, starting at 1.
    pub seq: u64,
    pub source: TickerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickerKind {
    Thread,
    Interval,
    Manual,
}

/// Which tick source to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickerMode {
    /// Dedicated thread, falling back to a runtime interval.
    #[default]
    Auto,
    Thread,
    Interval,
}

impl TickerMode {
    pub fn build(self, interval: Duration, ticks: TickSender) -> Box<dyn Ticker> {
        match self {
            TickerMode::Auto => Box::new(AdaptiveTicker::new(
                Box::new(ThreadTicker::new(interval, ticks.clone())),
                Box::new(IntervalTicker::new(interval, ticks)),
            )),
            TickerMode::Thread => Box::new(ThreadTicker::new(interval, ticks)),
            TickerMode::Interval => Box::new(IntervalTicker::new(interval, ticks)),
        }
    }
}

/// A periodic tick source.
///
/// `start` on a running ticker and `stop` on a stopped one are no-ops.
/// Once `stop` returns, the ticker produces no further ticks.
pub trait Ticker: Send {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
    fn kind(&self) -> TickerKind;
}

/// Tries `primary`; if it reports the environment cannot run it, switches
/// to `fallback` for good.
pub struct AdaptiveTicker {
    active: Box<dyn Ticker>,
    fallback: Option<Box<dyn Ticker>>,
}

impl AdaptiveTicker {
    pub fn new(primary: Box<dyn Ticker>, fallback: Box<dyn Ticker>) -> Self {
        Self {
            active: primary,
            fallback: Some(fallback),
        }
    }
}

impl Ticker for AdaptiveTicker {
    fn start(&mut self) -> Result<()> {
        match self.active.start() {
            Ok(()) => Ok(()),
            Err(err) => {
                let Some(fallback) = self.fallback.take() else {
                    return Err(err);
                };
                tracing::warn!(
                    error = %err,
                    from = ?self.active.kind(),
                    to = ?fallback.kind(),
                    "tick source unavailable, falling back"
                );
                self.active = fallback;
                self.active.start()
            }
        }
    }

    fn stop(&mut self) {
        self.active.stop();
    }

    fn is_running(&self) -> bool {
        self.active.is_running()
    }

    fn kind(&self) -> TickerKind {
        self.active.kind()
    }
}

/// Ticker for hosts that call `Scheduler::on_tick` from their own loop.
///
/// Clones share the running flag.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    running: Arc<AtomicBool>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ticker for ManualTicker {
    fn start(&mut self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn kind(&self) -> TickerKind {
        TickerKind::Manual
    }
}
