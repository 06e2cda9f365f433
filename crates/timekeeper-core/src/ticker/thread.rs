//! Ticks from a dedicated OS thread.
//!
//! The thread keeps ticking while the consumer is busy, so a stalled
//! frontend only delays tick processing, never tick production.

use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TrySendError;

use super::{Tick, TickSender, Ticker, TickerKind};
use crate::error::{CoreError, Result};

pub struct ThreadTicker {
    interval: Duration,
    ticks: TickSender,
    worker: Option<Worker>,
}

struct Worker {
    stop: std_mpsc::Sender<()>,
}

impl ThreadTicker {
    pub fn new(interval: Duration, ticks: TickSender) -> Self {
        Self {
            interval,
            ticks,
            worker: None,
        }
    }
}

impl Ticker for ThreadTicker {
    fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let (stop, stop_rx) = std_mpsc::channel();
        let ticks = self.ticks.clone();
        let interval = self.interval;
        std::thread::Builder::new()
            .name("timekeeper-ticker".into())
            .spawn(move || run(interval, ticks, stop_rx))
            .map_err(|e| CoreError::environment("background thread", e.to_string()))?;
        tracing::debug!(interval_ms = interval.as_millis() as u64, "thread ticker started");
        self.worker = Some(Worker { stop });
        Ok(())
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // The thread is detached. Stop wakes it out of its timed wait and it
        // exits on its own, so this never blocks the caller's runtime thread.
        // A send error means it already exited.
        let _ = worker.stop.send(());
        tracing::debug!("thread ticker stopped");
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn kind(&self) -> TickerKind {
        TickerKind::Thread
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(interval: Duration, ticks: TickSender, stop: std_mpsc::Receiver<()>) {
    let mut seq = 0u64;
    let mut next = Instant::now() + interval;
    loop {
        let wait = next.saturating_duration_since(Instant::now());
        match stop.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            // Stop requested or the ticker was dropped.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }

        seq += 1;
        match ticks.try_send(Tick {
            seq,
            source: TickerKind::Thread,
        }) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Closed(_)) => return,
        }

        // Fixed-rate schedule; skip ahead instead of bursting after a stall.
        next += interval;
        let now = Instant::now();
        if next <= now {
            next = now + interval;
        }
    }
}
