//! Ticks from a `tokio::time::interval` task on the host runtime.
//!
//! Used where a background thread cannot be spawned. On a current-thread
//! runtime the ticks share the host's event loop, so they jitter with its
//! load, but the delivered `Tick` values are the same.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{Tick, TickSender, Ticker, TickerKind};
use crate::error::{CoreError, Result};

pub struct IntervalTicker {
    interval: Duration,
    ticks: TickSender,
    task: Option<JoinHandle<()>>,
}

impl IntervalTicker {
    pub fn new(interval: Duration, ticks: TickSender) -> Self {
        Self {
            interval,
            ticks,
            task: None,
        }
    }
}

impl Ticker for IntervalTicker {
    fn start(&mut self) -> Result<()> {
        if self.task.is_some() {
            return Ok(());
        }
        let runtime = Handle::try_current()
            .map_err(|e| CoreError::environment("async runtime", e.to_string()))?;
        let ticks = self.ticks.clone();
        let period = self.interval;
        self.task = Some(runtime.spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut seq = 0u64;
            loop {
                timer.tick().await;
                seq += 1;
                match ticks.try_send(Tick {
                    seq,
                    source: TickerKind::Interval,
                }) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Closed(_)) => return,
                }
            }
        }));
        tracing::debug!(interval_ms = period.as_millis() as u64, "interval ticker started");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            // The task only sends between awaits, so abort leaves no tick in flight.
            task.abort();
            tracing::debug!("interval ticker stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.task.is_some()
    }

    fn kind(&self) -> TickerKind {
        TickerKind::Interval
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::tick_channel;

    #[test]
    fn start_without_runtime_reports_environment_unavailable() {
        let (tx, _rx) = tick_channel();
        let mut ticker = IntervalTicker::new(Duration::from_millis(250), tx);
        let err = ticker.start().unwrap_err();
        assert!(matches!(err, CoreError::EnvironmentUnavailable { .. }));
        assert!(!ticker.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_at_the_configured_period() {
        let (tx, mut rx) = tick_channel();
        let mut ticker = IntervalTicker::new(Duration::from_millis(250), tx);
        let started = Instant::now();
        ticker.start().unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(first.source, TickerKind::Interval);
        assert_eq!(started.elapsed(), Duration::from_millis(250));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.seq, 2);
        assert_eq!(started.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_stop() {
        let (tx, mut rx) = tick_channel();
        let mut ticker = IntervalTicker::new(Duration::from_millis(250), tx);
        ticker.start().unwrap();
        rx.recv().await.unwrap();
        ticker.stop();
        assert!(!ticker.is_running());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }
}
