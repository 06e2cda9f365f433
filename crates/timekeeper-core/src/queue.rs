//! Staggered delivery queue.
//!
//! Due points leave the queue one at a time with at least `stagger_ms`
//! between them, so alerts never overlap. There is at most one pending
//! drain deadline; the owner sleeps until `next_pop_at()` and calls `poll`.

use std::collections::VecDeque;

use crate::points::NotificationPoint;

/// Default gap between two deliveries.
pub const DEFAULT_STAGGER_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    pending: VecDeque<NotificationPoint>,
    /// Clock reading before which nothing may be popped.
    next_pop_at: Option<u64>,
    stagger_ms: u64,
}

impl DeliveryQueue {
    pub fn new(stagger_ms: u64) -> Self {
        Self {
            pending: VecDeque::new(),
            next_pop_at: None,
            stagger_ms,
        }
    }

    pub fn stagger_ms(&self) -> u64 {
        self.stagger_ms
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &NotificationPoint> {
        self.pending.iter()
    }

    /// Deadline of the in-flight drain timer, if one is armed.
    pub fn next_pop_at(&self) -> Option<u64> {
        self.next_pop_at
    }

    pub fn is_draining(&self) -> bool {
        self.next_pop_at.is_some()
    }

    /// Append a detection batch. The caller passes it sorted by time.
    pub fn extend(&mut self, batch: impl IntoIterator<Item = NotificationPoint>) {
        self.pending.extend(batch);
    }

    /// Pop the next point if no drain timer is holding it back.
    ///
    /// After a pop, the drain timer is armed if anything is left, and the
    /// queue goes idle otherwise.
    pub fn poll(&mut self, now_ms: u64) -> Option<NotificationPoint> {
        if let Some(at) = self.next_pop_at {
            if now_ms < at {
                return None;
            }
            self.next_pop_at = None;
        }

        let point = self.pending.pop_front()?;
        if !self.pending.is_empty() {
            self.next_pop_at = Some(now_ms.saturating_add(self.stagger_ms));
        }
        Some(point)
    }

    /// Drop everything pending and disarm the drain timer.
    /// Returns how many deliveries were cancelled.
    pub fn clear(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        self.next_pop_at = None;
        cancelled
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new(DEFAULT_STAGGER_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::Urgency;

    fn points(times: &[u64]) -> Vec<NotificationPoint> {
        times
            .iter()
            .map(|&t| NotificationPoint::new(t, "", Urgency::Info))
            .collect()
    }

    #[test]
    fn single_point_pops_immediately_and_goes_idle() {
        let mut queue = DeliveryQueue::default();
        queue.extend(points(&[60_000]));
        assert_eq!(queue.poll(0).map(|p| p.time_ms), Some(60_000));
        assert!(!queue.is_draining());
        assert!(queue.poll(0).is_none());
    }

    #[test]
    fn batch_drains_with_stagger() {
        let mut queue = DeliveryQueue::default();
        queue.extend(points(&[1, 2, 3]));

        assert_eq!(queue.poll(1_000).unwrap().time_ms, 1);
        assert_eq!(queue.next_pop_at(), Some(1_500));
        assert!(queue.poll(1_499).is_none());

        assert_eq!(queue.poll(1_500).unwrap().time_ms, 2);
        assert_eq!(queue.next_pop_at(), Some(2_000));

        // A late wake-up staggers from when the pop actually happened.
        assert_eq!(queue.poll(2_300).unwrap().time_ms, 3);
        assert_eq!(queue.next_pop_at(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn new_batch_waits_behind_armed_timer() {
        let mut queue = DeliveryQueue::default();
        queue.extend(points(&[1, 2]));
        queue.poll(0);
        queue.extend(points(&[3]));
        assert!(queue.poll(100).is_none());
        assert_eq!(queue.poll(500).unwrap().time_ms, 2);
        assert_eq!(queue.poll(1_000).unwrap().time_ms, 3);
    }

    #[test]
    fn clear_cancels_pending_and_timer() {
        let mut queue = DeliveryQueue::default();
        queue.extend(points(&[1, 2, 3]));
        queue.poll(0);
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.next_pop_at(), None);
        assert!(queue.poll(10_000).is_none());
    }
}
