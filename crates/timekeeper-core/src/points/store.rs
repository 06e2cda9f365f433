//! Owned set of notification points.
//!
//! Points are kept sorted by `time_ms` (stable, so equal offsets keep their
//! insertion order). Operations that depend on the timer take
//! `running_elapsed`: `Some(elapsed)` while the timer is running, `None`
//! otherwise.

use uuid::Uuid;

use super::point::{clean_label, validate_time, NotificationPoint, PointDraft, PointPatch};
use crate::error::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointStore {
    points: Vec<NotificationPoint>,
}

impl PointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk load without range validation.
    pub fn from_points(points: Vec<NotificationPoint>) -> Self {
        let mut store = Self::new();
        for point in points {
            store.insert_sorted(point);
        }
        store
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Read-only view ordered by `time_ms`.
    pub fn list(&self) -> &[NotificationPoint] {
        &self.points
    }

    pub fn get(&self, id: Uuid) -> Option<&NotificationPoint> {
        self.points.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn fired_count(&self) -> usize {
        self.points.iter().filter(|p| p.fired).count()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Add a user-created point.
    ///
    /// A point whose time has already passed in the running session is
    /// created fired, so it is never delivered late.
    pub fn add(
        &mut self,
        draft: PointDraft,
        running_elapsed: Option<u64>,
    ) -> Result<NotificationPoint, ValidationError> {
        let time_ms = validate_time(draft.time_ms)?;
        let mut point = NotificationPoint::new(time_ms, draft.label, draft.urgency);
        point.fired = already_passed(time_ms, running_elapsed);
        self.insert_sorted(point.clone());
        Ok(point)
    }

    /// Apply a partial update and recompute `fired` against the running
    /// session. Nothing changes if validation fails.
    pub fn update(
        &mut self,
        id: Uuid,
        patch: PointPatch,
        running_elapsed: Option<u64>,
    ) -> Result<NotificationPoint, ValidationError> {
        let index = self.index_of(id)?;
        if let Some(time_ms) = patch.time_ms {
            validate_time(time_ms)?;
        }

        let mut point = self.points.remove(index);
        if let Some(time_ms) = patch.time_ms {
            point.time_ms = time_ms;
        }
        if let Some(label) = patch.label {
            point.label = clean_label(&label);
        }
        if let Some(urgency) = patch.urgency {
            point.urgency = urgency;
        }
        point.fired = already_passed(point.time_ms, running_elapsed);

        self.insert_sorted(point.clone());
        Ok(point)
    }

    pub fn remove(&mut self, id: Uuid) -> Result<NotificationPoint, ValidationError> {
        let index = self.index_of(id)?;
        Ok(self.points.remove(index))
    }

    /// Swap in a whole new set (preset application, loading).
    /// Returns how many were pre-marked fired.
    pub fn replace_all(
        &mut self,
        points: Vec<NotificationPoint>,
        running_elapsed: Option<u64>,
    ) -> usize {
        self.points.clear();
        let mut passed = 0;
        for mut point in points {
            point.fired = already_passed(point.time_ms, running_elapsed);
            if point.fired {
                passed += 1;
            }
            self.insert_sorted(point);
        }
        passed
    }

    pub fn reset_fired(&mut self) {
        for point in &mut self.points {
            point.fired = false;
        }
    }

    /// Mark every unfired point with `time_ms <= elapsed_ms` as fired and
    /// return them in ascending time order.
    pub fn mark_due(&mut self, elapsed_ms: u64) -> Vec<NotificationPoint> {
        let mut due = Vec::new();
        for point in self.points.iter_mut().filter(|p| p.is_due(elapsed_ms)) {
            point.fired = true;
            due.push(point.clone());
        }
        due
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn index_of(&self, id: Uuid) -> Result<usize, ValidationError> {
        self.points
            .iter()
            .position(|p| p.id == id)
            .ok_or(ValidationError::UnknownPoint(id))
    }

    fn insert_sorted(&mut self, point: NotificationPoint) {
        let at = self.points.partition_point(|p| p.time_ms <= point.time_ms);
        self.points.insert(at, point);
    }
}

fn already_passed(time_ms: u64, running_elapsed: Option<u64>) -> bool {
    running_elapsed.is_some_and(|elapsed| elapsed >= time_ms)
}
