//! Deferred, coalesced rebuilds of the aggregate collision geometry.

use std::time::Duration;

use dustfield_core::CellCoord;

use crate::pool::TerrainInstance;

/// Horizontal run of filled cells merged into a single collider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColliderRun {
    /// Leftmost cell of the run.
    pub start: CellCoord,
    /// Number of consecutive filled cells in the row.
    pub length: u32,
}

/// Aggregate collision boundary built from every active instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollisionGeometry {
    runs: Vec<ColliderRun>,
    instances: usize,
}

impl CollisionGeometry {
    /// Merges the colliders of the provided instances into row runs.
    pub(crate) fn from_instances<'a, I>(instances: I) -> Self
    where
        I: IntoIterator<Item = &'a TerrainInstance>,
    {
        let mut cells: Vec<CellCoord> = instances
            .into_iter()
            .filter_map(TerrainInstance::cell)
            .collect();
        cells.sort_by_key(|cell| (cell.row(), cell.column()));

        let mut runs: Vec<ColliderRun> = Vec::new();
        for cell in &cells {
            if let Some(run) = runs.last_mut() {
                let extends = run.start.row() == cell.row()
                    && run.start.column().saturating_add(run.length) == cell.column();
                if extends {
                    run.length += 1;
                    continue;
                }
            }
            runs.push(ColliderRun {
                start: *cell,
                length: 1,
            });
        }

        Self {
            runs,
            instances: cells.len(),
        }
    }

    /// Merged collider runs in row-major order.
    #[must_use]
    pub fn runs(&self) -> &[ColliderRun] {
        &self.runs
    }

    /// Number of instances that contributed to the geometry.
    #[must_use]
    pub const fn instance_count(&self) -> usize {
        self.instances
    }

    /// Reports whether the geometry covers the cell.
    #[must_use]
    pub fn covers(&self, cell: CellCoord) -> bool {
        self.runs.iter().any(|run| {
            run.start.row() == cell.row()
                && cell.column() >= run.start.column()
                && cell.column() - run.start.column() < run.length
        })
    }
}

/// Tracks dirty state and decides when the collision geometry is rebuilt.
#[derive(Clone, Debug, Default)]
pub(crate) struct RebuildCoordinator {
    changed: usize,
    dirty: bool,
    batch_depth: u32,
    scheduled_at: Option<Duration>,
    last_rebuild: Option<Duration>,
    min_interval: Duration,
}

impl RebuildCoordinator {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            ..Self::default()
        }
    }

    /// Counts a cell whose filler changed.
    pub(crate) fn note_changed(&mut self) {
        self.changed = self.changed.saturating_add(1);
    }

    /// Consumes queued changes and marks the geometry dirty when any exist.
    ///
    /// Returns the number of consumed changes.
    pub(crate) fn flush(&mut self, now: Duration) -> usize {
        let consumed = std::mem::take(&mut self.changed);
        if consumed > 0 {
            self.mark_dirty(now);
        }
        consumed
    }

    pub(crate) fn mark_dirty(&mut self, now: Duration) {
        self.dirty = true;
        if self.batch_depth == 0 {
            self.schedule(now);
        }
    }

    pub(crate) fn begin_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_add(1);
    }

    /// Closes a batch, scheduling a rebuild when the outermost one ends dirty.
    ///
    /// Returns `false` when no batch was open.
    pub(crate) fn end_batch(&mut self, now: Duration) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 && self.dirty {
            self.schedule(now);
        }
        true
    }

    /// Claims the scheduled rebuild if it is due, resetting the dirty state.
    pub(crate) fn take_due(&mut self, now: Duration) -> bool {
        if self.batch_depth > 0 {
            return false;
        }
        match self.scheduled_at {
            Some(at) if at <= now => {
                self.scheduled_at = None;
                self.dirty = false;
                self.last_rebuild = Some(now);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn batch_depth(&self) -> u32 {
        self.batch_depth
    }

    pub(crate) fn scheduled_at(&self) -> Option<Duration> {
        self.scheduled_at
    }

    fn schedule(&mut self, now: Duration) {
        if self.scheduled_at.is_some() {
            return;
        }
        let earliest = match self.last_rebuild {
            Some(last) => now.max(last.saturating_add(self.min_interval)),
            None => now,
        };
        self.scheduled_at = Some(earliest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn repeated_marks_schedule_a_single_rebuild() {
        let mut coordinator = RebuildCoordinator::new(INTERVAL);
        coordinator.mark_dirty(Duration::ZERO);
        coordinator.mark_dirty(Duration::from_millis(10));

        assert_eq!(coordinator.scheduled_at(), Some(Duration::ZERO));
        assert!(coordinator.take_due(Duration::from_millis(10)));
        assert!(!coordinator.take_due(Duration::from_millis(10)));
        assert!(!coordinator.is_dirty());
    }

    #[test]
    fn batches_defer_rebuild_until_outermost_end() {
        let mut coordinator = RebuildCoordinator::new(INTERVAL);
        coordinator.begin_batch();
        coordinator.begin_batch();
        coordinator.mark_dirty(Duration::ZERO);
        assert_eq!(coordinator.scheduled_at(), None);

        assert!(coordinator.end_batch(Duration::ZERO));
        assert_eq!(coordinator.scheduled_at(), None, "inner end must not schedule");
        assert!(coordinator.end_batch(Duration::ZERO));
        assert_eq!(coordinator.scheduled_at(), Some(Duration::ZERO));
    }

    #[test]
    fn unbalanced_end_batch_is_rejected() {
        let mut coordinator = RebuildCoordinator::new(INTERVAL);
        assert!(!coordinator.end_batch(Duration::ZERO));
        assert_eq!(coordinator.batch_depth(), 0);
    }

    #[test]
    fn rebuilds_are_throttled_by_minimum_interval() {
        let mut coordinator = RebuildCoordinator::new(INTERVAL);
        coordinator.mark_dirty(Duration::ZERO);
        assert!(coordinator.take_due(Duration::ZERO));

        coordinator.mark_dirty(Duration::from_millis(30));
        assert_eq!(coordinator.scheduled_at(), Some(INTERVAL));
        assert!(!coordinator.take_due(Duration::from_millis(50)));
        assert!(coordinator.take_due(INTERVAL));
    }

    #[test]
    fn flush_consumes_changes_once() {
        let mut coordinator = RebuildCoordinator::new(INTERVAL);
        coordinator.note_changed();
        coordinator.note_changed();
        assert_eq!(coordinator.flush(Duration::ZERO), 2);
        assert!(coordinator.is_dirty());
        assert_eq!(coordinator.flush(Duration::ZERO), 0);
        assert_eq!(coordinator.scheduled_at(), Some(Duration::ZERO));
    }

    #[test]
    fn clean_batch_schedules_nothing() {
        let mut coordinator = RebuildCoordinator::new(INTERVAL);
        coordinator.begin_batch();
        assert!(coordinator.end_batch(Duration::ZERO));
        assert_eq!(coordinator.scheduled_at(), None);
        assert_eq!(coordinator.flush(Duration::ZERO), 0);
    }

    #[test]
    fn geometry_merges_horizontal_runs() {
        let mut pool = crate::pool::InstancePool::new();
        for cell in [
            CellCoord::new(2, 0),
            CellCoord::new(0, 0),
            CellCoord::new(1, 0),
            CellCoord::new(4, 0),
            CellCoord::new(0, 1),
        ] {
            let _ = pool.acquire(cell);
        }

        let geometry = CollisionGeometry::from_instances(pool.colliding());
        assert_eq!(
            geometry.runs(),
            &[
                ColliderRun {
                    start: CellCoord::new(0, 0),
                    length: 3
                },
                ColliderRun {
                    start: CellCoord::new(4, 0),
                    length: 1
                },
                ColliderRun {
                    start: CellCoord::new(0, 1),
                    length: 1
                },
            ]
        );
        assert_eq!(geometry.instance_count(), 5);
        assert!(geometry.covers(CellCoord::new(1, 0)));
        assert!(!geometry.covers(CellCoord::new(3, 0)));
    }
}
