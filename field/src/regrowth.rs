//! Per-cell regrowth tasks driven by a wake-time queue.
//!
//! Every pending task lives in its cell as a [`RegrowthTask`] carrying a
//! generation number. The queue only stores `(due, generation, cell)` wake
//! entries; an entry whose generation no longer matches the cell's task is a
//! tombstone and is skipped when popped. Cancelling a task is therefore just
//! clearing or overwriting the cell's task, which is O(1) and idempotent.

use std::{cmp::Reverse, collections::BinaryHeap, time::Duration};

use dustfield_core::{CellCoord, Event, PhaseId};

use crate::{probe::OccupancyProbe, Field};

/// Pending regrowth work bound to one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RegrowthTask {
    /// Waiting for its wake time in the queue.
    Scheduled {
        /// Simulated time the task wakes at.
        due: Duration,
        /// Generation matching the queued wake entry.
        generation: u64,
    },
    /// Waiting for every keep-clear reservation on the cell to be released.
    Parked,
}

/// Externally visible status of a cell's regrowth task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegrowthStatus {
    /// No regrowth is pending.
    Idle,
    /// Regrowth is attempted at the provided time.
    Scheduled {
        /// Simulated time of the next attempt.
        due: Duration,
    },
    /// Regrowth resumes once the cell's reservations are released.
    Parked,
}

impl RegrowthStatus {
    pub(crate) fn from_task(task: Option<RegrowthTask>) -> Self {
        match task {
            None => Self::Idle,
            Some(RegrowthTask::Scheduled { due, .. }) => Self::Scheduled { due },
            Some(RegrowthTask::Parked) => Self::Parked,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct WakeEntry {
    due: Duration,
    generation: u64,
    index: usize,
}

/// Wake-time queue shared by every cell's regrowth task.
#[derive(Clone, Debug, Default)]
pub(crate) struct RegrowthScheduler {
    queue: BinaryHeap<Reverse<WakeEntry>>,
    next_generation: u64,
}

impl RegrowthScheduler {
    /// Queues a wake entry and returns the task the cell must store.
    pub(crate) fn schedule(&mut self, index: usize, due: Duration) -> RegrowthTask {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.queue.push(Reverse(WakeEntry {
            due,
            generation,
            index,
        }));
        RegrowthTask::Scheduled { due, generation }
    }

    /// Pops the earliest wake entry due at or before `now`.
    fn pop_due(&mut self, now: Duration) -> Option<(usize, u64)> {
        let Reverse(entry) = self.queue.peek()?;
        if entry.due > now {
            return None;
        }
        let Reverse(entry) = self.queue.pop()?;
        Some((entry.index, entry.generation))
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Field {
    /// Schedules filler to regrow in the cell.
    ///
    /// Permanently open and filled cells drop any pending task instead. A
    /// pending task is left untouched unless `refresh_if_pending` is set, in
    /// which case it is replaced by a fresh wait.
    pub(crate) fn request_regrowth(
        &mut self,
        cell: CellCoord,
        phase: PhaseId,
        explicit_delay: Option<Duration>,
        refresh_if_pending: bool,
    ) {
        let Some(index) = self.cells.index(cell) else {
            return;
        };
        let delay = explicit_delay.unwrap_or_else(|| self.config.regrowth_delay(phase));
        let due = self.now.saturating_add(delay);
        let Some(state) = self.cells.at_mut(index) else {
            return;
        };
        if state.permanently_open || state.instance.is_some() {
            state.task = None;
            return;
        }
        if state.task.is_some() && !refresh_if_pending {
            return;
        }
        state.task = Some(self.scheduler.schedule(index, due));
    }

    /// Runs every regrowth task whose wake time has arrived.
    pub(crate) fn run_due_regrowth<P>(&mut self, probe: &P, out_events: &mut Vec<Event>)
    where
        P: OccupancyProbe + ?Sized,
    {
        let now = self.now;
        let retry_at = now.saturating_add(self.config.retry_interval());
        let size = self.cells.size();

        while let Some((index, generation)) = self.scheduler.pop_due(now) {
            let Some(cell) = size.cell_at(index) else {
                continue;
            };
            let Some(state) = self.cells.at_mut(index) else {
                continue;
            };
            match state.task {
                Some(RegrowthTask::Scheduled { generation: live, .. }) if live == generation => {}
                _ => continue,
            }
            if state.permanently_open || state.instance.is_some() {
                state.task = None;
                continue;
            }
            if state.keep_clear_refs > 0 {
                state.task = Some(RegrowthTask::Parked);
                continue;
            }
            if let Some(until) = self.cells.active_hold(index, now) {
                let task = self.scheduler.schedule(index, until);
                if let Some(state) = self.cells.at_mut(index) {
                    state.task = Some(task);
                }
                continue;
            }
            if self.is_regrowth_vetoed(probe, cell) {
                let task = self.scheduler.schedule(index, retry_at);
                if let Some(state) = self.cells.at_mut(index) {
                    state.task = Some(task);
                }
                continue;
            }
            let _ = self.fill_cell(cell, out_events);
        }
    }

    fn is_regrowth_vetoed<P>(&self, probe: &P, cell: CellCoord) -> bool
    where
        P: OccupancyProbe + ?Sized,
    {
        if probe.is_externally_blocked(cell) || !probe.is_cell_free_of_occupants(cell) {
            return true;
        }
        if !probe.is_cell_free_of_collectable(cell) {
            return true;
        }
        match self.layout {
            Some(layout) => probe
                .is_overlapped_by_moving_actor(layout.grid_to_world(cell), layout.cell_length()),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_entries_pop_in_time_order() {
        let mut scheduler = RegrowthScheduler::default();
        let _ = scheduler.schedule(4, Duration::from_secs(3));
        let _ = scheduler.schedule(2, Duration::from_secs(1));
        let _ = scheduler.schedule(9, Duration::from_secs(2));

        let now = Duration::from_secs(2);
        assert_eq!(scheduler.pop_due(now).map(|(index, _)| index), Some(2));
        assert_eq!(scheduler.pop_due(now).map(|(index, _)| index), Some(9));
        assert_eq!(scheduler.pop_due(now), None);
    }

    #[test]
    fn equal_wake_times_pop_in_scheduling_order() {
        let mut scheduler = RegrowthScheduler::default();
        let due = Duration::from_secs(1);
        let _ = scheduler.schedule(7, due);
        let _ = scheduler.schedule(3, due);

        assert_eq!(scheduler.pop_due(due).map(|(index, _)| index), Some(7));
        assert_eq!(scheduler.pop_due(due).map(|(index, _)| index), Some(3));
    }

    #[test]
    fn task_status_reflects_task_variant() {
        assert_eq!(RegrowthStatus::from_task(None), RegrowthStatus::Idle);
        assert_eq!(
            RegrowthStatus::from_task(Some(RegrowthTask::Parked)),
            RegrowthStatus::Parked
        );
        let due = Duration::from_millis(250);
        assert_eq!(
            RegrowthStatus::from_task(Some(RegrowthTask::Scheduled { due, generation: 0 })),
            RegrowthStatus::Scheduled { due }
        );
    }
}
