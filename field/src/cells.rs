//! Dense per-cell state owned by the field.

use std::time::Duration;

use dustfield_core::{CellCoord, GridSize, InstanceId};

use crate::regrowth::RegrowthTask;

/// Authoritative record of a single grid cell.
#[derive(Clone, Debug, Default)]
pub(crate) struct CellState {
    /// Instance currently bound to the cell.
    pub(crate) instance: Option<InstanceId>,
    /// Set once the cell may never hold filler again.
    pub(crate) permanently_open: bool,
    /// Number of keep-clear reservations covering the cell.
    pub(crate) keep_clear_refs: u32,
    /// End of a temporary hold. Expired values are cleared on read.
    pub(crate) hold_until: Option<Duration>,
    /// Pending regrowth task, if any.
    pub(crate) task: Option<RegrowthTask>,
}

/// Row-major store of every cell in the grid.
#[derive(Clone, Debug, Default)]
pub(crate) struct CellStore {
    size: GridSize,
    cells: Vec<CellState>,
}

impl CellStore {
    pub(crate) fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![CellState::default(); size.cell_count()],
        }
    }

    pub(crate) fn size(&self) -> GridSize {
        self.size
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        self.size.index(cell)
    }

    pub(crate) fn get(&self, cell: CellCoord) -> Option<&CellState> {
        self.index(cell).and_then(|index| self.cells.get(index))
    }

    pub(crate) fn get_mut(&mut self, cell: CellCoord) -> Option<&mut CellState> {
        let index = self.index(cell)?;
        self.cells.get_mut(index)
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> Option<&mut CellState> {
        self.cells.get_mut(index)
    }

    /// Marks the cell permanently open and drops its pending task.
    ///
    /// The caller releases any bound instance first.
    pub(crate) fn mark_permanently_open(&mut self, cell: CellCoord) {
        if let Some(state) = self.get_mut(cell) {
            debug_assert!(state.instance.is_none(), "permanent cells hold no filler");
            state.permanently_open = true;
            state.task = None;
        }
    }

    /// Adds one reservation to the cell and returns the new count.
    pub(crate) fn inc_ref(&mut self, cell: CellCoord) -> u32 {
        match self.get_mut(cell) {
            Some(state) => {
                state.keep_clear_refs = state.keep_clear_refs.saturating_add(1);
                state.keep_clear_refs
            }
            None => 0,
        }
    }

    /// Removes one reservation from the cell and returns the new count.
    pub(crate) fn dec_ref(&mut self, cell: CellCoord) -> u32 {
        match self.get_mut(cell) {
            Some(state) => {
                debug_assert!(state.keep_clear_refs > 0, "unmatched keep-clear release");
                state.keep_clear_refs = state.keep_clear_refs.saturating_sub(1);
                state.keep_clear_refs
            }
            None => 0,
        }
    }

    /// Holds the cell open until the provided time, extending any shorter hold.
    pub(crate) fn set_hold(&mut self, cell: CellCoord, until: Duration) {
        if let Some(state) = self.get_mut(cell) {
            state.hold_until = Some(state.hold_until.map_or(until, |held| held.max(until)));
        }
    }

    /// End of the active hold on the cell, clearing it when it has expired.
    pub(crate) fn active_hold(&mut self, index: usize, now: Duration) -> Option<Duration> {
        let state = self.cells.get_mut(index)?;
        match state.hold_until {
            Some(until) if until > now => Some(until),
            Some(_) => {
                state.hold_until = None;
                None
            }
            None => None,
        }
    }

    /// Reports whether the cell counts as open regardless of its filler.
    ///
    /// Permanently open, reserved, and temporarily held cells are open.
    pub(crate) fn is_open_effective(&mut self, cell: CellCoord, now: Duration) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };
        let Some(state) = self.cells.get(index) else {
            return false;
        };
        if state.permanently_open || state.keep_clear_refs > 0 {
            return true;
        }
        self.active_hold(index, now).is_some()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (CellCoord, &CellState)> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(index, state)| size.cell_at(index).map(|cell| (cell, state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_cells_are_not_stored() {
        let mut store = CellStore::new(GridSize::new(2, 2));
        assert!(store.get(CellCoord::new(2, 0)).is_none());
        assert_eq!(store.inc_ref(CellCoord::new(0, 5)), 0);
        assert!(!store.is_open_effective(CellCoord::new(9, 9), Duration::ZERO));
    }

    #[test]
    fn reference_count_never_drops_below_zero() {
        let mut store = CellStore::new(GridSize::new(2, 2));
        let cell = CellCoord::new(1, 1);
        assert_eq!(store.inc_ref(cell), 1);
        assert_eq!(store.inc_ref(cell), 2);
        assert_eq!(store.dec_ref(cell), 1);
        assert_eq!(store.dec_ref(cell), 0);
    }

    #[test]
    fn expired_holds_are_cleared_on_read() {
        let mut store = CellStore::new(GridSize::new(3, 3));
        let cell = CellCoord::new(1, 2);
        store.set_hold(cell, Duration::from_secs(2));

        assert!(store.is_open_effective(cell, Duration::from_secs(1)));
        assert!(!store.is_open_effective(cell, Duration::from_secs(2)));
        assert_eq!(store.get(cell).and_then(|state| state.hold_until), None);
    }

    #[test]
    fn holds_only_extend() {
        let mut store = CellStore::new(GridSize::new(3, 3));
        let cell = CellCoord::new(0, 0);
        store.set_hold(cell, Duration::from_secs(5));
        store.set_hold(cell, Duration::from_secs(3));
        assert_eq!(
            store.get(cell).and_then(|state| state.hold_until),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn permanent_and_reserved_cells_are_open() {
        let mut store = CellStore::new(GridSize::new(3, 3));
        let permanent = CellCoord::new(0, 0);
        let reserved = CellCoord::new(2, 2);
        store.mark_permanently_open(permanent);
        let _ = store.inc_ref(reserved);

        assert!(store.is_open_effective(permanent, Duration::ZERO));
        assert!(store.is_open_effective(reserved, Duration::ZERO));
        assert!(!store.is_open_effective(CellCoord::new(1, 1), Duration::ZERO));
    }
}
