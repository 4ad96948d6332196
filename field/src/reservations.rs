//! Reference-counted keep-clear reservations.
//!
//! Each owner maps to the set of cells it currently keeps open. A cell's
//! reference count equals the number of owners whose footprint contains it,
//! so overlapping owners keep a shared cell open until the last one leaves.

use std::collections::{BTreeMap, BTreeSet};

use dustfield_core::{CellCoord, Event, OwnerId};
use tracing::warn;

use crate::Field;

/// Cells leaving and entering an owner's footprint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct FootprintDiff {
    released: Vec<CellCoord>,
    claimed: Vec<CellCoord>,
}

/// Current footprint of every reservation owner.
#[derive(Clone, Debug, Default)]
pub(crate) struct ReservationBook {
    owners: BTreeMap<OwnerId, BTreeSet<CellCoord>>,
}

impl ReservationBook {
    pub(crate) fn footprint(&self, owner: OwnerId) -> Option<&BTreeSet<CellCoord>> {
        self.owners.get(&owner)
    }

    pub(crate) fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub(crate) fn clear(&mut self) {
        self.owners.clear();
    }

    /// Stores the new footprint and returns how it differs from the previous one.
    fn replace(&mut self, owner: OwnerId, next: BTreeSet<CellCoord>) -> FootprintDiff {
        let previous = self.owners.remove(&owner).unwrap_or_default();
        let diff = FootprintDiff {
            released: previous.difference(&next).copied().collect(),
            claimed: next.difference(&previous).copied().collect(),
        };
        if !next.is_empty() {
            let _ = self.owners.insert(owner, next);
        }
        diff
    }
}

impl Field {
    /// Replaces the set of cells the owner keeps clear.
    ///
    /// Cells outside the grid are dropped. Cells leaving the footprint lose a
    /// reference and regrow once no owner holds them; cells entering it gain a
    /// reference and, when `force_remove_existing` is set, lose their filler
    /// immediately while still queueing regrowth for after the release.
    pub(crate) fn set_keep_clear(
        &mut self,
        owner: OwnerId,
        footprint: &[CellCoord],
        force_remove_existing: bool,
        out_events: &mut Vec<Event>,
    ) {
        let size = self.cells.size();
        let next: BTreeSet<CellCoord> = footprint
            .iter()
            .copied()
            .filter(|cell| size.contains(*cell))
            .collect();
        let dropped = footprint.iter().filter(|cell| !size.contains(**cell)).count();
        if dropped > 0 {
            warn!(
                owner = owner.get(),
                dropped, "keep-clear footprint extends beyond the grid"
            );
        }

        let diff = self.reservations.replace(owner, next);
        let phase = self.active_phase;

        for cell in diff.released {
            if self.cells.dec_ref(cell) > 0 {
                continue;
            }
            let permanent = self.cells.get(cell).map_or(true, |state| state.permanently_open);
            if !permanent {
                self.request_regrowth(cell, phase, None, true);
            }
        }

        for cell in diff.claimed {
            let _ = self.cells.inc_ref(cell);
            if force_remove_existing && self.clear_cell(cell, false, out_events) {
                self.request_regrowth(cell, phase, None, false);
            }
        }
    }

    /// Releases every cell the owner keeps clear.
    pub(crate) fn release_keep_clear(&mut self, owner: OwnerId, out_events: &mut Vec<Event>) {
        self.set_keep_clear(owner, &[], false, out_events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(coords: &[(u32, u32)]) -> BTreeSet<CellCoord> {
        coords
            .iter()
            .map(|&(column, row)| CellCoord::new(column, row))
            .collect()
    }

    #[test]
    fn replace_reports_entering_and_leaving_cells() {
        let mut book = ReservationBook::default();
        let owner = OwnerId::new(1);
        let first = book.replace(owner, cells(&[(0, 0), (1, 0)]));
        assert_eq!(first.claimed.len(), 2);
        assert!(first.released.is_empty());

        let second = book.replace(owner, cells(&[(1, 0), (2, 0)]));
        assert_eq!(second.released, vec![CellCoord::new(0, 0)]);
        assert_eq!(second.claimed, vec![CellCoord::new(2, 0)]);
    }

    #[test]
    fn empty_footprint_forgets_owner() {
        let mut book = ReservationBook::default();
        let owner = OwnerId::new(9);
        let _ = book.replace(owner, cells(&[(3, 3)]));
        assert_eq!(book.owner_count(), 1);

        let diff = book.replace(owner, BTreeSet::new());
        assert_eq!(diff.released, vec![CellCoord::new(3, 3)]);
        assert_eq!(book.owner_count(), 0);
        assert!(book.footprint(owner).is_none());
    }
}
