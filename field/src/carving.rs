//! Disk and corridor carving.

use dustfield_core::{CellCoord, Event, GridSize};
use tracing::{debug, warn};

use crate::Field;

/// Result of a corridor walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CorridorOutcome {
    /// The walk touched the destination region.
    Connected,
    /// The walk used up its step budget or had nowhere to go.
    Aborted,
    /// The origin or destination lies outside the grid.
    Ignored,
}

impl Field {
    /// Clears every cell within `radius` of `center`, returning the cells visited.
    ///
    /// Permanent carves also mark the cells permanently open, which drops
    /// their pending regrowth. Non-permanent carves leave scheduling to the
    /// caller.
    pub(crate) fn carve_disk(
        &mut self,
        center: CellCoord,
        radius: u32,
        permanent: bool,
        out_events: &mut Vec<Event>,
    ) -> Vec<CellCoord> {
        let cells = self.cells.size().disk(center, radius);
        for &cell in &cells {
            let _ = self.clear_cell(cell, permanent, out_events);
            if permanent {
                self.cells.mark_permanently_open(cell);
            }
        }
        cells
    }

    /// Carves a meandering permanent corridor from `origin` toward `destination`.
    ///
    /// The walk greedily steps toward the destination center, preferring
    /// filled neighbors (which it carves) over open ones (which it merely
    /// crosses). When every neighbor was already visited it relaxes that
    /// restriction. The walk stops once it is inside or next to the
    /// destination region and gives up after `columns * rows` steps.
    pub(crate) fn carve_corridor(
        &mut self,
        origin: CellCoord,
        destination: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> CorridorOutcome {
        let step_limit = self.cells.size().cell_count();
        self.walk_corridor(origin, destination, step_limit, out_events)
    }

    fn walk_corridor(
        &mut self,
        origin: CellCoord,
        destination: CellCoord,
        step_limit: usize,
        out_events: &mut Vec<Event>,
    ) -> CorridorOutcome {
        let size = self.cells.size();
        let (Some(origin_index), true) = (size.index(origin), size.contains(destination)) else {
            return CorridorOutcome::Ignored;
        };

        let corridor_radius = self.config.corridor_radius;
        let region_limit =
            u64::from(self.config.destination_radius) * u64::from(self.config.destination_radius);

        let mut visited = vec![false; size.cell_count()];
        visited[origin_index] = true;
        let mut path = vec![origin];
        let _ = self.carve_disk(origin, corridor_radius, true, out_events);

        let mut current = origin;
        let mut steps = 0;
        loop {
            if touches_region(size, current, destination, region_limit) {
                debug!(steps, length = path.len(), "corridor connected");
                out_events.push(Event::CorridorCarved { path });
                return CorridorOutcome::Connected;
            }
            if steps >= step_limit {
                return self.abort_corridor(origin, destination, steps, out_events);
            }
            steps += 1;

            let neighbors = size.neighbors(current);
            let is_visited = |cell: &CellCoord| {
                size.index(*cell)
                    .and_then(|index| visited.get(index).copied())
                    .unwrap_or(true)
            };
            let is_dusty = |cell: &CellCoord| {
                self.cells
                    .get(*cell)
                    .map_or(false, |state| state.instance.is_some())
            };

            let step = nearest(&neighbors, destination, |cell| is_dusty(cell) && !is_visited(cell))
                .map(|cell| (cell, true))
                .or_else(|| {
                    nearest(&neighbors, destination, |cell| {
                        !is_dusty(cell) && !is_visited(cell)
                    })
                    .map(|cell| (cell, false))
                })
                .or_else(|| nearest(&neighbors, destination, is_dusty).map(|cell| (cell, true)))
                .or_else(|| nearest(&neighbors, destination, |_| true).map(|cell| (cell, false)));

            let Some((next, carve)) = step else {
                return self.abort_corridor(origin, destination, steps, out_events);
            };
            if carve {
                let _ = self.carve_disk(next, corridor_radius, true, out_events);
            }
            if let Some(index) = size.index(next) {
                visited[index] = true;
            }
            path.push(next);
            current = next;
        }
    }

    fn abort_corridor(
        &mut self,
        origin: CellCoord,
        destination: CellCoord,
        steps: usize,
        out_events: &mut Vec<Event>,
    ) -> CorridorOutcome {
        warn!(
            origin = ?origin,
            destination = ?destination,
            steps,
            "corridor gave up before reaching its destination"
        );
        out_events.push(Event::CorridorAborted {
            origin,
            destination,
            steps,
        });
        CorridorOutcome::Aborted
    }
}

/// Reports whether `cell` lies inside, or next to, the disk around `center`.
fn touches_region(size: GridSize, cell: CellCoord, center: CellCoord, limit: u64) -> bool {
    if cell.squared_distance(center) <= limit {
        return true;
    }
    size.neighbors(cell)
        .into_iter()
        .any(|neighbor| neighbor.squared_distance(center) <= limit)
}

/// Candidate nearest to the target, keeping the earliest one on ties.
fn nearest<F>(candidates: &[CellCoord], target: CellCoord, mut accept: F) -> Option<CellCoord>
where
    F: FnMut(&CellCoord) -> bool,
{
    let mut best: Option<(u64, CellCoord)> = None;
    for cell in candidates {
        if !accept(cell) {
            continue;
        }
        let distance = cell.squared_distance(target);
        if best.map_or(true, |(closest, _)| distance < closest) {
            best = Some((distance, *cell));
        }
    }
    best.map(|(_, cell)| cell)
}
