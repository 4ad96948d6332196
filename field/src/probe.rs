//! Veto checks consulted before filler regrows into a cell.

use dustfield_core::CellCoord;
use glam::Vec2;

/// Read-only view of everything besides filler that may occupy a cell.
///
/// Every method defaults to "nothing is there", so implementors only
/// override the checks they can answer.
pub trait OccupancyProbe {
    /// Reports whether another system has claimed the cell.
    fn is_externally_blocked(&self, _cell: CellCoord) -> bool {
        false
    }

    /// Reports whether no other grid occupant sits in the cell.
    fn is_cell_free_of_occupants(&self, _cell: CellCoord) -> bool {
        true
    }

    /// Reports whether a moving actor overlaps the square of side
    /// `cell_length` centered on `center`.
    fn is_overlapped_by_moving_actor(&self, _center: Vec2, _cell_length: f32) -> bool {
        false
    }

    /// Reports whether no collectable sits in the cell.
    fn is_cell_free_of_collectable(&self, _cell: CellCoord) -> bool {
        true
    }
}

/// Probe for a field with nothing in it but filler.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOccupants;

impl OccupancyProbe for NoOccupants {}

/// Moving actors approximated as circles in world space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CircleActors {
    actors: Vec<(Vec2, f32)>,
}

impl CircleActors {
    /// Creates a probe from `(center, radius)` pairs.
    #[must_use]
    pub fn new(actors: Vec<(Vec2, f32)>) -> Self {
        Self { actors }
    }
}

impl OccupancyProbe for CircleActors {
    fn is_overlapped_by_moving_actor(&self, center: Vec2, cell_length: f32) -> bool {
        let half = Vec2::splat(cell_length * 0.5);
        self.actors.iter().any(|&(position, radius)| {
            let closest = position.clamp(center - half, center + half);
            closest.distance_squared(position) < radius * radius
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_overlaps_square_it_touches() {
        let probe = CircleActors::new(vec![(Vec2::new(2.4, 0.5), 0.5)]);
        assert!(probe.is_overlapped_by_moving_actor(Vec2::new(1.5, 0.5), 1.0));
        assert!(!probe.is_overlapped_by_moving_actor(Vec2::new(0.5, 0.5), 1.0));
    }

    #[test]
    fn default_probe_vetoes_nothing() {
        let probe = NoOccupants;
        let cell = CellCoord::new(0, 0);
        assert!(!probe.is_externally_blocked(cell));
        assert!(probe.is_cell_free_of_occupants(cell));
        assert!(probe.is_cell_free_of_collectable(cell));
        assert!(!probe.is_overlapped_by_moving_actor(Vec2::ZERO, 1.0));
    }
}
