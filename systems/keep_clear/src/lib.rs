#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns moving actors into keep-clear reservations.
//!
//! Each frame the caller hands over the actors that want the ground under
//! them kept open. The system compares every actor's disk footprint with the
//! one it last requested and only emits commands for owners whose footprint
//! changed or who disappeared.

use std::collections::BTreeMap;

use dustfield_core::{CellCoord, Command, GridLayout, OwnerId};
use glam::Vec2;

/// Immutable view of an actor that reserves the cells it covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActorSnapshot {
    /// Identity used to track the actor's reservation.
    pub owner: OwnerId,
    /// World position of the actor's center.
    pub position: Vec2,
    /// Radius of the actor in world units.
    pub radius: f32,
    /// Whether filler already under the actor is removed when it claims cells.
    pub force: bool,
}

/// Keep-clear reservation system.
#[derive(Debug, Default)]
pub struct KeepClear {
    footprints: BTreeMap<OwnerId, Vec<CellCoord>>,
}

impl KeepClear {
    /// Creates a system that has not reserved anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits reservation updates for the provided actors.
    ///
    /// Actors that left the grid, and owners missing from `actors`, have
    /// their reservations released.
    pub fn handle(&mut self, actors: &[ActorSnapshot], layout: &GridLayout, out: &mut Vec<Command>) {
        let mut seen: Vec<OwnerId> = Vec::with_capacity(actors.len());

        for actor in actors {
            let footprint = covered_cells(actor, layout);
            if footprint.is_empty() {
                continue;
            }
            seen.push(actor.owner);

            if self.footprints.get(&actor.owner) == Some(&footprint) {
                continue;
            }
            out.push(Command::SetKeepClear {
                owner: actor.owner,
                footprint: footprint.clone(),
                force_remove_existing: actor.force,
            });
            let _ = self.footprints.insert(actor.owner, footprint);
        }

        let departed: Vec<OwnerId> = self
            .footprints
            .keys()
            .copied()
            .filter(|owner| !seen.contains(owner))
            .collect();
        for owner in departed {
            let _ = self.footprints.remove(&owner);
            out.push(Command::ReleaseKeepClear { owner });
        }
    }

    /// Footprint last requested for the owner, if any.
    #[must_use]
    pub fn footprint(&self, owner: OwnerId) -> Option<&[CellCoord]> {
        self.footprints.get(&owner).map(Vec::as_slice)
    }
}

/// Cells covered by the actor, in row-major order.
///
/// The actor's radius is rounded up to whole cells and applied around the
/// cell containing its center.
fn covered_cells(actor: &ActorSnapshot, layout: &GridLayout) -> Vec<CellCoord> {
    let Some(center) = layout.world_to_grid(actor.position) else {
        return Vec::new();
    };
    let radius = cell_radius(actor.radius, layout.cell_length());
    layout.size().disk(center, radius)
}

fn cell_radius(radius: f32, cell_length: f32) -> u32 {
    if !(radius > 0.0) || !(cell_length > 0.0) {
        return 0;
    }
    let cells = (radius / cell_length).ceil();
    if cells >= u32::MAX as f32 {
        u32::MAX
    } else {
        cells as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustfield_core::GridSize;

    fn layout() -> GridLayout {
        GridLayout::new(GridSize::new(6, 6), 2.0, Vec2::ZERO)
    }

    #[test]
    fn radius_rounds_up_to_whole_cells() {
        assert_eq!(cell_radius(0.0, 2.0), 0);
        assert_eq!(cell_radius(1.0, 2.0), 1);
        assert_eq!(cell_radius(4.5, 2.0), 3);
        assert_eq!(cell_radius(f32::NAN, 2.0), 0);
        assert_eq!(cell_radius(1.0, 0.0), 0);
    }

    #[test]
    fn footprint_is_empty_off_grid() {
        let actor = ActorSnapshot {
            owner: OwnerId::new(1),
            position: Vec2::new(-1.0, 3.0),
            radius: 1.0,
            force: false,
        };
        assert!(covered_cells(&actor, &layout()).is_empty());
    }

    #[test]
    fn footprint_centers_on_actor_cell() {
        let actor = ActorSnapshot {
            owner: OwnerId::new(1),
            position: Vec2::new(5.0, 5.0),
            radius: 0.5,
            force: false,
        };
        let cells = covered_cells(&actor, &layout());
        assert_eq!(cells.len(), 5);
        assert!(cells.contains(&CellCoord::new(2, 2)));
    }
}
