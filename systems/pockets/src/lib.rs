#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that opens temporary pockets around spawned collectables.

use std::{collections::BTreeSet, time::Duration};

use dustfield_core::{Command, GridLayout};
use glam::Vec2;

/// Identifier of a collectable tracked by the pocket system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectableId(u64);

impl CollectableId {
    /// Wraps a raw collectable identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Collectable lifecycle notifications fed into the system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CollectableNotice {
    /// A collectable appeared at the given world position.
    Spawned {
        /// Collectable identity.
        id: CollectableId,
        /// World position of the collectable.
        position: Vec2,
    },
    /// A collectable was picked up.
    Collected {
        /// Collectable identity.
        id: CollectableId,
    },
}

/// Configuration parameters required to construct the pocket system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    radius: u32,
    hold: Duration,
}

impl Config {
    /// Creates a configuration carving pockets of `radius` cells held for `hold`.
    #[must_use]
    pub const fn new(radius: u32, hold: Duration) -> Self {
        Self { radius, hold }
    }
}

/// Pocket system.
#[derive(Debug)]
pub struct Pockets {
    config: Config,
    live: BTreeSet<CollectableId>,
}

impl Pockets {
    /// Creates the system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            live: BTreeSet::new(),
        }
    }

    /// Consumes notices and emits pocket carving commands.
    ///
    /// Each collectable gets a single pocket while it is alive. Collecting it
    /// only forgets it; the pocket's hold expires on its own.
    pub fn handle(
        &mut self,
        notices: &[CollectableNotice],
        layout: &GridLayout,
        out: &mut Vec<Command>,
    ) {
        for notice in notices {
            match *notice {
                CollectableNotice::Spawned { id, position } => {
                    let Some(center) = layout.world_to_grid(position) else {
                        continue;
                    };
                    if !self.live.insert(id) {
                        continue;
                    }
                    out.push(Command::CarvePocket {
                        center,
                        radius: self.config.radius,
                        hold: self.config.hold,
                    });
                }
                CollectableNotice::Collected { id } => {
                    let _ = self.live.remove(&id);
                }
            }
        }
    }

    /// Number of collectables currently holding a pocket.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustfield_core::{CellCoord, GridSize};

    fn layout() -> GridLayout {
        GridLayout::new(GridSize::new(4, 4), 1.0, Vec2::ZERO)
    }

    #[test]
    fn duplicate_spawn_notices_carve_once() {
        let mut pockets = Pockets::new(Config::new(1, Duration::from_secs(3)));
        let spawned = CollectableNotice::Spawned {
            id: CollectableId::new(9),
            position: Vec2::new(2.5, 1.5),
        };
        let mut out = Vec::new();
        pockets.handle(&[spawned, spawned], &layout(), &mut out);
        assert_eq!(
            out,
            vec![Command::CarvePocket {
                center: CellCoord::new(2, 1),
                radius: 1,
                hold: Duration::from_secs(3),
            }]
        );
    }

    #[test]
    fn spawns_outside_grid_are_ignored() {
        let mut pockets = Pockets::new(Config::new(1, Duration::from_secs(3)));
        let mut out = Vec::new();
        pockets.handle(
            &[CollectableNotice::Spawned {
                id: CollectableId::new(1),
                position: Vec2::new(10.0, 1.0),
            }],
            &layout(),
            &mut out,
        );
        assert!(out.is_empty());
        assert_eq!(pockets.live_count(), 0);
    }

    #[test]
    fn collected_ids_can_spawn_again() {
        let mut pockets = Pockets::new(Config::new(0, Duration::from_secs(1)));
        let id = CollectableId::new(4);
        let notices = [
            CollectableNotice::Spawned {
                id,
                position: Vec2::new(0.5, 0.5),
            },
            CollectableNotice::Collected { id },
            CollectableNotice::Spawned {
                id,
                position: Vec2::new(3.5, 3.5),
            },
        ];
        let mut out = Vec::new();
        pockets.handle(&notices, &layout(), &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(pockets.live_count(), 1);
        assert_eq!(id.get(), 4);
    }
}
