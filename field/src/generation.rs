//! Initial maze generation pass.

use dustfield_core::{CellCoord, Event};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::{carving::CorridorOutcome, Field};

impl Field {
    /// Fills every cell that is not held open.
    pub(crate) fn fill_all(&mut self, out_events: &mut Vec<Event>) -> usize {
        let size = self.cells.size();
        let now = self.now;
        let mut filled = 0;
        for index in 0..size.cell_count() {
            let Some(cell) = size.cell_at(index) else {
                continue;
            };
            if self.cells.is_open_effective(cell, now) {
                continue;
            }
            if self.fill_cell(cell, out_events) {
                filled += 1;
            }
        }
        filled
    }

    /// Fills the grid, carves the seed pocket and rooms, and links every room
    /// to the seed pocket with a corridor.
    ///
    /// The same seed always produces the same layout on the same grid.
    pub(crate) fn generate(&mut self, seed: u64, out_events: &mut Vec<Event>) {
        let size = self.cells.size();
        if size.cell_count() == 0 {
            return;
        }
        let settings = self.config.generation.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        self.rebuild.begin_batch();
        let filled = self.fill_all(out_events);
        let seed_cell = size.center();
        let _ = self.carve_disk(seed_cell, settings.seed_radius, true, out_events);

        let mut connected = 0;
        for _ in 0..settings.rooms {
            let room = CellCoord::new(
                rng.gen_range(0..size.columns()),
                rng.gen_range(0..size.rows()),
            );
            let _ = self.carve_disk(room, settings.room_radius, true, out_events);
            if self.carve_corridor(room, seed_cell, out_events) == CorridorOutcome::Connected {
                connected += 1;
            }
        }
        let _ = self.rebuild.end_batch(self.now);

        debug!(
            seed,
            filled,
            rooms = settings.rooms,
            connected,
            "field generated"
        );
        out_events.push(Event::FieldReady { seed: seed_cell });
    }
}
