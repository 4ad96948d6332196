#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Dust Field engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative field, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the field executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what changed. No component mutates cell state directly.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

mod config;

pub use config::{ConfigError, FieldConfig, GenerationConfig, PhaseProfile};

/// Commands that express all permissible field mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Supplies the grid layout and marks the field ready for carving.
    ConfigureGrid {
        /// Number of cell columns laid out in the grid.
        columns: u32,
        /// Number of cell rows laid out in the grid.
        rows: u32,
        /// Side length of a single square cell in world units.
        cell_length: f32,
        /// World position of the grid's upper-left corner.
        origin: Vec2,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Switches the phase used for regrowth requests issued by the field itself.
    SetPhase {
        /// Phase to activate.
        phase: PhaseId,
    },
    /// Fills the grid and carves the initial maze from the provided seed.
    GenerateField {
        /// Seed for the deterministic room layout.
        seed: u64,
    },
    /// Fills every cell that is eligible to hold filler.
    FillAll,
    /// Clears every cell inside a disk around the center.
    CarveDisk {
        /// Center of the disk.
        center: CellCoord,
        /// Radius of the disk measured in cells.
        radius: u32,
        /// Whether the carved cells may never regrow.
        permanent: bool,
    },
    /// Carves a meandering permanent corridor from the origin to the destination region.
    CarveCorridor {
        /// Cell the corridor starts from.
        origin: CellCoord,
        /// Center of the region the corridor must reach.
        destination: CellCoord,
    },
    /// Clears a disk and holds it open for a limited time before it may regrow.
    CarvePocket {
        /// Center of the pocket.
        center: CellCoord,
        /// Radius of the pocket measured in cells.
        radius: u32,
        /// How long the pocket stays open.
        hold: Duration,
    },
    /// Replaces the set of cells an owner keeps clear.
    SetKeepClear {
        /// Owner of the reservation.
        owner: OwnerId,
        /// Cells the owner wants kept open.
        footprint: Vec<CellCoord>,
        /// Whether filler already present in newly claimed cells is removed.
        force_remove_existing: bool,
    },
    /// Releases every cell an owner keeps clear.
    ReleaseKeepClear {
        /// Owner whose reservation is dropped.
        owner: OwnerId,
    },
    /// Schedules filler to regrow in a single cell.
    RequestRegrowth {
        /// Cell that should regrow.
        cell: CellCoord,
        /// Phase whose delay table applies.
        phase: PhaseId,
        /// Delay overriding the phase table, if any.
        explicit_delay: Option<Duration>,
        /// Whether an already pending task is restarted.
        refresh_if_pending: bool,
    },
    /// Opens a batch that suppresses collision rebuilds until closed.
    BeginBatch,
    /// Closes the innermost batch.
    EndBatch,
}

/// Events broadcast by the field after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that the grid layout was applied.
    GridConfigured {
        /// Dimensions of the configured grid.
        size: GridSize,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that the active phase changed.
    PhaseChanged {
        /// Phase that became active.
        phase: PhaseId,
    },
    /// Reports that filler was bound to a cell.
    CellFilled {
        /// Cell that received filler.
        cell: CellCoord,
        /// Instance bound to the cell.
        instance: InstanceId,
    },
    /// Reports that filler was removed from a cell.
    CellCleared {
        /// Cell that lost its filler.
        cell: CellCoord,
        /// Whether the cell became permanently open.
        permanent: bool,
    },
    /// Confirms that a corridor reached its destination region.
    CorridorCarved {
        /// Cells visited by the corridor walk, in order.
        path: Vec<CellCoord>,
    },
    /// Reports that a corridor walk exhausted its step budget.
    CorridorAborted {
        /// Cell the corridor started from.
        origin: CellCoord,
        /// Center of the unreached destination region.
        destination: CellCoord,
        /// Number of steps taken before giving up.
        steps: usize,
    },
    /// Reports that the aggregate collision geometry was regenerated.
    CollisionRebuilt {
        /// Number of merged collider rectangles in the new geometry.
        shapes: usize,
        /// Number of active instances contributing to the geometry.
        instances: usize,
    },
    /// Announces that the initial generation pass finished.
    FieldReady {
        /// Cell at the center of the seed pocket.
        seed: CellCoord,
    },
}

/// Unique identifier of a keep-clear reservation owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Creates a new owner identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier of a gameplay phase used to look up regrowth timing.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PhaseId(u16);

impl PhaseId {
    /// Creates a new phase identifier.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the phase.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

/// Identifier of a pooled terrain instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u32);

impl InstanceId {
    /// Creates a new instance identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the squared Euclidean distance between two cells.
    #[must_use]
    pub fn squared_distance(self, other: CellCoord) -> u64 {
        let dx = u64::from(self.column.abs_diff(other.column));
        let dy = u64::from(self.row.abs_diff(other.row));
        dx * dx + dy * dy
    }

    /// Reports whether the two cells touch, including diagonally.
    ///
    /// A cell is not adjacent to itself.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        let dx = self.column.abs_diff(other.column);
        let dy = self.row.abs_diff(other.row);
        dx <= 1 && dy <= 1 && (dx, dy) != (0, 0)
    }

    /// Returns the cell displaced by the provided offsets, if it stays non-negative.
    #[must_use]
    pub fn offset(self, columns: i64, rows: i64) -> Option<CellCoord> {
        let column = i64::from(self.column).checked_add(columns)?;
        let row = i64::from(self.row).checked_add(rows)?;
        Some(CellCoord::new(
            u32::try_from(column).ok()?,
            u32::try_from(row).ok()?,
        ))
    }
}

/// Dimensions of the cell grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    columns: u32,
    rows: u32,
}

impl GridSize {
    /// Creates a new grid size.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Dense row-major index of the cell, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        Some(row * width + column)
    }

    /// Cell stored at the dense row-major index.
    #[must_use]
    pub fn cell_at(&self, index: usize) -> Option<CellCoord> {
        if index >= self.cell_count() || self.columns == 0 {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let column = u32::try_from(index % width).ok()?;
        let row = u32::try_from(index / width).ok()?;
        Some(CellCoord::new(column, row))
    }

    /// Center cell of the grid, rounding toward the origin.
    #[must_use]
    pub const fn center(&self) -> CellCoord {
        CellCoord::new(self.columns / 2, self.rows / 2)
    }

    /// Cells inside the disk of the given radius, in row-major order.
    ///
    /// A cell belongs to the disk when `dx² + dy² <= radius²`. Cells outside
    /// the grid are skipped.
    #[must_use]
    pub fn disk(&self, center: CellCoord, radius: u32) -> Vec<CellCoord> {
        let reach = i64::from(radius);
        let limit = u64::from(radius) * u64::from(radius);
        let mut cells = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let Some(cell) = center.offset(dx, dy) else {
                    continue;
                };
                if self.contains(cell) && center.squared_distance(cell) <= limit {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// In-bounds cells surrounding the provided cell, including diagonals.
    ///
    /// Neighbors are listed row by row starting from the upper-left one.
    #[must_use]
    pub fn neighbors(&self, cell: CellCoord) -> Vec<CellCoord> {
        let mut cells = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if (dx, dy) == (0, 0) {
                    continue;
                }
                if let Some(neighbor) = cell.offset(dx, dy) {
                    if self.contains(neighbor) {
                        cells.push(neighbor);
                    }
                }
            }
        }
        cells
    }
}

/// Uniform layout that converts between world positions and grid cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLayout {
    size: GridSize,
    cell_length: f32,
    origin: Vec2,
}

impl GridLayout {
    /// Creates a new layout description.
    #[must_use]
    pub const fn new(size: GridSize, cell_length: f32, origin: Vec2) -> Self {
        Self {
            size,
            cell_length,
            origin,
        }
    }

    /// Dimensions of the grid.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Side length of a single square cell in world units.
    #[must_use]
    pub const fn cell_length(&self) -> f32 {
        self.cell_length
    }

    /// World position of the grid's upper-left corner.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Converts a world position into the cell containing it.
    ///
    /// Positions outside the grid, and layouts with a non-positive cell
    /// length, yield `None`.
    #[must_use]
    pub fn world_to_grid(&self, position: Vec2) -> Option<CellCoord> {
        if !(self.cell_length > 0.0) {
            return None;
        }
        let local = (position - self.origin) / self.cell_length;
        if !local.is_finite() || local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let cell = CellCoord::new(local.x.floor() as u32, local.y.floor() as u32);
        self.size.contains(cell).then_some(cell)
    }

    /// World position of the center of the provided cell.
    #[must_use]
    pub fn grid_to_world(&self, cell: CellCoord) -> Vec2 {
        self.origin
            + Vec2::new(
                (cell.column() as f32 + 0.5) * self.cell_length,
                (cell.row() as f32 + 0.5) * self.cell_length,
            )
    }
}

#[cfg(test)]
mod tests {
    use super::{CellCoord, FieldConfig, GridLayout, GridSize, OwnerId, PhaseId};
    use glam::Vec2;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn identifiers_round_trip_through_bincode() {
        assert_round_trip(&OwnerId::new(42));
        assert_round_trip(&PhaseId::new(3));
        assert_round_trip(&CellCoord::new(7, 11));
        assert_round_trip(&GridSize::new(24, 16));
    }

    #[test]
    fn field_config_round_trips_through_bincode() {
        assert_round_trip(&FieldConfig::default());
    }

    #[test]
    fn radius_one_disk_is_a_plus_shape() {
        let size = GridSize::new(8, 4);
        let cells = size.disk(CellCoord::new(3, 2), 1);
        assert_eq!(
            cells,
            vec![
                CellCoord::new(3, 1),
                CellCoord::new(2, 2),
                CellCoord::new(3, 2),
                CellCoord::new(4, 2),
                CellCoord::new(3, 3),
            ]
        );
    }

    #[test]
    fn disk_is_clipped_at_grid_edges() {
        let size = GridSize::new(4, 4);
        let cells = size.disk(CellCoord::new(0, 0), 1);
        assert_eq!(
            cells,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(1, 0),
                CellCoord::new(0, 1)
            ]
        );
    }

    #[test]
    fn corner_cells_have_three_neighbors() {
        let size = GridSize::new(5, 5);
        assert_eq!(size.neighbors(CellCoord::new(0, 0)).len(), 3);
        assert_eq!(size.neighbors(CellCoord::new(4, 4)).len(), 3);
        assert_eq!(size.neighbors(CellCoord::new(2, 2)).len(), 8);
    }

    #[test]
    fn index_and_cell_at_agree() {
        let size = GridSize::new(7, 3);
        for index in 0..size.cell_count() {
            let cell = size.cell_at(index).expect("index inside grid");
            assert_eq!(size.index(cell), Some(index));
        }
        assert_eq!(size.index(CellCoord::new(7, 0)), None);
        assert_eq!(size.cell_at(21), None);
    }

    #[test]
    fn adjacency_includes_diagonals_but_not_self() {
        let cell = CellCoord::new(3, 3);
        assert!(cell.is_adjacent(CellCoord::new(4, 4)));
        assert!(cell.is_adjacent(CellCoord::new(3, 2)));
        assert!(!cell.is_adjacent(cell));
        assert!(!cell.is_adjacent(CellCoord::new(5, 3)));
    }

    #[test]
    fn layout_converts_between_world_and_grid() {
        let layout = GridLayout::new(GridSize::new(10, 5), 2.0, Vec2::new(-10.0, -5.0));
        let cell = CellCoord::new(4, 3);
        let center = layout.grid_to_world(cell);
        assert_eq!(center, Vec2::new(-10.0 + 9.0, -5.0 + 7.0));
        assert_eq!(layout.world_to_grid(center), Some(cell));
        assert_eq!(layout.world_to_grid(Vec2::new(-11.0, 0.0)), None);
        assert_eq!(layout.world_to_grid(Vec2::new(10.0, 0.0)), None);
    }
}
