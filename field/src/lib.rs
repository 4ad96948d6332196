#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative terrain field state for Dust Field.
//!
//! The [`Field`] owns every cell, the instance pool, the keep-clear
//! reservations, the regrowth queue and the collision rebuild coordinator.
//! It is only mutated through [`apply`] and [`apply_with`], and only read
//! through the [`query`] module.

use std::{collections::VecDeque, time::Duration};

use dustfield_core::{
    CellCoord, Command, ConfigError, Event, FieldConfig, GridLayout, GridSize, PhaseId,
};
use tracing::{debug, warn};

mod carving;
mod cells;
mod generation;
mod pool;
mod probe;
mod rebuild;
mod regrowth;
mod reservations;

pub use pool::{InstanceState, PoolStats, TerrainInstance};
pub use probe::{CircleActors, NoOccupants, OccupancyProbe};
pub use rebuild::{ColliderRun, CollisionGeometry};
pub use regrowth::RegrowthStatus;

use cells::CellStore;
use pool::InstancePool;
use rebuild::RebuildCoordinator;
use regrowth::RegrowthScheduler;
use reservations::ReservationBook;

/// Represents the authoritative terrain field.
#[derive(Debug)]
pub struct Field {
    config: FieldConfig,
    layout: Option<GridLayout>,
    cells: CellStore,
    pool: InstancePool,
    reservations: ReservationBook,
    scheduler: RegrowthScheduler,
    rebuild: RebuildCoordinator,
    geometry: CollisionGeometry,
    deferred: VecDeque<Command>,
    active_phase: PhaseId,
    now: Duration,
}

impl Field {
    /// Creates a field with the default configuration, waiting for a grid.
    #[must_use]
    pub fn new() -> Self {
        Self::build(FieldConfig::default())
    }

    /// Creates a field with the provided configuration, waiting for a grid.
    pub fn with_config(config: FieldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: FieldConfig) -> Self {
        let mut pool = InstancePool::new();
        pool.prewarm(config.prewarm_instances);
        Self {
            rebuild: RebuildCoordinator::new(config.rebuild_min_interval()),
            config,
            layout: None,
            cells: CellStore::default(),
            pool,
            reservations: ReservationBook::default(),
            scheduler: RegrowthScheduler::default(),
            geometry: CollisionGeometry::default(),
            deferred: VecDeque::new(),
            active_phase: PhaseId::default(),
            now: Duration::ZERO,
        }
    }

    fn configure_grid(&mut self, layout: GridLayout, out_events: &mut Vec<Event>) {
        self.pool.release_all();
        self.cells = CellStore::new(layout.size());
        self.reservations.clear();
        self.scheduler.clear();
        self.layout = Some(layout);
        self.rebuild.mark_dirty(self.now);
        out_events.push(Event::GridConfigured {
            size: layout.size(),
        });
    }

    /// Binds a pooled instance to the cell when it may hold filler.
    ///
    /// Returns `true` when the cell was filled by this call.
    fn fill_cell(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) -> bool {
        let eligible = self
            .cells
            .get(cell)
            .map_or(false, |state| !state.permanently_open && state.instance.is_none());
        if !eligible {
            return false;
        }
        let instance = self.pool.acquire(cell);
        if let Some(state) = self.cells.get_mut(cell) {
            state.instance = Some(instance);
            state.task = None;
        }
        self.rebuild.note_changed();
        out_events.push(Event::CellFilled { cell, instance });
        true
    }

    /// Returns the cell's instance to the pool.
    ///
    /// Returns `true` when the cell held filler.
    fn clear_cell(&mut self, cell: CellCoord, permanent: bool, out_events: &mut Vec<Event>) -> bool {
        let Some(instance) = self.cells.get_mut(cell).and_then(|state| state.instance.take())
        else {
            return false;
        };
        let released = self.pool.release(instance);
        debug_assert!(released, "cell {cell:?} was bound to an instance the pool does not own");
        self.rebuild.note_changed();
        out_events.push(Event::CellCleared { cell, permanent });
        true
    }

    fn rebuild_geometry(&mut self, out_events: &mut Vec<Event>) {
        self.geometry = CollisionGeometry::from_instances(self.pool.colliding());
        let shapes = self.geometry.runs().len();
        let instances = self.geometry.instance_count();
        debug!(shapes, instances, "collision geometry rebuilt");
        out_events.push(Event::CollisionRebuilt { shapes, instances });
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the command to a field that has no occupants besides filler.
pub fn apply(field: &mut Field, command: Command, out_events: &mut Vec<Event>) {
    apply_with(field, command, &NoOccupants, out_events);
}

/// Applies the command to the field, consulting `probe` before regrowing filler.
///
/// Commands that need the grid are deferred until `ConfigureGrid` arrives and
/// then replayed in their original order.
pub fn apply_with<P>(field: &mut Field, command: Command, probe: &P, out_events: &mut Vec<Event>)
where
    P: OccupancyProbe + ?Sized,
{
    match command {
        Command::ConfigureGrid {
            columns,
            rows,
            cell_length,
            origin,
        } => {
            let layout = GridLayout::new(GridSize::new(columns, rows), cell_length, origin);
            field.configure_grid(layout, out_events);
            let deferred: Vec<Command> = field.deferred.drain(..).collect();
            if !deferred.is_empty() {
                debug!(count = deferred.len(), "replaying deferred commands");
            }
            for command in deferred {
                apply_with(field, command, probe, out_events);
            }
        }
        Command::Tick { dt } => {
            field.now = field.now.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
            field.run_due_regrowth(probe, out_events);
            let _ = field.rebuild.flush(field.now);
            if field.layout.is_some() && field.rebuild.take_due(field.now) {
                field.rebuild_geometry(out_events);
            }
        }
        Command::SetPhase { phase } => {
            field.active_phase = phase;
            out_events.push(Event::PhaseChanged { phase });
        }
        command if field.layout.is_none() => {
            field.deferred.push_back(command);
        }
        Command::GenerateField { seed } => field.generate(seed, out_events),
        Command::FillAll => {
            let _ = field.fill_all(out_events);
        }
        Command::CarveDisk {
            center,
            radius,
            permanent,
        } => {
            let cells = field.carve_disk(center, radius, permanent, out_events);
            if !permanent {
                let phase = field.active_phase;
                for cell in cells {
                    field.request_regrowth(cell, phase, None, false);
                }
            }
        }
        Command::CarveCorridor {
            origin,
            destination,
        } => {
            let _ = field.carve_corridor(origin, destination, out_events);
        }
        Command::CarvePocket {
            center,
            radius,
            hold,
        } => {
            let until = field.now.saturating_add(hold);
            let phase = field.active_phase;
            for cell in field.carve_disk(center, radius, false, out_events) {
                field.cells.set_hold(cell, until);
                field.request_regrowth(cell, phase, None, false);
            }
        }
        Command::SetKeepClear {
            owner,
            footprint,
            force_remove_existing,
        } => field.set_keep_clear(owner, &footprint, force_remove_existing, out_events),
        Command::ReleaseKeepClear { owner } => field.release_keep_clear(owner, out_events),
        Command::RequestRegrowth {
            cell,
            phase,
            explicit_delay,
            refresh_if_pending,
        } => field.request_regrowth(cell, phase, explicit_delay, refresh_if_pending),
        Command::BeginBatch => field.rebuild.begin_batch(),
        Command::EndBatch => {
            if !field.rebuild.end_batch(field.now) {
                warn!("end batch received without a matching begin batch");
            }
        }
    }
    let _ = field.rebuild.flush(field.now);
}

/// Query functions that provide read-only access to the field state.
pub mod query {
    use std::time::Duration;

    use dustfield_core::{CellCoord, GridLayout, InstanceId, OwnerId, PhaseId};
    use glam::Vec2;

    use super::{CollisionGeometry, Field, PoolStats, RegrowthStatus, TerrainInstance};

    /// Read-only snapshot of a single cell.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CellSnapshot {
        /// Coordinates of the cell.
        pub cell: CellCoord,
        /// Instance bound to the cell, if filled.
        pub instance: Option<InstanceId>,
        /// Whether the cell may never regrow.
        pub permanently_open: bool,
        /// Number of reservations keeping the cell clear.
        pub keep_clear_refs: u32,
        /// End of an unexpired temporary hold.
        pub held_until: Option<Duration>,
        /// Status of the cell's regrowth task.
        pub regrowth: RegrowthStatus,
    }

    impl CellSnapshot {
        /// Reports whether filler occupies the cell.
        #[must_use]
        pub const fn is_filled(&self) -> bool {
            self.instance.is_some()
        }
    }

    /// Snapshot of the collision rebuild coordinator.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RebuildStatus {
        /// Whether changes await a rebuild.
        pub dirty: bool,
        /// Number of open batches.
        pub batch_depth: u32,
        /// Time the next rebuild runs at, if one is scheduled.
        pub scheduled_at: Option<Duration>,
    }

    /// Reports whether the grid has been configured.
    #[must_use]
    pub fn is_ready(field: &Field) -> bool {
        field.layout.is_some()
    }

    /// Layout of the configured grid.
    #[must_use]
    pub fn layout(field: &Field) -> Option<GridLayout> {
        field.layout
    }

    /// Simulated time elapsed since the field was created.
    #[must_use]
    pub fn now(field: &Field) -> Duration {
        field.now
    }

    /// Phase used for regrowth the field schedules on its own.
    #[must_use]
    pub fn active_phase(field: &Field) -> PhaseId {
        field.active_phase
    }

    /// Captures the state of the provided cell.
    #[must_use]
    pub fn cell_state(field: &Field, cell: CellCoord) -> Option<CellSnapshot> {
        let state = field.cells.get(cell)?;
        Some(CellSnapshot {
            cell,
            instance: state.instance,
            permanently_open: state.permanently_open,
            keep_clear_refs: state.keep_clear_refs,
            held_until: state.hold_until.filter(|until| *until > field.now),
            regrowth: RegrowthStatus::from_task(state.task),
        })
    }

    /// Reports whether the cell counts as open for carving and generation.
    ///
    /// Permanently open, reserved, and unexpired held cells are open.
    #[must_use]
    pub fn is_open_effective(field: &Field, cell: CellCoord) -> bool {
        field.cells.get(cell).map_or(false, |state| {
            state.permanently_open
                || state.keep_clear_refs > 0
                || state.hold_until.map_or(false, |until| until > field.now)
        })
    }

    /// Reports whether filler occupies the cell.
    #[must_use]
    pub fn is_filled(field: &Field, cell: CellCoord) -> bool {
        field
            .cells
            .get(cell)
            .map_or(false, |state| state.instance.is_some())
    }

    /// Samples filler density at a world position: 1 when filled, otherwise 0.
    ///
    /// Positions outside the grid, or before the grid is ready, sample as 0.
    #[must_use]
    pub fn sample_occupancy(field: &Field, position: Vec2) -> u8 {
        field
            .layout
            .and_then(|layout| layout.world_to_grid(position))
            .map_or(0, |cell| u8::from(is_filled(field, cell)))
    }

    /// Number of reservations keeping the cell clear.
    #[must_use]
    pub fn keep_clear_refs(field: &Field, cell: CellCoord) -> u32 {
        field
            .cells
            .get(cell)
            .map_or(0, |state| state.keep_clear_refs)
    }

    /// Cells currently kept clear by the owner, in row-major order.
    #[must_use]
    pub fn footprint_of(field: &Field, owner: OwnerId) -> Vec<CellCoord> {
        let mut cells: Vec<CellCoord> = field
            .reservations
            .footprint(owner)
            .map(|cells| cells.iter().copied().collect())
            .unwrap_or_default();
        cells.sort_by_key(|cell| (cell.row(), cell.column()));
        cells
    }

    /// Number of owners holding at least one reservation.
    #[must_use]
    pub fn reservation_owner_count(field: &Field) -> usize {
        field.reservations.owner_count()
    }

    /// Number of cells with a pending or parked regrowth task.
    #[must_use]
    pub fn pending_regrowth(field: &Field) -> usize {
        field
            .cells
            .iter()
            .filter(|(_, state)| state.task.is_some())
            .count()
    }

    /// Number of cells holding filler.
    #[must_use]
    pub fn filled_count(field: &Field) -> usize {
        field
            .cells
            .iter()
            .filter(|(_, state)| state.instance.is_some())
            .count()
    }

    /// Counters describing the instance pool.
    #[must_use]
    pub fn pool_stats(field: &Field) -> PoolStats {
        field.pool.stats()
    }

    /// Looks up a terrain instance by identifier.
    #[must_use]
    pub fn instance(field: &Field, id: InstanceId) -> Option<&TerrainInstance> {
        field.pool.get(id)
    }

    /// Most recently rebuilt collision geometry.
    #[must_use]
    pub fn collision_geometry(field: &Field) -> &CollisionGeometry {
        &field.geometry
    }

    /// Current state of the collision rebuild coordinator.
    #[must_use]
    pub fn rebuild_status(field: &Field) -> RebuildStatus {
        RebuildStatus {
            dirty: field.rebuild.is_dirty(),
            batch_depth: field.rebuild.batch_depth(),
            scheduled_at: field.rebuild.scheduled_at(),
        }
    }

    /// Number of commands waiting for the grid to be configured.
    #[must_use]
    pub fn deferred_commands(field: &Field) -> usize {
        field.deferred.len()
    }
}
