//! Recycling pool for terrain instances.

use dustfield_core::{CellCoord, InstanceId};

/// Lifecycle stage of a terrain instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceState {
    /// Parked in the pool with no footprint.
    Pooled,
    /// Bound to a single grid cell.
    Active {
        /// Cell the instance fills.
        cell: CellCoord,
    },
}

/// Renderable, collidable filler object recycled by the pool.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainInstance {
    id: InstanceId,
    state: InstanceState,
    opacity: f32,
    collider_enabled: bool,
}

impl TerrainInstance {
    fn pooled(id: InstanceId) -> Self {
        Self {
            id,
            state: InstanceState::Pooled,
            opacity: 0.0,
            collider_enabled: false,
        }
    }

    /// Identifier of the instance.
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Current lifecycle stage.
    #[must_use]
    pub const fn state(&self) -> InstanceState {
        self.state
    }

    /// Visual opacity in the range 0.0..=1.0.
    #[must_use]
    pub const fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Whether the instance contributes a collider.
    #[must_use]
    pub const fn collider_enabled(&self) -> bool {
        self.collider_enabled
    }

    /// Cell the instance is bound to, if active.
    #[must_use]
    pub const fn cell(&self) -> Option<CellCoord> {
        match self.state {
            InstanceState::Active { cell } => Some(cell),
            InstanceState::Pooled => None,
        }
    }

    fn activate(&mut self, cell: CellCoord) {
        self.state = InstanceState::Active { cell };
        self.opacity = 1.0;
        self.collider_enabled = true;
    }

    fn neutralize(&mut self) {
        self.state = InstanceState::Pooled;
        self.opacity = 0.0;
        self.collider_enabled = false;
    }
}

/// Counters describing the pool population.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances bound to cells.
    pub active: usize,
    /// Instances parked on the free stack.
    pub pooled: usize,
    /// Instances ever constructed.
    pub created: usize,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct InstancePool {
    instances: Vec<TerrainInstance>,
    free: Vec<InstanceId>,
}

impl InstancePool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Constructs instances up front so the first fill does not allocate.
    pub(crate) fn prewarm(&mut self, count: usize) {
        self.instances.reserve(count);
        self.free.reserve(count);
        for _ in 0..count {
            let id = self.construct();
            self.free.push(id);
        }
    }

    /// Takes an instance from the free stack, or builds one, and binds it to the cell.
    pub(crate) fn acquire(&mut self, cell: CellCoord) -> InstanceId {
        let id = match self.free.pop() {
            Some(id) => id,
            None => self.construct(),
        };
        if let Some(instance) = self.slot_mut(id) {
            instance.activate(cell);
        }
        id
    }

    /// Neutralizes an active instance and returns it to the free stack.
    ///
    /// Returns `false` when the instance is unknown or already pooled.
    pub(crate) fn release(&mut self, id: InstanceId) -> bool {
        let Some(instance) = self.slot_mut(id) else {
            return false;
        };
        if instance.state == InstanceState::Pooled {
            return false;
        }
        instance.neutralize();
        self.free.push(id);
        true
    }

    /// Returns every active instance to the free stack.
    pub(crate) fn release_all(&mut self) {
        let active: Vec<InstanceId> = self
            .instances
            .iter()
            .filter(|instance| instance.state != InstanceState::Pooled)
            .map(TerrainInstance::id)
            .collect();
        for id in active {
            let _ = self.release(id);
        }
    }

    pub(crate) fn get(&self, id: InstanceId) -> Option<&TerrainInstance> {
        let index = usize::try_from(id.get()).ok()?;
        self.instances.get(index)
    }

    /// Active instances that currently provide a collider.
    pub(crate) fn colliding(&self) -> impl Iterator<Item = &TerrainInstance> + '_ {
        self.instances
            .iter()
            .filter(|instance| instance.collider_enabled && instance.cell().is_some())
    }

    pub(crate) fn stats(&self) -> PoolStats {
        let pooled = self.free.len();
        PoolStats {
            active: self.instances.len() - pooled,
            pooled,
            created: self.instances.len(),
        }
    }

    fn construct(&mut self) -> InstanceId {
        let raw = u32::try_from(self.instances.len()).unwrap_or(u32::MAX);
        let id = InstanceId::new(raw);
        self.instances.push(TerrainInstance::pooled(id));
        id
    }

    fn slot_mut(&mut self, id: InstanceId) -> Option<&mut TerrainInstance> {
        let index = usize::try_from(id.get()).ok()?;
        self.instances.get_mut(index)
    }
}
