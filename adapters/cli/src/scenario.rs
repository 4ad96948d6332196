use std::{fmt, time::Duration};

use dustfield_core::{Command, Event, OwnerId};
use dustfield_field::{self as field, query, CircleActors, Field, PoolStats};
use dustfield_system_keep_clear::{ActorSnapshot, KeepClear};
use dustfield_system_pockets::{CollectableId, CollectableNotice, Config as PocketConfig, Pockets};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

const VEHICLE: OwnerId = OwnerId::new(1);
const VEHICLE_RADIUS: f32 = 0.9;
const COLLECTABLE_INTERVAL: u32 = 40;
const COLLECTABLE_LIFETIME: u32 = 20;
const POCKET_RADIUS: u32 = 1;
const POCKET_HOLD: Duration = Duration::from_secs(6);

/// Parameters of a simulated run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ScenarioSettings {
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    pub(crate) seed: u64,
    pub(crate) ticks: u32,
    pub(crate) tick: Duration,
}

/// Tallies gathered while the scenario ran.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Summary {
    pub(crate) rebuilds: usize,
    pub(crate) corridors: usize,
    pub(crate) pockets: usize,
    filled: usize,
    pool: PoolStats,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "filled={} active={} pooled={} created={} rebuilds={} corridors={} pockets={}",
            self.filled,
            self.pool.active,
            self.pool.pooled,
            self.pool.created,
            self.rebuilds,
            self.corridors,
            self.pockets
        )
    }
}

/// Generates a field, then drives a vehicle along the middle row while
/// collectables pop up and vanish around it.
#[derive(Debug)]
pub(crate) struct Scenario {
    field: Field,
    settings: ScenarioSettings,
    keep_clear: KeepClear,
    pockets: Pockets,
    rng: ChaCha8Rng,
    summary: Summary,
}

impl Scenario {
    pub(crate) fn new(field: Field, settings: ScenarioSettings) -> Self {
        Self {
            field,
            settings,
            keep_clear: KeepClear::new(),
            pockets: Pockets::new(PocketConfig::new(POCKET_RADIUS, POCKET_HOLD)),
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            summary: Summary::default(),
        }
    }

    pub(crate) fn field(&self) -> &Field {
        &self.field
    }

    pub(crate) fn run(&mut self) -> Summary {
        let settings = self.settings;
        self.submit(
            Command::ConfigureGrid {
                columns: settings.columns,
                rows: settings.rows,
                cell_length: 1.0,
                origin: Vec2::ZERO,
            },
            &CircleActors::default(),
        );
        self.submit(Command::GenerateField { seed: settings.seed }, &CircleActors::default());

        let Some(layout) = query::layout(&self.field) else {
            return self.finish();
        };
        let driving_ticks = settings.ticks.saturating_mul(3) / 4;
        let mut live: Vec<(CollectableId, u32)> = Vec::new();
        let mut next_collectable = 0;

        for tick in 0..settings.ticks {
            let actors = if tick < driving_ticks {
                vec![self.vehicle_at(tick, driving_ticks)]
            } else {
                Vec::new()
            };
            let probe = CircleActors::new(
                actors
                    .iter()
                    .map(|actor| (actor.position, actor.radius))
                    .collect(),
            );

            let mut notices = Vec::new();
            live.retain(|&(id, born)| {
                if tick.saturating_sub(born) < COLLECTABLE_LIFETIME {
                    return true;
                }
                notices.push(CollectableNotice::Collected { id });
                false
            });
            if tick % COLLECTABLE_INTERVAL == 0 && settings.columns > 0 && settings.rows > 0 {
                let id = CollectableId::new(next_collectable);
                next_collectable += 1;
                let position = Vec2::new(
                    self.rng.gen_range(0.0..settings.columns as f32),
                    self.rng.gen_range(0.0..settings.rows as f32),
                );
                notices.push(CollectableNotice::Spawned { id, position });
                live.push((id, tick));
            }

            let mut commands = Vec::new();
            self.keep_clear.handle(&actors, &layout, &mut commands);
            self.pockets.handle(&notices, &layout, &mut commands);
            commands.push(Command::Tick { dt: settings.tick });
            for command in commands {
                self.submit(command, &probe);
            }
        }

        self.finish()
    }

    fn vehicle_at(&self, tick: u32, driving_ticks: u32) -> ActorSnapshot {
        let span = self.settings.columns.saturating_sub(1) as f32;
        let progress = tick as f32 / driving_ticks.max(1) as f32;
        ActorSnapshot {
            owner: VEHICLE,
            position: Vec2::new(0.5 + span * progress, self.settings.rows as f32 * 0.5),
            radius: VEHICLE_RADIUS,
            force: true,
        }
    }

    fn submit(&mut self, command: Command, probe: &CircleActors) {
        if matches!(command, Command::CarvePocket { .. }) {
            self.summary.pockets += 1;
        }
        let mut events = Vec::new();
        field::apply_with(&mut self.field, command, probe, &mut events);
        for event in events {
            match event {
                Event::CollisionRebuilt { shapes, instances } => {
                    debug!(shapes, instances, "collision geometry rebuilt");
                    self.summary.rebuilds += 1;
                }
                Event::CorridorCarved { .. } => self.summary.corridors += 1,
                _ => {}
            }
        }
    }

    fn finish(&mut self) -> Summary {
        self.summary.filled = query::filled_count(&self.field);
        self.summary.pool = query::pool_stats(&self.field);
        self.summary
    }
}
