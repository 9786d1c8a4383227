//! Frame driver that wires the world to every system.

use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use tile_defence_core::{CellCoord, Command, Event, TowerId, UpgradeId, WaveNumber};
use tile_defence_system_movement::Movement;
use tile_defence_system_tower_combat::{Config as CombatConfig, TowerCombat};
use tile_defence_system_wave_scheduler::{SchedulerError, WaveScheduler};
use tile_defence_world::{self as world, query, World};

use crate::Scenario;

/// Aggregated outcome of a simulated session.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Summary {
    /// Frames stepped so far.
    pub frames: u64,
    /// Simulated time.
    pub elapsed: Duration,
    /// Enemies that entered the field.
    pub spawned: u32,
    /// Enemies defeated by towers or found without health.
    pub defeated: u32,
    /// Enemies that reached the end of the path.
    pub leaked: u32,
    /// Attacks fired by towers.
    pub attacks: u32,
    /// Damage applied to enemies, overkill included.
    pub damage_dealt: f32,
    /// Waves closed after all their enemies were resolved.
    pub waves_completed: u32,
    /// Currency left.
    pub currency: u32,
    /// Lives left.
    pub lives: u32,
    /// Whether the session ran out of lives.
    pub game_over: bool,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "frames {} ({:.1}s simulated)",
            self.frames,
            self.elapsed.as_secs_f32()
        )?;
        writeln!(
            f,
            "enemies: {} spawned, {} defeated, {} leaked",
            self.spawned, self.defeated, self.leaked
        )?;
        writeln!(
            f,
            "towers: {} attacks, {:.1} damage",
            self.attacks, self.damage_dealt
        )?;
        writeln!(f, "waves completed: {}", self.waves_completed)?;
        write!(
            f,
            "currency {}, lives {}{}",
            self.currency,
            self.lives,
            if self.game_over { ", game over" } else { "" }
        )
    }
}

/// Headless session that steps the world and its systems frame by frame.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    scheduler: WaveScheduler,
    movement: Movement,
    combat: TowerCombat,
    events: Vec<Event>,
    commands: Vec<Command>,
    tally: Summary,
    replay: DefaultHasher,
    over: bool,
}

impl Simulation {
    /// Wraps a world and the systems that drive it.
    #[must_use]
    pub fn new(world: World, scheduler: WaveScheduler, combat: TowerCombat) -> Self {
        Self {
            world,
            scheduler,
            movement: Movement,
            combat,
            events: Vec::new(),
            commands: Vec::new(),
            tally: Summary::default(),
            replay: DefaultHasher::new(),
            over: false,
        }
    }

    /// Builds the session described by `scenario`, buys its towers and
    /// launches the first wave.
    pub fn from_scenario(scenario: &Scenario, seed: u64) -> Result<Self> {
        let world = World::new(scenario.world_config(), scenario.tile_map()?);
        let mut simulation = Self::new(
            world,
            WaveScheduler::new(scenario.scheduler_config(seed)),
            TowerCombat::new(CombatConfig::new(seed)),
        );

        for plan in scenario.towers() {
            let tower = simulation.place_tower(plan.cell())?;
            for upgrade in plan.upgrades() {
                simulation.upgrade(tower, *upgrade)?;
            }
        }

        let _ = simulation
            .begin(scenario.entry())
            .with_context(|| format!("failed to start waves from {}", scenario.entry()))?;
        Ok(simulation)
    }

    /// Builds a tower on `cell`.
    pub fn place_tower(&mut self, cell: CellCoord) -> Result<TowerId> {
        let events = self.execute(Command::PlaceTower { cell });
        for event in events {
            match event {
                Event::TowerPlaced { tower, .. } => return Ok(*tower),
                Event::TowerPlacementRejected { reason, .. } => {
                    bail!("tower at {cell} rejected: {reason}")
                }
                _ => {}
            }
        }
        bail!("tower at {cell} was neither placed nor rejected")
    }

    /// Buys `upgrade` for `tower`.
    pub fn upgrade(&mut self, tower: TowerId, upgrade: UpgradeId) -> Result<()> {
        let events = self.execute(Command::ApplyUpgrade { tower, upgrade });
        for event in events {
            if let Event::UpgradeRejected { reason, .. } = event {
                bail!("upgrade {upgrade:?} for tower {} rejected: {reason}", tower.get());
            }
        }
        Ok(())
    }

    /// Traces the wave path from `entry` and opens the first wave.
    pub fn begin(&mut self, entry: CellCoord) -> Result<WaveNumber, SchedulerError> {
        self.events.clear();
        self.commands.clear();
        let first = self
            .scheduler
            .begin(query::map(&self.world), entry, &mut self.commands)?;
        self.flush();
        let acknowledged = self.scheduler.acknowledge(&self.events);
        self.record();
        acknowledged.map(|()| first)
    }

    /// Advances the session by one frame.
    ///
    /// Waves the world refuses are aborted by the scheduler; the frame still
    /// completes before the failure is reported.
    pub fn step(&mut self, dt: Duration) -> Result<(), SchedulerError> {
        if self.over {
            return Ok(());
        }

        self.events.clear();
        self.commands.clear();
        world::apply(&mut self.world, Command::Tick { dt }, &mut self.events);
        let tick = self.events.len();

        self.scheduler.handle(&self.events[..tick], &mut self.commands);
        self.flush();
        let acknowledged = self.scheduler.acknowledge(&self.events[tick..]);

        let enemies = query::enemy_view(&self.world);
        self.movement.handle(
            &self.events[..tick],
            &enemies,
            |wave| query::wave_path(&self.world, wave),
            &mut self.commands,
        );
        self.flush();

        let towers = query::tower_view(&self.world);
        let enemies = query::enemy_view(&self.world);
        self.combat
            .handle(&self.events[..tick], &towers, &enemies, &mut self.commands);
        self.flush();

        world::apply(
            &mut self.world,
            Command::AdvanceEffects { dt },
            &mut self.events,
        );

        self.scheduler
            .reap(&query::wave_census(&self.world), &mut self.commands);
        self.flush();

        self.record();
        acknowledged
    }

    /// Events produced by the most recent frame or command.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Authoritative world state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Wave scheduler driving the session.
    #[must_use]
    pub fn scheduler(&self) -> &WaveScheduler {
        &self.scheduler
    }

    /// Reports whether the session ran out of lives.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.over
    }

    /// Hash of every event observed so far, used to compare replays.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        self.replay.clone().finish()
    }

    /// Current outcome of the session.
    #[must_use]
    pub fn summary(&self) -> Summary {
        let economy = query::economy(&self.world);
        Summary {
            frames: query::tick_index(&self.world),
            elapsed: query::elapsed(&self.world),
            waves_completed: self.scheduler.completed_waves(),
            currency: economy.currency,
            lives: economy.lives,
            game_over: self.over,
            ..self.tally
        }
    }

    fn execute(&mut self, command: Command) -> &[Event] {
        self.events.clear();
        world::apply(&mut self.world, command, &mut self.events);
        self.record();
        &self.events
    }

    fn flush(&mut self) {
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }
    }

    fn record(&mut self) {
        for event in &self.events {
            format!("{event:?}").hash(&mut self.replay);
            match event {
                Event::EnemySpawned { .. } => self.tally.spawned += 1,
                Event::EnemyDefeated { .. } => self.tally.defeated += 1,
                Event::EnemyLeaked { .. } => self.tally.leaked += 1,
                Event::TowerAttacked { .. } => self.tally.attacks += 1,
                Event::EnemyDamaged { damage, .. } => self.tally.damage_dealt += damage,
                Event::GameOver => {
                    self.over = true;
                    log::info!("game over after {} frames", query::tick_index(&self.world));
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_defence_core::TileMap;
    use tile_defence_system_wave_scheduler::Config as SchedulerConfig;
    use tile_defence_world::WorldConfig;

    const FRAME: Duration = Duration::from_millis(50);

    fn corridor(world_config: WorldConfig) -> Simulation {
        let rows: [&[u8]; 3] = [&[1; 12], &[0; 12], &[0; 12]];
        let map = TileMap::from_rows(20.0, &rows).expect("map");
        let scheduler = SchedulerConfig::new(11)
            .with_countdown(Duration::from_secs(1))
            .with_spawn_delay(Duration::from_millis(500));
        Simulation::new(
            World::new(world_config, map),
            WaveScheduler::new(scheduler),
            TowerCombat::new(CombatConfig::new(11)),
        )
    }

    #[test]
    fn undefended_corridor_ends_in_game_over() {
        let mut simulation = corridor(WorldConfig::default().with_starting_lives(3));
        assert_eq!(
            simulation.begin(CellCoord::new(0, 0)),
            Ok(WaveNumber::FIRST)
        );

        for _ in 0..2_000 {
            simulation.step(FRAME).expect("frame");
            if simulation.is_over() {
                break;
            }
        }

        let summary = simulation.summary();
        assert!(summary.game_over);
        assert!(summary.leaked >= 3);
        assert_eq!(summary.lives, 0);
        assert_eq!(summary.attacks, 0);

        let frames = summary.frames;
        simulation.step(FRAME).expect("frame after game over");
        assert_eq!(simulation.summary().frames, frames);
    }

    #[test]
    fn defended_corridor_earns_rewards() {
        let mut simulation = corridor(WorldConfig::default().with_starting_currency(200));
        let tower = simulation
            .place_tower(CellCoord::new(6, 1))
            .expect("tower");
        simulation.upgrade(tower, UpgradeId::Damage).expect("upgrade");
        assert!(simulation.upgrade(tower, UpgradeId::Damage).is_err());
        assert!(simulation.place_tower(CellCoord::new(3, 0)).is_err());
        let _ = simulation.begin(CellCoord::new(0, 0)).expect("begin");

        for _ in 0..400 {
            simulation.step(FRAME).expect("frame");
        }

        let summary = simulation.summary();
        assert!(summary.attacks > 0);
        assert!(summary.defeated > 0);
        assert!(summary.damage_dealt > 0.0);
        assert_eq!(
            summary.currency,
            200 - 50 - UpgradeId::Damage.cost() + summary.defeated * 10
        );
        assert!(summary.spawned >= summary.defeated + summary.leaked);
    }

    #[test]
    fn begin_reports_unusable_entries() {
        let mut simulation = corridor(WorldConfig::default());
        assert!(simulation.begin(CellCoord::new(0, 2)).is_err());
        assert!(simulation.scheduler().waves().next().is_none());
    }
}
