#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Tile Defence.

mod economy;
mod effects;
mod pool;
mod towers;

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use tile_defence_core::{
    Attack, AttackKind, CellCoord, Command, DefeatSound, EnemyId, Event, Path, PathError,
    PlacementError, RemovalError, SpawnError, TileKind, TileMap, TowerId, TowerStats,
    UpgradeError, UpgradeId, WaveNumber,
};

use economy::Economy;
use effects::EffectPool;
use pool::EnemyPool;
use towers::TowerRegistry;

const DEFAULT_POOL_CAPACITY: usize = 64;
const DEFAULT_EFFECT_CAPACITY: usize = 128;
const DEFAULT_STARTING_CURRENCY: u32 = 100;
const DEFAULT_STARTING_LIVES: u32 = 20;
const DEFAULT_TOWER_COST: u32 = 50;

/// Tunable parameters the world is created with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldConfig {
    pool_capacity: usize,
    effect_capacity: usize,
    starting_currency: u32,
    starting_lives: u32,
    tower_cost: u32,
    tower_stats: TowerStats,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            effect_capacity: DEFAULT_EFFECT_CAPACITY,
            starting_currency: DEFAULT_STARTING_CURRENCY,
            starting_lives: DEFAULT_STARTING_LIVES,
            tower_cost: DEFAULT_TOWER_COST,
            tower_stats: TowerStats::default(),
        }
    }
}

impl WorldConfig {
    /// Overrides the number of enemy pool slots.
    #[must_use]
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Overrides the number of visual effect slots.
    #[must_use]
    pub fn with_effect_capacity(mut self, capacity: usize) -> Self {
        self.effect_capacity = capacity;
        self
    }

    /// Overrides the currency a session starts with.
    #[must_use]
    pub fn with_starting_currency(mut self, currency: u32) -> Self {
        self.starting_currency = currency;
        self
    }

    /// Overrides the lives a session starts with.
    #[must_use]
    pub fn with_starting_lives(mut self, lives: u32) -> Self {
        self.starting_lives = lives;
        self
    }

    /// Overrides the currency charged per tower.
    #[must_use]
    pub fn with_tower_cost(mut self, cost: u32) -> Self {
        self.tower_cost = cost;
        self
    }

    /// Overrides the stats freshly built towers start with.
    #[must_use]
    pub fn with_tower_stats(mut self, stats: TowerStats) -> Self {
        self.tower_stats = stats;
        self
    }

    /// Number of enemy pool slots.
    #[must_use]
    pub const fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }

    /// Currency charged per tower.
    #[must_use]
    pub const fn tower_cost(&self) -> u32 {
        self.tower_cost
    }
}

#[derive(Debug)]
struct WaveRecord {
    path: Path,
}

/// Represents the authoritative Tile Defence world state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    map: TileMap,
    enemies: EnemyPool,
    waves: BTreeMap<WaveNumber, WaveRecord>,
    towers: TowerRegistry,
    economy: Economy,
    effects: EffectPool,
    next_sound: DefeatSound,
    tick_index: u64,
    elapsed: Duration,
    game_over: bool,
}

impl World {
    /// Creates a new world around the provided tile map.
    #[must_use]
    pub fn new(config: WorldConfig, map: TileMap) -> Self {
        Self {
            map,
            enemies: EnemyPool::new(config.pool_capacity),
            waves: BTreeMap::new(),
            towers: TowerRegistry::new(),
            economy: Economy::new(config.starting_currency, config.starting_lives),
            effects: EffectPool::new(config.effect_capacity),
            next_sound: DefeatSound::new(0),
            tick_index: 0,
            elapsed: Duration::ZERO,
            game_over: false,
            config,
        }
    }

    fn reset_session(&mut self) {
        for tower in self.towers.drain() {
            let _ = self.map.set_kind(tower.cell, TileKind::Ground);
        }
        self.enemies.clear();
        self.waves.clear();
        self.economy.reset();
        self.effects.clear();
        self.next_sound = DefeatSound::new(0);
        self.elapsed = Duration::ZERO;
        self.game_over = false;
    }

    fn defeat(&mut self, enemy: EnemyId, out_events: &mut Vec<Event>) {
        let Some(state) = self.enemies.deactivate(enemy) else {
            return;
        };
        self.economy.earn(state.reward);
        let sound = self.next_sound;
        self.next_sound = sound.next();
        out_events.push(Event::EnemyDefeated {
            enemy,
            wave: state.wave,
            reward: state.reward,
            sound,
        });
    }

    fn leak(&mut self, enemy: EnemyId, out_events: &mut Vec<Event>) {
        let Some(state) = self.enemies.deactivate(enemy) else {
            return;
        };
        let lives_remaining = self.economy.lose_life();
        out_events.push(Event::EnemyLeaked {
            enemy,
            wave: state.wave,
            lives_remaining,
        });

        if lives_remaining == 0 && !self.game_over {
            self.game_over = true;
            log::info!("out of lives after {:?}", self.elapsed);
            out_events.push(Event::GameOver);
        }
    }

    fn resolve_attack(&mut self, attack: Attack, out_events: &mut Vec<Event>) {
        let Some(target) = attack.primary() else {
            return;
        };
        let Some(tower) = self.towers.get_mut(attack.tower) else {
            log::debug!("attack from missing tower {:?} ignored", attack.tower);
            return;
        };
        tower.cooldown = tower.stats.attack_speed;
        let origin = tower.position;
        let blast_radius = tower.modifiers.area_radius;

        out_events.push(Event::TowerAttacked {
            tower: attack.tower,
            target,
            kind: attack.kind,
            critical: attack.critical,
            hits: u32::try_from(attack.hits.len()).unwrap_or(u32::MAX),
        });

        let mut chain_from = origin;
        for (index, hit) in attack.hits.iter().enumerate() {
            let Some(enemy) = self.enemies.get_mut(hit.enemy) else {
                continue;
            };
            let position = enemy.position;
            enemy.health -= hit.damage;
            let remaining_health = enemy.health;
            out_events.push(Event::EnemyDamaged {
                enemy: hit.enemy,
                damage: hit.damage,
                remaining_health,
            });

            match attack.kind {
                AttackKind::Plain => self.effects.projectile(origin, position, attack.critical),
                AttackKind::Area if index == 0 => {
                    self.effects.blast(position, blast_radius, attack.critical);
                }
                AttackKind::Area => {}
                AttackKind::Chain => {
                    self.effects.chain_arc(chain_from, position, attack.critical);
                    chain_from = position;
                }
            }

            if remaining_health <= 0.0 {
                self.defeat(hit.enemy, out_events);
            }
        }

        if let Some(duration) = attack.stun {
            if let Some(enemy) = self.enemies.get_mut(target) {
                enemy.stun_remaining = enemy.stun_remaining.max(duration);
                out_events.push(Event::EnemyStunned {
                    enemy: target,
                    duration,
                });
            }
        }
    }

    fn place_tower(&mut self, cell: CellCoord) -> Result<TowerId, PlacementError> {
        let kind = self.map.kind_at(cell).ok_or(PlacementError::OutOfBounds)?;
        if kind == TileKind::Occupied || self.towers.tower_at(cell).is_some() {
            return Err(PlacementError::Occupied);
        }
        if !kind.is_buildable() {
            return Err(PlacementError::NotBuildable);
        }
        if !self.economy.try_spend(self.config.tower_cost) {
            return Err(PlacementError::InsufficientFunds);
        }

        let _ = self.map.set_kind(cell, TileKind::Occupied);
        let position = self.map.cell_center(cell);
        Ok(self.towers.insert(cell, position, self.config.tower_stats))
    }

    fn apply_upgrade(&mut self, tower: TowerId, upgrade: UpgradeId) -> Result<(), UpgradeError> {
        let state = self
            .towers
            .get_mut(tower)
            .ok_or(UpgradeError::MissingTower)?;
        state.upgrades.check(upgrade)?;
        if !self.economy.try_spend(upgrade.cost()) {
            return Err(UpgradeError::InsufficientFunds);
        }

        let _ = state.upgrades.insert(upgrade);
        upgrade.apply(&mut state.stats, &mut state.modifiers);
        Ok(())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureMap { map } => {
            let (columns, rows) = (map.columns(), map.rows());
            world.reset_session();
            world.map = map;
            out_events.push(Event::MapConfigured { columns, rows });
        }
        Command::ResetSession => {
            world.reset_session();
            out_events.push(Event::SessionReset);
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.elapsed = world.elapsed.saturating_add(dt);
            world.towers.tick(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::OpenWave { wave, path } => {
            let Some(spawn_point) = path.first().filter(|_| path.is_traversable()) else {
                out_events.push(Event::WaveOpenRejected {
                    wave,
                    reason: PathError::TooShort {
                        points: u32::try_from(path.len()).unwrap_or(u32::MAX),
                    },
                });
                return;
            };
            let _ = world.waves.insert(wave, WaveRecord { path });
            out_events.push(Event::WaveOpened { wave, spawn_point });
        }
        Command::SpawnEnemy { wave, blueprint } => {
            let Some(spawn_point) = world.waves.get(&wave).and_then(|record| record.path.first())
            else {
                out_events.push(Event::EnemySpawnRejected {
                    wave,
                    blueprint,
                    reason: SpawnError::UnknownWave,
                });
                return;
            };

            match world.enemies.activate(wave, blueprint, spawn_point) {
                Some(enemy) => out_events.push(Event::EnemySpawned {
                    enemy,
                    wave,
                    position: spawn_point,
                }),
                None => {
                    log::warn!(
                        "enemy pool exhausted ({} slots), deferring spawn for wave {}",
                        world.enemies.capacity(),
                        wave.get()
                    );
                    out_events.push(Event::EnemySpawnRejected {
                        wave,
                        blueprint,
                        reason: SpawnError::PoolExhausted,
                    });
                }
            }
        }
        Command::MoveEnemy { enemy, motion } => {
            let Some(state) = world.enemies.get_mut(enemy) else {
                return;
            };
            state.apply_motion(&motion);

            if state.health <= 0.0 {
                world.defeat(enemy, out_events);
            } else if motion.reached_end {
                world.leak(enemy, out_events);
            }
        }
        Command::ResolveAttack { attack } => world.resolve_attack(attack, out_events),
        Command::AdvanceEffects { dt } => world.effects.advance(dt),
        Command::CloseWave { wave } => {
            if world.waves.remove(&wave).is_some() {
                log::debug!("wave {} closed", wave.get());
                out_events.push(Event::WaveClosed { wave });
            }
        }
        Command::ClearWave { wave } => {
            let removed = world.enemies.clear_wave(wave);
            let _ = world.waves.remove(&wave);
            out_events.push(Event::WaveCleared { wave, removed });
        }
        Command::PlaceTower { cell } => match world.place_tower(cell) {
            Ok(tower) => out_events.push(Event::TowerPlaced { tower, cell }),
            Err(reason) => out_events.push(Event::TowerPlacementRejected { cell, reason }),
        },
        Command::RemoveTower { tower } => match world.towers.remove(tower) {
            Some(state) => {
                let _ = world.map.set_kind(state.cell, TileKind::Ground);
                out_events.push(Event::TowerRemoved {
                    tower,
                    cell: state.cell,
                });
            }
            None => out_events.push(Event::TowerRemovalRejected {
                tower,
                reason: RemovalError::MissingTower,
            }),
        },
        Command::ApplyUpgrade { tower, upgrade } => match world.apply_upgrade(tower, upgrade) {
            Ok(()) => out_events.push(Event::UpgradeApplied { tower, upgrade }),
            Err(reason) => out_events.push(Event::UpgradeRejected {
                tower,
                upgrade,
                reason,
            }),
        },
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use tile_defence_core::{
        CellCoord, EconomySnapshot, EffectSnapshot, EnemyId, EnemySnapshot, EnemyView, Path,
        TileMap, TowerId, TowerView, WaveCensus, WaveNumber,
    };

    /// Provides read-only access to the world's tile map.
    #[must_use]
    pub fn map(world: &World) -> &TileMap {
        &world.map
    }

    /// Captures a read-only view of the active enemies in pool-slot order.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(world.enemies.iter().map(|enemy| enemy.snapshot()).collect())
    }

    /// Snapshot of a single active enemy.
    #[must_use]
    pub fn enemy(world: &World, id: EnemyId) -> Option<EnemySnapshot> {
        world.enemies.get(id).map(|enemy| enemy.snapshot())
    }

    /// Captures a read-only view of every tower, newest first.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(world.towers.iter().map(|tower| tower.snapshot()).collect())
    }

    /// Identifier of the tower standing on the provided cell, if any.
    #[must_use]
    pub fn tower_at(world: &World, cell: CellCoord) -> Option<TowerId> {
        world.towers.tower_at(cell)
    }

    /// Path registered for an open wave.
    #[must_use]
    pub fn wave_path(world: &World, wave: WaveNumber) -> Option<&Path> {
        world.waves.get(&wave).map(|record| &record.path)
    }

    /// Waves whose path record is still registered, in ascending order.
    #[must_use]
    pub fn open_waves(world: &World) -> Vec<WaveNumber> {
        world.waves.keys().copied().collect()
    }

    /// Counts active enemies per wave.
    #[must_use]
    pub fn wave_census(world: &World) -> WaveCensus {
        WaveCensus::from_waves(world.enemies.iter().map(|enemy| enemy.wave))
    }

    /// Number of active enemies.
    #[must_use]
    pub fn active_enemy_count(world: &World) -> usize {
        world.enemies.active_count()
    }

    /// Number of enemy pool slots.
    #[must_use]
    pub fn pool_capacity(world: &World) -> usize {
        world.enemies.capacity()
    }

    /// Current currency and lives.
    #[must_use]
    pub fn economy(world: &World) -> EconomySnapshot {
        world.economy.snapshot()
    }

    /// Live visual effects in slot order.
    #[must_use]
    pub fn effects(world: &World) -> Vec<EffectSnapshot> {
        world.effects.snapshots()
    }

    /// Reports whether the session ran out of lives.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.game_over
    }

    /// Simulated time accumulated since the session started.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Number of ticks processed since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Reports whether the player can currently afford a tower.
    #[must_use]
    pub fn can_afford_tower(world: &World) -> bool {
        world.economy.can_afford(world.config.tower_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_defence_core::{EnemyBlueprint, EnemyMotion, Hit};

    fn strip_map() -> TileMap {
        let rows: [&[u8]; 3] = [&[0, 0, 0, 0], &[1, 1, 1, 1], &[0, 2, 0, 0]];
        TileMap::from_rows(10.0, &rows).expect("map")
    }

    fn strip_path() -> Path {
        Path::from_points(vec![
            Vec2::new(5.0, 15.0),
            Vec2::new(15.0, 15.0),
            Vec2::new(25.0, 15.0),
            Vec2::new(35.0, 15.0),
        ])
    }

    fn world_with_wave(config: WorldConfig) -> World {
        let mut world = World::new(config, strip_map());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::OpenWave {
                wave: WaveNumber::FIRST,
                path: strip_path(),
            },
            &mut events,
        );
        world
    }

    fn spawn(world: &mut World, health: f32) -> EnemyId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnEnemy {
                wave: WaveNumber::FIRST,
                blueprint: EnemyBlueprint::new(health, 20.0, 10),
            },
            &mut events,
        );
        match events.as_slice() {
            [Event::EnemySpawned { enemy, .. }] => *enemy,
            other => panic!("unexpected events {other:?}"),
        }
    }

    fn arrival() -> EnemyMotion {
        EnemyMotion {
            segment: 3,
            progress: 0.0,
            position: Vec2::new(35.0, 15.0),
            stun_remaining: Duration::ZERO,
            animation: Default::default(),
            reached_end: true,
        }
    }

    #[test]
    fn open_wave_rejects_single_point_paths() {
        let mut world = World::new(WorldConfig::default(), strip_map());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::OpenWave {
                wave: WaveNumber::FIRST,
                path: Path::from_points(vec![Vec2::ZERO]),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::WaveOpenRejected {
                wave: WaveNumber::FIRST,
                reason: PathError::TooShort { points: 1 },
            }]
        );
        assert!(query::open_waves(&world).is_empty());
    }

    #[test]
    fn spawn_for_unknown_wave_is_rejected() {
        let mut world = World::new(WorldConfig::default(), strip_map());
        let mut events = Vec::new();
        let blueprint = EnemyBlueprint::new(10.0, 10.0, 1);
        apply(
            &mut world,
            Command::SpawnEnemy {
                wave: WaveNumber::new(4),
                blueprint,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::EnemySpawnRejected {
                wave: WaveNumber::new(4),
                blueprint,
                reason: SpawnError::UnknownWave,
            }]
        );
    }

    #[test]
    fn spawn_beyond_capacity_reports_exhaustion() {
        let mut world = world_with_wave(WorldConfig::default().with_pool_capacity(1));
        let _ = spawn(&mut world, 50.0);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnEnemy {
                wave: WaveNumber::FIRST,
                blueprint: EnemyBlueprint::new(50.0, 20.0, 10),
            },
            &mut events,
        );
        assert!(matches!(
            events.as_slice(),
            [Event::EnemySpawnRejected {
                reason: SpawnError::PoolExhausted,
                ..
            }]
        ));
        assert_eq!(query::active_enemy_count(&world), 1);
    }

    #[test]
    fn leaking_costs_a_life_and_eventually_ends_the_session() {
        let mut world = world_with_wave(WorldConfig::default().with_starting_lives(2));

        for expected_lives in [1, 0] {
            let enemy = spawn(&mut world, 50.0);
            let mut events = Vec::new();
            apply(
                &mut world,
                Command::MoveEnemy {
                    enemy,
                    motion: arrival(),
                },
                &mut events,
            );
            assert!(events.contains(&Event::EnemyLeaked {
                enemy,
                wave: WaveNumber::FIRST,
                lives_remaining: expected_lives,
            }));
        }

        assert!(query::is_game_over(&world));
        assert_eq!(query::economy(&world).lives, 0);
        assert_eq!(query::active_enemy_count(&world), 0);
    }

    #[test]
    fn defeated_enemy_reaching_the_end_is_not_a_leak() {
        let mut world = world_with_wave(WorldConfig::default());
        let enemy = spawn(&mut world, 0.0);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveEnemy {
                enemy,
                motion: arrival(),
            },
            &mut events,
        );

        assert!(matches!(
            events.as_slice(),
            [Event::EnemyDefeated { reward: 10, .. }]
        ));
        let economy = query::economy(&world);
        assert_eq!(economy.lives, 20);
        assert_eq!(economy.currency, 110);
    }

    #[test]
    fn stale_handles_are_ignored() {
        let mut world = world_with_wave(WorldConfig::default());
        let enemy = spawn(&mut world, 50.0);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ClearWave {
                wave: WaveNumber::FIRST,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::WaveCleared {
                wave: WaveNumber::FIRST,
                removed: 1,
            }]
        );

        events.clear();
        apply(
            &mut world,
            Command::MoveEnemy {
                enemy,
                motion: arrival(),
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert_eq!(query::economy(&world).lives, 20);
    }

    #[test]
    fn placement_checks_bounds_occupancy_terrain_and_funds_in_order() {
        let mut world = World::new(
            WorldConfig::default().with_starting_currency(60),
            strip_map(),
        );
        let mut events = Vec::new();

        let requests = [
            CellCoord::new(9, 9),
            CellCoord::new(0, 1),
            CellCoord::new(1, 2),
            CellCoord::new(0, 0),
            CellCoord::new(0, 0),
            CellCoord::new(2, 0),
        ];
        for cell in requests {
            apply(&mut world, Command::PlaceTower { cell }, &mut events);
        }

        let outcomes: Vec<Result<(), PlacementError>> = events
            .iter()
            .map(|event| match event {
                Event::TowerPlaced { .. } => Ok(()),
                Event::TowerPlacementRejected { reason, .. } => Err(*reason),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(
            outcomes,
            vec![
                Err(PlacementError::OutOfBounds),
                Err(PlacementError::NotBuildable),
                Err(PlacementError::NotBuildable),
                Ok(()),
                Err(PlacementError::Occupied),
                Err(PlacementError::InsufficientFunds),
            ]
        );
        assert_eq!(query::economy(&world).currency, 10);
        assert_eq!(
            query::map(&world).kind_at(CellCoord::new(0, 0)),
            Some(TileKind::Occupied)
        );
    }

    #[test]
    fn removal_frees_the_tile_without_refund() {
        let mut world = World::new(WorldConfig::default(), strip_map());
        let mut events = Vec::new();
        let cell = CellCoord::new(3, 0);
        apply(&mut world, Command::PlaceTower { cell }, &mut events);
        let tower = query::tower_at(&world, cell).expect("tower");

        apply(&mut world, Command::RemoveTower { tower }, &mut events);
        apply(&mut world, Command::RemoveTower { tower }, &mut events);

        assert_eq!(
            &events[1..],
            &[
                Event::TowerRemoved { tower, cell },
                Event::TowerRemovalRejected {
                    tower,
                    reason: RemovalError::MissingTower,
                },
            ]
        );
        assert_eq!(query::map(&world).kind_at(cell), Some(TileKind::Ground));
        assert_eq!(query::economy(&world).currency, 50);
    }

    #[test]
    fn upgrades_charge_currency_and_respect_branches() {
        let mut world = World::new(
            WorldConfig::default().with_starting_currency(190),
            strip_map(),
        );
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTower {
                cell: CellCoord::new(0, 0),
            },
            &mut events,
        );
        let tower = query::tower_at(&world, CellCoord::new(0, 0)).expect("tower");
        events.clear();

        for upgrade in [UpgradeId::AreaBlast, UpgradeId::ChainLightning, UpgradeId::Stun] {
            apply(
                &mut world,
                Command::ApplyUpgrade { tower, upgrade },
                &mut events,
            );
        }

        assert_eq!(
            events,
            vec![
                Event::UpgradeApplied {
                    tower,
                    upgrade: UpgradeId::AreaBlast,
                },
                Event::UpgradeRejected {
                    tower,
                    upgrade: UpgradeId::ChainLightning,
                    reason: UpgradeError::BranchLocked,
                },
                Event::UpgradeRejected {
                    tower,
                    upgrade: UpgradeId::Stun,
                    reason: UpgradeError::InsufficientFunds,
                },
            ]
        );
        let snapshot = query::tower_view(&world).into_vec().remove(0);
        assert_eq!(snapshot.modifiers.area_radius, 50.0);
        assert_eq!(query::economy(&world).currency, 60);
    }

    #[test]
    fn attack_sets_cooldown_and_defeats_enemies() {
        let mut world = world_with_wave(WorldConfig::default());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTower {
                cell: CellCoord::new(1, 0),
            },
            &mut events,
        );
        let tower = query::tower_at(&world, CellCoord::new(1, 0)).expect("tower");
        let sturdy = spawn(&mut world, 100.0);
        let fragile = spawn(&mut world, 20.0);
        events.clear();

        apply(
            &mut world,
            Command::ResolveAttack {
                attack: Attack {
                    tower,
                    kind: AttackKind::Area,
                    critical: false,
                    stun: Some(Duration::from_secs(1)),
                    hits: vec![
                        Hit {
                            enemy: sturdy,
                            damage: 25.0,
                        },
                        Hit {
                            enemy: fragile,
                            damage: 25.0,
                        },
                    ],
                },
            },
            &mut events,
        );

        assert!(events.contains(&Event::EnemyDefeated {
            enemy: fragile,
            wave: WaveNumber::FIRST,
            reward: 10,
            sound: DefeatSound::new(0),
        }));
        assert!(events.contains(&Event::EnemyStunned {
            enemy: sturdy,
            duration: Duration::from_secs(1),
        }));
        let survivor = query::enemy(&world, sturdy).expect("alive");
        assert_eq!(survivor.health, 75.0);
        assert!(survivor.is_stunned());
        assert_eq!(query::active_enemy_count(&world), 1);
        assert!(!query::tower_view(&world).into_vec()[0].is_ready());
        assert_eq!(query::effects(&world).len(), 1);
    }

    #[test]
    fn tick_counts_cooldowns_down() {
        let mut world = world_with_wave(WorldConfig::default());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTower {
                cell: CellCoord::new(1, 0),
            },
            &mut events,
        );
        let tower = query::tower_at(&world, CellCoord::new(1, 0)).expect("tower");
        let enemy = spawn(&mut world, 100.0);
        apply(
            &mut world,
            Command::ResolveAttack {
                attack: Attack {
                    tower,
                    kind: AttackKind::Plain,
                    critical: false,
                    stun: None,
                    hits: vec![Hit {
                        enemy,
                        damage: 25.0,
                    }],
                },
            },
            &mut events,
        );

        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(600),
            },
            &mut events,
        );
        assert_eq!(
            query::tower_view(&world).into_vec()[0].cooldown,
            Duration::from_millis(400)
        );
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(600),
            },
            &mut events,
        );
        assert!(query::tower_view(&world).into_vec()[0].is_ready());
        assert_eq!(query::tick_index(&world), 2);
        assert_eq!(query::elapsed(&world), Duration::from_millis(1200));
    }

    #[test]
    fn reset_session_restores_economy_and_tiles() {
        let mut world = world_with_wave(WorldConfig::default());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTower {
                cell: CellCoord::new(0, 0),
            },
            &mut events,
        );
        let _ = spawn(&mut world, 100.0);

        events.clear();
        apply(&mut world, Command::ResetSession, &mut events);

        assert_eq!(events, vec![Event::SessionReset]);
        assert_eq!(query::active_enemy_count(&world), 0);
        assert!(query::open_waves(&world).is_empty());
        assert!(query::tower_view(&world).is_empty());
        assert_eq!(query::economy(&world).currency, 100);
        assert_eq!(
            query::map(&world).kind_at(CellCoord::new(0, 0)),
            Some(TileKind::Ground)
        );
    }
}
