use std::time::Duration;

use glam::Vec2;
use tile_defence_core::{
    AnimationState, CellCoord, Command, EnemyId, EnemyMotion, Event, TileMap, WaveNumber,
};
use tile_defence_system_wave_scheduler::{
    Config, SchedulerError, WavePhase, WaveScheduler, WaveTuning,
};
use tile_defence_world::{self as world, query, World, WorldConfig};

const FRAME: Duration = Duration::from_millis(100);

struct Session {
    world: World,
    scheduler: WaveScheduler,
}

impl Session {
    fn start(world_config: WorldConfig, config: Config) -> Self {
        let rows: [&[u8]; 2] = [&[1; 10], &[0; 10]];
        let map = TileMap::from_rows(20.0, &rows).expect("map");
        let mut world = World::new(world_config, map);
        let mut scheduler = WaveScheduler::new(config);

        let mut commands = Vec::new();
        let first = scheduler
            .begin(query::map(&world), CellCoord::new(0, 0), &mut commands)
            .expect("first wave");
        assert_eq!(first, WaveNumber::FIRST);

        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
        scheduler.acknowledge(&events).expect("wave opened");
        assert_eq!(query::open_waves(&world), vec![WaveNumber::FIRST]);

        Self { world, scheduler }
    }

    fn frame(&mut self) -> Result<Vec<Event>, SchedulerError> {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt: FRAME }, &mut events);

        let mut commands = Vec::new();
        self.scheduler.handle(&events, &mut commands);
        let mut responses = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut responses);
        }
        self.scheduler.acknowledge(&responses)?;

        let mut closing = Vec::new();
        self.scheduler
            .reap(&query::wave_census(&self.world), &mut closing);
        for command in closing {
            world::apply(&mut self.world, command, &mut responses);
        }

        events.extend(responses);
        Ok(events)
    }

    fn leak(&mut self, enemy: EnemyId) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::MoveEnemy {
                enemy,
                motion: EnemyMotion {
                    segment: 9,
                    progress: 0.0,
                    position: Vec2::new(190.0, 10.0),
                    stun_remaining: Duration::ZERO,
                    animation: AnimationState::default(),
                    reached_end: true,
                },
            },
            &mut events,
        );
        events
    }
}

fn spawned(events: &[Event]) -> Vec<EnemyId> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::EnemySpawned { enemy, .. } => Some(*enemy),
            _ => None,
        })
        .collect()
}

#[test]
fn first_wave_spawns_its_enemies_over_time() {
    let mut session = Session::start(WorldConfig::default(), Config::new(42));

    let mut spawn_times = Vec::new();
    for _ in 0..300 {
        let events = session.frame().expect("frame");
        for _ in spawned(&events) {
            spawn_times.push(query::elapsed(&session.world));
        }
        if spawn_times.len() == 5 {
            break;
        }
    }

    assert_eq!(spawn_times.len(), 5);
    assert!(spawn_times[0] > Duration::from_secs(10));
    assert!(spawn_times[4] >= Duration::from_secs(16));

    let enemies = query::enemy_view(&session.world);
    assert_eq!(enemies.len(), 5);
    for enemy in enemies.iter() {
        assert_eq!(enemy.wave, WaveNumber::FIRST);
        assert_eq!(enemy.health, 100.0);
        assert!((15.0..35.0).contains(&enemy.speed), "speed {}", enemy.speed);
    }

    let wave = session.scheduler.wave(WaveNumber::FIRST).expect("wave");
    assert_eq!(wave.spawned(), 5);
    assert!(wave.queue().is_empty());
}

#[test]
fn exhausted_pool_defers_the_spawn_until_a_slot_frees_up() {
    let config = Config::new(7)
        .with_countdown(Duration::ZERO)
        .with_spawn_delay(FRAME);
    let mut session = Session::start(WorldConfig::default().with_pool_capacity(1), config);

    let mut occupant = None;
    let mut rejected = false;
    for _ in 0..10 {
        let events = session.frame().expect("frame");
        if let Some(enemy) = spawned(&events).first() {
            occupant = Some(*enemy);
        }
        if events
            .iter()
            .any(|event| matches!(event, Event::EnemySpawnRejected { .. }))
        {
            rejected = true;
            break;
        }
    }
    assert!(rejected, "pool never ran out");

    let wave = session.scheduler.wave(WaveNumber::FIRST).expect("wave");
    assert_eq!(wave.spawned(), 1);
    assert_eq!(wave.next_index(), 1);
    assert_eq!(wave.queue().len(), 4);

    let _ = session.leak(occupant.expect("first enemy"));
    let events = session.frame().expect("frame");

    assert_eq!(spawned(&events).len(), 1);
    let wave = session.scheduler.wave(WaveNumber::FIRST).expect("wave");
    assert_eq!(wave.spawned(), 2);
    assert_eq!(wave.queue().len(), 3);
}

#[test]
fn resolved_waves_are_closed_and_counted() {
    let config = Config::new(7)
        .with_countdown(Duration::ZERO)
        .with_spawn_delay(FRAME)
        .with_tuning(WaveTuning::default().with_count(2, 0));
    let mut session = Session::start(WorldConfig::default(), config);

    let mut enemies = Vec::new();
    for _ in 0..10 {
        enemies.extend(spawned(&session.frame().expect("frame")));
        if enemies.len() == 2 {
            break;
        }
    }
    assert_eq!(enemies.len(), 2);
    assert_eq!(
        session.scheduler.wave(WaveNumber::FIRST).map(|wave| wave.phase()),
        Some(WavePhase::Active)
    );

    for enemy in enemies {
        let events = session.leak(enemy);
        assert!(matches!(events.as_slice(), [Event::EnemyLeaked { .. }]));
    }
    let events = session.frame().expect("frame");

    assert!(events.iter().any(|event| matches!(
        event,
        Event::WaveClosed { wave } if *wave == WaveNumber::FIRST
    )));
    assert_eq!(session.scheduler.completed_waves(), 1);
    assert!(session.scheduler.wave(WaveNumber::FIRST).is_none());
    assert!(query::wave_path(&session.world, WaveNumber::FIRST).is_none());
}

#[test]
fn waves_forgotten_by_the_world_are_aborted() {
    let config = Config::new(7)
        .with_countdown(Duration::ZERO)
        .with_spawn_delay(FRAME);
    let mut session = Session::start(WorldConfig::default(), config);

    let mut events = Vec::new();
    world::apply(
        &mut session.world,
        Command::ClearWave {
            wave: WaveNumber::FIRST,
        },
        &mut events,
    );

    let mut failure = None;
    for _ in 0..5 {
        if let Err(error) = session.frame() {
            failure = Some(error);
            break;
        }
    }

    assert_eq!(
        failure,
        Some(SchedulerError::UnknownWave {
            wave: WaveNumber::FIRST
        })
    );
    assert!(session.scheduler.wave(WaveNumber::FIRST).is_none());
}
