#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave scheduler that drives enemy waves from countdown to completion.
//!
//! The scheduler owns every wave that has been launched plus a small
//! look-ahead queue of waves built in advance. Each tick it counts pending
//! waves down, asks active waves for their next enemy and launches the next
//! wave once the inter-wave timer elapses. Spawn outcomes reported by the
//! world are fed back through [`WaveScheduler::acknowledge`], and finished
//! waves are closed by [`WaveScheduler::reap`].

mod wave;

use std::time::Duration;

use thiserror::Error;
use tile_defence_core::{
    CellCoord, Command, Event, Path, PathError, SpawnError, TileMap, WaveCensus, WaveNumber,
};
use tile_defence_system_path_tracing::PathTracer;

pub use wave::{EnemyQueue, Wave, WavePhase, WaveQueue, WaveTuning};

const DEFAULT_COUNTDOWN: Duration = Duration::from_secs(10);
const DEFAULT_SPAWN_DELAY: Duration = Duration::from_millis(1500);
const DEFAULT_NEXT_WAVE_DELAY: Duration = Duration::from_secs(20);
const DEFAULT_LOOK_AHEAD: usize = 1;

/// Failures that stop a wave or the whole session from proceeding.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// The entry cell does not produce a usable path.
    #[error("wave path is unusable: {0}")]
    Path(#[from] PathError),
    /// The world refused to register the wave's path.
    #[error("wave {wave} was rejected by the world: {reason}")]
    WaveRejected {
        /// Wave that was aborted.
        wave: WaveNumber,
        /// Reason reported by the world.
        reason: PathError,
    },
    /// The world does not know the wave an enemy was spawned for.
    #[error("wave {wave} is unknown to the world")]
    UnknownWave {
        /// Wave that was aborted.
        wave: WaveNumber,
    },
    /// The wave's enemy queue could not be allocated.
    #[error("wave {wave} could not be allocated")]
    AllocationFailed {
        /// Wave that could not be built.
        wave: WaveNumber,
    },
}

/// Configuration parameters required to construct the wave scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    countdown: Duration,
    spawn_delay: Duration,
    next_wave_delay: Duration,
    look_ahead: usize,
    rng_seed: u64,
    tuning: WaveTuning,
}

impl Config {
    /// Creates a configuration with the default cadence and the provided seed.
    #[must_use]
    pub fn new(rng_seed: u64) -> Self {
        Self {
            countdown: DEFAULT_COUNTDOWN,
            spawn_delay: DEFAULT_SPAWN_DELAY,
            next_wave_delay: DEFAULT_NEXT_WAVE_DELAY,
            look_ahead: DEFAULT_LOOK_AHEAD,
            rng_seed,
            tuning: WaveTuning::default(),
        }
    }

    /// Overrides the countdown that precedes a wave's first spawn.
    #[must_use]
    pub const fn with_countdown(mut self, countdown: Duration) -> Self {
        self.countdown = countdown;
        self
    }

    /// Overrides the delay between consecutive spawns of a wave.
    #[must_use]
    pub const fn with_spawn_delay(mut self, spawn_delay: Duration) -> Self {
        self.spawn_delay = spawn_delay;
        self
    }

    /// Overrides the delay between a wave's activation and the next launch.
    #[must_use]
    pub const fn with_next_wave_delay(mut self, delay: Duration) -> Self {
        self.next_wave_delay = delay;
        self
    }

    /// Overrides how many waves are built ahead of time.
    #[must_use]
    pub const fn with_look_ahead(mut self, look_ahead: usize) -> Self {
        self.look_ahead = look_ahead;
        self
    }

    /// Overrides the strength curve.
    #[must_use]
    pub const fn with_tuning(mut self, tuning: WaveTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Delay between consecutive spawns of a wave.
    #[must_use]
    pub const fn spawn_delay(&self) -> Duration {
        self.spawn_delay
    }
}

/// Pure system that schedules waves and emits spawn commands.
#[derive(Debug)]
pub struct WaveScheduler {
    config: Config,
    tracer: PathTracer,
    path: Option<Path>,
    waves: Vec<Wave>,
    upcoming: WaveQueue,
    next_number: WaveNumber,
    next_wave_in: Option<Duration>,
    completed: u32,
}

impl WaveScheduler {
    /// Creates an idle scheduler using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tracer: PathTracer::new(),
            path: None,
            waves: Vec::new(),
            upcoming: WaveQueue::default(),
            next_number: WaveNumber::FIRST,
            next_wave_in: None,
            completed: 0,
        }
    }

    /// Traces the wave path from `entry` and launches the first wave.
    ///
    /// Any previously scheduled waves are discarded.
    pub fn begin(
        &mut self,
        map: &TileMap,
        entry: CellCoord,
        out: &mut Vec<Command>,
    ) -> Result<WaveNumber, SchedulerError> {
        self.reset();

        let path = self.tracer.trace(map, entry)?;
        if !path.is_traversable() {
            let points = u32::try_from(path.len()).unwrap_or(u32::MAX);
            log::error!("path from {entry} holds {points} point(s), waves cannot start");
            return Err(PathError::TooShort { points }.into());
        }
        self.path = Some(path);

        let first = self.build_next()?;
        let number = first.number();
        self.launch(first, out);
        self.fill_look_ahead();
        log::info!("wave {} launched from {entry}", number);
        Ok(number)
    }

    /// Consumes world events and emits wave and spawn commands.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        let mut dt = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt: step } = event {
                dt = dt.saturating_add(*step);
            }
        }
        if dt.is_zero() || self.path.is_none() {
            return;
        }

        let spawn_delay = self.config.spawn_delay;
        let mut activated = false;
        for wave in &mut self.waves {
            if wave.count_down(dt) {
                log::info!("wave {} is active", wave.number());
                activated = true;
                continue;
            }
            if let Some(blueprint) = wave.poll_spawn(dt, spawn_delay) {
                out.push(Command::SpawnEnemy {
                    wave: wave.number(),
                    blueprint,
                });
            }
        }

        if activated {
            self.next_wave_in = Some(self.config.next_wave_delay);
            return;
        }

        let Some(remaining) = self.next_wave_in else {
            return;
        };
        let remaining = remaining.saturating_sub(dt);
        if !remaining.is_zero() {
            self.next_wave_in = Some(remaining);
            return;
        }

        self.next_wave_in = None;
        self.fill_look_ahead();
        if let Some(next) = self.upcoming.dequeue() {
            log::info!("wave {} launched", next.number());
            self.launch(next, out);
            self.fill_look_ahead();
        }
    }

    /// Applies the world's responses to previously emitted commands.
    ///
    /// Deferred spawns are re-queued at the head of their wave. Waves the
    /// world refuses are aborted and reported as errors.
    pub fn acknowledge(&mut self, events: &[Event]) -> Result<(), SchedulerError> {
        let spawn_delay = self.config.spawn_delay;
        let mut failure = None;

        for event in events {
            match event {
                Event::EnemySpawned { wave, .. } => {
                    if let Some(record) = self.wave_mut(*wave) {
                        record.confirm_spawn();
                    }
                }
                Event::EnemySpawnRejected {
                    wave,
                    blueprint,
                    reason: SpawnError::PoolExhausted,
                } => {
                    if let Some(record) = self.wave_mut(*wave) {
                        log::debug!("spawn for wave {} deferred", wave);
                        record.defer_spawn(*blueprint, spawn_delay);
                    }
                }
                Event::EnemySpawnRejected {
                    wave,
                    reason: SpawnError::UnknownWave,
                    ..
                } => {
                    log::error!("world has no record of wave {}, aborting it", wave);
                    self.abort(*wave);
                    failure = Some(SchedulerError::UnknownWave { wave: *wave });
                }
                Event::WaveOpenRejected { wave, reason } => {
                    log::error!("wave {} rejected: {reason}", wave);
                    self.abort(*wave);
                    failure = Some(SchedulerError::WaveRejected {
                        wave: *wave,
                        reason: *reason,
                    });
                }
                _ => {}
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Closes every wave whose enemies were all spawned and resolved.
    pub fn reap(&mut self, census: &WaveCensus, out: &mut Vec<Command>) {
        let mut finished = 0;
        for wave in &mut self.waves {
            if wave.try_finish(census) {
                log::info!("wave {} finished", wave.number());
                out.push(Command::CloseWave {
                    wave: wave.number(),
                });
                finished += 1;
            }
        }

        if finished > 0 {
            self.completed = self.completed.saturating_add(finished);
            self.waves
                .retain(|wave| wave.phase() != WavePhase::Finished);
        }
    }

    /// Drops a wave's remaining enemies and asks the world to clear the rest.
    pub fn force_clear(&mut self, wave: WaveNumber, out: &mut Vec<Command>) {
        if let Some(record) = self.wave_mut(wave) {
            record.drain();
        }
        self.waves.retain(|record| record.number() != wave);
        out.push(Command::ClearWave { wave });
    }

    /// Discards every wave and returns to the idle state.
    pub fn reset(&mut self) {
        self.path = None;
        self.waves.clear();
        self.upcoming.clear();
        self.next_number = WaveNumber::FIRST;
        self.next_wave_in = None;
        self.completed = 0;
    }

    /// Launched waves that have not finished yet, oldest first.
    pub fn waves(&self) -> impl Iterator<Item = &Wave> {
        self.waves.iter()
    }

    /// Looks up a launched wave.
    #[must_use]
    pub fn wave(&self, number: WaveNumber) -> Option<&Wave> {
        self.waves.iter().find(|wave| wave.number() == number)
    }

    /// Waves built ahead of time, in launch order.
    #[must_use]
    pub fn upcoming(&self) -> &WaveQueue {
        &self.upcoming
    }

    /// Time left before the next wave launches, if the timer is armed.
    #[must_use]
    pub const fn next_wave_in(&self) -> Option<Duration> {
        self.next_wave_in
    }

    /// Number of waves closed since the session began.
    #[must_use]
    pub const fn completed_waves(&self) -> u32 {
        self.completed
    }

    /// Path shared by every wave of the session.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    fn wave_mut(&mut self, number: WaveNumber) -> Option<&mut Wave> {
        self.waves.iter_mut().find(|wave| wave.number() == number)
    }

    fn abort(&mut self, number: WaveNumber) {
        self.waves.retain(|wave| wave.number() != number);
    }

    fn launch(&mut self, wave: Wave, out: &mut Vec<Command>) {
        out.push(Command::OpenWave {
            wave: wave.number(),
            path: wave.path().clone(),
        });
        self.waves.push(wave);
    }

    fn build_next(&mut self) -> Result<Wave, SchedulerError> {
        let number = self.next_number;
        let path = self.path.clone().unwrap_or_default();
        let wave = Wave::build(
            number,
            path,
            &self.config.tuning,
            self.config.countdown,
            self.config.rng_seed,
        )
        .ok_or(SchedulerError::AllocationFailed { wave: number })?;
        self.next_number = number.next();
        Ok(wave)
    }

    fn fill_look_ahead(&mut self) {
        while self.upcoming.len() < self.config.look_ahead {
            match self.build_next() {
                Ok(wave) => self.upcoming.enqueue(wave),
                Err(error) => {
                    log::warn!("look-ahead stopped: {error}");
                    break;
                }
            }
        }
    }
}
