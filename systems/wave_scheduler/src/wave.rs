//! Wave state machine and the queues it is built from.

use std::{collections::VecDeque, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use tile_defence_core::{EnemyBlueprint, Path, WaveCensus, WaveNumber};

/// Strength curve that scales enemies with the wave number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveTuning {
    base_count: u32,
    count_step: u32,
    base_health: f32,
    health_step: f32,
    min_speed: f32,
    max_speed: f32,
    speed_step: f32,
    base_reward: u32,
    reward_step: u32,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            base_count: 5,
            count_step: 2,
            base_health: 100.0,
            health_step: 25.0,
            min_speed: 15.0,
            max_speed: 35.0,
            speed_step: 2.0,
            base_reward: 10,
            reward_step: 2,
        }
    }
}

impl WaveTuning {
    /// Overrides the enemy count of the first wave and its per-wave growth.
    #[must_use]
    pub const fn with_count(mut self, base: u32, step: u32) -> Self {
        self.base_count = base;
        self.count_step = step;
        self
    }

    /// Overrides the enemy health of the first wave and its per-wave growth.
    #[must_use]
    pub const fn with_health(mut self, base: f32, step: f32) -> Self {
        self.base_health = base;
        self.health_step = step;
        self
    }

    /// Overrides the first wave's half-open speed range and its per-wave shift.
    #[must_use]
    pub const fn with_speed(mut self, min: f32, max: f32, step: f32) -> Self {
        self.min_speed = min;
        self.max_speed = max;
        self.speed_step = step;
        self
    }

    /// Overrides the kill reward of the first wave and its per-wave growth.
    #[must_use]
    pub const fn with_reward(mut self, base: u32, step: u32) -> Self {
        self.base_reward = base;
        self.reward_step = step;
        self
    }

    /// Number of enemies the wave spawns.
    #[must_use]
    pub fn enemy_count(&self, wave: WaveNumber) -> u32 {
        self.base_count
            .saturating_add(self.count_step.saturating_mul(steps(wave)))
    }

    /// Hit points every enemy of the wave starts with.
    #[must_use]
    pub fn health(&self, wave: WaveNumber) -> f32 {
        self.base_health + self.health_step * steps(wave) as f32
    }

    /// Half-open range enemy speeds of the wave are drawn from.
    #[must_use]
    pub fn speed_range(&self, wave: WaveNumber) -> (f32, f32) {
        let shift = self.speed_step * steps(wave) as f32;
        (self.min_speed + shift, self.max_speed + shift)
    }

    /// Currency awarded for every enemy of the wave.
    #[must_use]
    pub fn reward(&self, wave: WaveNumber) -> u32 {
        self.base_reward
            .saturating_add(self.reward_step.saturating_mul(steps(wave)))
    }
}

fn steps(wave: WaveNumber) -> u32 {
    wave.get().saturating_sub(1)
}

/// Lifecycle phase of a wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WavePhase {
    /// Counting down before the first spawn.
    Pending,
    /// Spawning enemies on the spawn-delay cadence.
    Active,
    /// Every enemy was spawned and resolved.
    Finished,
}

/// FIFO of enemies a wave has not spawned yet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnemyQueue {
    entries: VecDeque<EnemyBlueprint>,
}

impl EnemyQueue {
    /// Removes the next enemy to spawn.
    pub fn dequeue(&mut self) -> Option<EnemyBlueprint> {
        self.entries.pop_front()
    }

    /// Puts an enemy back at the head of the queue.
    pub fn requeue_front(&mut self, blueprint: EnemyBlueprint) {
        self.entries.push_front(blueprint);
    }

    /// Number of enemies left in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether every enemy was dequeued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterator over the queued enemies in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemyBlueprint> {
        self.entries.iter()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Scheduled group of enemies sharing one path and spawn cadence.
#[derive(Clone, Debug)]
pub struct Wave {
    number: WaveNumber,
    path: Path,
    queue: EnemyQueue,
    phase: WavePhase,
    countdown: Duration,
    countdown_elapsed: Duration,
    spawn_timer: Duration,
    to_spawn: u32,
    spawned: u32,
    next_index: u32,
    awaiting: u32,
}

impl Wave {
    /// Builds a wave with its enemies pre-populated from the tuning curve.
    ///
    /// Returns `None` when the enemy queue cannot be allocated.
    #[must_use]
    pub fn build(
        number: WaveNumber,
        path: Path,
        tuning: &WaveTuning,
        countdown: Duration,
        seed: u64,
    ) -> Option<Self> {
        let to_spawn = tuning.enemy_count(number);
        let mut entries = VecDeque::new();
        if let Err(error) = entries.try_reserve_exact(usize::try_from(to_spawn).ok()?) {
            log::warn!(
                "failed to allocate {to_spawn} enemies for wave {}: {error}",
                number.get()
            );
            return None;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(derive_wave_seed(seed, number));
        let health = tuning.health(number);
        let reward = tuning.reward(number);
        let (min_speed, max_speed) = tuning.speed_range(number);
        for _ in 0..to_spawn {
            let speed = if max_speed > min_speed {
                rng.gen_range(min_speed..max_speed)
            } else {
                min_speed
            };
            entries.push_back(EnemyBlueprint::new(health, speed, reward));
        }

        Some(Self {
            number,
            path,
            queue: EnemyQueue { entries },
            phase: WavePhase::Pending,
            countdown,
            countdown_elapsed: Duration::ZERO,
            spawn_timer: Duration::ZERO,
            to_spawn,
            spawned: 0,
            next_index: 0,
            awaiting: 0,
        })
    }

    /// Number identifying the wave.
    #[must_use]
    pub const fn number(&self) -> WaveNumber {
        self.number
    }

    /// Path every enemy of the wave follows.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> WavePhase {
        self.phase
    }

    /// Enemies still waiting to be spawned.
    #[must_use]
    pub fn queue(&self) -> &EnemyQueue {
        &self.queue
    }

    /// Countdown left before the wave starts spawning.
    #[must_use]
    pub fn countdown_remaining(&self) -> Duration {
        self.countdown.saturating_sub(self.countdown_elapsed)
    }

    /// Total number of enemies the wave spawns.
    #[must_use]
    pub const fn enemies_to_spawn(&self) -> u32 {
        self.to_spawn
    }

    /// Number of enemies the world confirmed as spawned.
    #[must_use]
    pub const fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Index of the next enemy to dequeue.
    #[must_use]
    pub const fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Advances the countdown, returning `true` on the tick the wave activates.
    pub(crate) fn count_down(&mut self, dt: Duration) -> bool {
        if self.phase != WavePhase::Pending {
            return false;
        }
        self.countdown_elapsed = self.countdown_elapsed.saturating_add(dt);
        if self.countdown_elapsed < self.countdown {
            return false;
        }
        self.phase = WavePhase::Active;
        self.spawn_timer = Duration::ZERO;
        true
    }

    /// Accumulates the spawn timer and dequeues the next enemy once the
    /// spawn delay elapsed.
    pub(crate) fn poll_spawn(
        &mut self,
        dt: Duration,
        spawn_delay: Duration,
    ) -> Option<EnemyBlueprint> {
        if self.phase != WavePhase::Active || self.queue.is_empty() || self.awaiting > 0 {
            return None;
        }
        self.spawn_timer = self.spawn_timer.saturating_add(dt);
        if self.spawn_timer < spawn_delay {
            return None;
        }

        let blueprint = self.queue.dequeue()?;
        self.spawn_timer = Duration::ZERO;
        self.next_index += 1;
        self.awaiting += 1;
        Some(blueprint)
    }

    pub(crate) fn confirm_spawn(&mut self) {
        self.awaiting = self.awaiting.saturating_sub(1);
        if self.spawned < self.to_spawn {
            self.spawned += 1;
        }
    }

    /// Returns a rejected enemy to the head of the queue and primes the spawn
    /// timer so the retry happens on the next tick.
    pub(crate) fn defer_spawn(&mut self, blueprint: EnemyBlueprint, spawn_delay: Duration) {
        self.awaiting = self.awaiting.saturating_sub(1);
        self.next_index = self.next_index.saturating_sub(1);
        self.queue.requeue_front(blueprint);
        self.spawn_timer = spawn_delay;
    }

    /// Marks the wave finished once every enemy was spawned and resolved.
    pub(crate) fn try_finish(&mut self, census: &WaveCensus) -> bool {
        if self.phase != WavePhase::Active
            || !self.queue.is_empty()
            || self.awaiting > 0
            || census.active_in(self.number) > 0
        {
            return false;
        }
        self.phase = WavePhase::Finished;
        true
    }

    pub(crate) fn drain(&mut self) {
        self.queue.clear();
        self.phase = WavePhase::Finished;
    }
}

/// Look-ahead FIFO of waves that were built but not launched yet.
#[derive(Clone, Debug, Default)]
pub struct WaveQueue {
    waves: VecDeque<Wave>,
}

impl WaveQueue {
    /// Appends a wave at the back of the queue.
    pub fn enqueue(&mut self, wave: Wave) {
        self.waves.push_back(wave);
    }

    /// Transfers ownership of the oldest wave to the caller.
    pub fn dequeue(&mut self) -> Option<Wave> {
        self.waves.pop_front()
    }

    /// Number of waves waiting to launch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waves.len()
    }

    /// Reports whether no wave is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// Iterator over the waiting waves in launch order.
    pub fn iter(&self) -> impl Iterator<Item = &Wave> {
        self.waves.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.waves.clear();
    }
}

fn derive_wave_seed(global_seed: u64, wave: WaveNumber) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(wave.get().to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}
