//! TOML scenario files describing a headless session.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tile_defence_core::{CellCoord, TileMap, UpgradeId};
use tile_defence_system_wave_scheduler::{Config as SchedulerConfig, WaveTuning};
use tile_defence_world::WorldConfig;

/// Session description loaded from a scenario file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    seed: u64,
    map: MapSection,
    entry: CellCoord,
    #[serde(default)]
    economy: EconomySection,
    #[serde(default)]
    waves: WavesSection,
    #[serde(default)]
    towers: Vec<TowerPlan>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MapSection {
    tile_length: f32,
    rows: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EconomySection {
    currency: Option<u32>,
    lives: Option<u32>,
    tower_cost: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WavesSection {
    countdown_ms: Option<u64>,
    spawn_delay_ms: Option<u64>,
    next_wave_delay_ms: Option<u64>,
    look_ahead: Option<usize>,
    count: Option<Curve<u32>>,
    health: Option<Curve<f32>>,
    reward: Option<Curve<u32>>,
    speed: Option<SpeedCurve>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Curve<T> {
    base: T,
    step: T,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpeedCurve {
    min: f32,
    max: f32,
    step: f32,
}

/// Tower placed before the first wave, along with the upgrades bought for it.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TowerPlan {
    column: u32,
    row: u32,
    #[serde(default)]
    upgrades: Vec<UpgradeId>,
}

impl TowerPlan {
    /// Cell the tower is built on.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        CellCoord::new(self.column, self.row)
    }

    /// Upgrades purchased for the tower, in order.
    #[must_use]
    pub fn upgrades(&self) -> &[UpgradeId] {
        &self.upgrades
    }
}

impl Scenario {
    /// Reads and parses the scenario stored at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario at {}", path.display()))
    }

    /// Parses scenario TOML contents.
    pub fn parse(contents: &str) -> Result<Self> {
        let scenario: Self =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        let tile_length = scenario.map.tile_length;
        if tile_length.is_nan() || tile_length <= 0.0 {
            bail!("tile length must be positive, found {tile_length}");
        }
        if scenario.map.rows.is_empty() {
            bail!("scenario map has no rows");
        }
        if let Some(speed) = scenario.waves.speed {
            if speed.min > speed.max {
                bail!("speed range {}..{} is inverted", speed.min, speed.max);
            }
        }
        Ok(scenario)
    }

    /// Seed used when the command line does not provide one.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Cell the wave path is traced from.
    #[must_use]
    pub const fn entry(&self) -> CellCoord {
        self.entry
    }

    /// Towers to build before the first wave.
    #[must_use]
    pub fn towers(&self) -> &[TowerPlan] {
        &self.towers
    }

    /// Builds the tile map described by the scenario.
    pub fn tile_map(&self) -> Result<TileMap> {
        TileMap::from_rows(self.map.tile_length, &self.map.rows)
            .context("scenario map is malformed")
    }

    /// World configuration with the scenario's economy overrides applied.
    #[must_use]
    pub fn world_config(&self) -> WorldConfig {
        let mut config = WorldConfig::default();
        if let Some(currency) = self.economy.currency {
            config = config.with_starting_currency(currency);
        }
        if let Some(lives) = self.economy.lives {
            config = config.with_starting_lives(lives);
        }
        if let Some(cost) = self.economy.tower_cost {
            config = config.with_tower_cost(cost);
        }
        config
    }

    /// Scheduler configuration with the scenario's wave overrides applied.
    #[must_use]
    pub fn scheduler_config(&self, seed: u64) -> SchedulerConfig {
        let waves = &self.waves;
        let mut tuning = WaveTuning::default();
        if let Some(count) = waves.count {
            tuning = tuning.with_count(count.base, count.step);
        }
        if let Some(health) = waves.health {
            tuning = tuning.with_health(health.base, health.step);
        }
        if let Some(reward) = waves.reward {
            tuning = tuning.with_reward(reward.base, reward.step);
        }
        if let Some(speed) = waves.speed {
            tuning = tuning.with_speed(speed.min, speed.max, speed.step);
        }

        let mut config = SchedulerConfig::new(seed).with_tuning(tuning);
        if let Some(ms) = waves.countdown_ms {
            config = config.with_countdown(Duration::from_millis(ms));
        }
        if let Some(ms) = waves.spawn_delay_ms {
            config = config.with_spawn_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = waves.next_wave_delay_ms {
            config = config.with_next_wave_delay(Duration::from_millis(ms));
        }
        if let Some(depth) = waves.look_ahead {
            config = config.with_look_ahead(depth);
        }
        config
    }
}
