#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tile Defence combat simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable views such as [`EnemyView`] and [`TowerView`], and respond
//! exclusively with new command batches.

use std::{fmt, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod upgrades;

pub use upgrades::{UpgradeBranch, UpgradeId, UpgradeSet};

/// Maximum number of waypoints a traced path may hold.
pub const MAX_PATH_POINTS: usize = 100;

/// Number of frames in an enemy's walk cycle.
pub const ANIMATION_FRAMES: u8 = 4;

/// Time each walk-cycle frame stays on screen.
pub const ANIMATION_FRAME_TIME: Duration = Duration::from_millis(150);

/// Damage multiplier applied to every additional chain jump.
pub const CHAIN_DAMAGE_DECAY: f32 = 0.75;

/// Number of distinct defeat sound variants the audio collaborator rotates through.
pub const DEFEAT_SOUND_VARIANTS: u8 = 3;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Installs a new tile map and resets the session around it.
    ConfigureMap {
        /// Tile map supplied by the map collaborator.
        map: TileMap,
    },
    /// Restores the economy and empties every pool, registry and wave record.
    ResetSession,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Registers the path followed by every enemy of a wave.
    OpenWave {
        /// Number of the wave being opened.
        wave: WaveNumber,
        /// Waypoints traced from the wave's entry cell.
        path: Path,
    },
    /// Requests that a queued enemy be placed into a free pool slot.
    SpawnEnemy {
        /// Wave the enemy belongs to.
        wave: WaveNumber,
        /// Attributes the enemy is created with.
        blueprint: EnemyBlueprint,
    },
    /// Publishes the outcome of an enemy's per-frame update.
    MoveEnemy {
        /// Handle of the enemy that moved.
        enemy: EnemyId,
        /// New kinematic state computed for the enemy.
        motion: EnemyMotion,
    },
    /// Applies the damage and effects of a single tower attack.
    ResolveAttack {
        /// Attack resolved by the combat system.
        attack: Attack,
    },
    /// Advances the lifetime of every visual effect.
    AdvanceEffects {
        /// Duration of simulated time that elapsed since the previous advance.
        dt: Duration,
    },
    /// Releases the path record of a wave whose enemies are all resolved.
    CloseWave {
        /// Wave that finished.
        wave: WaveNumber,
    },
    /// Deactivates every enemy of a wave without reward or life loss.
    ClearWave {
        /// Wave being force-cleared.
        wave: WaveNumber,
    },
    /// Requests placement of a tower on the provided cell.
    PlaceTower {
        /// Cell the tower should occupy.
        cell: CellCoord,
    },
    /// Requests removal of an existing tower from the world.
    RemoveTower {
        /// Identifier of the tower targeted for removal.
        tower: TowerId,
    },
    /// Purchases an upgrade for a tower and applies its effect.
    ApplyUpgrade {
        /// Tower receiving the upgrade.
        tower: TowerId,
        /// Upgrade being purchased.
        upgrade: UpgradeId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a new tile map was installed.
    MapConfigured {
        /// Number of tile columns in the installed map.
        columns: u32,
        /// Number of tile rows in the installed map.
        rows: u32,
    },
    /// Confirms that the session state was reset.
    SessionReset,
    /// Confirms that a wave's path was registered.
    WaveOpened {
        /// Wave that opened.
        wave: WaveNumber,
        /// World-space point at which the wave's enemies appear.
        spawn_point: Vec2,
    },
    /// Reports that a wave could not be opened.
    WaveOpenRejected {
        /// Wave that was rejected.
        wave: WaveNumber,
        /// Configuration error that prevents the wave from proceeding.
        reason: PathError,
    },
    /// Confirms that a finished wave released its path record.
    WaveClosed {
        /// Wave that closed.
        wave: WaveNumber,
    },
    /// Confirms that a wave was force-cleared.
    WaveCleared {
        /// Wave that was cleared.
        wave: WaveNumber,
        /// Number of active enemies removed from the pool.
        removed: u32,
    },
    /// Confirms that an enemy was placed into a pool slot.
    EnemySpawned {
        /// Handle assigned to the enemy.
        enemy: EnemyId,
        /// Wave the enemy belongs to.
        wave: WaveNumber,
        /// Position the enemy starts at.
        position: Vec2,
    },
    /// Reports that an enemy could not be placed into the pool.
    EnemySpawnRejected {
        /// Wave the enemy belongs to.
        wave: WaveNumber,
        /// Attributes of the enemy that was not placed.
        blueprint: EnemyBlueprint,
        /// Reason the spawn failed.
        reason: SpawnError,
    },
    /// Reports damage dealt to an enemy.
    EnemyDamaged {
        /// Enemy that took damage.
        enemy: EnemyId,
        /// Amount of damage applied.
        damage: f32,
        /// Hit points left after the damage.
        remaining_health: f32,
    },
    /// Reports that an enemy was stunned.
    EnemyStunned {
        /// Enemy that was stunned.
        enemy: EnemyId,
        /// Stun duration applied.
        duration: Duration,
    },
    /// Reports that an enemy was defeated and its reward paid out.
    EnemyDefeated {
        /// Enemy that was defeated.
        enemy: EnemyId,
        /// Wave the enemy belonged to.
        wave: WaveNumber,
        /// Currency awarded for the kill.
        reward: u32,
        /// Defeat sound variant the audio collaborator should play.
        sound: DefeatSound,
    },
    /// Reports that an enemy reached the end of its path.
    EnemyLeaked {
        /// Enemy that leaked.
        enemy: EnemyId,
        /// Wave the enemy belonged to.
        wave: WaveNumber,
        /// Lives left after the leak.
        lives_remaining: u32,
    },
    /// Reports that a tower fired.
    TowerAttacked {
        /// Tower that fired.
        tower: TowerId,
        /// Primary target of the attack.
        target: EnemyId,
        /// Primary effect resolved by the attack.
        kind: AttackKind,
        /// Indicates whether the attack rolled a critical hit.
        critical: bool,
        /// Number of enemies hit, including the primary target.
        hits: u32,
    },
    /// Confirms that a tower was placed into the world.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Cell occupied by the tower.
        cell: CellCoord,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a tower was removed from the world.
    TowerRemoved {
        /// Identifier of the tower that was removed.
        tower: TowerId,
        /// Cell previously occupied by the tower.
        cell: CellCoord,
    },
    /// Reports that a tower removal request was rejected.
    TowerRemovalRejected {
        /// Identifier of the tower targeted for removal.
        tower: TowerId,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Confirms that an upgrade was purchased and applied.
    UpgradeApplied {
        /// Tower that received the upgrade.
        tower: TowerId,
        /// Upgrade that was applied.
        upgrade: UpgradeId,
    },
    /// Reports that an upgrade purchase was rejected.
    UpgradeRejected {
        /// Tower targeted by the purchase.
        tower: TowerId,
        /// Upgrade that was requested.
        upgrade: UpgradeId,
        /// Specific reason the purchase failed.
        reason: UpgradeError,
    },
    /// Announces that the player ran out of lives.
    GameOver,
}

/// Generation-tagged handle to a slot in the enemy pool.
///
/// A slot's generation advances every time it is reused, so a handle kept
/// after its enemy was deactivated never resolves to the slot's next tenant.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EnemyId {
    slot: u32,
    generation: u32,
}

impl EnemyId {
    /// Creates a new enemy handle from a slot index and generation.
    #[must_use]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Index of the pool slot the enemy occupies.
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation of the slot at the time the handle was issued.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Unique identifier assigned to a tower.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Monotonically increasing number that identifies a wave.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WaveNumber(u32);

impl WaveNumber {
    /// Number assigned to the first wave of a session.
    pub const FIRST: Self = Self(1);

    /// Creates a new wave number wrapper.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the underlying wave number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the number of the wave that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for WaveNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of a single tile expressed as column and row coordinates.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
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

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Classification of a tile code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Open ground that accepts tower placement.
    Ground,
    /// Tile that belongs to an enemy path.
    Path,
    /// Scenery that neither enemies nor towers may use.
    Decoration,
    /// Ground currently holding a tower.
    Occupied,
}

impl TileKind {
    /// Integer code stored in the tile grid for this kind.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Ground => 0,
            Self::Path => 1,
            Self::Decoration => 2,
            Self::Occupied => 3,
        }
    }

    /// Classifies a raw tile code, returning `None` for unknown codes.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Ground),
            1 => Some(Self::Path),
            2 => Some(Self::Decoration),
            3 => Some(Self::Occupied),
            _ => None,
        }
    }

    /// Reports whether a tower may be built on this kind of tile.
    #[must_use]
    pub const fn is_buildable(self) -> bool {
        matches!(self, Self::Ground)
    }
}

/// Fixed-size grid of integer tile codes stored in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMap {
    columns: u32,
    rows: u32,
    tile_length: f32,
    codes: Vec<u8>,
}

impl TileMap {
    /// Creates a map of the provided dimensions filled with buildable ground.
    #[must_use]
    pub fn new(columns: u32, rows: u32, tile_length: f32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            tile_length,
            codes: vec![TileKind::Ground.code(); capacity],
        }
    }

    /// Builds a map from rows of raw tile codes.
    ///
    /// Every row must have the same length as the first one.
    pub fn from_rows<R>(tile_length: f32, rows: &[R]) -> Result<Self, MapError>
    where
        R: AsRef<[u8]>,
    {
        let expected = rows.first().map_or(0, |row| row.as_ref().len());
        let mut codes = Vec::with_capacity(expected * rows.len());

        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != expected {
                return Err(MapError::RaggedRow {
                    row: u32::try_from(index).unwrap_or(u32::MAX),
                    expected: u32::try_from(expected).unwrap_or(u32::MAX),
                    found: u32::try_from(row.len()).unwrap_or(u32::MAX),
                });
            }
            codes.extend_from_slice(row);
        }

        Ok(Self {
            columns: u32::try_from(expected).map_err(|_| MapError::TooLarge)?,
            rows: u32::try_from(rows.len()).map_err(|_| MapError::TooLarge)?,
            tile_length,
            codes,
        })
    }

    /// Number of columns contained in the map.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the map.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a single square tile expressed in world units.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.tile_length
    }

    /// Reports whether the cell lies inside the map.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Raw tile code stored at the provided cell.
    #[must_use]
    pub fn tile_code_at(&self, cell: CellCoord) -> Option<u8> {
        self.index(cell)
            .and_then(|index| self.codes.get(index).copied())
    }

    /// Classified tile kind stored at the provided cell.
    #[must_use]
    pub fn kind_at(&self, cell: CellCoord) -> Option<TileKind> {
        self.tile_code_at(cell).and_then(TileKind::from_code)
    }

    /// Reports whether the provided cell holds a path tile.
    #[must_use]
    pub fn is_path_tile(&self, cell: CellCoord) -> bool {
        self.kind_at(cell) == Some(TileKind::Path)
    }

    /// Rewrites the tile at the provided cell, returning `false` when the cell
    /// lies outside the map.
    pub fn set_kind(&mut self, cell: CellCoord, kind: TileKind) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };
        match self.codes.get_mut(index) {
            Some(code) => {
                *code = kind.code();
                true
            }
            None => false,
        }
    }

    /// World-space center of the provided cell.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(
            (cell.column() as f32 + 0.5) * self.tile_length,
            (cell.row() as f32 + 0.5) * self.tile_length,
        )
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

/// Ordered, bounded sequence of world-space waypoints.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    points: Vec<Vec2>,
}

impl Path {
    /// Creates a path from the provided points, keeping at most
    /// [`MAX_PATH_POINTS`] of them.
    #[must_use]
    pub fn from_points(mut points: Vec<Vec2>) -> Self {
        points.truncate(MAX_PATH_POINTS);
        Self { points }
    }

    /// Appends a waypoint, returning `false` once the path is full.
    pub fn push(&mut self, point: Vec2) -> bool {
        if self.points.len() >= MAX_PATH_POINTS {
            return false;
        }
        self.points.push(point);
        true
    }

    /// Number of waypoints in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Reports whether the path holds no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Reports whether the path can carry enemies, i.e. has at least two points.
    #[must_use]
    pub fn is_traversable(&self) -> bool {
        self.points.len() >= 2
    }

    /// Waypoints in travel order.
    #[must_use]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// First waypoint, where enemies spawn.
    #[must_use]
    pub fn first(&self) -> Option<Vec2> {
        self.points.first().copied()
    }

    /// Last waypoint, where enemies leak.
    #[must_use]
    pub fn last(&self) -> Option<Vec2> {
        self.points.last().copied()
    }

    /// Number of segments between consecutive waypoints.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Length of the provided segment in world units.
    #[must_use]
    pub fn segment_length(&self, segment: usize) -> Option<f32> {
        let start = self.points.get(segment)?;
        let end = self.points.get(segment.checked_add(1)?)?;
        Some(start.distance(*end))
    }

    /// Interpolated position at fractional `progress` along `segment`.
    ///
    /// Segments past the end resolve to the last waypoint.
    #[must_use]
    pub fn position_at(&self, segment: usize, progress: f32) -> Vec2 {
        match (self.points.get(segment), self.points.get(segment + 1)) {
            (Some(start), Some(end)) => start.lerp(*end, progress.clamp(0.0, 1.0)),
            _ => self.last().unwrap_or(Vec2::ZERO),
        }
    }
}

/// Attributes an enemy is created with.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyBlueprint {
    health: f32,
    speed: f32,
    reward: u32,
}

impl EnemyBlueprint {
    /// Creates a new enemy blueprint.
    #[must_use]
    pub const fn new(health: f32, speed: f32, reward: u32) -> Self {
        Self {
            health,
            speed,
            reward,
        }
    }

    /// Hit points the enemy starts with.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Movement speed in world units per second.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Currency awarded when the enemy is defeated.
    #[must_use]
    pub const fn reward(&self) -> u32 {
        self.reward
    }
}

/// Walk-cycle frame shown for an enemy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AnimationState {
    frame: u8,
    elapsed: Duration,
}

impl AnimationState {
    /// Creates an animation state showing `frame` for `elapsed` so far.
    #[must_use]
    pub const fn new(frame: u8, elapsed: Duration) -> Self {
        Self { frame, elapsed }
    }

    /// Frame currently displayed.
    #[must_use]
    pub const fn frame(&self) -> u8 {
        self.frame
    }

    /// Time the current frame has been displayed.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Kinematic state produced by an enemy's per-frame update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyMotion {
    /// Index of the path segment the enemy is on.
    pub segment: u32,
    /// Fractional progress along the segment, in `0.0..1.0`.
    pub progress: f32,
    /// World-space position after the update.
    pub position: Vec2,
    /// Stun time left after the update.
    pub stun_remaining: Duration,
    /// Animation state after the update.
    pub animation: AnimationState,
    /// Indicates whether the enemy moved past the last segment.
    pub reached_end: bool,
}

/// Base attack parameters of a tower.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerStats {
    /// Damage dealt to the primary target.
    pub damage: f32,
    /// Targeting radius in world units.
    pub range: f32,
    /// Cooldown restored after every attack.
    pub attack_speed: Duration,
}

impl Default for TowerStats {
    fn default() -> Self {
        Self {
            damage: 25.0,
            range: 100.0,
            attack_speed: Duration::from_secs(1),
        }
    }
}

/// Upgrade-derived attack modifiers of a tower.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TowerModifiers {
    /// Additional enemies hit by a chain attack.
    pub chain_jumps: u32,
    /// Maximum distance between consecutive chain links.
    pub chain_range: f32,
    /// Radius of the area attack around the primary target.
    pub area_radius: f32,
    /// Probability in `0.0..=1.0` that an attack stuns its target.
    pub stun_chance: f32,
    /// Stun duration applied on a successful stun roll.
    pub stun_duration: Duration,
    /// Probability in `0.0..=1.0` that an attack is critical.
    pub critical_chance: f32,
    /// Damage multiplier applied by a critical hit.
    pub critical_multiplier: f32,
}

impl TowerModifiers {
    /// Primary effect an attack from these modifiers resolves.
    #[must_use]
    pub fn primary_effect(&self) -> AttackKind {
        if self.area_radius > 0.0 {
            AttackKind::Area
        } else if self.chain_jumps > 0 {
            AttackKind::Chain
        } else {
            AttackKind::Plain
        }
    }

    /// Reports whether the tower is able to stun.
    #[must_use]
    pub fn can_stun(&self) -> bool {
        self.stun_chance > 0.0 && !self.stun_duration.is_zero()
    }
}

/// Primary effect resolved by an attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackKind {
    /// Single target hit delivered by a projectile.
    Plain,
    /// Uniform damage to every enemy around the primary target.
    Area,
    /// Decaying damage hopping between nearby enemies.
    Chain,
}

/// Damage dealt to one enemy by an attack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Enemy receiving the damage.
    pub enemy: EnemyId,
    /// Amount of damage dealt.
    pub damage: f32,
}

/// Fully resolved attack of a single tower.
#[derive(Clone, Debug, PartialEq)]
pub struct Attack {
    /// Tower that fired.
    pub tower: TowerId,
    /// Primary effect of the attack.
    pub kind: AttackKind,
    /// Indicates whether the attack rolled a critical hit.
    pub critical: bool,
    /// Stun applied to the primary target, if the stun roll succeeded.
    pub stun: Option<Duration>,
    /// Damage applications in resolution order; the first entry is the
    /// primary target.
    pub hits: Vec<Hit>,
}

impl Attack {
    /// Primary target of the attack.
    #[must_use]
    pub fn primary(&self) -> Option<EnemyId> {
        self.hits.first().map(|hit| hit.enemy)
    }
}

/// Defeat sound variant requested from the audio collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DefeatSound(u8);

impl DefeatSound {
    /// Creates a sound selector, wrapping into the available variants.
    #[must_use]
    pub const fn new(variant: u8) -> Self {
        Self(variant % DEFEAT_SOUND_VARIANTS)
    }

    /// Index of the sound variant.
    #[must_use]
    pub const fn variant(&self) -> u8 {
        self.0
    }

    /// Sound variant played after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self::new(self.0.wrapping_add(1))
    }
}

/// Category of a short-lived visual feedback record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Projectile in flight from a tower to its target.
    Projectile,
    /// Impact left behind by a projectile.
    Impact,
    /// Area attack burst around the primary target.
    Blast,
    /// Arc between two links of a chain attack.
    ChainArc,
}

/// Immutable representation of a visual effect used for drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectSnapshot {
    /// Category of the effect.
    pub kind: EffectKind,
    /// Start point of the effect.
    pub from: Vec2,
    /// End point of the effect.
    pub to: Vec2,
    /// Radius of blast effects, zero otherwise.
    pub radius: f32,
    /// Indicates whether the originating attack was critical.
    pub critical: bool,
    /// Lifetime left before the effect expires.
    pub remaining: Duration,
    /// Total lifetime of the effect.
    pub lifetime: Duration,
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Handle of the enemy.
    pub id: EnemyId,
    /// Wave the enemy belongs to.
    pub wave: WaveNumber,
    /// World-space position of the enemy.
    pub position: Vec2,
    /// Current hit points.
    pub health: f32,
    /// Hit points the enemy spawned with.
    pub max_health: f32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Index of the path segment the enemy is on.
    pub segment: u32,
    /// Fractional progress along the segment.
    pub progress: f32,
    /// Stun time left; zero when the enemy is not stunned.
    pub stun_remaining: Duration,
    /// Walk-cycle state of the enemy.
    pub animation: AnimationState,
}

impl EnemySnapshot {
    /// Reports whether the enemy is currently stunned.
    #[must_use]
    pub fn is_stunned(&self) -> bool {
        !self.stun_remaining.is_zero()
    }
}

/// Read-only snapshot describing all active enemies in pool-slot order.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view, ordering snapshots by pool slot.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id.slot());
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in pool-slot order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Number of active enemies captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Finds the snapshot of the provided enemy.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&EnemySnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == id)
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Cell occupied by the tower.
    pub cell: CellCoord,
    /// World-space center of the tower.
    pub position: Vec2,
    /// Base attack parameters after upgrades.
    pub stats: TowerStats,
    /// Upgrade-derived attack modifiers.
    pub modifiers: TowerModifiers,
    /// Cooldown left before the tower may fire again.
    pub cooldown: Duration,
    /// Upgrades purchased for the tower.
    pub upgrades: UpgradeSet,
}

impl TowerSnapshot {
    /// Reports whether the tower's cooldown has elapsed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cooldown.is_zero()
    }
}

/// Read-only snapshot describing all towers, newest first.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view ordered from the most recently placed tower
    /// to the oldest one.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by(|left, right| right.id.cmp(&left.id));
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Number of towers captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no towers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Count of active enemies per wave.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WaveCensus {
    entries: Vec<(WaveNumber, u32)>,
}

impl WaveCensus {
    /// Counts the active enemies of every wave in the provided sequence.
    #[must_use]
    pub fn from_waves<I>(waves: I) -> Self
    where
        I: IntoIterator<Item = WaveNumber>,
    {
        let mut entries: Vec<(WaveNumber, u32)> = Vec::new();
        for wave in waves {
            match entries.binary_search_by_key(&wave, |(number, _)| *number) {
                Ok(index) => entries[index].1 += 1,
                Err(index) => entries.insert(index, (wave, 1)),
            }
        }
        Self { entries }
    }

    /// Number of active enemies tagged with the provided wave.
    #[must_use]
    pub fn active_in(&self, wave: WaveNumber) -> u32 {
        self.entries
            .binary_search_by_key(&wave, |(number, _)| *number)
            .map_or(0, |index| self.entries[index].1)
    }

    /// Total number of active enemies across all waves.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.entries.iter().map(|(_, count)| count).sum()
    }
}

/// Player currency and lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EconomySnapshot {
    /// Currency available for placements and upgrades.
    pub currency: u32,
    /// Lives left before the session is lost.
    pub lives: u32,
}

/// Reasons a tile map could not be built.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapError {
    /// A row's length differs from the first row.
    #[error("row {row} holds {found} tiles, expected {expected}")]
    RaggedRow {
        /// Index of the offending row.
        row: u32,
        /// Length of the first row.
        expected: u32,
        /// Length of the offending row.
        found: u32,
    },
    /// The map dimensions do not fit the coordinate type.
    #[error("tile map dimensions exceed the supported range")]
    TooLarge,
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested cell lies outside the tile map.
    #[error("cell lies outside the tile map")]
    OutOfBounds,
    /// The requested cell already holds a tower.
    #[error("cell already holds a tower")]
    Occupied,
    /// The requested tile is not buildable ground.
    #[error("tile is not buildable ground")]
    NotBuildable,
    /// The player cannot afford the placement cost.
    #[error("insufficient currency for tower placement")]
    InsufficientFunds,
}

/// Reasons a tower removal request may be rejected by the world.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalError {
    /// No tower with the provided identifier exists.
    #[error("no tower with the provided identifier exists")]
    MissingTower,
}

/// Reasons an upgrade purchase may be rejected by the world.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeError {
    /// No tower with the provided identifier exists.
    #[error("no tower with the provided identifier exists")]
    MissingTower,
    /// The tower already owns the upgrade.
    #[error("upgrade was already purchased for this tower")]
    AlreadyPurchased,
    /// The upgrade builds on another upgrade the tower does not own.
    #[error("upgrade requires a prerequisite the tower does not own")]
    MissingPrerequisite,
    /// The tower owns an upgrade from a mutually exclusive branch.
    #[error("upgrade branch is locked by a previous purchase")]
    BranchLocked,
    /// The player cannot afford the upgrade.
    #[error("insufficient currency for upgrade")]
    InsufficientFunds,
}

/// Configuration errors raised while deriving a wave path.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathError {
    /// The start cell lies outside the tile map.
    #[error("start cell {cell} lies outside the tile map")]
    StartOutOfBounds {
        /// Start cell that was provided.
        cell: CellCoord,
    },
    /// The start cell does not hold a path tile.
    #[error("start cell {cell} is not a path tile")]
    StartNotPath {
        /// Start cell that was provided.
        cell: CellCoord,
    },
    /// The traced path holds fewer than two points.
    #[error("path holds {points} point(s), at least two are required")]
    TooShort {
        /// Number of points in the rejected path.
        points: u32,
    },
}

/// Reasons an enemy could not be placed into the pool.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnError {
    /// The wave has no registered path.
    #[error("wave has no registered path")]
    UnknownWave,
    /// Every pool slot is occupied.
    #[error("enemy pool has no free slot")]
    PoolExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn enemy_id_round_trips_through_bincode() {
        assert_round_trip(&EnemyId::new(7, 3));
    }

    #[test]
    fn path_error_round_trips_through_bincode() {
        assert_round_trip(&PathError::StartNotPath {
            cell: CellCoord::new(2, 9),
        });
    }

    #[test]
    fn tile_codes_classify_known_kinds() {
        for kind in [
            TileKind::Ground,
            TileKind::Path,
            TileKind::Decoration,
            TileKind::Occupied,
        ] {
            assert_eq!(TileKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(TileKind::from_code(42), None);
        assert!(TileKind::Ground.is_buildable());
        assert!(!TileKind::Occupied.is_buildable());
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let rows: [&[u8]; 2] = [&[0, 1, 0], &[0, 1]];
        assert_eq!(
            TileMap::from_rows(32.0, &rows),
            Err(MapError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2,
            })
        );
    }

    #[test]
    fn tile_map_reads_and_rewrites_codes() {
        let rows: [&[u8]; 2] = [&[0, 1], &[2, 1]];
        let mut map = TileMap::from_rows(10.0, &rows).expect("map");

        assert_eq!(map.columns(), 2);
        assert_eq!(map.rows(), 2);
        assert!(map.is_path_tile(CellCoord::new(1, 0)));
        assert_eq!(map.kind_at(CellCoord::new(0, 1)), Some(TileKind::Decoration));
        assert_eq!(map.tile_code_at(CellCoord::new(5, 5)), None);

        assert!(map.set_kind(CellCoord::new(0, 0), TileKind::Occupied));
        assert_eq!(map.kind_at(CellCoord::new(0, 0)), Some(TileKind::Occupied));
        assert!(!map.set_kind(CellCoord::new(2, 0), TileKind::Occupied));
        assert_eq!(map.cell_center(CellCoord::new(1, 1)), Vec2::new(15.0, 15.0));
    }

    #[test]
    fn path_is_bounded_and_measures_segments() {
        let mut path = Path::default();
        assert!(!path.is_traversable());
        for index in 0..MAX_PATH_POINTS {
            assert!(path.push(Vec2::new(index as f32 * 10.0, 0.0)));
        }
        assert!(!path.push(Vec2::ZERO));
        assert_eq!(path.len(), MAX_PATH_POINTS);
        assert_eq!(path.segment_count(), MAX_PATH_POINTS - 1);
        assert_eq!(path.segment_length(0), Some(10.0));
        assert_eq!(path.segment_length(MAX_PATH_POINTS - 1), None);
        assert_eq!(path.position_at(1, 0.5), Vec2::new(15.0, 0.0));
        assert_eq!(
            path.position_at(MAX_PATH_POINTS, 0.0),
            Vec2::new((MAX_PATH_POINTS - 1) as f32 * 10.0, 0.0)
        );

        let truncated = Path::from_points(vec![Vec2::ZERO; MAX_PATH_POINTS + 5]);
        assert_eq!(truncated.len(), MAX_PATH_POINTS);
    }

    #[test]
    fn modifiers_select_a_single_primary_effect() {
        let mut modifiers = TowerModifiers::default();
        assert_eq!(modifiers.primary_effect(), AttackKind::Plain);
        modifiers.chain_jumps = 2;
        assert_eq!(modifiers.primary_effect(), AttackKind::Chain);
        modifiers.area_radius = 40.0;
        assert_eq!(modifiers.primary_effect(), AttackKind::Area);
        assert!(!modifiers.can_stun());
    }

    #[test]
    fn tower_view_orders_newest_first() {
        let snapshot = |id| TowerSnapshot {
            id: TowerId::new(id),
            cell: CellCoord::new(id, 0),
            position: Vec2::ZERO,
            stats: TowerStats::default(),
            modifiers: TowerModifiers::default(),
            cooldown: Duration::ZERO,
            upgrades: UpgradeSet::default(),
        };
        let view = TowerView::from_snapshots(vec![snapshot(1), snapshot(3), snapshot(2)]);
        let order: Vec<u32> = view.iter().map(|tower| tower.id.get()).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn wave_census_counts_per_wave() {
        let census = WaveCensus::from_waves([
            WaveNumber::new(2),
            WaveNumber::new(1),
            WaveNumber::new(2),
        ]);
        assert_eq!(census.active_in(WaveNumber::new(1)), 1);
        assert_eq!(census.active_in(WaveNumber::new(2)), 2);
        assert_eq!(census.active_in(WaveNumber::new(3)), 0);
        assert_eq!(census.total(), 3);
    }

    #[test]
    fn defeat_sounds_rotate() {
        let first = DefeatSound::new(0);
        let sounds: Vec<u8> = std::iter::successors(Some(first), |sound| Some(sound.next()))
            .take(5)
            .map(|sound| sound.variant())
            .collect();
        assert_eq!(sounds, vec![0, 1, 2, 0, 1]);
    }
}
