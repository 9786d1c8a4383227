//! Catalog of purchasable tower upgrades.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{TowerModifiers, TowerStats, UpgradeError};

/// Identifier of a purchasable tower upgrade.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum UpgradeId {
    /// Raises base damage.
    Damage,
    /// Extends the targeting radius.
    Range,
    /// Shortens the cooldown between attacks.
    AttackSpeed,
    /// Lets attacks hop to nearby enemies.
    ChainLightning,
    /// Adds jumps and reach to chain attacks.
    ChainReach,
    /// Turns attacks into area blasts around the target.
    AreaBlast,
    /// Widens the area blast.
    AreaRadius,
    /// Gives attacks a chance to stun their target.
    Stun,
    /// Gives attacks a chance to deal critical damage.
    CriticalStrike,
    /// Strengthens critical hits.
    CriticalPower,
}

/// Upgrade tree branch an upgrade belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeBranch {
    /// Base stat improvements available to every tower.
    Core,
    /// Chain lightning attacks.
    Chain,
    /// Area blast attacks.
    Area,
    /// Crowd control effects.
    Control,
    /// Critical hit effects.
    Precision,
}

impl UpgradeBranch {
    /// Branch that may not be combined with this one on the same tower.
    #[must_use]
    pub const fn exclusive_with(self) -> Option<Self> {
        match self {
            Self::Chain => Some(Self::Area),
            Self::Area => Some(Self::Chain),
            Self::Core | Self::Control | Self::Precision => None,
        }
    }
}

impl UpgradeId {
    /// Every upgrade in catalog order.
    pub const ALL: [Self; 10] = [
        Self::Damage,
        Self::Range,
        Self::AttackSpeed,
        Self::ChainLightning,
        Self::ChainReach,
        Self::AreaBlast,
        Self::AreaRadius,
        Self::Stun,
        Self::CriticalStrike,
        Self::CriticalPower,
    ];

    /// Currency charged for the upgrade.
    #[must_use]
    pub const fn cost(self) -> u32 {
        match self {
            Self::Damage | Self::Range => 40,
            Self::AttackSpeed | Self::ChainReach | Self::AreaRadius => 60,
            Self::ChainLightning | Self::AreaBlast => 80,
            Self::Stun => 70,
            Self::CriticalStrike | Self::CriticalPower => 60,
        }
    }

    /// Upgrade that must be owned before this one can be purchased.
    #[must_use]
    pub const fn prerequisite(self) -> Option<Self> {
        match self {
            Self::ChainReach => Some(Self::ChainLightning),
            Self::AreaRadius => Some(Self::AreaBlast),
            Self::CriticalPower => Some(Self::CriticalStrike),
            _ => None,
        }
    }

    /// Branch the upgrade belongs to.
    #[must_use]
    pub const fn branch(self) -> UpgradeBranch {
        match self {
            Self::Damage | Self::Range | Self::AttackSpeed => UpgradeBranch::Core,
            Self::ChainLightning | Self::ChainReach => UpgradeBranch::Chain,
            Self::AreaBlast | Self::AreaRadius => UpgradeBranch::Area,
            Self::Stun => UpgradeBranch::Control,
            Self::CriticalStrike | Self::CriticalPower => UpgradeBranch::Precision,
        }
    }

    /// Applies the upgrade's effect to a tower's stats and modifiers.
    pub fn apply(self, stats: &mut TowerStats, modifiers: &mut TowerModifiers) {
        match self {
            Self::Damage => stats.damage += 10.0,
            Self::Range => stats.range += 25.0,
            Self::AttackSpeed => stats.attack_speed = stats.attack_speed.mul_f32(0.75),
            Self::ChainLightning => {
                modifiers.chain_jumps = 2;
                modifiers.chain_range = 80.0;
            }
            Self::ChainReach => {
                modifiers.chain_jumps += 2;
                modifiers.chain_range += 40.0;
            }
            Self::AreaBlast => modifiers.area_radius = 50.0,
            Self::AreaRadius => modifiers.area_radius += 30.0,
            Self::Stun => {
                modifiers.stun_chance = 0.2;
                modifiers.stun_duration = Duration::from_secs(1);
            }
            Self::CriticalStrike => {
                modifiers.critical_chance = 0.15;
                modifiers.critical_multiplier = 2.0;
            }
            Self::CriticalPower => {
                modifiers.critical_multiplier += 1.0;
                modifiers.critical_chance = (modifiers.critical_chance + 0.1).min(1.0);
            }
        }
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of upgrades purchased for a single tower.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpgradeSet(u16);

impl UpgradeSet {
    /// Reports whether the set holds the provided upgrade.
    #[must_use]
    pub const fn contains(&self, upgrade: UpgradeId) -> bool {
        self.0 & upgrade.bit() != 0
    }

    /// Adds an upgrade, returning `false` when it was already present.
    pub fn insert(&mut self, upgrade: UpgradeId) -> bool {
        let present = self.contains(upgrade);
        self.0 |= upgrade.bit();
        !present
    }

    /// Number of upgrades in the set.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.0.count_ones()
    }

    /// Reports whether no upgrade was purchased.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterator over the owned upgrades in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = UpgradeId> + '_ {
        UpgradeId::ALL
            .into_iter()
            .filter(move |upgrade| self.contains(*upgrade))
    }

    /// Verifies that the upgrade may be added, ignoring cost.
    pub fn check(&self, upgrade: UpgradeId) -> Result<(), UpgradeError> {
        if self.contains(upgrade) {
            return Err(UpgradeError::AlreadyPurchased);
        }

        if let Some(required) = upgrade.prerequisite() {
            if !self.contains(required) {
                return Err(UpgradeError::MissingPrerequisite);
            }
        }

        if let Some(locked) = upgrade.branch().exclusive_with() {
            if self.iter().any(|owned| owned.branch() == locked) {
                return Err(UpgradeError::BranchLocked);
            }
        }

        Ok(())
    }
}
