//! Authoritative tower state management utilities.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use tile_defence_core::{CellCoord, TowerId, TowerModifiers, TowerSnapshot, TowerStats, UpgradeSet};

/// Snapshot of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    /// Identifier allocated by the world for the tower.
    pub(crate) id: TowerId,
    /// Cell occupied by the tower.
    pub(crate) cell: CellCoord,
    /// World-space center of the occupied cell.
    pub(crate) position: Vec2,
    pub(crate) stats: TowerStats,
    pub(crate) modifiers: TowerModifiers,
    /// Time left before the tower may fire again.
    pub(crate) cooldown: Duration,
    pub(crate) upgrades: UpgradeSet,
}

impl TowerState {
    pub(crate) fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            cell: self.cell,
            position: self.position,
            stats: self.stats,
            modifiers: self.modifiers,
            cooldown: self.cooldown,
            upgrades: self.upgrades,
        }
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Stores a freshly built tower, returning its identifier.
    pub(crate) fn insert(&mut self, cell: CellCoord, position: Vec2, stats: TowerStats) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().saturating_add(1));
        let _ = self.entries.insert(
            id,
            TowerState {
                id,
                cell,
                position,
                stats,
                modifiers: TowerModifiers::default(),
                cooldown: Duration::ZERO,
                upgrades: UpgradeSet::default(),
            },
        );
        id
    }

    pub(crate) fn remove(&mut self, id: TowerId) -> Option<TowerState> {
        self.entries.remove(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    /// Identifier of the tower standing on the provided cell, if any.
    pub(crate) fn tower_at(&self, cell: CellCoord) -> Option<TowerId> {
        self.entries
            .values()
            .find(|tower| tower.cell == cell)
            .map(|tower| tower.id)
    }

    /// Counts every cooldown down by the elapsed time.
    pub(crate) fn tick(&mut self, dt: Duration) {
        for tower in self.entries.values_mut() {
            tower.cooldown = tower.cooldown.saturating_sub(dt);
        }
    }

    /// Removes every tower and yields them for tile cleanup.
    pub(crate) fn drain(&mut self) -> Vec<TowerState> {
        self.next_tower_id = TowerId::new(0);
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_starts_empty_with_zero_identifier() {
        let registry = TowerRegistry::new();
        assert!(registry.entries.is_empty());
        assert_eq!(registry.next_tower_id.get(), 0);
    }

    #[test]
    fn identifiers_are_never_reused_after_removal() {
        let mut registry = TowerRegistry::new();
        let first = registry.insert(CellCoord::new(0, 0), Vec2::ZERO, TowerStats::default());
        let _ = registry.remove(first).expect("tower");
        let second = registry.insert(CellCoord::new(0, 0), Vec2::ZERO, TowerStats::default());
        assert!(second > first);
        assert_eq!(registry.tower_at(CellCoord::new(0, 0)), Some(second));
    }

    #[test]
    fn tick_saturates_cooldowns_at_zero() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(CellCoord::new(1, 1), Vec2::ONE, TowerStats::default());
        registry.get_mut(id).expect("tower").cooldown = Duration::from_millis(300);

        registry.tick(Duration::from_millis(200));
        assert_eq!(
            registry.get_mut(id).expect("tower").cooldown,
            Duration::from_millis(100)
        );

        registry.tick(Duration::from_millis(500));
        assert!(registry.iter().all(|tower| tower.snapshot().is_ready()));
    }
}
