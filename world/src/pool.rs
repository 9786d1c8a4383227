//! Fixed-capacity enemy pool with generation-tagged slots.

use std::time::Duration;

use glam::Vec2;
use tile_defence_core::{
    AnimationState, EnemyBlueprint, EnemyId, EnemyMotion, EnemySnapshot, WaveNumber,
};

/// State of a single active enemy.
#[derive(Clone, Debug)]
pub(crate) struct EnemyState {
    pub(crate) id: EnemyId,
    pub(crate) wave: WaveNumber,
    pub(crate) position: Vec2,
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) speed: f32,
    pub(crate) reward: u32,
    pub(crate) segment: u32,
    pub(crate) progress: f32,
    pub(crate) stun_remaining: Duration,
    pub(crate) animation: AnimationState,
}

impl EnemyState {
    pub(crate) fn apply_motion(&mut self, motion: &EnemyMotion) {
        self.segment = motion.segment;
        self.progress = motion.progress;
        self.position = motion.position;
        self.stun_remaining = motion.stun_remaining;
        self.animation = motion.animation;
    }

    pub(crate) fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            wave: self.wave,
            position: self.position,
            health: self.health,
            max_health: self.max_health,
            speed: self.speed,
            segment: self.segment,
            progress: self.progress,
            stun_remaining: self.stun_remaining,
            animation: self.animation,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    enemy: Option<EnemyState>,
}

/// Pool that reuses a fixed number of enemy slots.
#[derive(Debug)]
pub(crate) struct EnemyPool {
    slots: Vec<Slot>,
}

impl EnemyPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::default(); capacity],
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.enemy.is_some()).count()
    }

    /// Activates the first free slot, returning `None` when every slot is taken.
    pub(crate) fn activate(
        &mut self,
        wave: WaveNumber,
        blueprint: EnemyBlueprint,
        position: Vec2,
    ) -> Option<EnemyId> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.enemy.is_none())?;
        let id = EnemyId::new(u32::try_from(index).ok()?, slot.generation);
        slot.enemy = Some(EnemyState {
            id,
            wave,
            position,
            health: blueprint.health(),
            max_health: blueprint.health(),
            speed: blueprint.speed(),
            reward: blueprint.reward(),
            segment: 0,
            progress: 0.0,
            stun_remaining: Duration::ZERO,
            animation: AnimationState::default(),
        });
        Some(id)
    }

    pub(crate) fn get(&self, id: EnemyId) -> Option<&EnemyState> {
        let slot = self.slots.get(usize::try_from(id.slot()).ok()?)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.enemy.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: EnemyId) -> Option<&mut EnemyState> {
        let slot = self.slots.get_mut(usize::try_from(id.slot()).ok()?)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.enemy.as_mut()
    }

    /// Frees the enemy's slot and retires its handle.
    pub(crate) fn deactivate(&mut self, id: EnemyId) -> Option<EnemyState> {
        let slot = self.slots.get_mut(usize::try_from(id.slot()).ok()?)?;
        if slot.generation != id.generation() {
            return None;
        }
        let enemy = slot.enemy.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        Some(enemy)
    }

    /// Deactivates every enemy of the provided wave, returning how many were removed.
    pub(crate) fn clear_wave(&mut self, wave: WaveNumber) -> u32 {
        let mut removed = 0;
        for slot in &mut self.slots {
            if slot.enemy.as_ref().is_some_and(|enemy| enemy.wave == wave) {
                slot.enemy = None;
                slot.generation = slot.generation.wrapping_add(1);
                removed += 1;
            }
        }
        removed
    }

    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.enemy.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
    }

    /// Active enemies in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &EnemyState> {
        self.slots.iter().filter_map(|slot| slot.enemy.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blueprint() -> EnemyBlueprint {
        EnemyBlueprint::new(100.0, 20.0, 10)
    }

    #[test]
    fn activation_fills_first_free_slot() {
        let mut pool = EnemyPool::new(3);
        let first = pool
            .activate(WaveNumber::FIRST, blueprint(), Vec2::ZERO)
            .expect("slot");
        let second = pool
            .activate(WaveNumber::FIRST, blueprint(), Vec2::ZERO)
            .expect("slot");
        assert_eq!(first.slot(), 0);
        assert_eq!(second.slot(), 1);

        let _ = pool.deactivate(first).expect("active");
        let reused = pool
            .activate(WaveNumber::FIRST, blueprint(), Vec2::ZERO)
            .expect("slot");
        assert_eq!(reused.slot(), 0);
        assert_ne!(reused, first);
        assert!(pool.get(first).is_none());
        assert!(pool.get(reused).is_some());
    }

    #[test]
    fn exhausted_pool_refuses_activation() {
        let mut pool = EnemyPool::new(1);
        assert!(pool
            .activate(WaveNumber::FIRST, blueprint(), Vec2::ZERO)
            .is_some());
        assert!(pool
            .activate(WaveNumber::FIRST, blueprint(), Vec2::ZERO)
            .is_none());
        assert_eq!(pool.active_count(), pool.capacity());
    }

    #[test]
    fn clear_wave_only_touches_matching_enemies() {
        let mut pool = EnemyPool::new(4);
        let second_wave = WaveNumber::new(2);
        let _ = pool.activate(WaveNumber::FIRST, blueprint(), Vec2::ZERO);
        let _ = pool.activate(second_wave, blueprint(), Vec2::ZERO);
        let _ = pool.activate(second_wave, blueprint(), Vec2::ZERO);

        assert_eq!(pool.clear_wave(second_wave), 2);
        assert_eq!(pool.active_count(), 1);
        assert!(pool.iter().all(|enemy| enemy.wave == WaveNumber::FIRST));
    }
}
