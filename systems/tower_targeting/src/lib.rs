#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Target selection over a frame-local copy of the enemy pool.
//!
//! [`CandidateSet`] mirrors the active enemies in pool-slot order and tracks
//! the damage already dealt during the current frame, so that later towers
//! never aim at an enemy an earlier tower has just defeated.

use glam::Vec2;
use tile_defence_core::{EnemyId, EnemyView};

/// Enemy eligible for targeting during the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Handle of the enemy.
    pub id: EnemyId,
    /// World-space position of the enemy.
    pub position: Vec2,
    /// Hit points left after the damage dealt so far this frame.
    pub health: f32,
}

impl Candidate {
    /// Reports whether the enemy is still standing.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// Frame-local ledger of targetable enemies in pool-slot order.
#[derive(Debug, Default)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    /// Creates an empty candidate set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the ledger with the enemies captured by `enemies`.
    pub fn refresh(&mut self, enemies: &EnemyView) {
        self.candidates.clear();
        self.candidates.extend(enemies.iter().map(|enemy| Candidate {
            id: enemy.id,
            position: enemy.position,
            health: enemy.health,
        }));
    }

    /// Number of enemies in the ledger, alive or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Reports whether the ledger holds no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Reports whether any enemy in the ledger is still standing.
    #[must_use]
    pub fn any_alive(&self) -> bool {
        self.candidates.iter().any(Candidate::is_alive)
    }

    /// First living enemy in pool-slot order within `range` of `origin`.
    ///
    /// This is deliberately not a nearest-enemy search.
    #[must_use]
    pub fn first_in_range(&self, origin: Vec2, range: f32) -> Option<&Candidate> {
        self.candidates
            .iter()
            .find(|candidate| candidate.is_alive() && candidate.position.distance(origin) <= range)
    }

    /// Living enemy strictly nearest to `from` and strictly closer than
    /// `range`, skipping every enemy in `exclude`.
    ///
    /// Ties keep the enemy that comes first in pool-slot order.
    #[must_use]
    pub fn next_chain_target(
        &self,
        from: Vec2,
        range: f32,
        exclude: &[EnemyId],
    ) -> Option<&Candidate> {
        let mut best: Option<(&Candidate, f32)> = None;
        for candidate in &self.candidates {
            if !candidate.is_alive() || exclude.contains(&candidate.id) {
                continue;
            }
            let distance = candidate.position.distance(from);
            if distance >= range {
                continue;
            }
            if best.map_or(true, |(_, nearest)| distance < nearest) {
                best = Some((candidate, distance));
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    /// Living enemies within `radius` of `center`, in pool-slot order,
    /// skipping `exclude`.
    pub fn within_radius(
        &self,
        center: Vec2,
        radius: f32,
        exclude: EnemyId,
    ) -> impl Iterator<Item = &Candidate> + '_ {
        self.candidates.iter().filter(move |candidate| {
            candidate.id != exclude
                && candidate.is_alive()
                && candidate.position.distance(center) <= radius
        })
    }

    /// Looks up an enemy in the ledger.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&Candidate> {
        self.candidates.iter().find(|candidate| candidate.id == id)
    }

    /// Records damage dealt to an enemy, returning `true` when it drops to
    /// zero or below.
    pub fn apply_damage(&mut self, id: EnemyId, damage: f32) -> bool {
        match self.candidates.iter_mut().find(|candidate| candidate.id == id) {
            Some(candidate) => {
                candidate.health -= damage;
                !candidate.is_alive()
            }
            None => false,
        }
    }
}
