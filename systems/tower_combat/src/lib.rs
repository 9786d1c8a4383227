#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that resolves tower attacks into damage commands.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tile_defence_core::{
    Attack, AttackKind, Command, EnemyId, EnemyView, Event, Hit, TowerSnapshot, TowerView,
    CHAIN_DAMAGE_DECAY,
};
use tile_defence_system_tower_targeting::{Candidate, CandidateSet};

/// Configuration parameters required to construct the combat system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration seeding the critical and stun rolls.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Tower combat system that emits one resolved attack per ready tower.
#[derive(Debug)]
pub struct TowerCombat {
    rng: ChaCha8Rng,
    candidates: CandidateSet,
    chain: Vec<EnemyId>,
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new combat system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            candidates: CandidateSet::new(),
            chain: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Emits `Command::ResolveAttack` entries for towers ready to fire.
    ///
    /// Towers are visited newest first. Damage dealt by earlier towers is
    /// tracked locally, so enemies they defeat are not targeted again in the
    /// same frame.
    pub fn handle(
        &mut self,
        events: &[Event],
        towers: &TowerView,
        enemies: &EnemyView,
        out: &mut Vec<Command>,
    ) {
        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return;
        }

        if towers.is_empty() || enemies.is_empty() {
            return;
        }

        self.candidates.refresh(enemies);
        self.scratch.clear();

        for tower in towers.iter().filter(|tower| tower.is_ready()) {
            if !self.candidates.any_alive() {
                break;
            }
            let Some(target) = self
                .candidates
                .first_in_range(tower.position, tower.stats.range)
                .copied()
            else {
                continue;
            };

            let attack = self.resolve(tower, target);
            for hit in &attack.hits {
                let _ = self.candidates.apply_damage(hit.enemy, hit.damage);
            }
            log::debug!(
                "tower {} fires {:?} at {:?} hitting {} enemies",
                tower.id.get(),
                attack.kind,
                target.id,
                attack.hits.len()
            );
            self.scratch.push(Command::ResolveAttack { attack });
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }

    fn resolve(&mut self, tower: &TowerSnapshot, target: Candidate) -> Attack {
        let modifiers = &tower.modifiers;

        let critical =
            modifiers.critical_chance > 0.0 && self.rng.gen::<f32>() < modifiers.critical_chance;
        let damage = if critical {
            tower.stats.damage * modifiers.critical_multiplier
        } else {
            tower.stats.damage
        };

        let stun = if modifiers.can_stun() && self.rng.gen::<f32>() < modifiers.stun_chance {
            Some(modifiers.stun_duration)
        } else {
            None
        };

        let kind = modifiers.primary_effect();
        let mut hits = vec![Hit {
            enemy: target.id,
            damage,
        }];
        match kind {
            AttackKind::Plain => {}
            AttackKind::Area => hits.extend(
                self.candidates
                    .within_radius(target.position, modifiers.area_radius, target.id)
                    .map(|candidate| Hit {
                        enemy: candidate.id,
                        damage,
                    }),
            ),
            AttackKind::Chain => {
                self.chain.clear();
                self.chain.push(target.id);
                let mut from = target.position;
                let mut link_damage = damage;
                for _ in 0..modifiers.chain_jumps {
                    let Some(next) = self
                        .candidates
                        .next_chain_target(from, modifiers.chain_range, &self.chain)
                        .copied()
                    else {
                        break;
                    };
                    link_damage *= CHAIN_DAMAGE_DECAY;
                    hits.push(Hit {
                        enemy: next.id,
                        damage: link_damage,
                    });
                    self.chain.push(next.id);
                    from = next.position;
                }
            }
        }

        Attack {
            tower: tower.id,
            kind,
            critical,
            stun,
            hits,
        }
    }
}
