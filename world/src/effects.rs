//! Bounded pool of short-lived visual feedback records.

use std::time::Duration;

use glam::Vec2;
use tile_defence_core::{EffectKind, EffectSnapshot};

const PROJECTILE_LIFETIME: Duration = Duration::from_millis(200);
const IMPACT_LIFETIME: Duration = Duration::from_millis(150);
const BLAST_LIFETIME: Duration = Duration::from_millis(250);
const CHAIN_ARC_LIFETIME: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, Debug)]
struct Effect {
    kind: EffectKind,
    from: Vec2,
    to: Vec2,
    radius: f32,
    critical: bool,
    remaining: Duration,
    lifetime: Duration,
}

impl Effect {
    fn new(kind: EffectKind, from: Vec2, to: Vec2, radius: f32, critical: bool) -> Self {
        let lifetime = lifetime_of(kind);
        Self {
            kind,
            from,
            to,
            radius,
            critical,
            remaining: lifetime,
            lifetime,
        }
    }

    fn snapshot(&self) -> EffectSnapshot {
        EffectSnapshot {
            kind: self.kind,
            from: self.from,
            to: self.to,
            radius: self.radius,
            critical: self.critical,
            remaining: self.remaining,
            lifetime: self.lifetime,
        }
    }
}

const fn lifetime_of(kind: EffectKind) -> Duration {
    match kind {
        EffectKind::Projectile => PROJECTILE_LIFETIME,
        EffectKind::Impact => IMPACT_LIFETIME,
        EffectKind::Blast => BLAST_LIFETIME,
        EffectKind::ChainArc => CHAIN_ARC_LIFETIME,
    }
}

#[derive(Debug)]
pub(crate) struct EffectPool {
    slots: Vec<Option<Effect>>,
}

impl EffectPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub(crate) fn projectile(&mut self, from: Vec2, to: Vec2, critical: bool) {
        self.spawn(Effect::new(EffectKind::Projectile, from, to, 0.0, critical));
    }

    pub(crate) fn blast(&mut self, center: Vec2, radius: f32, critical: bool) {
        self.spawn(Effect::new(EffectKind::Blast, center, center, radius, critical));
    }

    pub(crate) fn chain_arc(&mut self, from: Vec2, to: Vec2, critical: bool) {
        self.spawn(Effect::new(EffectKind::ChainArc, from, to, 0.0, critical));
    }

    fn spawn(&mut self, effect: Effect) {
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => *slot = Some(effect),
            None => log::debug!("effect pool full, dropping {:?}", effect.kind),
        }
    }

    /// Ages every effect; landed projectiles turn into impacts at their target.
    pub(crate) fn advance(&mut self, dt: Duration) {
        for slot in &mut self.slots {
            let Some(effect) = slot else {
                continue;
            };

            if effect.remaining > dt {
                effect.remaining -= dt;
                continue;
            }

            let expired = *effect;
            *slot = match expired.kind {
                EffectKind::Projectile => Some(Effect::new(
                    EffectKind::Impact,
                    expired.to,
                    expired.to,
                    0.0,
                    expired.critical,
                )),
                EffectKind::Impact | EffectKind::Blast | EffectKind::ChainArc => None,
            };
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots.fill(None);
    }

    pub(crate) fn snapshots(&self) -> Vec<EffectSnapshot> {
        self.slots.iter().flatten().map(Effect::snapshot).collect()
    }
}
