#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that walks enemies along their wave paths.

use std::time::Duration;

use tile_defence_core::{
    AnimationState, Command, EnemyMotion, EnemySnapshot, EnemyView, Event, Path, WaveNumber,
    ANIMATION_FRAMES, ANIMATION_FRAME_TIME,
};

/// Pure system that reacts to world events and emits movement commands.
#[derive(Debug, Default)]
pub struct Movement;

impl Movement {
    /// Emits one `Command::MoveEnemy` per active enemy for the elapsed time.
    ///
    /// `path_for` resolves the path of a wave; enemies whose wave has no
    /// registered path are left untouched.
    pub fn handle<'p, F>(
        &mut self,
        events: &[Event],
        enemy_view: &EnemyView,
        path_for: F,
        out: &mut Vec<Command>,
    ) where
        F: Fn(WaveNumber) -> Option<&'p Path>,
    {
        let mut dt = Duration::ZERO;
        let mut ticked = false;
        for event in events {
            if let Event::TimeAdvanced { dt: step } = event {
                dt = dt.saturating_add(*step);
                ticked = true;
            }
        }

        if !ticked {
            return;
        }

        for enemy in enemy_view.iter() {
            let Some(path) = path_for(enemy.wave) else {
                continue;
            };
            out.push(Command::MoveEnemy {
                enemy: enemy.id,
                motion: advance(enemy, path, dt),
            });
        }
    }
}

/// Computes an enemy's kinematic state after `dt` of travel along `path`.
///
/// Stunned enemies only count their stun and animation down. Moving enemies
/// carry any distance left over at the end of a segment into the following
/// segments, so the outcome does not depend on how `dt` is sliced.
#[must_use]
pub fn advance(enemy: &EnemySnapshot, path: &Path, dt: Duration) -> EnemyMotion {
    let animation = animate(enemy.animation, dt);

    if enemy.is_stunned() {
        return EnemyMotion {
            segment: enemy.segment,
            progress: enemy.progress,
            position: enemy.position,
            stun_remaining: enemy.stun_remaining.saturating_sub(dt),
            animation,
            reached_end: false,
        };
    }

    let segment_count = path.segment_count();
    let mut segment = usize::try_from(enemy.segment).unwrap_or(usize::MAX);
    let mut progress = enemy.progress;
    let mut travel = enemy.speed.max(0.0) * dt.as_secs_f32();

    while segment < segment_count {
        let length = path.segment_length(segment).unwrap_or(0.0);
        if length > f32::EPSILON {
            let left = (1.0 - progress) * length;
            if travel < left {
                progress += travel / length;
                if progress < 1.0 {
                    break;
                }
                travel = 0.0;
            } else {
                travel -= left;
            }
        }
        segment += 1;
        progress = 0.0;
    }

    let reached_end = segment >= segment_count;
    let position = if reached_end {
        path.last().unwrap_or(enemy.position)
    } else {
        path.position_at(segment, progress)
    };

    EnemyMotion {
        segment: u32::try_from(segment.min(segment_count)).unwrap_or(u32::MAX),
        progress,
        position,
        stun_remaining: enemy.stun_remaining,
        animation,
        reached_end,
    }
}

fn animate(state: AnimationState, dt: Duration) -> AnimationState {
    let mut elapsed = state.elapsed().saturating_add(dt);
    let mut frame = state.frame();
    while elapsed >= ANIMATION_FRAME_TIME {
        elapsed -= ANIMATION_FRAME_TIME;
        frame = (frame + 1) % ANIMATION_FRAMES;
    }
    AnimationState::new(frame, elapsed)
}
