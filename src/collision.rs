use bevy::prelude::*;

use crate::command::NextCommandId;
use crate::config::SandboxConfig;
use crate::effects::EffectBus;
use crate::exchange::{self, CollisionCooldown, EffectRng, HeroEffect};
use crate::playback::PlaybackSession;
use crate::sprite::{CommandQueue, Pose, SpriteId};
use crate::stats::SessionStats;

/// Edge-triggered collision bookkeeping. `episode_active` latches on the
/// rising edge of overlap so a sustained overlap fires the exchange at
/// most once; it unlatches when the overlap clears (or when the
/// collision-active flag expires, see `exchange::tick_collision_cooldown`).
#[derive(Resource)]
pub struct CollisionState {
    pub overlapping: bool,
    pub episode_active: bool,
    pub count: u32,
    sample_timer: Timer,
    sample_now: bool,
}

impl CollisionState {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            overlapping: false,
            episode_active: false,
            count: 0,
            sample_timer: Timer::new(
                std::time::Duration::from_millis(config.collision_sample_ms),
                TimerMode::Repeating,
            ),
            sample_now: false,
        }
    }

    /// Clears overlap tracking and schedules an immediate sample; the
    /// collision count is deliberately preserved across sessions.
    pub fn rearm(&mut self) {
        self.overlapping = false;
        self.episode_active = false;
        self.sample_timer.reset();
        self.sample_now = true;
    }
}

/// Axis-aligned overlap test for two top-left-anchored footprints of the
/// configured sprite size.
pub fn aabb_overlap(a: &Pose, b: &Pose, width: f32, height: f32) -> bool {
    a.x < b.x + width && a.x + width > b.x && a.y < b.y + height && a.y + height > b.y
}

/// Samples sprite bounding boxes on its own cadence while a session is
/// playing. A no-op unless exactly two sprites exist. Fires the exchange
/// once per overlap episode, on the rising edge only.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sample_collisions(
    time: Res<Time>,
    config: Res<SandboxConfig>,
    session: Option<Res<PlaybackSession>>,
    mut state: ResMut<CollisionState>,
    mut hero: ResMut<HeroEffect>,
    mut cooldown: ResMut<CollisionCooldown>,
    mut next_id: ResMut<NextCommandId>,
    mut stats: ResMut<SessionStats>,
    mut effects: ResMut<EffectBus>,
    mut rng: ResMut<EffectRng>,
    mut sprites: Query<(&SpriteId, &Pose, &mut CommandQueue)>,
) {
    if session.is_none() {
        return;
    }
    if sprites.iter().count() != 2 {
        return;
    }

    state.sample_timer.tick(time.delta());
    let due = state.sample_now || state.sample_timer.just_finished();
    if !due {
        return;
    }
    state.sample_now = false;

    let mut pair = sprites.iter_mut();
    let Some((id_a, pose_a, mut queue_a)) = pair.next() else {
        return;
    };
    let Some((id_b, pose_b, mut queue_b)) = pair.next() else {
        return;
    };

    let overlapping = aabb_overlap(pose_a, pose_b, config.sprite_width, config.sprite_height);
    state.overlapping = overlapping;

    if overlapping && !state.episode_active {
        debug!("overlap onset between sprite {} and sprite {}", id_a.0, id_b.0);
        exchange::perform_exchange(
            &mut queue_a,
            &mut queue_b,
            &mut next_id,
            &mut state,
            &mut hero,
            &mut cooldown,
            &mut stats,
            &mut effects,
            &mut rng,
        );
    } else if !overlapping {
        state.episode_active = false;
    }
}
