use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::collision::CollisionState;
use crate::command::NextCommandId;
use crate::config::SandboxConfig;
use crate::effects::{EffectBus, EffectEvent};
use crate::sprite::CommandQueue;
use crate::stats::SessionStats;

/// Captions flashed over the canvas while the hero effect is raised.
const HERO_TEXTS: [&str; 8] = [
    "HERO", "BOOM!", "WOW!", "CRASH!", "BANG!", "SWITCH!", "SWAP!", "EXCHANGE!",
];

/// Transient full-screen flash raised on collision, consumed by the
/// rendering collaborator. Auto-clears after `hero_effect_ms`.
#[derive(Resource)]
pub struct HeroEffect {
    pub active: bool,
    pub text: String,
    timer: Timer,
}

impl HeroEffect {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            active: false,
            text: String::new(),
            timer: Timer::new(
                std::time::Duration::from_millis(config.hero_effect_ms),
                TimerMode::Once,
            ),
        }
    }

    fn raise(&mut self, text: &str) {
        self.active = true;
        self.text = text.to_string();
        self.timer.reset();
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.timer.reset();
    }
}

/// Collision-active flag. While raised the exchange stays disarmed; its
/// expiry re-arms the edge trigger even under sustained overlap.
#[derive(Resource)]
pub struct CollisionCooldown {
    pub active: bool,
    timer: Timer,
}

impl CollisionCooldown {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            active: false,
            timer: Timer::new(
                std::time::Duration::from_millis(config.collision_active_ms),
                TimerMode::Once,
            ),
        }
    }

    fn raise(&mut self) {
        self.active = true;
        self.timer.reset();
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.timer.reset();
    }
}

#[derive(Resource)]
pub struct EffectRng(pub SmallRng);

impl Default for EffectRng {
    fn default() -> Self {
        Self(SmallRng::from_entropy())
    }
}

/// Swaps the two sprites' queues wholesale and raises the collision
/// effects. Every swapped command is re-stamped with a fresh id so no
/// identifier ever lives in two queues.
#[allow(clippy::too_many_arguments)]
pub(crate) fn perform_exchange(
    queue_a: &mut CommandQueue,
    queue_b: &mut CommandQueue,
    next_id: &mut NextCommandId,
    state: &mut CollisionState,
    hero: &mut HeroEffect,
    cooldown: &mut CollisionCooldown,
    stats: &mut SessionStats,
    effects: &mut EffectBus,
    rng: &mut EffectRng,
) {
    std::mem::swap(&mut queue_a.0, &mut queue_b.0);
    for command in queue_a.0.iter_mut().chain(queue_b.0.iter_mut()) {
        command.id = next_id.allocate();
    }

    state.episode_active = true;
    state.count += 1;
    stats.collisions += 1;
    stats.animations_exchanged += 1;

    let text = HERO_TEXTS.choose(&mut rng.0).copied().unwrap_or("HERO");
    hero.raise(text);
    cooldown.raise();

    effects.emit(EffectEvent::CollisionSound);
    effects.emit(EffectEvent::CollisionHaptic);
    effects.emit(EffectEvent::AnimationExchanged);

    info!(
        "collision #{}: queues exchanged, hero effect \"{text}\"",
        state.count
    );
}

pub(crate) fn tick_hero_effect(time: Res<Time>, mut hero: ResMut<HeroEffect>) {
    if !hero.active {
        return;
    }
    hero.timer.tick(time.delta());
    if hero.timer.finished() {
        hero.active = false;
    }
}

pub(crate) fn tick_collision_cooldown(
    time: Res<Time>,
    mut cooldown: ResMut<CollisionCooldown>,
    mut state: ResMut<CollisionState>,
) {
    if !cooldown.active {
        return;
    }
    cooldown.timer.tick(time.delta());
    if cooldown.timer.finished() {
        cooldown.active = false;
        // Expiry re-arms the monitor even if the overlap never cleared.
        state.episode_active = false;
    }
}
