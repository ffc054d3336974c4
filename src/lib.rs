//! A headless sprite-animation sandbox engine.
//!
//! Sprites carry editable command queues; a playback session runs every
//! queue concurrently in tick lock-step while a collision monitor
//! samples the (at most two) sprites' bounding boxes and, on the onset
//! of an overlap, swaps the sprites' remaining queues and raises the
//! hero effect. The [`SandboxEngine`] facade owns the ECS world and an
//! explicitly advanced clock, so hosts and tests drive time themselves.

use bevy::prelude::*;

pub mod collision;
pub mod command;
pub mod config;
pub mod effects;
pub mod engine;
pub mod exchange;
pub mod interpreter;
pub mod playback;
pub mod sprite;
pub mod stats;

pub use command::{palette, Action, ActionKind, AnimationCommand, CommandId, PaletteBlock};
pub use config::SandboxConfig;
pub use effects::EffectEvent;
pub use engine::{SandboxEngine, SpriteSnapshot};
pub use sprite::{ExpressionKind, Pose, SpriteId, SpriteKind, TransientExpression};
pub use stats::SessionStats;

/// Installs every sandbox resource and the per-frame system chain on an
/// otherwise bare [`App`]. The chain order matters: collisions are
/// sampled (and queues exchanged) before the current tick's commands
/// are handed out, so an overlap present at session start swaps queues
/// before anything executes.
pub struct SandboxPlugin {
    pub config: SandboxConfig,
}

impl Plugin for SandboxPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Time>()
            .insert_resource(collision::CollisionState::new(&self.config))
            .insert_resource(exchange::HeroEffect::new(&self.config))
            .insert_resource(exchange::CollisionCooldown::new(&self.config))
            .init_resource::<command::NextCommandId>()
            .init_resource::<sprite::NextSpriteId>()
            .init_resource::<sprite::SelectedSprite>()
            .init_resource::<effects::EffectBus>()
            .init_resource::<stats::SessionStats>()
            .init_resource::<exchange::EffectRng>()
            .insert_resource(self.config.clone())
            .add_systems(
                Update,
                (
                    collision::sample_collisions,
                    playback::load_tick_commands,
                    playback::advance_steps,
                    playback::finish_tick_barrier,
                    playback::tick_expressions,
                    exchange::tick_hero_effect,
                    exchange::tick_collision_cooldown,
                )
                    .chain(),
            );
    }
}
