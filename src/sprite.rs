use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::command::AnimationCommand;
use crate::config::CANVAS_CENTER;

/// Stable identifier handed to external collaborators; survives entity
/// reuse the way a raw `Entity` would not.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteId(pub u64);

#[derive(Resource, Default)]
pub struct NextSpriteId(u64);

impl NextSpriteId {
    pub fn allocate(&mut self) -> SpriteId {
        self.0 += 1;
        SpriteId(self.0)
    }
}

/// Appearance tag; the renderer picks the matching artwork.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpriteKind {
    Cat,
    GreenCat,
    BlueCat,
}

impl SpriteKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cat => "Cat",
            Self::GreenCat => "Green Cat",
            Self::BlueCat => "Blue Cat",
        }
    }
}

/// A sprite's position and heading. Always written as one whole
/// replacement so no observer can see a half-applied step.
#[derive(Component, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    /// Heading in degrees; 0 points along +x.
    pub rotation: f32,
}

impl Pose {
    pub fn origin() -> Self {
        Self {
            x: CANVAS_CENTER,
            y: CANVAS_CENTER,
            rotation: 0.0,
        }
    }
}

/// Ordered sequence of commands awaiting playback. Position `t` in every
/// queue runs on tick `t` of the playback session.
#[derive(Component, Clone, Default)]
pub struct CommandQueue(pub Vec<AnimationCommand>);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionKind {
    Speech,
    Thought,
}

/// A speech or thought bubble raised by say/think; cleared by
/// [`ExpressionTimer`] once its duration elapses.
#[derive(Component, Clone, Debug, PartialEq, Serialize)]
pub struct TransientExpression {
    pub kind: ExpressionKind,
    pub text: String,
}

#[derive(Component)]
pub struct ExpressionTimer(pub Timer);

/// At most one sprite is selected at a time; queue edits from the UI
/// target the selection.
#[derive(Resource, Default)]
pub struct SelectedSprite(pub Option<SpriteId>);
