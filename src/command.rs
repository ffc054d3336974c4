use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EXPRESSION_MS: u64 = 5000;

fn default_expression_ms() -> u64 {
    DEFAULT_EXPRESSION_MS
}

/// A single animation instruction. The wire form matches the block
/// payloads the UI produces: `{"type":"move","value":10}`,
/// `{"type":"goto","x":0,"y":0}` and so on. An unrecognized `type` fails
/// deserialization, which callers treat as a recoverable skip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Move {
        #[serde(rename = "value")]
        steps: f32,
    },
    Turn {
        #[serde(rename = "value")]
        degrees: f32,
    },
    Goto {
        x: f32,
        y: f32,
    },
    Repeat {
        count: u32,
    },
    Say {
        text: String,
        #[serde(default = "default_expression_ms")]
        duration_ms: u64,
    },
    Think {
        text: String,
        #[serde(default = "default_expression_ms")]
        duration_ms: u64,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Move { .. } => ActionKind::Move,
            Self::Turn { .. } => ActionKind::Turn,
            Self::Goto { .. } => ActionKind::Goto,
            Self::Repeat { .. } => ActionKind::Repeat,
            Self::Say { .. } => ActionKind::Say,
            Self::Think { .. } => ActionKind::Think,
        }
    }
}

/// Parameter-free tag for an [`Action`], used for statistics and outward
/// notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Move,
    Turn,
    Goto,
    Repeat,
    Say,
    Think,
}

impl ActionKind {
    pub const ALL: [Self; 6] = [
        Self::Move,
        Self::Turn,
        Self::Goto,
        Self::Repeat,
        Self::Say,
        Self::Think,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub u64);

/// Allocator for command identifiers. Exchanged commands are re-stamped
/// from here so a queue swap never aliases identifiers across sprites.
#[derive(Resource, Default)]
pub struct NextCommandId(u64);

impl NextCommandId {
    pub fn allocate(&mut self) -> CommandId {
        self.0 += 1;
        CommandId(self.0)
    }
}

/// A command as it sits in a sprite's queue. Immutable once enqueued;
/// queues copy commands by value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnimationCommand {
    pub id: CommandId,
    pub action: Action,
}

/// A labeled block offered by the sidebar palette.
#[derive(Clone, Debug, Serialize)]
pub struct PaletteBlock {
    pub label: &'static str,
    pub action: Action,
}

/// The stock block palette the UI seeds its sidebar with.
pub fn palette() -> Vec<PaletteBlock> {
    vec![
        PaletteBlock {
            label: "Move 10 steps",
            action: Action::Move { steps: 10.0 },
        },
        PaletteBlock {
            label: "Turn 15 degrees",
            action: Action::Turn { degrees: 15.0 },
        },
        PaletteBlock {
            label: "Go to x: 0 y: 0",
            action: Action::Goto { x: 0.0, y: 0.0 },
        },
        PaletteBlock {
            label: "Repeat 10 times",
            action: Action::Repeat { count: 10 },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_deserialize_from_block_payloads() {
        let action: Action = serde_json::from_str(r#"{"type":"move","value":10}"#).expect("move");
        assert_eq!(action, Action::Move { steps: 10.0 });

        let action: Action = serde_json::from_str(r#"{"type":"goto","x":0,"y":0}"#).expect("goto");
        assert_eq!(action, Action::Goto { x: 0.0, y: 0.0 });

        let action: Action =
            serde_json::from_str(r#"{"type":"say","text":"hi"}"#).expect("say with default");
        assert_eq!(
            action,
            Action::Say {
                text: "hi".to_string(),
                duration_ms: DEFAULT_EXPRESSION_MS,
            }
        );
    }

    #[test]
    fn unrecognized_command_kind_is_rejected() {
        let result = serde_json::from_str::<Action>(r#"{"type":"teleport","value":3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn command_ids_are_unique_and_monotonic() {
        let mut next = NextCommandId::default();
        let a = next.allocate();
        let b = next.allocate();
        assert_ne!(a, b);
        assert!(b.0 > a.0);
    }

    #[test]
    fn palette_offers_the_stock_blocks() {
        let blocks = palette();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].action, Action::Move { steps: 10.0 });
        assert_eq!(blocks[3].action, Action::Repeat { count: 10 });
    }
}
