use std::collections::BTreeMap;

use bevy::prelude::*;
use serde::Serialize;

use crate::command::ActionKind;

/// In-memory session statistics, mirrored out to the persistence
/// collaborator via [`SessionStats::snapshot`]. Counters accumulate
/// across playback runs within one engine lifetime.
#[derive(Resource, Clone, Serialize)]
pub struct SessionStats {
    pub animations: BTreeMap<ActionKind, u64>,
    pub collisions: u64,
    pub sprites_created: u64,
    pub animations_exchanged: u64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            animations: ActionKind::ALL.iter().map(|&kind| (kind, 0)).collect(),
            collisions: 0,
            sprites_created: 0,
            animations_exchanged: 0,
        }
    }
}

impl SessionStats {
    pub fn record_animation(&mut self, kind: ActionKind) {
        *self.animations.entry(kind).or_insert(0) += 1;
    }

    pub fn animation_count(&self, kind: ActionKind) -> u64 {
        self.animations.get(&kind).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
