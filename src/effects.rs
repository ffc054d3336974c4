use std::collections::VecDeque;

use bevy::prelude::*;
use crossbeam_channel::Sender;
use serde::Serialize;

use crate::command::ActionKind;

const MAX_EFFECTS: usize = 256;

/// Outward fire-and-forget notification to the rendering / audio /
/// haptics / statistics collaborators.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EffectEvent {
    CollisionSound,
    CollisionHaptic,
    AnimationExecuted { kind: ActionKind },
    AnimationExchanged,
}

/// Buffered side-effect outbox. Events land in a bounded ring buffer the
/// host can drain, and are mirrored to an optional channel sink. Sink
/// failures are swallowed; a broken speaker never aborts playback.
#[derive(Resource, Default)]
pub struct EffectBus {
    pub recent: VecDeque<EffectEvent>,
    pub dropped: u64,
    sink: Option<Sender<EffectEvent>>,
}

impl EffectBus {
    pub fn emit(&mut self, event: EffectEvent) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.try_send(event.clone()) {
                warn!("effect sink rejected {event:?}: {e}");
            }
        }
        self.recent.push_back(event);
        while self.recent.len() > MAX_EFFECTS {
            self.recent.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
    }

    pub fn set_sink(&mut self, sink: Sender<EffectEvent>) {
        self.sink = Some(sink);
    }

    pub fn drain(&mut self) -> Vec<EffectEvent> {
        self.recent.drain(..).collect()
    }
}
