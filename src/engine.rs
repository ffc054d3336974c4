use std::time::Duration;

use bevy::prelude::*;
use crossbeam_channel::Sender;
use serde::Serialize;

use crate::collision::CollisionState;
use crate::command::{Action, AnimationCommand, CommandId, NextCommandId};
use crate::config::{self, SandboxConfig};
use crate::effects::{EffectBus, EffectEvent};
use crate::exchange::{CollisionCooldown, HeroEffect};
use crate::playback::{self, ActiveSteps, PlaybackSession};
use crate::sprite::{
    CommandQueue, ExpressionTimer, NextSpriteId, Pose, SelectedSprite, SpriteId, SpriteKind,
    TransientExpression,
};
use crate::stats::SessionStats;
use crate::SandboxPlugin;

/// Virtual-clock quantum the blocking drive loop advances per frame.
/// Small enough to divide every engine cadence.
const DRIVE_QUANTUM: Duration = Duration::from_millis(10);

/// Read-only view of one sprite for the rendering collaborator.
#[derive(Clone, Debug, Serialize)]
pub struct SpriteSnapshot {
    pub id: SpriteId,
    pub kind: SpriteKind,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub queue: Vec<AnimationCommand>,
    pub expression: Option<TransientExpression>,
    pub is_selected: bool,
}

/// The sandbox engine facade. Owns the ECS app, exposes queue editing
/// and playback to external collaborators, and drives the schedule with
/// an explicitly advanced clock so embeddings and tests control time.
pub struct SandboxEngine {
    app: App,
}

impl Default for SandboxEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxEngine {
    /// Builds an engine with config loaded from `SPRITELAB_CONFIG` (or
    /// defaults when unset).
    pub fn new() -> Self {
        Self::with_config(config::load_config())
    }

    pub fn with_config(config: SandboxConfig) -> Self {
        let mut app = App::new();
        app.add_plugins(SandboxPlugin { config });
        Self { app }
    }

    // ── Sprite registry ─────────────────────────────────────────────

    pub fn add_sprite(&mut self, kind: SpriteKind) -> SpriteId {
        let world = self.app.world_mut();
        let id = world.resource_mut::<NextSpriteId>().allocate();
        world.spawn((id, kind, Pose::origin(), CommandQueue::default()));
        world.resource_mut::<SessionStats>().sprites_created += 1;
        debug!("added sprite {} ({})", id.0, kind.label());
        id
    }

    pub fn remove_sprite(&mut self, id: SpriteId) -> Result<(), String> {
        let world = self.app.world_mut();
        let entity = find_sprite(world, id).ok_or_else(|| format!("sprite {} not found", id.0))?;
        world.despawn(entity);
        let mut selected = world.resource_mut::<SelectedSprite>();
        if selected.0 == Some(id) {
            selected.0 = None;
        }
        Ok(())
    }

    pub fn select_sprite(&mut self, id: SpriteId) -> Result<(), String> {
        let world = self.app.world_mut();
        find_sprite(world, id).ok_or_else(|| format!("sprite {} not found", id.0))?;
        world.resource_mut::<SelectedSprite>().0 = Some(id);
        Ok(())
    }

    pub fn selected_sprite(&self) -> Option<SpriteId> {
        self.app.world().resource::<SelectedSprite>().0
    }

    /// Returns every sprite to the origin pose and lowers every
    /// collision / hero flag. Queues are left intact; a running session
    /// is abandoned.
    pub fn reset_all_sprites(&mut self) {
        let world = self.app.world_mut();
        let mut query = world.query_filtered::<Entity, With<SpriteId>>();
        let entities: Vec<Entity> = query.iter(world).collect();
        for entity in entities {
            if let Some(mut pose) = world.get_mut::<Pose>(entity) {
                *pose = Pose::origin();
            }
            world
                .entity_mut(entity)
                .remove::<(ActiveSteps, TransientExpression, ExpressionTimer)>();
        }
        world.remove_resource::<PlaybackSession>();
        world.resource_mut::<CollisionState>().rearm();
        world.resource_mut::<HeroEffect>().clear();
        world.resource_mut::<CollisionCooldown>().clear();
    }

    pub fn set_sprite_pose(
        &mut self,
        id: SpriteId,
        x: f32,
        y: f32,
        rotation: f32,
    ) -> Result<(), String> {
        let world = self.app.world_mut();
        let entity = find_sprite(world, id).ok_or_else(|| format!("sprite {} not found", id.0))?;
        let mut pose = world
            .get_mut::<Pose>(entity)
            .ok_or_else(|| format!("sprite {} has no pose", id.0))?;
        *pose = Pose { x, y, rotation };
        Ok(())
    }

    // ── Queue editing ───────────────────────────────────────────────

    pub fn enqueue_command(&mut self, id: SpriteId, action: Action) -> Result<CommandId, String> {
        let world = self.app.world_mut();
        let entity = find_sprite(world, id).ok_or_else(|| format!("sprite {} not found", id.0))?;
        let command_id = world.resource_mut::<NextCommandId>().allocate();
        let mut queue = world
            .get_mut::<CommandQueue>(entity)
            .ok_or_else(|| format!("sprite {} has no queue", id.0))?;
        queue.0.push(AnimationCommand {
            id: command_id,
            action,
        });
        Ok(command_id)
    }

    /// Accepts a raw block payload from the UI. An unrecognized or
    /// malformed command is a recoverable skip, reported to the caller
    /// and logged, never fatal.
    pub fn enqueue_command_json(&mut self, id: SpriteId, payload: &str) -> Result<CommandId, String> {
        let action: Action = serde_json::from_str(payload).map_err(|e| {
            warn!("skipping unrecognized command payload: {e}");
            format!("unrecognized command: {e}")
        })?;
        self.enqueue_command(id, action)
    }

    pub fn dequeue_command(&mut self, id: SpriteId, command_id: CommandId) -> Result<(), String> {
        let world = self.app.world_mut();
        let entity = find_sprite(world, id).ok_or_else(|| format!("sprite {} not found", id.0))?;
        let mut queue = world
            .get_mut::<CommandQueue>(entity)
            .ok_or_else(|| format!("sprite {} has no queue", id.0))?;
        let before = queue.0.len();
        queue.0.retain(|command| command.id != command_id);
        if queue.0.len() == before {
            return Err(format!("command {} not queued on sprite {}", command_id.0, id.0));
        }
        Ok(())
    }

    pub fn reset_queue(&mut self, id: SpriteId) -> Result<(), String> {
        let world = self.app.world_mut();
        let entity = find_sprite(world, id).ok_or_else(|| format!("sprite {} not found", id.0))?;
        let mut queue = world
            .get_mut::<CommandQueue>(entity)
            .ok_or_else(|| format!("sprite {} has no queue", id.0))?;
        queue.0.clear();
        Ok(())
    }

    // ── Playback ────────────────────────────────────────────────────

    /// Starts a session without driving it; pair with [`Self::tick`]
    /// when an outer render loop owns the clock. No-op (returns false)
    /// while already playing or with nothing queued.
    pub fn start(&mut self) -> bool {
        playback::start_playback(self.app.world_mut())
    }

    /// Advances the engine clock by `delta` and runs one frame.
    pub fn tick(&mut self, delta: Duration) {
        self.app
            .world_mut()
            .resource_mut::<Time>()
            .advance_by(delta);
        self.app.update();
    }

    /// Runs a full playback session to completion on the virtual clock.
    /// Returns false when rejected (already playing, or nothing queued).
    pub fn play(&mut self) -> bool {
        if !self.start() {
            return false;
        }
        while self.is_playing() {
            self.tick(DRIVE_QUANTUM);
        }
        true
    }

    pub fn is_playing(&self) -> bool {
        self.app.world().contains_resource::<PlaybackSession>()
    }

    // ── Observers ───────────────────────────────────────────────────

    pub fn get_sprite(&mut self, id: SpriteId) -> Option<SpriteSnapshot> {
        let world = self.app.world_mut();
        let entity = find_sprite(world, id)?;
        let selected = world.resource::<SelectedSprite>().0;
        snapshot_entity(world, entity, selected)
    }

    pub fn list_sprites(&mut self) -> Vec<SpriteSnapshot> {
        let world = self.app.world_mut();
        let selected = world.resource::<SelectedSprite>().0;
        let mut query = world.query_filtered::<Entity, With<SpriteId>>();
        let entities: Vec<Entity> = query.iter(world).collect();
        let mut snapshots: Vec<SpriteSnapshot> = entities
            .into_iter()
            .filter_map(|entity| snapshot_entity(world, entity, selected))
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.id.0);
        snapshots
    }

    pub fn collision_count(&self) -> u32 {
        self.app.world().resource::<CollisionState>().count
    }

    pub fn is_hero_effect_active(&self) -> bool {
        self.app.world().resource::<HeroEffect>().active
    }

    pub fn hero_text(&self) -> Option<String> {
        let hero = self.app.world().resource::<HeroEffect>();
        hero.active.then(|| hero.text.clone())
    }

    pub fn stats(&self) -> SessionStats {
        self.app.world().resource::<SessionStats>().clone()
    }

    // ── Side-effect plumbing ────────────────────────────────────────

    pub fn drain_effects(&mut self) -> Vec<EffectEvent> {
        self.app.world_mut().resource_mut::<EffectBus>().drain()
    }

    pub fn set_effect_sink(&mut self, sink: Sender<EffectEvent>) {
        self.app
            .world_mut()
            .resource_mut::<EffectBus>()
            .set_sink(sink);
    }

    /// Direct world access for embeddings that need more than the
    /// facade exposes.
    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }
}

fn find_sprite(world: &mut World, id: SpriteId) -> Option<Entity> {
    let mut query = world.query::<(Entity, &SpriteId)>();
    query
        .iter(world)
        .find_map(|(entity, sprite_id)| (*sprite_id == id).then_some(entity))
}

fn snapshot_entity(
    world: &World,
    entity: Entity,
    selected: Option<SpriteId>,
) -> Option<SpriteSnapshot> {
    let id = *world.get::<SpriteId>(entity)?;
    let kind = *world.get::<SpriteKind>(entity)?;
    let pose = *world.get::<Pose>(entity)?;
    let queue = world
        .get::<CommandQueue>(entity)
        .map(|queue| queue.0.clone())
        .unwrap_or_default();
    Some(SpriteSnapshot {
        id,
        kind,
        x: pose.x,
        y: pose.y,
        rotation: pose.rotation,
        queue,
        expression: world.get::<TransientExpression>(entity).cloned(),
        is_selected: selected == Some(id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ActionKind;
    use crate::sprite::ExpressionKind;

    fn engine() -> SandboxEngine {
        SandboxEngine::with_config(SandboxConfig::default())
    }

    /// Drives the virtual clock forward in quantum-sized frames.
    fn run(engine: &mut SandboxEngine, ms: u64) {
        let mut remaining = ms;
        while remaining >= 10 {
            engine.tick(Duration::from_millis(10));
            remaining -= 10;
        }
        if remaining > 0 {
            engine.tick(Duration::from_millis(remaining));
        }
    }

    #[test]
    fn reset_returns_sprites_to_origin_and_lowers_flags() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        let b = engine.add_sprite(SpriteKind::BlueCat);
        engine.set_sprite_pose(a, 10.0, 20.0, 45.0).expect("pose a");
        engine.set_sprite_pose(b, 300.0, 400.0, 90.0).expect("pose b");

        engine.reset_all_sprites();

        for snapshot in engine.list_sprites() {
            assert_eq!((snapshot.x, snapshot.y, snapshot.rotation), (150.0, 150.0, 0.0));
        }
        assert!(!engine.is_hero_effect_active());
        assert!(!engine.is_playing());
    }

    #[test]
    fn distant_sprites_play_without_colliding() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        let b = engine.add_sprite(SpriteKind::GreenCat);
        engine.set_sprite_pose(b, 400.0, 150.0, 0.0).expect("pose b");
        engine
            .enqueue_command(a, Action::Move { steps: 10.0 })
            .expect("enqueue a");
        engine
            .enqueue_command(b, Action::Turn { degrees: 90.0 })
            .expect("enqueue b");

        assert!(engine.play());

        let snap_a = engine.get_sprite(a).expect("sprite a");
        assert!((snap_a.x - 160.0).abs() < 0.01);
        assert!((snap_a.y - 150.0).abs() < 0.01);
        assert_eq!(snap_a.rotation, 0.0);

        let snap_b = engine.get_sprite(b).expect("sprite b");
        assert!((snap_b.x - 400.0).abs() < 0.01);
        assert_eq!(snap_b.rotation, 90.0);

        assert_eq!(engine.collision_count(), 0);
        assert!(!engine.is_playing());
    }

    #[test]
    fn overlapping_sprites_exchange_queues_before_executing() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        let b = engine.add_sprite(SpriteKind::BlueCat);
        engine.set_sprite_pose(b, 160.0, 150.0, 0.0).expect("pose b");
        engine
            .enqueue_command(a, Action::Move { steps: 5.0 })
            .expect("enqueue a");
        engine
            .enqueue_command(b, Action::Move { steps: -5.0 })
            .expect("enqueue b");

        assert!(engine.play());

        // Each sprite executed the other's original command.
        let snap_a = engine.get_sprite(a).expect("sprite a");
        assert!((snap_a.x - 145.0).abs() < 0.01, "a.x = {}", snap_a.x);
        let snap_b = engine.get_sprite(b).expect("sprite b");
        assert!((snap_b.x - 165.0).abs() < 0.01, "b.x = {}", snap_b.x);

        assert_eq!(engine.collision_count(), 1);
        assert_eq!(snap_a.queue[0].action, Action::Move { steps: -5.0 });
        assert_eq!(snap_b.queue[0].action, Action::Move { steps: 5.0 });

        let events = engine.drain_effects();
        assert!(events.contains(&EffectEvent::AnimationExchanged));
        assert!(events.contains(&EffectEvent::CollisionSound));
    }

    #[test]
    fn sustained_overlap_fires_exactly_once() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        let b = engine.add_sprite(SpriteKind::GreenCat);
        engine.set_sprite_pose(b, 160.0, 150.0, 0.0).expect("pose b");
        // Two in-place spins keep both boxes overlapping for >1s of samples.
        engine
            .enqueue_command(a, Action::Turn { degrees: 40.0 })
            .expect("enqueue a");
        engine
            .enqueue_command(b, Action::Turn { degrees: 40.0 })
            .expect("enqueue b");

        assert!(engine.play());
        assert_eq!(engine.collision_count(), 1);
    }

    #[test]
    fn monitor_rearms_once_overlap_clears() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        let b = engine.add_sprite(SpriteKind::BlueCat);
        engine.set_sprite_pose(b, 160.0, 150.0, 0.0).expect("pose b");
        // Long spin keeps the session alive while poses are nudged. The
        // initial exchange hands it to sprite b, so sprite a stays idle
        // and its pose can be moved without the stepper rewriting it.
        engine
            .enqueue_command(a, Action::Turn { degrees: 3600.0 })
            .expect("enqueue a");

        assert!(engine.start());
        run(&mut engine, 50);
        assert_eq!(engine.collision_count(), 1);

        engine.set_sprite_pose(a, 400.0, 150.0, 0.0).expect("move away");
        run(&mut engine, 200);
        assert_eq!(engine.collision_count(), 1);

        engine.set_sprite_pose(a, 150.0, 150.0, 0.0).expect("move back");
        run(&mut engine, 200);
        assert_eq!(engine.collision_count(), 2);
    }

    #[test]
    fn collision_monitor_requires_exactly_two_sprites() {
        let mut engine = engine();
        let ids = [
            engine.add_sprite(SpriteKind::Cat),
            engine.add_sprite(SpriteKind::GreenCat),
            engine.add_sprite(SpriteKind::BlueCat),
        ];
        for id in ids {
            engine
                .enqueue_command(id, Action::Move { steps: 1.0 })
                .expect("enqueue");
        }

        assert!(engine.play());
        assert_eq!(engine.collision_count(), 0);
    }

    #[test]
    fn play_is_rejected_while_already_playing() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        engine
            .enqueue_command(a, Action::Turn { degrees: 900.0 })
            .expect("enqueue");

        assert!(engine.start());
        run(&mut engine, 100);
        let before = engine.get_sprite(a).expect("sprite a");

        assert!(!engine.start());
        let after = engine.get_sprite(a).expect("sprite a");
        assert_eq!(before.rotation, after.rotation);
        assert!(engine.is_playing());
    }

    #[test]
    fn play_is_rejected_when_every_queue_is_empty() {
        let mut engine = engine();
        engine.add_sprite(SpriteKind::Cat);
        assert!(!engine.play());
        assert!(!engine.is_playing());
    }

    #[test]
    fn goto_lands_on_biased_target_from_any_start() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        engine.set_sprite_pose(a, 200.0, 300.0, 45.0).expect("pose");
        engine
            .enqueue_command(a, Action::Goto { x: 25.0, y: 25.0 })
            .expect("enqueue");

        assert!(engine.play());
        let snapshot = engine.get_sprite(a).expect("sprite");
        assert!((snapshot.x - 175.0).abs() < 0.01);
        assert!((snapshot.y - 175.0).abs() < 0.01);
        assert_eq!(snapshot.rotation, 45.0);
    }

    #[test]
    fn commands_are_separated_by_the_inter_command_delay() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        engine
            .enqueue_command(a, Action::Move { steps: 1.0 })
            .expect("first");
        engine
            .enqueue_command(a, Action::Move { steps: 1.0 })
            .expect("second");

        assert!(engine.start());
        run(&mut engine, 200);
        // First command done, barrier pause still holding back the second.
        let snapshot = engine.get_sprite(a).expect("sprite");
        assert!((snapshot.x - 151.0).abs() < 0.01);
        assert!(engine.is_playing());

        run(&mut engine, 600);
        let snapshot = engine.get_sprite(a).expect("sprite");
        assert!((snapshot.x - 152.0).abs() < 0.01);
        assert!(!engine.is_playing());
    }

    #[test]
    fn say_raises_an_expression_that_clears_on_its_own() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        engine
            .enqueue_command(
                a,
                Action::Say {
                    text: "hello".to_string(),
                    duration_ms: 5000,
                },
            )
            .expect("enqueue");

        assert!(engine.play());
        let snapshot = engine.get_sprite(a).expect("sprite");
        let expression = snapshot.expression.expect("expression raised");
        assert_eq!(expression.kind, ExpressionKind::Speech);
        assert_eq!(expression.text, "hello");
        // Pose untouched by expressions.
        assert_eq!((snapshot.x, snapshot.y), (150.0, 150.0));

        run(&mut engine, 5100);
        assert!(engine.get_sprite(a).expect("sprite").expression.is_none());
    }

    #[test]
    fn hero_effect_raises_then_clears_after_its_duration() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        let b = engine.add_sprite(SpriteKind::BlueCat);
        engine.set_sprite_pose(b, 160.0, 150.0, 0.0).expect("pose b");
        engine
            .enqueue_command(a, Action::Move { steps: 5.0 })
            .expect("enqueue");

        assert!(engine.play());
        assert!(engine.is_hero_effect_active());
        assert!(engine.hero_text().is_some());

        run(&mut engine, 3100);
        assert!(!engine.is_hero_effect_active());
        assert!(engine.hero_text().is_none());
    }

    #[test]
    fn stats_track_executed_animations_and_sprites() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        engine
            .enqueue_command(a, Action::Move { steps: 2.0 })
            .expect("move");
        engine
            .enqueue_command(a, Action::Repeat { count: 1 })
            .expect("repeat");

        assert!(engine.play());
        let stats = engine.stats();
        assert_eq!(stats.sprites_created, 1);
        assert_eq!(stats.animation_count(ActionKind::Move), 1);
        assert_eq!(stats.animation_count(ActionKind::Repeat), 1);
        assert_eq!(stats.animation_count(ActionKind::Turn), 0);
    }

    #[test]
    fn queue_editing_round_trips() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        let first = engine
            .enqueue_command_json(a, r#"{"type":"move","value":10}"#)
            .expect("json enqueue");
        engine
            .enqueue_command(a, Action::Turn { degrees: 15.0 })
            .expect("enqueue");
        assert_eq!(engine.get_sprite(a).expect("sprite").queue.len(), 2);

        engine.dequeue_command(a, first).expect("dequeue");
        let snapshot = engine.get_sprite(a).expect("sprite");
        assert_eq!(snapshot.queue.len(), 1);
        assert_eq!(snapshot.queue[0].action, Action::Turn { degrees: 15.0 });

        engine.reset_queue(a).expect("reset queue");
        assert!(engine.get_sprite(a).expect("sprite").queue.is_empty());

        assert!(engine
            .enqueue_command_json(a, r#"{"type":"warp","value":1}"#)
            .is_err());
    }

    #[test]
    fn selection_is_single_and_cleared_on_removal() {
        let mut engine = engine();
        let a = engine.add_sprite(SpriteKind::Cat);
        let b = engine.add_sprite(SpriteKind::GreenCat);

        engine.select_sprite(a).expect("select a");
        engine.select_sprite(b).expect("select b");
        assert_eq!(engine.selected_sprite(), Some(b));
        assert!(engine.get_sprite(b).expect("sprite b").is_selected);
        assert!(!engine.get_sprite(a).expect("sprite a").is_selected);

        engine.remove_sprite(b).expect("remove b");
        assert_eq!(engine.selected_sprite(), None);
        assert!(engine.select_sprite(b).is_err());
    }
}
