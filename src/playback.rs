use bevy::prelude::*;

use crate::collision::CollisionState;
use crate::command::Action;
use crate::config::SandboxConfig;
use crate::effects::{EffectBus, EffectEvent};
use crate::exchange::{CollisionCooldown, HeroEffect};
use crate::interpreter;
use crate::sprite::{
    CommandQueue, ExpressionKind, ExpressionTimer, Pose, TransientExpression,
};
use crate::stats::SessionStats;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum SessionPhase {
    /// About to hand out the commands at the current tick.
    Loading,
    /// Sprites are stepping through their tick-`t` plans.
    Stepping,
    /// All sprites finished tick `t`; waiting out the inter-command delay.
    Pausing,
}

/// The single in-flight playback session. Its existence in the world is
/// what makes `is_playing()` true; removing it ends playback.
#[derive(Resource)]
pub struct PlaybackSession {
    /// Synchronized queue position across all sprites.
    pub tick: usize,
    phase: SessionPhase,
    pause: Timer,
}

/// The remaining interpreter-planned poses for one sprite's current
/// command, drained one pose per timer expiry.
#[derive(Component)]
pub struct ActiveSteps {
    poses: Vec<Pose>,
    next: usize,
    timer: Timer,
}

/// Starts a playback session. Rejected as a no-op when a session is
/// already running or when every sprite's queue is empty. Collision and
/// hero-effect flags are cleared; poses are left where the sprites
/// stand (resetting to the origin is `reset_all_sprites`' job).
pub fn start_playback(world: &mut World) -> bool {
    if world.contains_resource::<PlaybackSession>() {
        warn!("play() ignored: a playback session is already running");
        return false;
    }

    let mut queues = world.query::<&CommandQueue>();
    if !queues.iter(world).any(|queue| !queue.0.is_empty()) {
        debug!("play() ignored: every command queue is empty");
        return false;
    }

    world.resource_mut::<CollisionState>().rearm();
    world.resource_mut::<HeroEffect>().clear();
    world.resource_mut::<CollisionCooldown>().clear();

    let inter_command_ms = world.resource::<SandboxConfig>().inter_command_ms;
    world.insert_resource(PlaybackSession {
        tick: 0,
        phase: SessionPhase::Loading,
        pause: Timer::new(
            std::time::Duration::from_millis(inter_command_ms),
            TimerMode::Once,
        ),
    });
    info!("playback started");
    true
}

/// Hands every sprite its command at the current tick, turning it into
/// either an [`ActiveSteps`] plan or a transient expression. Ends the
/// session when the tick is past every queue.
pub(crate) fn load_tick_commands(
    mut commands: Commands,
    session: Option<ResMut<PlaybackSession>>,
    mut stats: ResMut<SessionStats>,
    mut effects: ResMut<EffectBus>,
    sprites: Query<(Entity, &Pose, &CommandQueue)>,
) {
    let Some(mut session) = session else {
        return;
    };
    if session.phase != SessionPhase::Loading {
        return;
    }

    let tick = session.tick;
    let mut loaded_any = false;
    for (entity, pose, queue) in sprites.iter() {
        let Some(command) = queue.0.get(tick) else {
            continue;
        };
        loaded_any = true;
        stats.record_animation(command.action.kind());
        effects.emit(EffectEvent::AnimationExecuted {
            kind: command.action.kind(),
        });

        match &command.action {
            Action::Say { text, duration_ms } => {
                raise_expression(&mut commands, entity, ExpressionKind::Speech, text, *duration_ms);
            }
            Action::Think { text, duration_ms } => {
                raise_expression(&mut commands, entity, ExpressionKind::Thought, text, *duration_ms);
            }
            action => {
                let plan = interpreter::plan(action, *pose);
                if !plan.is_empty() {
                    commands.entity(entity).insert(ActiveSteps {
                        poses: plan.poses,
                        next: 0,
                        timer: Timer::new(plan.step_delay, TimerMode::Repeating),
                    });
                }
            }
        }
    }

    if loaded_any {
        session.phase = SessionPhase::Stepping;
    } else {
        info!("playback finished after {tick} ticks");
        commands.remove_resource::<PlaybackSession>();
    }
}

fn raise_expression(
    commands: &mut Commands,
    entity: Entity,
    kind: ExpressionKind,
    text: &str,
    duration_ms: u64,
) {
    commands.entity(entity).insert((
        TransientExpression {
            kind,
            text: text.to_string(),
        },
        ExpressionTimer(Timer::new(
            std::time::Duration::from_millis(duration_ms),
            TimerMode::Once,
        )),
    ));
}

/// Applies due pose steps. Each application replaces the whole `Pose`
/// component, so the collision monitor never observes a partial write.
pub(crate) fn advance_steps(
    time: Res<Time>,
    mut commands: Commands,
    mut movers: Query<(Entity, &mut Pose, &mut ActiveSteps)>,
) {
    for (entity, mut pose, mut steps) in movers.iter_mut() {
        steps.timer.tick(time.delta());
        for _ in 0..steps.timer.times_finished_this_tick() {
            if steps.next >= steps.poses.len() {
                break;
            }
            *pose = steps.poses[steps.next];
            steps.next += 1;
        }
        if steps.next >= steps.poses.len() {
            commands.entity(entity).remove::<ActiveSteps>();
        }
    }
}

/// The inter-command barrier: once every sprite has finished its tick-`t`
/// command, wait the fixed delay, then advance the shared tick cursor.
pub(crate) fn finish_tick_barrier(
    time: Res<Time>,
    mut commands: Commands,
    session: Option<ResMut<PlaybackSession>>,
    in_flight: Query<(), With<ActiveSteps>>,
    queues: Query<&CommandQueue>,
) {
    let Some(mut session) = session else {
        return;
    };
    match session.phase {
        SessionPhase::Loading => {}
        SessionPhase::Stepping => {
            if !in_flight.is_empty() {
                return;
            }
            let longest = queues.iter().map(|queue| queue.0.len()).max().unwrap_or(0);
            if session.tick + 1 >= longest {
                info!("playback finished after {} ticks", session.tick + 1);
                commands.remove_resource::<PlaybackSession>();
            } else {
                session.pause.reset();
                session.phase = SessionPhase::Pausing;
            }
        }
        SessionPhase::Pausing => {
            session.pause.tick(time.delta());
            if session.pause.finished() {
                session.tick += 1;
                session.phase = SessionPhase::Loading;
            }
        }
    }
}

/// Clears speech/thought bubbles whose duration has elapsed. Runs with
/// or without a session; a bubble may outlive playback.
pub(crate) fn tick_expressions(
    time: Res<Time>,
    mut commands: Commands,
    mut bubbles: Query<(Entity, &mut ExpressionTimer)>,
) {
    for (entity, mut timer) in bubbles.iter_mut() {
        timer.0.tick(time.delta());
        if timer.0.finished() {
            commands
                .entity(entity)
                .remove::<(TransientExpression, ExpressionTimer)>();
        }
    }
}
