//! Pure translation of one command into timed intermediate poses.
//!
//! The planner never touches ECS state: it takes the sprite's current
//! pose and returns the finite list of poses the scheduler should write,
//! together with the uniform delay between them. Say/think produce no
//! poses at all; their expression timing belongs to the scheduler.

use std::time::Duration;

use crate::command::Action;
use crate::config::CANVAS_CENTER;
use crate::sprite::Pose;

/// Distance covered by one move step, in canvas units.
const MOVE_STEP_UNITS: f32 = 1.0;
/// Degrees covered by one turn step.
const TURN_STEP_DEGREES: f32 = 1.0;
/// Straight-line distance covered by one goto step.
const GOTO_STEP_UNITS: f32 = 5.0;
/// Delay between pose steps for move/turn/goto.
const POSE_STEP_MS: u64 = 30;
/// Delay between bounce micro-steps for repeat.
const BOUNCE_STEP_MS: u64 = 100;
/// Displacement of each bounce micro-step.
const BOUNCE_OFFSET: f32 = 10.0;
/// Upper bound on the poses materialized for one command. Absurd
/// operands clamp here instead of exhausting memory; float-to-int
/// casts saturate, so NaN yields zero steps and infinities clamp.
const MAX_PLAN_STEPS: usize = 100_000;

/// The poses a single command resolves to, in execution order, plus the
/// wait applied after each one.
#[derive(Clone, Debug, PartialEq)]
pub struct StepPlan {
    pub poses: Vec<Pose>,
    pub step_delay: Duration,
}

impl StepPlan {
    fn empty() -> Self {
        Self {
            poses: Vec::new(),
            step_delay: Duration::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

/// Plans the intermediate poses for `action` starting from `start`.
pub fn plan(action: &Action, start: Pose) -> StepPlan {
    match action {
        Action::Move { steps } => plan_move(*steps, start),
        Action::Turn { degrees } => plan_turn(*degrees, start),
        Action::Goto { x, y } => plan_goto(*x, *y, start),
        Action::Repeat { count } => plan_bounce(*count, start),
        // Expressions change no pose; the scheduler raises the bubble.
        Action::Say { .. } | Action::Think { .. } => StepPlan::empty(),
    }
}

fn plan_move(steps: f32, start: Pose) -> StepPlan {
    let count = (steps.abs().ceil() as usize).min(MAX_PLAN_STEPS);
    let direction = start.rotation.to_radians();
    let sign = if steps < 0.0 { -1.0 } else { 1.0 };
    let dx = direction.cos() * MOVE_STEP_UNITS * sign;
    let dy = direction.sin() * MOVE_STEP_UNITS * sign;

    let mut poses = Vec::with_capacity(count);
    let mut pose = start;
    for _ in 0..count {
        pose.x += dx;
        pose.y += dy;
        poses.push(pose);
    }
    StepPlan {
        poses,
        step_delay: Duration::from_millis(POSE_STEP_MS),
    }
}

fn plan_turn(degrees: f32, start: Pose) -> StepPlan {
    let count = (degrees.abs().ceil() as usize).min(MAX_PLAN_STEPS);
    let delta = if degrees < 0.0 {
        -TURN_STEP_DEGREES
    } else {
        TURN_STEP_DEGREES
    };

    let mut poses = Vec::with_capacity(count);
    let mut pose = start;
    for _ in 0..count {
        pose.rotation += delta;
        poses.push(pose);
    }
    StepPlan {
        poses,
        step_delay: Duration::from_millis(POSE_STEP_MS),
    }
}

fn plan_goto(x: f32, y: f32, start: Pose) -> StepPlan {
    let target_x = x + CANVAS_CENTER;
    let target_y = y + CANVAS_CENTER;
    let distance = (target_x - start.x).hypot(target_y - start.y);
    if distance == 0.0 {
        return StepPlan::empty();
    }

    let count = ((distance / GOTO_STEP_UNITS).ceil() as usize).min(MAX_PLAN_STEPS);
    let mut poses = Vec::with_capacity(count);
    for i in 1..=count {
        let t = i as f32 / count as f32;
        poses.push(Pose {
            x: start.x + (target_x - start.x) * t,
            y: start.y + (target_y - start.y) * t,
            rotation: start.rotation,
        });
    }
    StepPlan {
        poses,
        step_delay: Duration::from_millis(POSE_STEP_MS),
    }
}

// The bounce pattern is a fixed displacement regardless of heading; the
// sandbox has always behaved that way, so it stays heading-blind.
fn plan_bounce(count: u32, start: Pose) -> StepPlan {
    let offsets = [
        (BOUNCE_OFFSET, 0.0),
        (0.0, BOUNCE_OFFSET),
        (-BOUNCE_OFFSET, 0.0),
        (0.0, -BOUNCE_OFFSET),
    ];

    let reps = (count as usize).min(MAX_PLAN_STEPS / offsets.len());
    let mut poses = Vec::with_capacity(reps * offsets.len());
    let mut pose = start;
    for _ in 0..reps {
        for (dx, dy) in offsets {
            pose.x += dx;
            pose.y += dy;
            poses.push(pose);
        }
    }
    StepPlan {
        poses,
        step_delay: Duration::from_millis(BOUNCE_STEP_MS),
    }
}
