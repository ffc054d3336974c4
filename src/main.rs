//! Headless demo: two cats on a collision course, then a full report.

use spritelab::{Action, SandboxEngine, SpriteKind};

fn main() {
    println!("[spritelab] Starting headless demo");
    let mut engine = SandboxEngine::new();

    let cat = engine.add_sprite(SpriteKind::Cat);
    let blue = engine.add_sprite(SpriteKind::BlueCat);
    engine
        .set_sprite_pose(blue, 400.0, 150.0, 180.0)
        .expect("position blue cat");

    for block in spritelab::palette() {
        println!("[spritelab] palette block: {}", block.label);
    }

    // The cat walks right, the blue cat walks left (heading 180), so
    // their boxes meet mid-canvas and the queues swap.
    for _ in 0..4 {
        engine
            .enqueue_command(cat, Action::Move { steps: 40.0 })
            .expect("enqueue");
        engine
            .enqueue_command(blue, Action::Move { steps: 40.0 })
            .expect("enqueue");
    }
    engine
        .enqueue_command(
            cat,
            Action::Say {
                text: "that was close!".to_string(),
                duration_ms: 2000,
            },
        )
        .expect("enqueue");

    if !engine.play() {
        eprintln!("[spritelab] play() rejected");
        std::process::exit(1);
    }

    for snapshot in engine.list_sprites() {
        println!(
            "[spritelab] sprite {} ({:?}) at ({:.1}, {:.1}) rot {:.1}",
            snapshot.id.0, snapshot.kind, snapshot.x, snapshot.y, snapshot.rotation
        );
    }
    println!("[spritelab] collisions: {}", engine.collision_count());
    if let Some(text) = engine.hero_text() {
        println!("[spritelab] hero effect: {text}");
    }
    println!("[spritelab] effects: {}", engine.drain_effects().len());
    println!("[spritelab] stats: {}", engine.stats().snapshot());
}
