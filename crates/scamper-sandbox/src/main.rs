//! Headless sandbox for the scamper runtime core.
//!
//! Builds a small scene (a keyboard and path driven player, a watching NPC
//! and seeded static obstacles), plays a fixed input script against a manual
//! clock and logs what happens. Runs are reproducible for a given seed.
//!
//! ```text
//! RUST_LOG=debug scamper-sandbox --ticks 900 --seed 42
//! ```

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scamper_core::clock::ManualClock;
use scamper_core::entity::{EntityDesc, EntityId};
use scamper_core::keys::Key;
use scamper_core::movement::{self, pathfinding, KEYBOARD, PATH};
use scamper_core::physics::{BodyDesc, KinematicWorld};
use scamper_core::visual::Frames;
use scamper_core::{AnimationName, Event, EventName, Game, GameConfig, LayerName, Payload};

#[derive(Parser)]
#[command(version, about = "Scripted headless run of the scamper runtime core")]
struct Cli {
    /// JSON game configuration; defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Frames to run.
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Seed for obstacle placement.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Frame length in milliseconds.
    #[arg(long, default_value_t = 16)]
    dt_ms: u64,

    /// Number of static obstacles.
    #[arg(long, default_value_t = 6)]
    obstacles: usize,
}

/// One scripted input.
#[derive(Debug, Clone)]
enum Input {
    Press(Key),
    Release(Key),
    Tap(Vec2),
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            GameConfig::from_json_str(&raw).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => GameConfig::default(),
    };

    let clock = ManualClock::new();
    let physics = KinematicWorld::new(config.physics);
    let mut game = Game::new(config, Box::new(physics), Rc::new(clock.clone()))?;

    let scene = build_scene(&mut game, cli.seed, cli.obstacles)?;
    let script = script(game.world().playfield());
    info!(
        seed = cli.seed,
        ticks = cli.ticks,
        entities = game.world().entity_count(),
        "sandbox scene ready"
    );

    run(&mut game, &clock, &cli, &scene, &script);

    let stats = game.world().bus().stats();
    info!(
        delivered = stats.delivered,
        throttled = stats.throttled,
        depth_dropped = stats.depth_dropped,
        "bus totals"
    );
    game.teardown();
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// =============================================================================
// Scene
// =============================================================================

struct Scene {
    player: EntityId,
    npc: EntityId,
}

fn build_scene(game: &mut Game, seed: u64, obstacles: usize) -> anyhow::Result<Scene> {
    let playfield = game.world().playfield();
    let start = playfield * 0.5;
    let player_layer = LayerName::new("player");

    let player = game
        .world_mut()
        .spawn(EntityDesc::at(start, Vec2::splat(24.0)));
    game.add_entity(player);
    for (name, frame) in [
        ("movingX", "hero_walk_side"),
        ("movingUp", "hero_walk_up"),
        ("movingDown", "hero_walk_down"),
        ("stopped", "hero_stand"),
    ] {
        game.world_mut()
            .animate(player, AnimationName::new(name), Frames::from(frame));
    }
    game.world_mut().add_to_layer(player, &player_layer);
    game.world_mut()
        .use_registered(player, &KEYBOARD, json!({ "maxSpeed": 4.0 }))?;
    game.world_mut().use_registered(
        player,
        &PATH,
        json!({ "maxSpeed": 4.0, "pathfinding": { "gridCellSize": 32.0 } }),
    )?;

    let npc = game.world_mut().spawn(EntityDesc {
        body: BodyDesc::new(Vec2::new(start.x + 160.0, start.y), Vec2::splat(24.0)).fixed(),
        ..EntityDesc::default()
    });
    game.world_mut().on_layer(npc, &player_layer, move |world, event| {
        if let Some(other) = event.entity() {
            info!(npc = %npc, player = %other, at = ?world.position(other), "npc bumped by player");
        }
    });

    if playfield.min_element() < 240.0 {
        warn!(?playfield, "playfield too small for obstacles");
        return Ok(Scene { player, npc });
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut placed = 0;
    for _ in 0..obstacles * 20 {
        if placed == obstacles {
            break;
        }
        let size = Vec2::new(rng.gen_range(24.0..96.0), rng.gen_range(24.0..96.0));
        let center = Vec2::new(
            rng.gen_range(size.x..playfield.x - size.x),
            rng.gen_range(size.y..playfield.y - size.y),
        );
        if center.distance(start) < 120.0 || center.distance(Vec2::new(start.x + 160.0, start.y)) < 80.0 {
            continue;
        }
        game.world_mut().spawn(EntityDesc {
            body: BodyDesc::new(center, size).fixed(),
            ..EntityDesc::default()
        });
        placed += 1;
    }
    if placed < obstacles {
        warn!(placed, requested = obstacles, "could not place every obstacle");
    }

    Ok(Scene { player, npc })
}

fn script(playfield: Vec2) -> Vec<(u64, Input)> {
    vec![
        (10, Input::Press(Key::D)),
        (70, Input::Release(Key::D)),
        (100, Input::Press(Key::W)),
        (140, Input::Release(Key::W)),
        (200, Input::Tap(Vec2::new(playfield.x * 0.15, playfield.y * 0.85))),
        (420, Input::Press(Key::ArrowRight)),
        (450, Input::Release(Key::ArrowRight)),
        (480, Input::Tap(Vec2::new(playfield.x * 0.85, playfield.y * 0.2))),
    ]
}

// =============================================================================
// Loop
// =============================================================================

#[allow(clippy::cast_precision_loss)]
fn run(game: &mut Game, clock: &ManualClock, cli: &Cli, scene: &Scene, script: &[(u64, Input)]) {
    let mut next = script.iter().peekable();

    for tick in 0..cli.ticks {
        while let Some((_, input)) = next.next_if(|(at, _)| *at == tick) {
            apply(game, input);
        }

        clock.advance(cli.dt_ms);
        game.tick(cli.dt_ms as f32);

        if !game.world().is_alive(scene.player) {
            warn!(tick, "player is gone; stopping early");
            return;
        }
        if tick % 60 == 0 {
            let world = game.world();
            info!(
                tick,
                position = ?world.position(scene.player),
                phase = ?movement::phase(world, scene.player),
                facing = ?movement::facing(world, scene.player),
                animation = ?world.visual(scene.player).and_then(|v| v.current()).map(AnimationName::as_str),
                on_path = pathfinding::has_active_path(world, scene.player),
                "player"
            );
        }
    }

    if let Some(path) = pathfinding::path(game.world(), scene.player) {
        info!(remaining = path.waypoints.len(), destination = ?path.destination, "run ended mid-path");
    }
    info!(npc_alive = game.world().is_alive(scene.npc), ticks = game.ticks(), "run finished");
}

fn apply(game: &mut Game, input: &Input) {
    let event = match input {
        Input::Press(key) => Event::new(EventName::KEY_DOWN).with(Payload::Key(key.clone())),
        Input::Release(key) => Event::new(EventName::KEY_UP).with(Payload::Key(key.clone())),
        Input::Tap(point) => Event::new(EventName::POINTER_TAP).with(Payload::Point(*point)),
    };
    info!(?input, "input");
    game.world_mut().emit(event);
}
