//! End-to-end scenarios for the runtime guarantees.
//!
//! Each test builds a small world, plays it forward on a manual clock and
//! checks one observable guarantee: single registration, unit force, depth
//! and throttle limits, clean destruction, and the movement and path
//! scenarios.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use serde_json::Value;
use trellis::Grid;

use crate::bus::{BusConfig, Dispatch};
use crate::entity::EntityDesc;
use crate::events::Event;
use crate::game::GameConfig;
use crate::keys::Key;
use crate::movement::{self, pathfinding, Facing, MovementPhase, SteerTarget, KEYBOARD, PATH, TOUCH};
use crate::names::{EventName, LayerName};
use crate::physics::{BodyDesc, BodyHandle};

use super::helpers::{
    attach, game, game_with, press, probed_game, release, run, run_until, spawn_block, spawn_mover, FRAME_MS,
};

// =============================================================================
// Composition guarantees
// =============================================================================

#[test]
fn double_attach_registers_update_and_events_once() {
    let (mut g, _clock) = game();
    let id = spawn_mover(&mut g, Vec2::new(100.0, 100.0));
    let before = g.world().bus().subscriber_count(&EventName::KEY_DOWN);

    assert!(g.world_mut().use_registered(id, &KEYBOARD, Value::Null).unwrap());
    assert!(!g.world_mut().use_registered(id, &KEYBOARD, Value::Null).unwrap());

    assert_eq!(g.world().bus().subscriber_count(&EventName::KEY_DOWN), before + 1);
    assert_eq!(g.world().bus().subscriber_count(&EventName::KEY_UP), 1);
    assert_eq!(g.world().entity(id).unwrap().updater_count(), 1);
    assert_eq!(g.world().entity(id).unwrap().plugins(), &[KEYBOARD]);
}

#[test]
fn destroyed_entity_leaves_layers_and_physics() {
    let (mut g, clock) = game();
    let id = spawn_mover(&mut g, Vec2::new(100.0, 100.0));
    let walls = LayerName::new("walls");
    g.world_mut().add_to_layer(id, &walls);
    attach(&mut g, id, &KEYBOARD);
    let body = g.world().entity(id).unwrap().body();

    assert!(g.world_mut().destroy(id));

    assert!(!g.world().is_in_layer(id, &LayerName::ENTITIES));
    assert!(!g.world().is_in_layer(id, &walls));
    assert!(!g.world().physics().contains(body));
    g.world_mut().update_entity(id);
    press(&mut g, Key::D);
    run(&mut g, &clock, 2);
    assert_eq!(g.world().entity_count(), 0);
}

// =============================================================================
// Force and speed
// =============================================================================

#[test]
fn applied_force_has_unit_direction_regardless_of_distance() {
    let (mut g, clock, forces) = probed_game();
    let near = spawn_mover(&mut g, Vec2::new(100.0, 100.0));
    let far = spawn_mover(&mut g, Vec2::new(100.0, 300.0));
    for id in [near, far] {
        attach(&mut g, id, &TOUCH);
    }
    g.world_mut()
        .side_mut::<SteerTarget>()
        .insert(near, SteerTarget(Vec2::new(130.0, 140.0)));
    g.world_mut()
        .side_mut::<SteerTarget>()
        .insert(far, SteerTarget(Vec2::new(400.0, 700.0)));

    run(&mut g, &clock, 1);

    let near_body = g.world().entity(near).unwrap().body();
    let far_body = g.world().entity(far).unwrap().body();
    let logged = forces.borrow();
    let force_on = |body: BodyHandle| logged.iter().find(|(b, _)| *b == body).map(|(_, f)| *f).unwrap();
    let (fa, fb) = (force_on(near_body), force_on(far_body));

    assert!((fa - fb).length() < 1e-5);
    assert!((fa.normalize() - Vec2::new(0.6, 0.8)).length() < 1e-5);
}

#[test]
fn diagonal_keys_do_not_push_harder() {
    let (mut g, clock, forces) = probed_game();
    let straight = spawn_mover(&mut g, Vec2::new(100.0, 100.0));
    let diagonal = spawn_mover(&mut g, Vec2::new(100.0, 300.0));
    for id in [straight, diagonal] {
        attach(&mut g, id, &KEYBOARD);
    }
    // The second one also holds down
    press(&mut g, Key::D);
    g.world_mut()
        .side_mut::<movement::HeldAxes>()
        .insert(diagonal, movement::HeldAxes { x: 1, y: 1 });

    run(&mut g, &clock, 1);

    let logged = forces.borrow();
    assert_eq!(logged.len(), 2);
    let (a, b) = (logged[0].1, logged[1].1);
    assert!((a.length() - b.length()).abs() < 1e-6);
    assert!((b.x - b.y).abs() < 1e-6);
}

#[test]
fn speed_never_exceeds_max_after_a_tick() {
    let (mut g, clock) = game();
    let id = spawn_mover(&mut g, Vec2::new(300.0, 300.0));
    attach(&mut g, id, &KEYBOARD);
    g.world_mut().set_velocity(id, Vec2::new(30.0, 40.0));

    run(&mut g, &clock, 1);

    let velocity = g.world().velocity(id).unwrap();
    let max = movement::settings_for(g.world(), id, &KEYBOARD).max_speed;
    assert!((velocity.length() - max).abs() < 1e-4);
    assert!((velocity.normalize() - Vec2::new(0.6, 0.8)).length() < 1e-5);
}

// =============================================================================
// Bus guards
// =============================================================================

#[test]
fn self_reemitting_handler_stops_at_depth_limit() {
    let (mut g, _clock) = game_with(GameConfig {
        bus: BusConfig {
            throttle_interval_ms: 0,
            ..BusConfig::default()
        },
        ..GameConfig::default()
    });
    let echo = EventName::new("echo");
    let runs = Rc::new(RefCell::new(0u32));
    let counter = Rc::clone(&runs);
    let name = echo.clone();
    g.world_mut().on(echo.clone(), move |world, _| {
        *counter.borrow_mut() += 1;
        world.emit(Event::new(name.clone()));
    });

    assert_eq!(g.world_mut().emit(Event::new(echo)), Dispatch::Delivered(1));

    assert_eq!(*runs.borrow(), 50);
    assert_eq!(g.world().bus().stats().depth_dropped, 1);
    assert_eq!(g.world().bus().depth(), 0);
}

#[test]
fn repeat_inside_throttle_window_is_dropped() {
    let (mut g, clock) = game();
    let ping = EventName::new("ping");
    let runs = Rc::new(RefCell::new(0u32));
    let counter = Rc::clone(&runs);
    g.world_mut().on(ping.clone(), move |_, _| *counter.borrow_mut() += 1);

    g.world_mut().emit(Event::new(ping.clone()));
    clock.advance(15);
    assert_eq!(g.world_mut().emit(Event::new(ping.clone())), Dispatch::Throttled);
    clock.advance(1);
    assert_eq!(g.world_mut().emit(Event::new(ping)), Dispatch::Delivered(1));

    assert_eq!(*runs.borrow(), 2);
}

// =============================================================================
// Movement cycle
// =============================================================================

#[test]
fn held_up_key_cycles_through_phases_and_keeps_facing() {
    let (mut g, clock) = game();
    let id = spawn_mover(&mut g, Vec2::new(400.0, 500.0));
    attach(&mut g, id, &KEYBOARD);

    let mut phases = vec![movement::phase(g.world(), id).unwrap()];
    let mut record = |g: &crate::game::Game| {
        let phase = movement::phase(g.world(), id).unwrap();
        if phases.last() != Some(&phase) {
            phases.push(phase);
        }
        phase
    };

    press(&mut g, Key::ArrowUp);
    for _ in 0..120 {
        run(&mut g, &clock, 1);
        if record(&g) == MovementPhase::Moving {
            break;
        }
    }
    assert_eq!(movement::facing(g.world(), id), Some(Facing::Up));

    release(&mut g, Key::ArrowUp);
    for _ in 0..300 {
        run(&mut g, &clock, 1);
        assert_eq!(movement::facing(g.world(), id), Some(Facing::Up));
        if record(&g) == MovementPhase::Idle {
            break;
        }
    }

    assert_eq!(
        phases,
        vec![
            MovementPhase::Idle,
            MovementPhase::Accelerating,
            MovementPhase::Moving,
            MovementPhase::Stopping,
            MovementPhase::Stopped,
            MovementPhase::Idle,
        ]
    );
}

#[test]
fn acceleration_is_never_skipped() {
    let (mut g, clock) = game();
    let id = spawn_mover(&mut g, Vec2::new(400.0, 300.0));
    attach(&mut g, id, &KEYBOARD);

    press(&mut g, Key::D);
    run(&mut g, &clock, 1);

    assert_eq!(movement::phase(g.world(), id), Some(MovementPhase::Accelerating));
}

// =============================================================================
// Pathfinding scenarios
// =============================================================================

#[test]
fn corner_to_far_corner_on_an_empty_grid() {
    let (mut g, _clock) = game();
    let id = spawn_mover(&mut g, Vec2::ZERO);
    attach(&mut g, id, &PATH);

    let waypoints = pathfinding::find_path(g.world_mut(), id, Vec2::new(500.0, 500.0), None);

    assert!(!waypoints.is_empty());
    let last = *waypoints.last().unwrap();
    assert!(last.distance(Vec2::new(500.0, 500.0)) <= 32.0);
}

#[test]
fn near_and_enclosed_destinations_give_empty_paths() {
    let (mut g, _clock) = game();
    let id = spawn_mover(&mut g, Vec2::new(48.0, 48.0));
    attach(&mut g, id, &PATH);
    // A ring of blocks around (400, 300)
    for (center, size) in [
        (Vec2::new(400.0, 220.0), Vec2::new(224.0, 32.0)),
        (Vec2::new(400.0, 380.0), Vec2::new(224.0, 32.0)),
        (Vec2::new(320.0, 300.0), Vec2::new(32.0, 224.0)),
        (Vec2::new(480.0, 300.0), Vec2::new(32.0, 224.0)),
    ] {
        spawn_block(&mut g, center, size);
    }

    assert!(pathfinding::find_path(g.world_mut(), id, Vec2::new(51.0, 52.0), None).is_empty());
    assert!(pathfinding::find_path(g.world_mut(), id, Vec2::new(400.0, 300.0), None).is_empty());
    assert!(!pathfinding::has_active_path(g.world(), id));
}

#[test]
fn collision_mid_path_recalculates_without_going_through_the_obstacle() {
    let (mut g, clock) = game();
    let walker = spawn_mover(&mut g, Vec2::new(48.0, 48.0));
    attach(&mut g, walker, &PATH);
    let destination = Vec2::new(400.0, 48.0);
    assert!(!pathfinding::find_path(g.world_mut(), walker, destination, None).is_empty());

    // Dropped onto the route after planning
    let blocker = spawn_block(&mut g, Vec2::new(240.0, 48.0), Vec2::splat(16.0));

    let at_collision = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&at_collision);
    g.world_mut().on(EventName::COLLISION, move |world, event| {
        if event.involves(walker) && sink.borrow().is_none() {
            *sink.borrow_mut() = Some((
                pathfinding::is_recalculating(world, walker),
                world.velocity(walker),
                world.now_ms(),
            ));
        }
    });

    let frames = run_until(&mut g, &clock, 300, |_| at_collision.borrow().is_some());
    assert!(frames < 300);
    let (recalculating, velocity, hit_at) = at_collision.borrow().unwrap();
    assert!(recalculating);
    assert_eq!(velocity, Some(Vec2::ZERO));

    let delay = movement::settings_for(g.world(), walker, &PATH).pathfinding.recalculate_delay_ms;
    while g.world().now_ms() < hit_at + delay + FRAME_MS {
        run(&mut g, &clock, 1);
    }

    match pathfinding::path(g.world(), walker) {
        None => {}
        Some(path) => {
            assert!(!path.is_recalculating());
            let pf = movement::settings_for(g.world(), walker, &PATH).pathfinding;
            let grid = pathfinding::obstacle_grid(g.world(), walker, None, &pf).unwrap();
            let blocked = g.world().bounds(blocker).unwrap();
            for point in path.waypoints.iter().skip(1) {
                assert!(grid.is_walkable(grid.cell_at(*point, pf.grid_cell_size)));
                assert!(!blocked.expanded(8.0).contains(*point));
            }
        }
    }
}

#[test]
fn walked_path_never_enters_blocked_cells() {
    let (mut g, _clock) = game();
    let id = spawn_mover(&mut g, Vec2::new(48.0, 300.0));
    attach(&mut g, id, &PATH);
    g.world_mut().spawn(EntityDesc {
        body: BodyDesc::new(Vec2::new(400.0, 300.0), Vec2::new(64.0, 400.0)).fixed(),
        ..EntityDesc::default()
    });

    let pf = movement::settings_for(g.world(), id, &PATH).pathfinding;
    let grid = pathfinding::obstacle_grid(g.world(), id, None, &pf).unwrap();
    let waypoints = pathfinding::find_path(g.world_mut(), id, Vec2::new(720.0, 300.0), None);
    assert!(!waypoints.is_empty());

    let cells: Vec<_> = waypoints
        .iter()
        .map(|p| grid.cell_at(*p, pf.grid_cell_size))
        .collect();
    for cell in trellis::expand_path(&cells).into_iter().skip(1) {
        assert!(grid.is_walkable(cell), "walked through {cell:?}");
    }
    assert_eq!(Grid::cell_center(cells[0], pf.grid_cell_size), waypoints[0]);
}

#[test]
fn crawling_entity_abandons_its_path() {
    let (mut g, clock) = game();
    let id = g.world_mut().spawn(EntityDesc {
        body: BodyDesc {
            mass: 1000.0,
            ..BodyDesc::new(Vec2::new(48.0, 48.0), Vec2::splat(16.0))
        },
        ..EntityDesc::default()
    });
    g.add_entity(id);
    attach(&mut g, id, &PATH);
    assert!(!pathfinding::find_path(g.world_mut(), id, Vec2::new(598.0, 48.0), None).is_empty());

    let settings = movement::settings_for(g.world(), id, &PATH);
    let stuck_ticks = settings.pathfinding.stuck_ticks;
    run(&mut g, &clock, stuck_ticks - 5);

    let crawl = settings.max_speed * settings.pathfinding.stuck_speed_fraction;
    assert!(g.world().velocity(id).unwrap().length() < crawl);
    assert!(pathfinding::has_active_path(g.world(), id));

    let frames = run_until(&mut g, &clock, 10, |g| !pathfinding::has_active_path(g.world(), id));
    assert!(frames < 10);
    assert_eq!(g.world().velocity(id), Some(Vec2::ZERO));
}

#[test]
fn progressing_entity_keeps_its_path() {
    let (mut g, clock) = game();
    let id = spawn_mover(&mut g, Vec2::new(48.0, 48.0));
    attach(&mut g, id, &PATH);
    assert!(!pathfinding::find_path(g.world_mut(), id, Vec2::new(598.0, 48.0), None).is_empty());

    let stuck_ticks = movement::settings_for(g.world(), id, &PATH).pathfinding.stuck_ticks;
    run(&mut g, &clock, stuck_ticks + 10);

    assert!(pathfinding::has_active_path(g.world(), id));
    assert!(g.world().position(id).unwrap().x > 100.0);
}
