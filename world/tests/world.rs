use cpu_defender_core::{
    Command, DamageSource, EnemyKind, Event, FireError, GameState, RepairError, SpawnProfile,
};
use cpu_defender_world::{self as world, query, World};
use glam::Vec2;

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

fn tick_frames(world: &mut World, frames: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..frames {
        world::apply(world, Command::Tick, &mut events);
    }
    events
}

fn spawn(world: &mut World, position: Vec2, speed: f32, kind: EnemyKind) {
    let _ = run(
        world,
        Command::SpawnEnemy {
            position,
            speed,
            kind,
        },
    );
}

fn destroy_stationary_enemy(world: &mut World) {
    let turret = query::turret(world).position();
    let target = turret - Vec2::new(150.0, 0.0);
    spawn(world, target, 0.0, EnemyKind::Drone);
    let _ = run(world, Command::AimAt { target });
    let _ = run(world, Command::Fire);
    let events = tick_frames(world, 20);
    assert!(
        events
            .iter()
            .any(|event| matches!(event, Event::EnemyDestroyed { .. })),
        "expected the round to destroy the stationary enemy"
    );
}

#[test]
fn tick_advances_frame_counter() {
    let mut world = World::new();
    let events = tick_frames(&mut world, 3);

    let frames: Vec<u64> = events
        .iter()
        .filter_map(|event| match event {
            Event::FrameAdvanced { frame } => Some(*frame),
            _ => None,
        })
        .collect();
    assert_eq!(frames, vec![1, 2, 3]);
    assert_eq!(query::telemetry(&world).elapsed_frames, 3);
}

#[test]
fn paused_world_ignores_ticks_and_fire() {
    let mut world = World::new();
    let events = run(&mut world, Command::SetPaused { paused: true });
    assert_eq!(events, vec![Event::PauseChanged { paused: true }]);

    assert!(tick_frames(&mut world, 10).is_empty());
    assert_eq!(query::frame(&world), 0);

    let events = run(&mut world, Command::Fire);
    assert_eq!(
        events,
        vec![Event::ShotRejected {
            reason: FireError::Paused
        }]
    );

    let repeated = run(&mut world, Command::SetPaused { paused: true });
    assert!(repeated.is_empty(), "unchanged pause flag emits nothing");
}

#[test]
fn round_destroys_enemy_and_awards_score() {
    let mut world = World::new();
    destroy_stationary_enemy(&mut world);

    assert_eq!(query::score(&world), 50);
    assert!(query::enemies(&world).is_empty());
    assert!(query::bullets(&world).is_empty());
}

#[test]
fn enemy_contact_damages_base() {
    let mut world = World::new();
    let center = query::base(&world).position();
    spawn(&mut world, center + Vec2::new(45.0, 0.0), 10.0, EnemyKind::Drone);

    let events = tick_frames(&mut world, 1);

    assert!(events.iter().any(|event| matches!(
        event,
        Event::BaseDamaged {
            source: DamageSource::Contact(EnemyKind::Drone),
            ..
        }
    )));
    assert!((query::base(&world).health() - 90.0).abs() < f32::EPSILON);
    assert!(query::enemies(&world).is_empty());
}

#[test]
fn mines_pulse_once_per_second() {
    let mut world = World::new();
    let center = query::base(&world).position();
    let _ = run(
        &mut world,
        Command::SpawnMine {
            position: center + Vec2::new(60.0, 60.0),
        },
    );
    let _ = run(
        &mut world,
        Command::SpawnMine {
            position: center - Vec2::new(60.0, 60.0),
        },
    );

    let _ = tick_frames(&mut world, 59);
    assert!((query::base(&world).health() - 100.0).abs() < f32::EPSILON);

    let _ = tick_frames(&mut world, 1);
    assert!((query::base(&world).health() - 96.0).abs() < f32::EPSILON);
    assert_eq!(query::telemetry(&world).mine_count, 2);
}

#[test]
fn firing_consumes_ammunition_until_empty() {
    let mut world = World::new();
    let capacity = query::turret(&world).ammo();
    assert_eq!(capacity, SpawnProfile::MANUAL.max_ammo);

    for expected in (0..capacity).rev() {
        let events = run(&mut world, Command::Fire);
        assert_eq!(events, vec![Event::ShotFired { ammo: expected }]);
    }

    let events = run(&mut world, Command::Fire);
    assert_eq!(
        events,
        vec![Event::ShotRejected {
            reason: FireError::NoAmmunition
        }]
    );
}

#[test]
fn ammunition_crate_refills_up_to_cap() {
    let mut world = World::new();
    for _ in 0..4 {
        let _ = run(&mut world, Command::Fire);
    }
    let turret = query::turret(&world).position();
    let _ = run(&mut world, Command::SpawnAmmoCrate { position: turret });

    let events = tick_frames(&mut world, 1);
    let collected = events.iter().find_map(|event| match event {
        Event::AmmoCollected { gained, ammo, .. } => Some((*gained, *ammo)),
        _ => None,
    });

    assert_eq!(collected, Some((4, SpawnProfile::MANUAL.max_ammo)));
    assert!(query::ammo_crates(&world).is_empty());
}

#[test]
fn lowering_ammo_cap_clamps_current_rounds() {
    let mut world = World::new();
    let profile = SpawnProfile {
        max_ammo: 5,
        ..SpawnProfile::MANUAL
    };

    let events = run(&mut world, Command::ApplySpawnProfile { profile });

    assert_eq!(events, vec![Event::SpawnProfileApplied { profile }]);
    assert_eq!(query::turret(&world).ammo(), 5);
    assert_eq!(query::telemetry(&world).max_ammo, 5);
}

#[test]
fn repair_requires_damage_and_score() {
    let mut world = World::new();
    let events = run(&mut world, Command::RepairBase);
    assert_eq!(
        events,
        vec![Event::RepairRejected {
            reason: RepairError::HealthFull
        }]
    );

    let center = query::base(&world).position();
    spawn(&mut world, center + Vec2::new(45.0, 0.0), 10.0, EnemyKind::Drone);
    let _ = tick_frames(&mut world, 1);

    let events = run(&mut world, Command::RepairBase);
    assert_eq!(
        events,
        vec![Event::RepairRejected {
            reason: RepairError::InsufficientScore
        }]
    );

    for _ in 0..10 {
        destroy_stationary_enemy(&mut world);
    }
    assert_eq!(query::score(&world), 500);

    let events = run(&mut world, Command::RepairBase);
    assert_eq!(
        events,
        vec![Event::BaseRepaired {
            health: 100.0,
            score: 0
        }]
    );
}

#[test]
fn destroyed_base_freezes_the_run() {
    let mut world = World::new();
    let center = query::base(&world).position();
    for _ in 0..5 {
        spawn(
            &mut world,
            center + Vec2::new(45.0, 0.0),
            10.0,
            EnemyKind::Explosive,
        );
    }

    let events = tick_frames(&mut world, 1);

    assert!(events
        .iter()
        .any(|event| matches!(event, Event::GameOver { score: 0 })));
    assert_eq!(query::game_state(&world), GameState::GameOver);
    assert!(tick_frames(&mut world, 5).is_empty());
    assert_eq!(
        run(&mut world, Command::Fire),
        vec![Event::ShotRejected {
            reason: FireError::GameOver
        }]
    );
}

#[test]
fn clearing_hostiles_reports_counts() {
    let mut world = World::new();
    spawn(&mut world, Vec2::new(0.0, 0.0), 1.0, EnemyKind::Drone);
    spawn(&mut world, Vec2::new(10.0, 0.0), 1.0, EnemyKind::Armed);
    let _ = run(
        &mut world,
        Command::SpawnMine {
            position: Vec2::new(300.0, 300.0),
        },
    );

    let events = run(&mut world, Command::ClearHostiles);

    assert_eq!(
        events,
        vec![Event::HostilesCleared {
            enemies: 2,
            mines: 1
        }]
    );
    assert_eq!(query::telemetry(&world).enemy_count, 0);
}
