#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting hostile and pickup spawn commands.

use cpu_defender_core::{Command, EnemyKind, Event, SpawnProfile};
use glam::Vec2;
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

const EDGE_OFFSET: f32 = 30.0;
const MINE_SCATTER: f32 = 150.0;
const BASE_ENEMY_SPEED: f32 = 1.5;
const EXPLOSIVE_SPEED_FACTOR: f32 = 1.25;
const CRATE_INTERVAL_FRAMES: u32 = 240;
const MAX_LIVE_CRATES: usize = 3;
const CRATE_MARGIN: f32 = 40.0;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided random seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Pure system that deterministically emits spawn commands as frames elapse.
#[derive(Debug)]
pub struct Spawning {
    hostile_accumulator: u32,
    crate_accumulator: u32,
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            hostile_accumulator: 0,
            crate_accumulator: 0,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Consumes events and the active profile to emit spawn commands.
    ///
    /// `arena_size` is the playfield extent; the base is assumed to sit at its
    /// centre. `live_crates` is the number of ammunition crates currently on
    /// the field.
    pub fn handle(
        &mut self,
        events: &[Event],
        profile: &SpawnProfile,
        arena_size: Vec2,
        live_crates: usize,
        out: &mut Vec<Command>,
    ) {
        let mut pending_crates = 0;
        for event in events {
            match event {
                Event::FrameAdvanced { .. } => {
                    if self.advance_hostile_clock(profile) {
                        out.push(self.spawn_hostile(profile, arena_size));
                    }

                    self.crate_accumulator += 1;
                    if self.crate_accumulator >= CRATE_INTERVAL_FRAMES {
                        self.crate_accumulator = 0;
                        if live_crates + pending_crates < MAX_LIVE_CRATES {
                            pending_crates += 1;
                            out.push(Command::SpawnAmmoCrate {
                                position: self.crate_position(arena_size),
                            });
                        }
                    }
                }
                Event::HostilesCleared { .. } => {
                    self.hostile_accumulator = 0;
                }
                _ => {}
            }
        }
    }

    fn advance_hostile_clock(&mut self, profile: &SpawnProfile) -> bool {
        if profile.spawn_interval_frames == 0 {
            return false;
        }

        self.hostile_accumulator += 1;
        if self.hostile_accumulator >= profile.spawn_interval_frames {
            self.hostile_accumulator = 0;
            true
        } else {
            false
        }
    }

    fn spawn_hostile(&mut self, profile: &SpawnProfile, arena_size: Vec2) -> Command {
        let center = arena_size * 0.5;
        if profile.mines_enabled && self.rng.gen::<f32>() < profile.mine_chance {
            let offset = Vec2::new(
                self.rng.gen_range(-MINE_SCATTER..MINE_SCATTER),
                self.rng.gen_range(-MINE_SCATTER..MINE_SCATTER),
            );
            return Command::SpawnMine {
                position: center + offset,
            };
        }

        let position = self.edge_position(arena_size);
        let kind = self.select_kind(profile);
        let mut speed = (BASE_ENEMY_SPEED + self.rng.gen::<f32>()) * profile.enemy_speed_multiplier;
        if kind == EnemyKind::Explosive {
            speed *= EXPLOSIVE_SPEED_FACTOR;
        }

        Command::SpawnEnemy {
            position,
            speed,
            kind,
        }
    }

    fn select_kind(&mut self, profile: &SpawnProfile) -> EnemyKind {
        let roll = self.rng.gen::<f32>();
        if roll < profile.explosive_chance {
            EnemyKind::Explosive
        } else if roll < profile.explosive_chance + profile.armed_chance {
            EnemyKind::Armed
        } else {
            EnemyKind::Drone
        }
    }

    fn edge_position(&mut self, arena_size: Vec2) -> Vec2 {
        let along_x = self.rng.gen::<f32>() * arena_size.x;
        let along_y = self.rng.gen::<f32>() * arena_size.y;
        match self.rng.gen_range(0..4) {
            0 => Vec2::new(along_x, -EDGE_OFFSET),
            1 => Vec2::new(arena_size.x + EDGE_OFFSET, along_y),
            2 => Vec2::new(along_x, arena_size.y + EDGE_OFFSET),
            _ => Vec2::new(-EDGE_OFFSET, along_y),
        }
    }

    fn crate_position(&mut self, arena_size: Vec2) -> Vec2 {
        let span = (arena_size - Vec2::splat(CRATE_MARGIN * 2.0)).max(Vec2::ZERO);
        Vec2::new(
            CRATE_MARGIN + self.rng.gen::<f32>() * span.x,
            CRATE_MARGIN + self.rng.gen::<f32>() * span.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_never_spawns() {
        let mut spawning = Spawning::new(Config::new(1));
        let profile = SpawnProfile {
            spawn_interval_frames: 0,
            ..SpawnProfile::MANUAL
        };
        for _ in 0..1_000 {
            assert!(!spawning.advance_hostile_clock(&profile));
        }
    }

    #[test]
    fn kind_selection_honours_disabled_variants() {
        let mut spawning = Spawning::new(Config::new(7));
        for _ in 0..500 {
            assert_eq!(spawning.select_kind(&SpawnProfile::MANUAL), EnemyKind::Drone);
        }
    }
}
