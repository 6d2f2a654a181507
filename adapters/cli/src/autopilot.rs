//! Scripted turret used by headless simulations.

use clap::ValueEnum;
use cpu_defender_core::FRAMES_PER_SECOND;
use cpu_defender_world::{query, World};
use glam::Vec2;
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

use crate::defender::PlayerControls;

/// Playing strength of the autopilot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Skill {
    /// Slow, inaccurate and never reloads or repairs.
    Novice,
    /// Reloads when low and fires at a steady cadence.
    Steady,
    /// Fast and accurate, reloads early and repairs the base.
    Expert,
}

#[derive(Clone, Copy, Debug)]
struct Profile {
    fire_period: u32,
    aim_error: f32,
    reload_below: Option<f32>,
    repair_below: Option<f32>,
}

impl Skill {
    fn profile(self) -> Profile {
        match self {
            Self::Novice => Profile {
                fire_period: 30,
                aim_error: 40.0,
                reload_below: None,
                repair_below: None,
            },
            Self::Steady => Profile {
                fire_period: 12,
                aim_error: 12.0,
                reload_below: Some(0.3),
                repair_below: None,
            },
            Self::Expert => Profile {
                fire_period: 6,
                aim_error: 0.0,
                reload_below: Some(0.5),
                repair_below: Some(0.6),
            },
        }
    }
}

#[derive(Debug)]
pub(crate) struct Autopilot {
    profile: Profile,
    home: Vec2,
    cooldown: u32,
    rng: ChaCha8Rng,
}

impl Autopilot {
    pub(crate) fn new(skill: Skill, seed: u64) -> Self {
        Self {
            profile: skill.profile(),
            home: Vec2::new(350.0, 350.0),
            cooldown: 0,
            rng: ChaCha8Rng::seed_from_u64(seed ^ u64::from(FRAMES_PER_SECOND)),
        }
    }

    /// Chooses the controls for the next host frame.
    pub(crate) fn decide(&mut self, world: &World) -> PlayerControls {
        let turret = query::turret(world);
        let base = query::base(world);
        let position = turret.position();
        let cap = query::spawn_profile(world).max_ammo.max(1);

        let low_ammo = self
            .profile
            .reload_below
            .is_some_and(|threshold| (turret.ammo() as f32) < cap as f32 * threshold);
        let destination = if low_ammo {
            nearest(
                position,
                query::ammo_crates(world).iter().map(|ammo| ammo.position()),
            )
            .unwrap_or(self.home)
        } else {
            self.home
        };
        let offset = destination - position;
        let movement = if offset.length() > 4.0 {
            offset.normalize_or_zero()
        } else {
            Vec2::ZERO
        };

        let target = nearest(
            base.position(),
            query::enemies(world)
                .iter()
                .map(|enemy| enemy.position())
                .chain(query::mines(world).iter().map(|mine| mine.position())),
        );
        let aim = target.map(|target| {
            if self.profile.aim_error > 0.0 {
                let error = self.profile.aim_error;
                target
                    + Vec2::new(
                        self.rng.gen_range(-error..=error),
                        self.rng.gen_range(-error..=error),
                    )
            } else {
                target
            }
        });

        self.cooldown = self.cooldown.saturating_sub(1);
        let fire = aim.is_some() && turret.ammo() > 0 && self.cooldown == 0;
        if fire {
            self.cooldown = self.profile.fire_period;
        }

        let repair = self.profile.repair_below.is_some_and(|threshold| {
            base.health() < base.max_health() * threshold && query::score(world) >= 500
        });

        PlayerControls {
            movement,
            aim,
            fire,
            repair,
        }
    }
}

fn nearest(origin: Vec2, candidates: impl Iterator<Item = Vec2>) -> Option<Vec2> {
    candidates.min_by(|a, b| a.distance_squared(origin).total_cmp(&b.distance_squared(origin)))
}
