#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative arena state management for CPU Defender.

use cpu_defender_core::{
    Command, CrateId, DamageSource, EnemyId, EnemyKind, Event, FireError, GameState, MineId,
    RepairError, SpawnProfile, TelemetrySnapshot,
};
use glam::Vec2;

const DEFAULT_ARENA_WIDTH: f32 = 700.0;
const DEFAULT_ARENA_HEIGHT: f32 = 500.0;

const BASE_MAX_HEALTH: f32 = 100.0;
const BASE_CONTACT_RADIUS: f32 = 40.0;

const TURRET_SPEED: f32 = 4.0;
const TURRET_MARGIN: f32 = 20.0;
const TURRET_START_OFFSET: f32 = 100.0;

const BULLET_SPEED: f32 = 10.0;
const BULLET_RADIUS: f32 = 4.0;

const ARMED_STANDOFF: f32 = 150.0;
const ARMED_FIRE_FRAMES: u32 = 90;
const ARMED_DAMAGE: f32 = 5.0;

const MINE_HIT_RADIUS: f32 = 15.0;
const MINE_PULSE_FRAMES: u64 = 60;
const MINE_DAMAGE: f32 = 2.0;

const CRATE_PICKUP_RADIUS: f32 = 24.0;

const ENEMY_SCORE: u32 = 50;
const MINE_SCORE: u32 = 150;
const REPAIR_COST: u32 = 500;
const REPAIR_AMOUNT: f32 = 30.0;

/// Rectangular playfield that hosts every entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arena {
    width: f32,
    height: f32,
}

impl Arena {
    /// Creates an arena with the provided dimensions.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width of the arena in world units.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Height of the arena in world units.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Centre of the arena, where the base sits.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Reports whether the position lies inside the arena bounds.
    #[must_use]
    pub fn contains(&self, position: Vec2) -> bool {
        (0.0..=self.width).contains(&position.x) && (0.0..=self.height).contains(&position.y)
    }

    fn clamp_with_margin(&self, position: Vec2, margin: f32) -> Vec2 {
        Vec2::new(
            position.x.clamp(margin, (self.width - margin).max(margin)),
            position.y.clamp(margin, (self.height - margin).max(margin)),
        )
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(DEFAULT_ARENA_WIDTH, DEFAULT_ARENA_HEIGHT)
    }
}

/// The processor core the player defends.
#[derive(Clone, Debug, PartialEq)]
pub struct Base {
    position: Vec2,
    health: f32,
}

impl Base {
    /// Position of the base.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Remaining health in the range `0.0..=100.0`.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Maximum health the base can hold.
    #[must_use]
    pub const fn max_health(&self) -> f32 {
        BASE_MAX_HEALTH
    }
}

/// Player-controlled turret.
#[derive(Clone, Debug, PartialEq)]
pub struct Turret {
    position: Vec2,
    heading: f32,
    ammo: u32,
}

impl Turret {
    /// Position of the turret.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Barrel heading in radians, measured from the positive x axis.
    #[must_use]
    pub const fn heading(&self) -> f32 {
        self.heading
    }

    /// Rounds currently loaded.
    #[must_use]
    pub const fn ammo(&self) -> u32 {
        self.ammo
    }
}

/// Round travelling across the arena.
#[derive(Clone, Debug, PartialEq)]
pub struct Bullet {
    position: Vec2,
    velocity: Vec2,
}

impl Bullet {
    /// Current position of the round.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Collision radius of the round.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        BULLET_RADIUS
    }
}

/// Hostile unit homing on the base.
#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    id: EnemyId,
    kind: EnemyKind,
    position: Vec2,
    speed: f32,
    fire_countdown: u32,
}

impl Enemy {
    /// Identifier of the unit.
    #[must_use]
    pub const fn id(&self) -> EnemyId {
        self.id
    }

    /// Behavioural variant of the unit.
    #[must_use]
    pub const fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// Current position of the unit.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Distance travelled per frame.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }
}

/// Stationary hazard that pulses damage into the base.
#[derive(Clone, Debug, PartialEq)]
pub struct Mine {
    id: MineId,
    position: Vec2,
}

impl Mine {
    /// Identifier of the mine.
    #[must_use]
    pub const fn id(&self) -> MineId {
        self.id
    }

    /// Position of the mine.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }
}

/// Ammunition pickup waiting to be collected.
#[derive(Clone, Debug, PartialEq)]
pub struct AmmoCrate {
    id: CrateId,
    position: Vec2,
}

impl AmmoCrate {
    /// Identifier of the crate.
    #[must_use]
    pub const fn id(&self) -> CrateId {
        self.id
    }

    /// Position of the crate.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }
}

/// Represents the authoritative CPU Defender arena state.
#[derive(Debug)]
pub struct World {
    arena: Arena,
    base: Base,
    turret: Turret,
    bullets: Vec<Bullet>,
    enemies: Vec<Enemy>,
    mines: Vec<Mine>,
    crates: Vec<AmmoCrate>,
    profile: SpawnProfile,
    score: u32,
    frame: u64,
    paused: bool,
    state: GameState,
    next_enemy: u32,
    next_mine: u32,
    next_crate: u32,
}

impl World {
    /// Creates a fresh arena ready for play with the manual spawn profile.
    #[must_use]
    pub fn new() -> Self {
        Self::with_arena(Arena::default())
    }

    /// Creates a fresh arena with custom dimensions.
    #[must_use]
    pub fn with_arena(arena: Arena) -> Self {
        let center = arena.center();
        let profile = SpawnProfile::MANUAL;
        let turret_start =
            arena.clamp_with_margin(center + Vec2::new(0.0, TURRET_START_OFFSET), TURRET_MARGIN);
        Self {
            arena,
            base: Base {
                position: center,
                health: BASE_MAX_HEALTH,
            },
            turret: Turret {
                position: turret_start,
                heading: 0.0,
                ammo: profile.max_ammo,
            },
            bullets: Vec::new(),
            enemies: Vec::new(),
            mines: Vec::new(),
            crates: Vec::new(),
            profile,
            score: 0,
            frame: 0,
            paused: false,
            state: GameState::Playing,
            next_enemy: 0,
            next_mine: 0,
            next_crate: 0,
        }
    }

    fn accepts_input(&self) -> bool {
        !self.paused && self.state == GameState::Playing
    }

    fn damage_base(&mut self, amount: f32, source: DamageSource, out_events: &mut Vec<Event>) {
        self.base.health = (self.base.health - amount).max(0.0);
        out_events.push(Event::BaseDamaged {
            amount,
            health: self.base.health,
            source,
        });
    }

    fn advance_frame(&mut self, out_events: &mut Vec<Event>) {
        self.frame = self.frame.saturating_add(1);
        out_events.push(Event::FrameAdvanced { frame: self.frame });

        self.advance_bullets();
        self.advance_enemies(out_events);
        self.resolve_enemy_hits(out_events);
        self.resolve_mine_hits(out_events);
        if self.frame % MINE_PULSE_FRAMES == 0 {
            self.pulse_mines(out_events);
        }
        self.collect_crates(out_events);

        if self.base.health <= 0.0 {
            self.state = GameState::GameOver;
            tracing::info!(score = self.score, frame = self.frame, "base destroyed");
            out_events.push(Event::GameOver { score: self.score });
        }
    }

    fn advance_bullets(&mut self) {
        let arena = self.arena;
        for bullet in &mut self.bullets {
            bullet.position += bullet.velocity;
        }
        self.bullets.retain(|bullet| arena.contains(bullet.position));
    }

    fn advance_enemies(&mut self, out_events: &mut Vec<Event>) {
        let target = self.base.position;
        let mut gunfire = 0;
        let mut index = 0;
        while index < self.enemies.len() {
            let enemy = &mut self.enemies[index];
            let offset = target - enemy.position;
            let distance = offset.length();

            if enemy.kind == EnemyKind::Armed && distance <= ARMED_STANDOFF {
                enemy.fire_countdown = enemy.fire_countdown.saturating_sub(1);
                if enemy.fire_countdown == 0 {
                    enemy.fire_countdown = ARMED_FIRE_FRAMES;
                    gunfire += 1;
                }
                index += 1;
                continue;
            }

            if distance > f32::EPSILON {
                enemy.position += offset / distance * enemy.speed;
            }

            if enemy.position.distance(target) < BASE_CONTACT_RADIUS {
                let enemy = self.enemies.remove(index);
                out_events.push(Event::EnemyReachedBase {
                    enemy: enemy.id,
                    position: enemy.position,
                });
                self.damage_base(
                    enemy.kind.contact_damage(),
                    DamageSource::Contact(enemy.kind),
                    out_events,
                );
                continue;
            }

            index += 1;
        }

        for _ in 0..gunfire {
            self.damage_base(ARMED_DAMAGE, DamageSource::Gunfire, out_events);
        }
    }

    fn resolve_enemy_hits(&mut self, out_events: &mut Vec<Event>) {
        let mut index = 0;
        while index < self.enemies.len() {
            let enemy = &self.enemies[index];
            let reach = enemy.kind.radius() + BULLET_RADIUS;
            let hit = self
                .bullets
                .iter()
                .position(|bullet| bullet.position.distance(enemy.position) < reach);

            let Some(bullet_index) = hit else {
                index += 1;
                continue;
            };

            let _ = self.bullets.remove(bullet_index);
            let enemy = self.enemies.remove(index);
            self.score = self.score.saturating_add(ENEMY_SCORE);
            out_events.push(Event::EnemyDestroyed {
                enemy: enemy.id,
                position: enemy.position,
                score: self.score,
            });
        }
    }

    fn resolve_mine_hits(&mut self, out_events: &mut Vec<Event>) {
        let mut index = 0;
        while index < self.mines.len() {
            let mine = &self.mines[index];
            let hit = self
                .bullets
                .iter()
                .position(|bullet| bullet.position.distance(mine.position) < MINE_HIT_RADIUS);

            let Some(bullet_index) = hit else {
                index += 1;
                continue;
            };

            let _ = self.bullets.remove(bullet_index);
            let mine = self.mines.remove(index);
            self.score = self.score.saturating_add(MINE_SCORE);
            out_events.push(Event::MineCleared {
                mine: mine.id,
                position: mine.position,
                score: self.score,
            });
        }
    }

    fn pulse_mines(&mut self, out_events: &mut Vec<Event>) {
        for _ in 0..self.mines.len() {
            self.damage_base(MINE_DAMAGE, DamageSource::Mine, out_events);
        }
    }

    fn collect_crates(&mut self, out_events: &mut Vec<Event>) {
        let turret = self.turret.position;
        let mut index = 0;
        while index < self.crates.len() {
            if self.crates[index].position.distance(turret) >= CRATE_PICKUP_RADIUS {
                index += 1;
                continue;
            }

            let collected = self.crates.remove(index);
            let capacity = self.profile.max_ammo.saturating_sub(self.turret.ammo);
            let gained = self.profile.ammo_per_pickup.min(capacity);
            self.turret.ammo += gained;
            out_events.push(Event::AmmoCollected {
                crate_id: collected.id,
                gained,
                ammo: self.turret.ammo,
            });
        }
    }

    fn fire(&mut self, out_events: &mut Vec<Event>) {
        if self.state == GameState::GameOver {
            out_events.push(Event::ShotRejected {
                reason: FireError::GameOver,
            });
            return;
        }
        if self.paused {
            out_events.push(Event::ShotRejected {
                reason: FireError::Paused,
            });
            return;
        }
        if self.turret.ammo == 0 {
            out_events.push(Event::ShotRejected {
                reason: FireError::NoAmmunition,
            });
            return;
        }

        self.turret.ammo -= 1;
        let direction = Vec2::from_angle(self.turret.heading);
        self.bullets.push(Bullet {
            position: self.turret.position,
            velocity: direction * BULLET_SPEED,
        });
        out_events.push(Event::ShotFired {
            ammo: self.turret.ammo,
        });
    }

    fn repair(&mut self, out_events: &mut Vec<Event>) {
        let rejection = if self.state == GameState::GameOver {
            Some(RepairError::GameOver)
        } else if self.base.health >= BASE_MAX_HEALTH {
            Some(RepairError::HealthFull)
        } else if self.score < REPAIR_COST {
            Some(RepairError::InsufficientScore)
        } else {
            None
        };

        if let Some(reason) = rejection {
            out_events.push(Event::RepairRejected { reason });
            return;
        }

        self.score -= REPAIR_COST;
        self.base.health = (self.base.health + REPAIR_AMOUNT).min(BASE_MAX_HEALTH);
        out_events.push(Event::BaseRepaired {
            health: self.base.health,
            score: self.score,
        });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick => {
            if world.accepts_input() {
                world.advance_frame(out_events);
            }
        }
        Command::MovePlayer { direction } => {
            if !world.accepts_input() {
                return;
            }
            let step = direction.clamp(Vec2::splat(-1.0), Vec2::splat(1.0)) * TURRET_SPEED;
            world.turret.position = world
                .arena
                .clamp_with_margin(world.turret.position + step, TURRET_MARGIN);
        }
        Command::AimAt { target } => {
            let offset = target - world.turret.position;
            if offset.length_squared() > f32::EPSILON {
                world.turret.heading = offset.y.atan2(offset.x);
            }
        }
        Command::Fire => world.fire(out_events),
        Command::SpawnEnemy {
            position,
            speed,
            kind,
        } => {
            if world.state == GameState::GameOver {
                return;
            }
            let id = EnemyId::new(world.next_enemy);
            world.next_enemy = world.next_enemy.wrapping_add(1);
            world.enemies.push(Enemy {
                id,
                kind,
                position,
                speed: speed.max(0.0),
                fire_countdown: ARMED_FIRE_FRAMES,
            });
            out_events.push(Event::EnemySpawned { enemy: id, kind });
        }
        Command::SpawnMine { position } => {
            if world.state == GameState::GameOver {
                return;
            }
            let id = MineId::new(world.next_mine);
            world.next_mine = world.next_mine.wrapping_add(1);
            world.mines.push(Mine { id, position });
            out_events.push(Event::MineSpawned { mine: id });
        }
        Command::SpawnAmmoCrate { position } => {
            if world.state == GameState::GameOver {
                return;
            }
            let id = CrateId::new(world.next_crate);
            world.next_crate = world.next_crate.wrapping_add(1);
            world.crates.push(AmmoCrate { id, position });
            out_events.push(Event::AmmoCrateSpawned { crate_id: id });
        }
        Command::RepairBase => world.repair(out_events),
        Command::ApplySpawnProfile { profile } => {
            world.profile = profile;
            world.turret.ammo = world.turret.ammo.min(profile.max_ammo);
            out_events.push(Event::SpawnProfileApplied { profile });
        }
        Command::SetPaused { paused } => {
            if world.paused != paused {
                world.paused = paused;
                out_events.push(Event::PauseChanged { paused });
            }
        }
        Command::ClearHostiles => {
            let enemies = world.enemies.len();
            let mines = world.mines.len();
            world.enemies.clear();
            world.mines.clear();
            out_events.push(Event::HostilesCleared { enemies, mines });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{AmmoCrate, Arena, Base, Bullet, Enemy, Mine, Turret, World};
    use cpu_defender_core::{GameState, SpawnProfile, TelemetrySnapshot};

    /// Dimensions of the playfield.
    #[must_use]
    pub fn arena(world: &World) -> Arena {
        world.arena
    }

    /// Provides read-only access to the defended base.
    #[must_use]
    pub fn base(world: &World) -> &Base {
        &world.base
    }

    /// Provides read-only access to the player turret.
    #[must_use]
    pub fn turret(world: &World) -> &Turret {
        &world.turret
    }

    /// Rounds currently in flight.
    #[must_use]
    pub fn bullets(world: &World) -> &[Bullet] {
        &world.bullets
    }

    /// Live hostile units in spawn order.
    #[must_use]
    pub fn enemies(world: &World) -> &[Enemy] {
        &world.enemies
    }

    /// Live mines in spawn order.
    #[must_use]
    pub fn mines(world: &World) -> &[Mine] {
        &world.mines
    }

    /// Ammunition crates waiting to be collected.
    #[must_use]
    pub fn ammo_crates(world: &World) -> &[AmmoCrate] {
        &world.crates
    }

    /// Spawn profile currently in effect.
    #[must_use]
    pub fn spawn_profile(world: &World) -> SpawnProfile {
        world.profile
    }

    /// Current score.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.score
    }

    /// Frames simulated since the run started.
    #[must_use]
    pub fn frame(world: &World) -> u64 {
        world.frame
    }

    /// Reports whether the simulation clock is frozen.
    #[must_use]
    pub fn is_paused(world: &World) -> bool {
        world.paused
    }

    /// Lifecycle state of the run.
    #[must_use]
    pub fn game_state(world: &World) -> GameState {
        world.state
    }

    /// Captures the quantities consumed by adaptive difficulty.
    #[must_use]
    pub fn telemetry(world: &World) -> TelemetrySnapshot {
        super::telemetry_snapshot(world)
    }
}

fn telemetry_snapshot(world: &World) -> TelemetrySnapshot {
    TelemetrySnapshot {
        score: world.score,
        base_health: world.base.health,
        enemy_count: world.enemies.len(),
        mine_count: world.mines.len(),
        elapsed_frames: world.frame,
        ammo: world.turret.ammo,
        max_ammo: world.profile.max_ammo,
    }
}
