#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the CPU Defender cabinet.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative arena, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. The adaptive difficulty systems additionally
//! share the telemetry and classification vocabulary declared here:
//! [`TelemetrySnapshot`], [`FeatureVector`], [`ClassProbabilities`] and
//! [`DifficultyLevel`].

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canonical title shown by adapters when the cabinet boots.
pub const CABINET_TITLE: &str = "CPU Defender Arcade";

/// Number of fixed simulation frames executed per simulated second.
pub const FRAMES_PER_SECOND: u32 = 60;

/// Simulated time covered by a single [`Command::Tick`].
pub const FRAME_DURATION: Duration = Duration::from_nanos(1_000_000_000 / FRAMES_PER_SECOND as u64);

/// Commands that express all permissible arena mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation by exactly one fixed frame.
    Tick,
    /// Moves the player turret along the provided input direction for one frame.
    MovePlayer {
        /// Desired travel direction; components are clamped to `-1.0..=1.0`.
        direction: Vec2,
    },
    /// Points the turret barrel at the provided arena position.
    AimAt {
        /// Arena position the turret should face.
        target: Vec2,
    },
    /// Fires a single round along the turret's current heading.
    Fire,
    /// Requests that a hostile unit enter the arena.
    SpawnEnemy {
        /// Arena position at which the unit appears.
        position: Vec2,
        /// Distance travelled per frame.
        speed: f32,
        /// Behavioural variant of the unit.
        kind: EnemyKind,
    },
    /// Requests that a stationary mine be planted near the base.
    SpawnMine {
        /// Arena position of the mine.
        position: Vec2,
    },
    /// Requests that an ammunition crate be dropped into the arena.
    SpawnAmmoCrate {
        /// Arena position of the crate.
        position: Vec2,
    },
    /// Spends score to restore base health.
    RepairBase,
    /// Replaces the spawn parameters consumed by spawning and resource caps.
    ApplySpawnProfile {
        /// Profile that becomes active immediately.
        profile: SpawnProfile,
    },
    /// Freezes or resumes the simulation clock.
    SetPaused {
        /// Whether ticks should be ignored.
        paused: bool,
    },
    /// Removes every live enemy and mine from the arena.
    ClearHostiles,
}

/// Events broadcast by the arena after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced by one frame.
    FrameAdvanced {
        /// Total number of frames simulated after this tick.
        frame: u64,
    },
    /// Confirms that the turret fired a round.
    ShotFired {
        /// Rounds remaining after the shot.
        ammo: u32,
    },
    /// Reports that a fire request was rejected.
    ShotRejected {
        /// Specific reason the shot did not happen.
        reason: FireError,
    },
    /// Confirms that a hostile unit entered the arena.
    EnemySpawned {
        /// Identifier assigned to the unit.
        enemy: EnemyId,
        /// Behavioural variant of the unit.
        kind: EnemyKind,
    },
    /// Confirms that the player destroyed a hostile unit.
    EnemyDestroyed {
        /// Identifier of the destroyed unit.
        enemy: EnemyId,
        /// Position at which the unit was destroyed.
        position: Vec2,
        /// Score after the kill was awarded.
        score: u32,
    },
    /// Reports that a hostile unit reached the base and was consumed.
    EnemyReachedBase {
        /// Identifier of the unit.
        enemy: EnemyId,
        /// Position of the impact.
        position: Vec2,
    },
    /// Confirms that a mine was planted.
    MineSpawned {
        /// Identifier assigned to the mine.
        mine: MineId,
    },
    /// Confirms that the player shot a mine.
    MineCleared {
        /// Identifier of the cleared mine.
        mine: MineId,
        /// Position of the mine.
        position: Vec2,
        /// Score after the clearance was awarded.
        score: u32,
    },
    /// Reports that the base lost health.
    BaseDamaged {
        /// Health removed by the hit.
        amount: f32,
        /// Remaining base health.
        health: f32,
        /// Origin of the damage.
        source: DamageSource,
    },
    /// Confirms that an ammunition crate was dropped.
    AmmoCrateSpawned {
        /// Identifier assigned to the crate.
        crate_id: CrateId,
    },
    /// Confirms that the turret picked up an ammunition crate.
    AmmoCollected {
        /// Identifier of the collected crate.
        crate_id: CrateId,
        /// Rounds gained from the pickup after capping.
        gained: u32,
        /// Rounds held after the pickup.
        ammo: u32,
    },
    /// Confirms that score was spent on base repairs.
    BaseRepaired {
        /// Health after the repair.
        health: f32,
        /// Score after paying for the repair.
        score: u32,
    },
    /// Reports that a repair request was rejected.
    RepairRejected {
        /// Specific reason the repair did not happen.
        reason: RepairError,
    },
    /// Confirms that a new spawn profile is active.
    SpawnProfileApplied {
        /// Profile now in effect.
        profile: SpawnProfile,
    },
    /// Announces that the pause flag changed.
    PauseChanged {
        /// Whether the simulation is now paused.
        paused: bool,
    },
    /// Confirms that hostiles were removed.
    HostilesCleared {
        /// Number of enemies removed.
        enemies: usize,
        /// Number of mines removed.
        mines: usize,
    },
    /// Announces that the base was destroyed.
    GameOver {
        /// Final score.
        score: u32,
    },
}

/// Unique identifier assigned to a hostile unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a mine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MineId(u32);

impl MineId {
    /// Creates a new mine identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an ammunition crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrateId(u32);

impl CrateId {
    /// Creates a new crate identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Behavioural variants of hostile units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Basic unit that flies straight at the base.
    Drone,
    /// Unit that holds position at standoff range and fires on the base.
    Armed,
    /// Fast unit that detonates on contact for heavy damage.
    Explosive,
}

impl EnemyKind {
    /// Health removed from the base when the unit reaches it.
    #[must_use]
    pub const fn contact_damage(self) -> f32 {
        match self {
            Self::Drone | Self::Armed => 10.0,
            Self::Explosive => 20.0,
        }
    }

    /// Collision radius used for hit tests.
    #[must_use]
    pub const fn radius(self) -> f32 {
        match self {
            Self::Drone | Self::Armed => 12.0,
            Self::Explosive => 10.0,
        }
    }
}

/// Origin of damage applied to the base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DamageSource {
    /// A unit reached the base.
    Contact(EnemyKind),
    /// An armed unit fired from standoff range.
    Gunfire,
    /// A live mine pulsed.
    Mine,
}

/// Reasons a fire request may be rejected by the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FireError {
    /// The turret holds no rounds.
    NoAmmunition,
    /// The simulation is paused.
    Paused,
    /// The base has already been destroyed.
    GameOver,
}

/// Reasons a repair request may be rejected by the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RepairError {
    /// The player cannot afford the repair.
    InsufficientScore,
    /// The base is already at full health.
    HealthFull,
    /// The base has already been destroyed.
    GameOver,
}

/// Lifecycle of a single CPU Defender run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameState {
    /// The base is alive and the simulation accepts ticks.
    Playing,
    /// The base was destroyed; the run is frozen.
    GameOver,
}

/// Gameplay parameters derived from the active difficulty level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnProfile {
    /// Frames between hostile spawns.
    pub spawn_interval_frames: u32,
    /// Multiplier applied to the base enemy speed.
    pub enemy_speed_multiplier: f32,
    /// Whether spawns may be replaced by mines.
    pub mines_enabled: bool,
    /// Probability that an eligible spawn becomes a mine.
    pub mine_chance: f32,
    /// Probability that an enemy spawn is an armed unit.
    pub armed_chance: f32,
    /// Probability that an enemy spawn is an explosive unit.
    pub explosive_chance: f32,
    /// Maximum rounds the turret may hold.
    pub max_ammo: u32,
    /// Rounds gained from a single ammunition crate.
    pub ammo_per_pickup: u32,
}

impl SpawnProfile {
    /// Profile used while adaptive difficulty is disabled.
    pub const MANUAL: Self = Self {
        spawn_interval_frames: 120,
        enemy_speed_multiplier: 1.0,
        mines_enabled: false,
        mine_chance: 0.0,
        armed_chance: 0.0,
        explosive_chance: 0.0,
        max_ammo: 30,
        ammo_per_pickup: 10,
    };
}

impl Default for SpawnProfile {
    fn default() -> Self {
        Self::MANUAL
    }
}

/// Read-only snapshot of the gameplay quantities consumed by adaptive difficulty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetrySnapshot {
    /// Current score.
    pub score: u32,
    /// Base health in the range `0.0..=100.0`.
    pub base_health: f32,
    /// Number of live hostile units.
    pub enemy_count: usize,
    /// Number of live mines.
    pub mine_count: usize,
    /// Frames simulated since the run started.
    pub elapsed_frames: u64,
    /// Rounds currently held by the turret.
    pub ammo: u32,
    /// Current ammunition cap.
    pub max_ammo: u32,
}

/// Raw four-feature vector fed to the difficulty classifier.
///
/// Values are kept as `f32` so that misbehaving callers can be represented
/// faithfully; normalization clamps them before classification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureVector {
    /// Current score.
    pub score: f32,
    /// Base health, nominally `0.0..=100.0`.
    pub base_health: f32,
    /// Live enemy count, nominally a non-negative integer.
    pub enemy_count: f32,
    /// Elapsed frames, nominally a non-negative integer.
    pub elapsed_frames: f32,
}

impl FeatureVector {
    /// Creates a feature vector from raw values.
    #[must_use]
    pub const fn new(score: f32, base_health: f32, enemy_count: f32, elapsed_frames: f32) -> Self {
        Self {
            score,
            base_health,
            enemy_count,
            elapsed_frames,
        }
    }

    /// Extracts the classifier features from a telemetry snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &TelemetrySnapshot) -> Self {
        Self {
            score: snapshot.score as f32,
            base_health: snapshot.base_health,
            enemy_count: snapshot.enemy_count as f32,
            elapsed_frames: snapshot.elapsed_frames as f32,
        }
    }

    /// Returns the features in classifier input order.
    #[must_use]
    pub const fn to_array(&self) -> [f32; 4] {
        [
            self.score,
            self.base_health,
            self.enemy_count,
            self.elapsed_frames,
        ]
    }
}

/// The three difficulty classes predicted by the classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyClass {
    /// The player is struggling and should receive assistance.
    Easy,
    /// The player is coping with the current pressure.
    Normal,
    /// The player is dominating and can be challenged further.
    Hard,
}

impl DifficultyClass {
    /// All classes in classifier output order.
    pub const ALL: [Self; 3] = [Self::Easy, Self::Normal, Self::Hard];

    /// Position of the class within classifier output.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Easy => 0,
            Self::Normal => 1,
            Self::Hard => 2,
        }
    }

    /// Resolves a classifier output index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Easy),
            1 => Some(Self::Normal),
            2 => Some(Self::Hard),
            _ => None,
        }
    }
}

/// Ordered probability triple returned by the classifier.
///
/// Channels are nominally within `0.0..=1.0` and sum to one, but consumers
/// treat each channel independently and never rely on the sum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    /// Probability of [`DifficultyClass::Easy`].
    pub easy: f32,
    /// Probability of [`DifficultyClass::Normal`].
    pub normal: f32,
    /// Probability of [`DifficultyClass::Hard`].
    pub hard: f32,
}

impl ClassProbabilities {
    /// Creates a probability triple.
    #[must_use]
    pub const fn new(easy: f32, normal: f32, hard: f32) -> Self {
        Self { easy, normal, hard }
    }

    /// Equal-thirds prior used before any evidence has been observed.
    #[must_use]
    pub const fn uniform() -> Self {
        Self::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
    }

    /// Triple that places all mass on a single class.
    #[must_use]
    pub const fn one_hot(class: DifficultyClass) -> Self {
        match class {
            DifficultyClass::Easy => Self::new(1.0, 0.0, 0.0),
            DifficultyClass::Normal => Self::new(0.0, 1.0, 0.0),
            DifficultyClass::Hard => Self::new(0.0, 0.0, 1.0),
        }
    }

    /// Creates a triple from classifier output order.
    #[must_use]
    pub const fn from_array(values: [f32; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    /// Returns the channels in classifier output order.
    #[must_use]
    pub const fn to_array(&self) -> [f32; 3] {
        [self.easy, self.normal, self.hard]
    }

    /// Probability assigned to the provided class.
    #[must_use]
    pub const fn get(&self, class: DifficultyClass) -> f32 {
        match class {
            DifficultyClass::Easy => self.easy,
            DifficultyClass::Normal => self.normal,
            DifficultyClass::Hard => self.hard,
        }
    }

    /// Class holding the largest probability; ties resolve to the earliest class.
    ///
    /// Non-finite channels never win.
    #[must_use]
    pub fn dominant(&self) -> DifficultyClass {
        let mut best = DifficultyClass::Normal;
        let mut best_value = f32::NEG_INFINITY;
        for class in DifficultyClass::ALL {
            let value = self.get(class);
            if value.is_finite() && value > best_value {
                best = class;
                best_value = value;
            }
        }
        best
    }

    /// Reports whether every channel is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.easy.is_finite() && self.normal.is_finite() && self.hard.is_finite()
    }
}

impl Default for ClassProbabilities {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Difficulty levels driven by the adaptive controller.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum DifficultyLevel {
    /// Level 1: baseline pressure.
    #[default]
    Normal,
    /// Level 2: mines and armed units join the mix.
    Elevated,
    /// Level 3: fast and explosive units at maximum density.
    Maximum,
}

impl DifficultyLevel {
    /// All levels in ascending order.
    pub const ALL: [Self; 3] = [Self::Normal, Self::Elevated, Self::Maximum];

    /// One-based level number shown to players.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Normal => 1,
            Self::Elevated => 2,
            Self::Maximum => 3,
        }
    }

    /// Resolves a one-based level number.
    #[must_use]
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Normal),
            2 => Some(Self::Elevated),
            3 => Some(Self::Maximum),
            _ => None,
        }
    }

    /// Short human-readable tag describing the level.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Elevated => "MINES",
            Self::Maximum => "MAX",
        }
    }

    /// Next level up, if any.
    #[must_use]
    pub const fn escalated(self) -> Option<Self> {
        match self {
            Self::Normal => Some(Self::Elevated),
            Self::Elevated => Some(Self::Maximum),
            Self::Maximum => None,
        }
    }

    /// Next level down, if any.
    #[must_use]
    pub const fn deescalated(self) -> Option<Self> {
        match self {
            Self::Normal => None,
            Self::Elevated => Some(Self::Normal),
            Self::Maximum => Some(Self::Elevated),
        }
    }
}

/// Externally visible state of adaptive mode, used by the HUD.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdaptiveStatus {
    /// Adaptive mode is off; the manual profile is in force.
    Manual,
    /// The classifier is preparing or the opening announcement is showing.
    Starting,
    /// Play is running but the calibration window is still open.
    Calibrating,
    /// Play is running under classifier control at the given level.
    Active(DifficultyLevel),
}

/// Situations that produce an on-screen announcement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnnouncementKind {
    /// The classifier finished preparing.
    SystemOnline,
    /// The calibration window is starting.
    Calibrating,
    /// The calibration window closed.
    CalibrationComplete,
    /// Difficulty increased to the given level.
    Escalated(DifficultyLevel),
    /// Difficulty was lowered to help the player.
    Assist,
    /// Adaptive mode was switched off.
    ManualMode,
    /// The classifier could not be prepared.
    Offline,
}

/// Transient headline shown over the playfield.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Announcement {
    /// What the announcement reports.
    pub kind: AnnouncementKind,
    /// Large headline text.
    pub title: &'static str,
    /// Smaller line under the headline.
    pub subtitle: &'static str,
    /// Time the announcement stays visible.
    pub duration: Duration,
}
