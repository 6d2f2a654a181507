#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Maps difficulty levels onto gameplay parameters and player-facing announcements.

use std::time::Duration;

use cpu_defender_core::{Command, DifficultyLevel, SpawnProfile};
pub use cpu_defender_core::{Announcement, AnnouncementKind};
use cpu_defender_system_difficulty::LevelTransition;
use serde::{Deserialize, Serialize};

/// Spawn profile per level, plus the profile used while adaptive mode is off.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectTable {
    /// Profile applied while adaptive mode is disabled.
    pub manual: SpawnProfile,
    /// Level 1 profile.
    pub normal: SpawnProfile,
    /// Level 2 profile.
    pub elevated: SpawnProfile,
    /// Level 3 profile.
    pub maximum: SpawnProfile,
}

impl EffectTable {
    /// Profile for a level; `adaptive == false` always selects the manual profile.
    #[must_use]
    pub fn profile(&self, level: DifficultyLevel, adaptive: bool) -> SpawnProfile {
        if !adaptive {
            return self.manual;
        }
        match level {
            DifficultyLevel::Normal => self.normal,
            DifficultyLevel::Elevated => self.elevated,
            DifficultyLevel::Maximum => self.maximum,
        }
    }

    /// Every profile in the table with a short name, for validation.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, SpawnProfile); 4] {
        [
            ("manual", self.manual),
            ("normal", self.normal),
            ("elevated", self.elevated),
            ("maximum", self.maximum),
        ]
    }
}

impl Default for EffectTable {
    fn default() -> Self {
        Self {
            manual: SpawnProfile::MANUAL,
            normal: SpawnProfile {
                spawn_interval_frames: 90,
                ..SpawnProfile::MANUAL
            },
            elevated: SpawnProfile {
                spawn_interval_frames: 50,
                enemy_speed_multiplier: 1.6,
                mines_enabled: true,
                mine_chance: 0.4,
                armed_chance: 0.25,
                explosive_chance: 0.0,
                max_ammo: 45,
                ammo_per_pickup: 15,
            },
            maximum: SpawnProfile {
                spawn_interval_frames: 25,
                enemy_speed_multiplier: 2.5,
                mines_enabled: true,
                mine_chance: 0.4,
                armed_chance: 0.2,
                explosive_chance: 0.3,
                max_ammo: 60,
                ammo_per_pickup: 20,
            },
        }
    }
}

/// Display durations of transient announcements, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncementTuning {
    /// Duration of event announcements.
    pub display_ms: u64,
    /// Duration of each activation sequence announcement.
    pub sequence_ms: u64,
}

impl Default for AnnouncementTuning {
    fn default() -> Self {
        Self {
            display_ms: 2_000,
            sequence_ms: 1_500,
        }
    }
}

/// Level effect applicator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LevelEffects {
    table: EffectTable,
    announcements: AnnouncementTuning,
}

impl LevelEffects {
    /// Creates an applicator from its tables.
    #[must_use]
    pub fn new(table: EffectTable, announcements: AnnouncementTuning) -> Self {
        Self {
            table,
            announcements,
        }
    }

    /// Spawn profile in force for a level and adaptive flag.
    #[must_use]
    pub fn profile(&self, level: DifficultyLevel, adaptive: bool) -> SpawnProfile {
        self.table.profile(level, adaptive)
    }

    /// Emits the command that makes the level's profile take effect immediately.
    pub fn apply(&self, level: DifficultyLevel, adaptive: bool, out: &mut Vec<Command>) {
        out.push(Command::ApplySpawnProfile {
            profile: self.profile(level, adaptive),
        });
    }

    /// Announcement for a level transition.
    #[must_use]
    pub fn announce_transition(&self, transition: &LevelTransition) -> Announcement {
        match transition {
            LevelTransition::Escalated { to, .. } => {
                self.announcement(AnnouncementKind::Escalated(*to))
            }
            LevelTransition::Assisted { .. } => self.announcement(AnnouncementKind::Assist),
        }
    }

    /// Announcement text and duration for a situation.
    #[must_use]
    pub fn announcement(&self, kind: AnnouncementKind) -> Announcement {
        let (title, subtitle) = match kind {
            AnnouncementKind::SystemOnline => ("AI SYSTEM", "ONLINE"),
            AnnouncementKind::Calibrating => ("LEVEL 1", "CALIBRATING..."),
            AnnouncementKind::CalibrationComplete => ("CALIBRATION", "COMPLETE"),
            AnnouncementKind::Escalated(DifficultyLevel::Normal) => ("LEVEL 1", "NORMAL"),
            AnnouncementKind::Escalated(DifficultyLevel::Elevated) => {
                ("LEVEL 2", "DANGER: MINES!")
            }
            AnnouncementKind::Escalated(DifficultyLevel::Maximum) => ("LEVEL 3", "OVERLOAD"),
            AnnouncementKind::Assist => ("ASSIST", "LOWERING DIFFICULTY"),
            AnnouncementKind::ManualMode => ("MANUAL MODE", "AI DISABLED"),
            AnnouncementKind::Offline => ("AI OFFLINE", "USING MANUAL MODE"),
        };
        let millis = match kind {
            AnnouncementKind::SystemOnline | AnnouncementKind::Calibrating => {
                self.announcements.sequence_ms
            }
            _ => self.announcements.display_ms,
        };

        Announcement {
            kind,
            title,
            subtitle,
            duration: Duration::from_millis(millis),
        }
    }
}
