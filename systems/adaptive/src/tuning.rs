use std::{fs, io, path::Path, path::PathBuf};

use cpu_defender_system_classifier::{ClassifierTuning, Normalization};
use cpu_defender_system_conditioner::ConditionerTuning;
use cpu_defender_system_difficulty::DifficultyTuning;
use cpu_defender_system_level_effects::{AnnouncementTuning, EffectTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const WEIGHT_TOLERANCE: f32 = 1e-3;
const MAX_HEALTH: f32 = 100.0;

/// Every tunable of the adaptive subsystem.
///
/// Missing sections and fields fall back to their defaults, so a tuning file
/// only needs to name the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveTuning {
    /// Frames between telemetry samples.
    pub sample_period_frames: u32,
    /// Feature divisors handed to the classifier.
    pub normalization: Normalization,
    /// Smoothing and danger estimation.
    pub conditioner: ConditionerTuning,
    /// State machine thresholds and timers.
    pub difficulty: DifficultyTuning,
    /// Spawn profile per level.
    pub effects: EffectTable,
    /// Announcement durations.
    pub announcements: AnnouncementTuning,
    /// Classifier choice and lifecycle.
    pub classifier: ClassifierTuning,
}

impl Default for AdaptiveTuning {
    fn default() -> Self {
        Self {
            sample_period_frames: 60,
            normalization: Normalization::default(),
            conditioner: ConditionerTuning::default(),
            difficulty: DifficultyTuning::default(),
            effects: EffectTable::default(),
            announcements: AnnouncementTuning::default(),
            classifier: ClassifierTuning::default(),
        }
    }
}

/// Reasons a tuning file was rejected.
#[derive(Debug, Error)]
pub enum TuningError {
    /// The file could not be read.
    #[error("failed to read tuning file `{}`", path.display())]
    Read {
        /// Location that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file is not valid TOML for the tuning schema.
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is outside its permitted range.
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Human readable constraint that failed.
        reason: String,
    },
}

impl AdaptiveTuning {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`TuningError::Parse`] for malformed documents and
    /// [`TuningError::Invalid`] for out-of-range values.
    pub fn from_toml_str(document: &str) -> Result<Self, TuningError> {
        let tuning: Self = toml::from_str(document)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reads, parses and validates a TOML tuning file.
    ///
    /// # Errors
    ///
    /// Returns [`TuningError::Read`] when the file cannot be read, otherwise
    /// the errors of [`AdaptiveTuning::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let document = fs::read_to_string(path).map_err(|source| TuningError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let tuning = Self::from_toml_str(&document)?;
        tracing::info!(path = %path.display(), "loaded adaptive tuning");
        Ok(tuning)
    }

    /// Checks the cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint as [`TuningError::Invalid`].
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.sample_period_frames == 0 {
            return Err(invalid("sample_period_frames", "must be positive"));
        }

        for (field, divisor) in [
            ("normalization.score", self.normalization.score),
            ("normalization.base_health", self.normalization.base_health),
            ("normalization.enemy_count", self.normalization.enemy_count),
            ("normalization.elapsed_frames", self.normalization.elapsed_frames),
        ] {
            if !(divisor.is_finite() && divisor > 0.0) {
                return Err(invalid(field, format!("divisor {divisor} must be positive")));
            }
        }

        let conditioner = &self.conditioner;
        for (field, alpha) in [
            ("conditioner.probability_alpha", conditioner.probability_alpha),
            ("conditioner.danger_alpha", conditioner.danger_alpha),
            ("conditioner.damage_alpha", conditioner.damage_alpha),
        ] {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(invalid(field, format!("alpha {alpha} must lie in (0, 1)")));
            }
        }

        let weights = &conditioner.danger_weights;
        for (field, weight) in [
            ("conditioner.danger_weights.health_loss", weights.health_loss),
            ("conditioner.danger_weights.enemy_pressure", weights.enemy_pressure),
            ("conditioner.danger_weights.scarcity", weights.scarcity),
        ] {
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(invalid(field, format!("weight {weight} must be non-negative")));
            }
        }
        let total = weights.total();
        if !((total - 1.0).abs() <= WEIGHT_TOLERANCE) {
            return Err(invalid(
                "conditioner.danger_weights",
                format!("weights sum to {total}, expected 1"),
            ));
        }
        if !(conditioner.enemy_saturation.is_finite() && conditioner.enemy_saturation > 0.0) {
            return Err(invalid("conditioner.enemy_saturation", "must be positive"));
        }

        let difficulty = &self.difficulty;
        if difficulty.confirmation_ticks == 0 {
            return Err(invalid("difficulty.confirmation_ticks", "must be positive"));
        }
        for (field, threshold) in [
            ("difficulty.escalate_hard_threshold", difficulty.escalate_hard_threshold),
            ("difficulty.normal_lock_threshold", difficulty.normal_lock_threshold),
            ("difficulty.assist_easy_base", difficulty.assist_easy_base),
            ("difficulty.assist_health_penalty", difficulty.assist_health_penalty),
            ("difficulty.assist_hard_ceiling", difficulty.assist_hard_ceiling),
            ("difficulty.critical_danger", difficulty.critical_danger),
        ] {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(invalid(field, format!("{threshold} must lie in [0, 1]")));
            }
        }
        if !(0.0..=MAX_HEALTH).contains(&difficulty.emergency_health_floor) {
            return Err(invalid(
                "difficulty.emergency_health_floor",
                format!(
                    "{} must lie in [0, {MAX_HEALTH}]",
                    difficulty.emergency_health_floor
                ),
            ));
        }
        if !(difficulty.damage_spike.is_finite() && difficulty.damage_spike > 0.0) {
            return Err(invalid(
                "difficulty.damage_spike",
                format!("{} must be positive", difficulty.damage_spike),
            ));
        }
        if difficulty.escalate_hard_threshold <= difficulty.assist_hard_ceiling {
            return Err(invalid(
                "difficulty.escalate_hard_threshold",
                format!(
                    "{} must exceed the assist hard ceiling {}",
                    difficulty.escalate_hard_threshold, difficulty.assist_hard_ceiling
                ),
            ));
        }

        for (name, profile) in self.effects.entries() {
            if profile.spawn_interval_frames == 0 {
                return Err(invalid(
                    "effects.spawn_interval_frames",
                    format!("{name} profile spawns every frame of zero length"),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> TuningError {
    let reason = reason.into();
    tracing::warn!(field, %reason, "rejected adaptive tuning");
    TuningError::Invalid { field, reason }
}
