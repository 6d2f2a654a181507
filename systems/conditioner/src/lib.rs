#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Signal conditioner that turns sparse classifier output into a stable control signal.
//!
//! Each evaluation folds one classifier sample into per-class exponential
//! moving averages and tracks two auxiliary estimates: a composite danger
//! level built from health, enemy pressure and ammunition scarcity, and a
//! short-horizon rate of recent base damage. Non-finite inputs never reach an
//! average; the affected channel keeps its previous value instead.

use cpu_defender_core::{ClassProbabilities, TelemetrySnapshot};
use serde::{Deserialize, Serialize};

const MAX_HEALTH: f32 = 100.0;

/// Relative contribution of each stress source to the danger estimate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DangerWeights {
    /// Weight of missing base health.
    pub health_loss: f32,
    /// Weight of enemy density.
    pub enemy_pressure: f32,
    /// Weight of ammunition scarcity.
    pub scarcity: f32,
}

impl DangerWeights {
    /// Sum of the three weights.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.health_loss + self.enemy_pressure + self.scarcity
    }
}

impl Default for DangerWeights {
    fn default() -> Self {
        Self {
            health_loss: 0.60,
            enemy_pressure: 0.30,
            scarcity: 0.10,
        }
    }
}

/// Smoothing parameters of the conditioner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionerTuning {
    /// EMA factor applied to each class probability channel.
    pub probability_alpha: f32,
    /// EMA factor applied to the danger estimate.
    pub danger_alpha: f32,
    /// EMA factor applied to the per-sample health loss.
    pub damage_alpha: f32,
    /// Weights of the danger estimate.
    pub danger_weights: DangerWeights,
    /// Enemy count at which enemy pressure saturates.
    pub enemy_saturation: f32,
}

impl Default for ConditionerTuning {
    fn default() -> Self {
        Self {
            probability_alpha: 0.20,
            danger_alpha: 0.20,
            damage_alpha: 0.25,
            danger_weights: DangerWeights::default(),
            enemy_saturation: 15.0,
        }
    }
}

/// Conditioned view of the most recent evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConditionedSignal {
    /// Smoothed class probabilities.
    pub probabilities: ClassProbabilities,
    /// Smoothed danger estimate in `0.0..=1.0`.
    pub danger: f32,
    /// Smoothed health lost per evaluation.
    pub damage_rate: f32,
    /// Sanitised base health observed by the latest evaluation.
    pub health: f32,
}

impl ConditionedSignal {
    /// Neutral prior: equal thirds, no danger, no damage, full health.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            probabilities: ClassProbabilities::uniform(),
            danger: 0.0,
            damage_rate: 0.0,
            health: MAX_HEALTH,
        }
    }
}

impl Default for ConditionedSignal {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Stateful smoothing filter owned by one adaptive session.
#[derive(Debug)]
pub struct SignalConditioner {
    tuning: ConditionerTuning,
    signal: ConditionedSignal,
    previous_health: Option<f32>,
    samples: u64,
}

impl SignalConditioner {
    /// Creates a conditioner seeded with the neutral prior.
    #[must_use]
    pub fn new(tuning: ConditionerTuning) -> Self {
        Self {
            tuning,
            signal: ConditionedSignal::neutral(),
            previous_health: None,
            samples: 0,
        }
    }

    /// Latest conditioned signal.
    #[must_use]
    pub fn signal(&self) -> ConditionedSignal {
        self.signal
    }

    /// Number of samples folded in since the last reset.
    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Returns every estimate to the neutral prior.
    pub fn reset(&mut self) {
        self.signal = ConditionedSignal::neutral();
        self.previous_health = None;
        self.samples = 0;
    }

    /// Folds one classifier sample and the matching telemetry into the estimates.
    pub fn update(
        &mut self,
        probabilities: &ClassProbabilities,
        snapshot: &TelemetrySnapshot,
    ) -> ConditionedSignal {
        let alpha = self.tuning.probability_alpha;
        let previous = self.signal.probabilities;
        let smoothed = ClassProbabilities::new(
            smooth(previous.easy, probabilities.easy, alpha),
            smooth(previous.normal, probabilities.normal, alpha),
            smooth(previous.hard, probabilities.hard, alpha),
        );

        let health = if snapshot.base_health.is_finite() {
            snapshot.base_health.clamp(0.0, MAX_HEALTH)
        } else {
            self.previous_health.unwrap_or(MAX_HEALTH)
        };
        let loss = self
            .previous_health
            .map_or(0.0, |previous| (previous - health).max(0.0));
        self.previous_health = Some(health);

        let damage_rate = ema(self.signal.damage_rate, loss, self.tuning.damage_alpha).max(0.0);
        let danger_now = self.instantaneous_danger(health, snapshot);
        let danger = smooth(self.signal.danger, danger_now, self.tuning.danger_alpha);

        self.signal = ConditionedSignal {
            probabilities: smoothed,
            danger,
            damage_rate: if damage_rate.is_finite() {
                damage_rate
            } else {
                self.signal.damage_rate
            },
            health,
        };
        self.samples += 1;

        tracing::debug!(
            easy = smoothed.easy,
            normal = smoothed.normal,
            hard = smoothed.hard,
            danger,
            damage_rate = self.signal.damage_rate,
            "signal conditioned"
        );
        self.signal
    }

    fn instantaneous_danger(&self, health: f32, snapshot: &TelemetrySnapshot) -> f32 {
        let weights = self.tuning.danger_weights;
        let health_loss = 1.0 - health / MAX_HEALTH;
        let pressure = if self.tuning.enemy_saturation > 0.0 {
            (snapshot.enemy_count as f32 / self.tuning.enemy_saturation).min(1.0)
        } else {
            0.0
        };
        let scarcity = if snapshot.max_ammo == 0 {
            0.0
        } else {
            1.0 - (snapshot.ammo.min(snapshot.max_ammo) as f32 / snapshot.max_ammo as f32)
        };

        weights.health_loss * health_loss
            + weights.enemy_pressure * pressure
            + weights.scarcity * scarcity
    }
}

impl Default for SignalConditioner {
    fn default() -> Self {
        Self::new(ConditionerTuning::default())
    }
}

fn ema(previous: f32, sample: f32, alpha: f32) -> f32 {
    alpha * sample + (1.0 - alpha) * previous
}

/// EMA of a unit-interval channel; non-finite samples leave it untouched.
fn smooth(previous: f32, sample: f32, alpha: f32) -> f32 {
    if !sample.is_finite() {
        return previous;
    }
    let next = ema(previous, sample.clamp(0.0, 1.0), alpha);
    if next.is_finite() {
        next.clamp(0.0, 1.0)
    } else {
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(health: f32, enemies: usize, ammo: u32, max_ammo: u32) -> TelemetrySnapshot {
        TelemetrySnapshot {
            score: 0,
            base_health: health,
            enemy_count: enemies,
            mine_count: 0,
            elapsed_frames: 0,
            ammo,
            max_ammo,
        }
    }

    #[test]
    fn danger_combines_weighted_sources() {
        let conditioner = SignalConditioner::default();
        let danger = conditioner.instantaneous_danger(50.0, &snapshot(50.0, 30, 0, 30));
        assert!((danger - (0.6 * 0.5 + 0.3 + 0.1)).abs() < 1e-6);
    }

    #[test]
    fn zero_ammo_cap_contributes_no_scarcity() {
        let conditioner = SignalConditioner::default();
        let danger = conditioner.instantaneous_danger(100.0, &snapshot(100.0, 0, 0, 0));
        assert_eq!(danger, 0.0);
    }

    #[test]
    fn non_finite_sample_keeps_previous_value() {
        assert_eq!(smooth(0.4, f32::NAN, 0.2), 0.4);
        assert_eq!(smooth(0.4, f32::INFINITY, 0.2), 0.4);
        assert!((smooth(0.0, 5.0, 0.5) - 0.5).abs() < f32::EPSILON);
    }
}
