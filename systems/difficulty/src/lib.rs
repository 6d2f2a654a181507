#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Three-level difficulty state machine driven by the conditioned classifier signal.
//!
//! The machine is evaluated once per sampling tick with the number of frames
//! the tick covers. After an initial calibration window it escalates when the
//! smoothed HARD probability is high and NORMAL is not confidently locked in,
//! requires a sustained hold before reaching the maximum level, and steps down
//! one level after a debounced run of assist conditions. Every transition
//! starts a cooldown during which no further transition is considered.

use cpu_defender_core::DifficultyLevel;
use cpu_defender_system_conditioner::ConditionedSignal;
use serde::{Deserialize, Serialize};

const MAX_HEALTH: f32 = 100.0;

/// Thresholds and timers of the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    /// Smoothed HARD probability required to escalate.
    pub escalate_hard_threshold: f32,
    /// Smoothed NORMAL probability at or above which escalation is locked.
    pub normal_lock_threshold: f32,
    /// Smoothed EASY probability required for assistance at full health.
    pub assist_easy_base: f32,
    /// Amount the EASY requirement drops as health falls to zero.
    pub assist_health_penalty: f32,
    /// Smoothed HARD probability below which the EASY assist may fire.
    pub assist_hard_ceiling: f32,
    /// Danger estimate above which assistance is requested.
    pub critical_danger: f32,
    /// Base health at or below which assistance is requested.
    pub emergency_health_floor: f32,
    /// Damage rate at or above which assistance is requested.
    pub damage_spike: f32,
    /// Consecutive qualifying ticks required before an assist fires.
    pub confirmation_ticks: u32,
    /// Frames after a transition during which no transition is evaluated.
    pub cooldown_frames: u32,
    /// Frames after activation during which no transition is evaluated.
    pub calibration_frames: u32,
    /// Qualifying frames required at level 2 before escalating to level 3.
    pub elevated_hold_frames: u32,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        Self {
            escalate_hard_threshold: 0.70,
            normal_lock_threshold: 0.55,
            assist_easy_base: 0.78,
            assist_health_penalty: 0.30,
            assist_hard_ceiling: 0.55,
            critical_danger: 0.62,
            emergency_health_floor: 45.0,
            damage_spike: 3.0,
            confirmation_ticks: 2,
            cooldown_frames: 240,
            calibration_frames: 300,
            elevated_hold_frames: 600,
        }
    }
}

/// Condition that requested a de-escalation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssistReason {
    /// Base health fell to or below the emergency floor.
    CriticalHealth,
    /// Recent damage reached the spike threshold.
    DamageSpike,
    /// The composite danger estimate is critical.
    Danger,
    /// The classifier is confident the player is struggling.
    EasyDominant,
}

/// A change of difficulty level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LevelTransition {
    /// Pressure increased by one level.
    Escalated {
        /// Level before the transition.
        from: DifficultyLevel,
        /// Level after the transition.
        to: DifficultyLevel,
    },
    /// Pressure decreased by one level to help the player.
    Assisted {
        /// Level before the transition.
        from: DifficultyLevel,
        /// Level after the transition.
        to: DifficultyLevel,
        /// Condition that confirmed the assist.
        reason: AssistReason,
    },
}

impl LevelTransition {
    /// Level before the transition.
    #[must_use]
    pub const fn from(&self) -> DifficultyLevel {
        match *self {
            Self::Escalated { from, .. } | Self::Assisted { from, .. } => from,
        }
    }

    /// Level after the transition.
    #[must_use]
    pub const fn to(&self) -> DifficultyLevel {
        match *self {
            Self::Escalated { to, .. } | Self::Assisted { to, .. } => to,
        }
    }
}

/// Result of a single evaluation tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Set on the tick that closes the calibration window.
    pub calibration_completed: bool,
    /// Transition fired on this tick, if any.
    pub transition: Option<LevelTransition>,
}

/// Difficulty state owned by one adaptive session.
#[derive(Debug)]
pub struct DifficultyStateMachine {
    tuning: DifficultyTuning,
    level: DifficultyLevel,
    calibration_remaining: u32,
    cooldown_remaining: u32,
    hold_frames: u32,
    assist_confirmations: u32,
}

impl DifficultyStateMachine {
    /// Creates a machine at level 1 with a full calibration window ahead.
    #[must_use]
    pub fn new(tuning: DifficultyTuning) -> Self {
        Self {
            tuning,
            level: DifficultyLevel::Normal,
            calibration_remaining: tuning.calibration_frames,
            cooldown_remaining: 0,
            hold_frames: 0,
            assist_confirmations: 0,
        }
    }

    /// Current difficulty level.
    #[must_use]
    pub fn level(&self) -> DifficultyLevel {
        self.level
    }

    /// Reports whether the calibration window is still open.
    #[must_use]
    pub fn is_calibrating(&self) -> bool {
        self.calibration_remaining > 0
    }

    /// Frames left in the calibration window.
    #[must_use]
    pub fn calibration_remaining(&self) -> u32 {
        self.calibration_remaining
    }

    /// Frames left before another transition may be evaluated.
    #[must_use]
    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown_remaining
    }

    /// Qualifying frames accumulated towards the level 3 hold.
    #[must_use]
    pub fn hold_frames(&self) -> u32 {
        self.hold_frames
    }

    /// Consecutive qualifying assist ticks observed so far.
    #[must_use]
    pub fn assist_confirmations(&self) -> u32 {
        self.assist_confirmations
    }

    /// Returns to level 1 with cleared counters and a fresh calibration window.
    pub fn reset(&mut self) {
        *self = Self::new(self.tuning);
    }

    /// Evaluates the transition rules for a tick covering `elapsed_frames`.
    pub fn evaluate(&mut self, elapsed_frames: u32, signal: &ConditionedSignal) -> Evaluation {
        let mut evaluation = Evaluation::default();

        if self.calibration_remaining > 0 {
            self.calibration_remaining = self.calibration_remaining.saturating_sub(elapsed_frames);
            if self.calibration_remaining > 0 {
                return evaluation;
            }
            tracing::info!("difficulty calibration complete");
            evaluation.calibration_completed = true;
        }

        if self.cooldown_remaining > 0 {
            self.cooldown_remaining = self.cooldown_remaining.saturating_sub(elapsed_frames);
            if self.cooldown_remaining > 0 {
                return evaluation;
            }
        }

        if let Some(lower) = self.level.deescalated() {
            match self.assist_reason(signal) {
                Some(reason) => {
                    self.assist_confirmations += 1;
                    if self.assist_confirmations < self.tuning.confirmation_ticks {
                        tracing::debug!(
                            ?reason,
                            confirmations = self.assist_confirmations,
                            "assist pending confirmation"
                        );
                        return evaluation;
                    }
                    evaluation.transition = Some(self.transition(LevelTransition::Assisted {
                        from: self.level,
                        to: lower,
                        reason,
                    }));
                    return evaluation;
                }
                None => self.assist_confirmations = 0,
            }
        }

        let probabilities = signal.probabilities;
        let qualifies = probabilities.hard >= self.tuning.escalate_hard_threshold
            && probabilities.normal < self.tuning.normal_lock_threshold;
        if !qualifies {
            self.hold_frames = 0;
            return evaluation;
        }

        let next = match self.level {
            DifficultyLevel::Normal => Some(DifficultyLevel::Elevated),
            DifficultyLevel::Elevated => {
                self.hold_frames = self.hold_frames.saturating_add(elapsed_frames);
                (self.hold_frames >= self.tuning.elevated_hold_frames)
                    .then_some(DifficultyLevel::Maximum)
            }
            DifficultyLevel::Maximum => None,
        };

        if let Some(to) = next {
            evaluation.transition = Some(self.transition(LevelTransition::Escalated {
                from: self.level,
                to,
            }));
        }
        evaluation
    }

    fn assist_reason(&self, signal: &ConditionedSignal) -> Option<AssistReason> {
        let tuning = &self.tuning;
        if signal.health <= tuning.emergency_health_floor {
            return Some(AssistReason::CriticalHealth);
        }
        if signal.damage_rate >= tuning.damage_spike {
            return Some(AssistReason::DamageSpike);
        }
        if signal.danger > tuning.critical_danger {
            return Some(AssistReason::Danger);
        }

        let missing = (1.0 - signal.health / MAX_HEALTH).clamp(0.0, 1.0);
        let easy_threshold = tuning.assist_easy_base - tuning.assist_health_penalty * missing;
        let probabilities = signal.probabilities;
        (probabilities.easy > easy_threshold && probabilities.hard < tuning.assist_hard_ceiling)
            .then_some(AssistReason::EasyDominant)
    }

    fn transition(&mut self, transition: LevelTransition) -> LevelTransition {
        tracing::info!(
            from = transition.from().number(),
            to = transition.to().number(),
            ?transition,
            "difficulty level changed"
        );
        self.level = transition.to();
        self.cooldown_remaining = self.tuning.cooldown_frames;
        self.hold_frames = 0;
        self.assist_confirmations = 0;
        transition
    }
}

impl Default for DifficultyStateMachine {
    fn default() -> Self {
        Self::new(DifficultyTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpu_defender_core::ClassProbabilities;

    fn signal(easy: f32, normal: f32, hard: f32, health: f32) -> ConditionedSignal {
        ConditionedSignal {
            probabilities: ClassProbabilities::new(easy, normal, hard),
            danger: 0.0,
            damage_rate: 0.0,
            health,
        }
    }

    #[test]
    fn easy_threshold_drops_with_health() {
        let machine = DifficultyStateMachine::default();
        assert_eq!(machine.assist_reason(&signal(0.7, 0.2, 0.1, 100.0)), None);
        assert_eq!(
            machine.assist_reason(&signal(0.7, 0.2, 0.1, 60.0)),
            Some(AssistReason::EasyDominant)
        );
    }

    #[test]
    fn easy_assist_requires_low_hard_probability() {
        let machine = DifficultyStateMachine::default();
        assert_eq!(machine.assist_reason(&signal(0.9, 0.0, 0.6, 60.0)), None);
    }

    #[test]
    fn emergency_conditions_ignore_probabilities() {
        let machine = DifficultyStateMachine::default();
        assert_eq!(
            machine.assist_reason(&signal(0.0, 0.0, 1.0, 45.0)),
            Some(AssistReason::CriticalHealth)
        );

        let spiking = ConditionedSignal {
            damage_rate: 3.0,
            ..signal(0.0, 0.0, 1.0, 90.0)
        };
        assert_eq!(machine.assist_reason(&spiking), Some(AssistReason::DamageSpike));

        let dangerous = ConditionedSignal {
            danger: 0.63,
            ..signal(0.0, 0.0, 1.0, 90.0)
        };
        assert_eq!(machine.assist_reason(&dangerous), Some(AssistReason::Danger));
    }
}
