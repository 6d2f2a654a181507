use cpu_defender_core::{ClassProbabilities, DifficultyLevel, TelemetrySnapshot};
use cpu_defender_system_conditioner::{ConditionedSignal, SignalConditioner};
use cpu_defender_system_difficulty::{
    AssistReason, DifficultyStateMachine, DifficultyTuning, LevelTransition,
};
use proptest::prelude::*;

const PERIOD: u32 = 60;

struct Harness {
    conditioner: SignalConditioner,
    machine: DifficultyStateMachine,
    ticks: u32,
}

impl Harness {
    fn new() -> Self {
        Self {
            conditioner: SignalConditioner::default(),
            machine: DifficultyStateMachine::default(),
            ticks: 0,
        }
    }

    fn tick(&mut self, probabilities: ClassProbabilities, health: f32) -> Option<LevelTransition> {
        let snapshot = TelemetrySnapshot {
            score: 2_000,
            base_health: health,
            enemy_count: 2,
            mine_count: 0,
            elapsed_frames: u64::from(self.ticks * PERIOD),
            ammo: 30,
            max_ammo: 30,
        };
        self.ticks += 1;
        let signal = self.conditioner.update(&probabilities, &snapshot);
        self.machine.evaluate(PERIOD, &signal).transition
    }

    fn level(&self) -> DifficultyLevel {
        self.machine.level()
    }
}

fn hard() -> ClassProbabilities {
    ClassProbabilities::new(0.05, 0.05, 0.9)
}

fn pinned_signal(easy: f32, normal: f32, hard: f32, health: f32) -> ConditionedSignal {
    ConditionedSignal {
        probabilities: ClassProbabilities::new(easy, normal, hard),
        danger: 0.0,
        damage_rate: 0.0,
        health,
    }
}

#[test]
fn no_escalation_before_calibration_window_elapses() {
    let mut machine = DifficultyStateMachine::default();
    let saturated = pinned_signal(0.0, 0.0, 1.0, 100.0);

    for _ in 0..4 {
        let evaluation = machine.evaluate(PERIOD, &saturated);
        assert_eq!(evaluation.transition, None);
        assert!(!evaluation.calibration_completed);
        assert_eq!(machine.level(), DifficultyLevel::Normal);
    }

    let evaluation = machine.evaluate(PERIOD, &saturated);
    assert!(evaluation.calibration_completed);
    assert_eq!(
        evaluation.transition,
        Some(LevelTransition::Escalated {
            from: DifficultyLevel::Normal,
            to: DifficultyLevel::Elevated,
        })
    );
}

#[test]
fn cooldown_blocks_repeated_transitions() {
    let mut machine = DifficultyStateMachine::default();
    let saturated = pinned_signal(0.0, 0.0, 1.0, 100.0);
    let _ = machine.evaluate(300, &saturated);
    assert_eq!(machine.level(), DifficultyLevel::Elevated);
    assert_eq!(machine.cooldown_remaining(), 240);

    let tuning = DifficultyTuning {
        elevated_hold_frames: 0,
        ..DifficultyTuning::default()
    };
    let mut eager = DifficultyStateMachine::new(tuning);
    let _ = eager.evaluate(300, &saturated);
    for remaining in [180, 120, 60] {
        assert_eq!(eager.evaluate(PERIOD, &saturated).transition, None);
        assert_eq!(eager.cooldown_remaining(), remaining);
        assert_eq!(eager.level(), DifficultyLevel::Elevated);
    }

    let evaluation = eager.evaluate(PERIOD, &saturated);
    assert_eq!(eager.cooldown_remaining(), 240);
    assert_eq!(
        evaluation.transition.map(|transition| transition.to()),
        Some(DifficultyLevel::Maximum)
    );
}

#[test]
fn normal_lock_prevents_escalation() {
    let mut machine = DifficultyStateMachine::default();
    let locked = pinned_signal(0.0, 0.6, 0.75, 100.0);
    for _ in 0..20 {
        assert_eq!(machine.evaluate(PERIOD, &locked).transition, None);
    }
    assert_eq!(machine.level(), DifficultyLevel::Normal);
}

#[test]
fn escalation_signal_never_triggers_assist() {
    let mut machine = DifficultyStateMachine::default();
    let escalating = pinned_signal(0.3, 0.0, 0.7, 100.0);
    let _ = machine.evaluate(300, &escalating);
    assert_eq!(machine.level(), DifficultyLevel::Elevated);

    for _ in 0..30 {
        let evaluation = machine.evaluate(PERIOD, &escalating);
        assert!(
            !matches!(evaluation.transition, Some(LevelTransition::Assisted { .. })),
            "an escalating signal must not de-escalate"
        );
        assert_eq!(machine.assist_confirmations(), 0);
    }
}

#[test]
fn single_assist_tick_is_debounced() {
    let mut machine = DifficultyStateMachine::default();
    let _ = machine.evaluate(300, &pinned_signal(0.0, 0.0, 1.0, 100.0));
    let _ = machine.evaluate(240, &pinned_signal(0.0, 0.0, 0.0, 100.0));
    assert_eq!(machine.cooldown_remaining(), 0);

    let struggling = pinned_signal(0.95, 0.05, 0.0, 100.0);
    let calm = pinned_signal(0.2, 0.6, 0.2, 100.0);

    assert_eq!(machine.evaluate(PERIOD, &struggling).transition, None);
    assert_eq!(machine.assist_confirmations(), 1);
    assert_eq!(machine.evaluate(PERIOD, &calm).transition, None);
    assert_eq!(machine.assist_confirmations(), 0);
    assert_eq!(machine.level(), DifficultyLevel::Elevated);

    assert_eq!(machine.evaluate(PERIOD, &struggling).transition, None);
    assert_eq!(
        machine.evaluate(PERIOD, &struggling).transition,
        Some(LevelTransition::Assisted {
            from: DifficultyLevel::Elevated,
            to: DifficultyLevel::Normal,
            reason: AssistReason::EasyDominant,
        })
    );
    assert_eq!(machine.assist_confirmations(), 0);
}

#[test]
fn calibration_then_escalation_scenario() {
    let mut harness = Harness::new();
    let mut transitions = Vec::new();
    for _ in 0..40 {
        if let Some(transition) = harness.tick(hard(), 100.0) {
            transitions.push((harness.ticks, transition));
        }
    }

    assert_eq!(transitions.len(), 2, "{transitions:?}");
    let (first_tick, first) = transitions[0];
    assert_eq!(first_tick, 5, "escalates on the tick that closes calibration");
    assert_eq!(first.to(), DifficultyLevel::Elevated);

    let (second_tick, second) = transitions[1];
    assert_eq!(second.to(), DifficultyLevel::Maximum);
    let frames_between = (second_tick - first_tick) * PERIOD;
    assert!(frames_between >= 240 + 600 - PERIOD, "hold must elapse: {frames_between}");
    assert_eq!(harness.level(), DifficultyLevel::Maximum);
}

#[test]
fn emergency_override_scenario() {
    let mut harness = Harness::new();
    for _ in 0..40 {
        let _ = harness.tick(hard(), 100.0);
    }
    assert_eq!(harness.level(), DifficultyLevel::Maximum);
    for _ in 0..4 {
        let _ = harness.tick(hard(), 100.0);
    }
    assert_eq!(harness.machine.cooldown_remaining(), 0);

    assert_eq!(harness.tick(hard(), 40.0), None);
    assert_eq!(harness.level(), DifficultyLevel::Maximum);
    let transition = harness.tick(hard(), 40.0);
    assert!(matches!(
        transition,
        Some(LevelTransition::Assisted {
            from: DifficultyLevel::Maximum,
            to: DifficultyLevel::Elevated,
            reason: AssistReason::CriticalHealth | AssistReason::DamageSpike,
        })
    ));
}

#[test]
fn reset_clears_all_state() {
    let mut harness = Harness::new();
    for _ in 0..40 {
        let _ = harness.tick(hard(), 100.0);
    }
    assert_eq!(harness.level(), DifficultyLevel::Maximum);

    harness.machine.reset();
    harness.conditioner.reset();

    assert_eq!(harness.level(), DifficultyLevel::Normal);
    assert_eq!(harness.machine.cooldown_remaining(), 0);
    assert_eq!(harness.machine.hold_frames(), 0);
    assert_eq!(harness.machine.assist_confirmations(), 0);
    assert!(harness.machine.is_calibrating());
    assert_eq!(harness.conditioner.signal(), ConditionedSignal::neutral());

    for _ in 0..4 {
        assert_eq!(harness.tick(hard(), 100.0), None);
    }
}

proptest! {
    #[test]
    fn levels_move_one_step_at_a_time(
        samples in prop::collection::vec(
            (0.0f32..=1.0, 0.0f32..=1.0, 0.0f32..=1.0, 0.0f32..=100.0),
            1..200,
        )
    ) {
        let mut harness = Harness::new();
        let mut frames_since_transition = u32::MAX;
        for (easy, normal, hard, health) in samples {
            let before = harness.level();
            let transition = harness.tick(ClassProbabilities::new(easy, normal, hard), health);
            frames_since_transition = frames_since_transition.saturating_add(PERIOD);
            if let Some(transition) = transition {
                prop_assert_eq!(transition.from(), before);
                let step = i16::from(transition.to().number()) - i16::from(before.number());
                prop_assert_eq!(step.abs(), 1);
                prop_assert!(frames_since_transition >= 240);
                frames_since_transition = 0;
            }
            prop_assert!(harness.ticks >= 5 || harness.level() == DifficultyLevel::Normal);
        }
    }
}
