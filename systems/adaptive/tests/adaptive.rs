use std::{cell::Cell, rc::Rc, task::Poll, time::Duration};

use cpu_defender_core::{ClassProbabilities, Command, DifficultyClass, DifficultyLevel, Event};
use cpu_defender_system_adaptive::{
    AdaptiveController, AdaptiveNotice, AdaptiveStatus, AdaptiveTuning, Phase,
};
use cpu_defender_system_classifier::{
    ClassifierError, ClassifierKind, DifficultyClassifier, LoadError, NormalizedFeatures,
};
use cpu_defender_system_conditioner::ConditionedSignal;
use cpu_defender_system_difficulty::LevelTransition;
use cpu_defender_system_level_effects::AnnouncementKind;
use cpu_defender_world::{self as world, query, World};

const HOST_FRAME: Duration = Duration::from_millis(16);

#[derive(Clone, Debug, Default)]
struct Probe {
    output: Rc<Cell<Option<ClassProbabilities>>>,
    predictions: Rc<Cell<u32>>,
    built: Rc<Cell<u32>>,
    dropped: Rc<Cell<u32>>,
}

impl Probe {
    fn emitting(class: DifficultyClass) -> Self {
        let probe = Self::default();
        probe.output.set(Some(ClassProbabilities::one_hot(class)));
        probe
    }
}

#[derive(Debug)]
struct Scripted {
    probe: Probe,
    polls_left: u32,
}

impl DifficultyClassifier for Scripted {
    fn is_ready(&self) -> bool {
        self.polls_left == 0
    }

    fn poll_prepare(&mut self, _elapsed: Duration) -> Poll<Result<(), ClassifierError>> {
        self.polls_left = self.polls_left.saturating_sub(1);
        if self.polls_left == 0 {
            Poll::Ready(Ok(()))
        } else {
            Poll::Pending
        }
    }

    fn predict(&self, _features: &NormalizedFeatures) -> Result<ClassProbabilities, ClassifierError> {
        self.probe.predictions.set(self.probe.predictions.get() + 1);
        self.probe.output.get().ok_or(ClassifierError::InvalidOutput)
    }
}

impl Drop for Scripted {
    fn drop(&mut self) {
        self.probe.dropped.set(self.probe.dropped.get() + 1);
    }
}

struct Rig {
    world: World,
    controller: AdaptiveController,
    notices: Vec<AdaptiveNotice>,
}

impl Rig {
    fn scripted(probe: &Probe, preparation_polls: u32) -> Self {
        let probe = probe.clone();
        let controller = AdaptiveController::with_factory(
            AdaptiveTuning::default(),
            Box::new(move || {
                probe.built.set(probe.built.get() + 1);
                Box::new(Scripted {
                    probe: probe.clone(),
                    polls_left: preparation_polls,
                })
            }),
        );
        Self::with_controller(controller)
    }

    fn with_controller(controller: AdaptiveController) -> Self {
        Self {
            world: World::new(),
            controller,
            notices: Vec::new(),
        }
    }

    fn apply(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        events
    }

    fn activate(&mut self) {
        let mut commands = Vec::new();
        self.controller.activate(&mut commands);
        let _ = self.apply(commands);
    }

    fn deactivate(&mut self) {
        let mut commands = Vec::new();
        self.controller.deactivate(&mut commands, &mut self.notices);
        let _ = self.apply(commands);
    }

    fn host_frame(&mut self) {
        let mut commands = Vec::new();
        self.controller
            .advance(HOST_FRAME, &mut commands, &mut self.notices);
        let _ = self.apply(commands);
    }

    fn tick(&mut self) {
        let events = self.apply(vec![Command::Tick]);
        let mut commands = Vec::new();
        let arena = &self.world;
        self.controller.observe(
            &events,
            || query::telemetry(arena),
            &mut commands,
            &mut self.notices,
        );
        let _ = self.apply(commands);
    }

    /// One host frame followed by one simulation tick.
    fn frame(&mut self) {
        self.host_frame();
        self.tick();
    }

    fn run_until_active(&mut self) {
        for _ in 0..1_000 {
            self.host_frame();
            if self.controller.phase() == Some(Phase::Active) {
                return;
            }
            self.tick();
        }
        panic!("activation sequence did not finish");
    }

    fn announcements(&self) -> Vec<AnnouncementKind> {
        self.notices
            .iter()
            .filter_map(|notice| match notice {
                AdaptiveNotice::Announcement(announcement) => Some(announcement.kind),
                _ => None,
            })
            .collect()
    }

    fn transitions(&self) -> Vec<LevelTransition> {
        self.notices
            .iter()
            .filter_map(|notice| match notice {
                AdaptiveNotice::LevelChanged(transition) => Some(*transition),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn activation_sequence_keeps_the_arena_paused() {
    let probe = Probe::emitting(DifficultyClass::Normal);
    let mut rig = Rig::scripted(&probe, 3);
    rig.activate();
    assert!(query::is_paused(&rig.world));
    assert_eq!(rig.controller.status(), AdaptiveStatus::Starting);

    rig.run_until_active();

    assert_eq!(query::frame(&rig.world), 0, "no frame advances before play");
    assert_eq!(probe.predictions.get(), 0);
    assert_eq!(
        rig.announcements(),
        vec![AnnouncementKind::SystemOnline, AnnouncementKind::Calibrating]
    );
    assert!(!query::is_paused(&rig.world));
    assert_eq!(query::spawn_profile(&rig.world).spawn_interval_frames, 90);
    assert_eq!(rig.controller.status(), AdaptiveStatus::Calibrating);
}

#[test]
fn hard_player_escalates_after_calibration() {
    let probe = Probe::emitting(DifficultyClass::Hard);
    let mut rig = Rig::scripted(&probe, 1);
    rig.activate();
    rig.run_until_active();

    for _ in 0..299 {
        rig.frame();
    }
    assert!(rig.transitions().is_empty());
    assert_eq!(probe.predictions.get(), 4);

    rig.frame();
    assert_eq!(
        rig.transitions(),
        vec![LevelTransition::Escalated {
            from: DifficultyLevel::Normal,
            to: DifficultyLevel::Elevated,
        }]
    );
    let announcements = rig.announcements();
    assert_eq!(
        &announcements[2..],
        &[
            AnnouncementKind::CalibrationComplete,
            AnnouncementKind::Escalated(DifficultyLevel::Elevated),
        ]
    );
    assert_eq!(query::spawn_profile(&rig.world).spawn_interval_frames, 50);
    assert!(query::spawn_profile(&rig.world).mines_enabled);

    for _ in 0..60 * 20 {
        rig.frame();
    }
    assert_eq!(rig.controller.level(), DifficultyLevel::Maximum);
    assert_eq!(
        rig.controller.status(),
        AdaptiveStatus::Active(DifficultyLevel::Maximum)
    );
    assert_eq!(query::spawn_profile(&rig.world).spawn_interval_frames, 25);
    assert_eq!(query::telemetry(&rig.world).max_ammo, 60);
}

#[test]
fn toggling_off_mid_session_resets_synchronously() {
    let probe = Probe::emitting(DifficultyClass::Hard);
    let mut rig = Rig::scripted(&probe, 1);
    rig.activate();
    rig.run_until_active();
    for _ in 0..300 {
        rig.frame();
    }
    assert_eq!(rig.controller.level(), DifficultyLevel::Elevated);

    rig.notices.clear();
    rig.deactivate();
    assert_eq!(rig.controller.status(), AdaptiveStatus::Manual);
    assert_eq!(rig.controller.level(), DifficultyLevel::Normal);
    assert_eq!(rig.controller.signal(), ConditionedSignal::neutral());
    assert_eq!(rig.announcements(), vec![AnnouncementKind::ManualMode]);
    assert_eq!(
        query::spawn_profile(&rig.world),
        rig.controller.tuning().effects.manual
    );
    assert!(!query::is_paused(&rig.world));

    let predictions = probe.predictions.get();
    rig.notices.clear();
    for _ in 0..600 {
        rig.frame();
    }
    assert!(rig.notices.is_empty(), "no transition fires after toggling off");
    assert_eq!(probe.predictions.get(), predictions);

    rig.activate();
    assert_eq!(probe.built.get(), 1, "a prepared classifier is reused");
    assert_eq!(rig.controller.sessions_started(), 2);
    rig.run_until_active();
    assert_eq!(rig.controller.status(), AdaptiveStatus::Calibrating);
    assert_eq!(rig.controller.level(), DifficultyLevel::Normal);
}

#[test]
fn load_failure_switches_adaptive_mode_off() {
    let mut tuning = AdaptiveTuning::default();
    tuning.classifier.kind = ClassifierKind::Pretrained;
    tuning.classifier.artifact_path = std::env::temp_dir().join(format!(
        "cpu-defender-adaptive-{}-absent.json",
        std::process::id()
    ));
    tuning.classifier.max_attempts = 3;
    tuning.classifier.retry_backoff_ms = 200;
    let mut rig = Rig::with_controller(AdaptiveController::new(tuning));

    rig.activate();
    for _ in 0..10 {
        rig.frame();
    }
    assert!(rig.controller.is_active(), "still retrying");
    assert!(query::is_paused(&rig.world));

    for _ in 0..30 {
        rig.frame();
    }

    assert!(!rig.controller.is_active());
    assert_eq!(rig.controller.status(), AdaptiveStatus::Manual);
    assert!(matches!(
        rig.notices.as_slice(),
        [
            AdaptiveNotice::LoadFailed(ClassifierError::Load(LoadError::Missing { .. })),
            AdaptiveNotice::Announcement(announcement),
        ] if announcement.kind == AnnouncementKind::Offline
    ));
    assert!(!query::is_paused(&rig.world));
    assert_eq!(
        query::spawn_profile(&rig.world),
        rig.controller.tuning().effects.manual
    );
    assert!(query::frame(&rig.world) > 0, "manual play continues");
}

#[test]
fn pending_preparation_is_dropped_with_its_session() {
    let probe = Probe::emitting(DifficultyClass::Hard);
    let mut rig = Rig::scripted(&probe, 1_000);
    rig.activate();
    for _ in 0..20 {
        rig.frame();
    }
    assert_eq!(rig.controller.phase(), Some(Phase::Loading));

    rig.deactivate();
    assert_eq!(probe.dropped.get(), 1);
    rig.notices.clear();

    for _ in 0..2_000 {
        rig.frame();
    }
    assert!(rig.notices.is_empty());
    assert_eq!(rig.controller.status(), AdaptiveStatus::Manual);
    assert_eq!(probe.predictions.get(), 0);

    rig.activate();
    assert_eq!(probe.built.get(), 2, "a fresh preparation starts");
    assert_eq!(rig.controller.phase(), Some(Phase::Loading));
}

#[test]
fn nothing_is_classified_while_the_arena_is_paused() {
    let probe = Probe::emitting(DifficultyClass::Hard);
    let mut rig = Rig::scripted(&probe, 1);
    rig.activate();
    rig.run_until_active();
    for _ in 0..120 {
        rig.frame();
    }
    let predictions = probe.predictions.get();
    assert_eq!(predictions, 2);

    let _ = rig.apply(vec![Command::SetPaused { paused: true }]);
    for _ in 0..1_200 {
        rig.frame();
    }
    assert_eq!(probe.predictions.get(), predictions);
    assert_eq!(rig.controller.level(), DifficultyLevel::Normal);
    assert!(rig.transitions().is_empty());
}

#[test]
fn failing_predictions_read_as_normal() {
    let probe = Probe::default();
    let mut rig = Rig::scripted(&probe, 1);
    rig.activate();
    rig.run_until_active();
    for _ in 0..60 * 30 {
        rig.frame();
    }

    assert_eq!(probe.predictions.get(), 30);
    assert!(rig.transitions().is_empty());
    assert_eq!(
        rig.controller.status(),
        AdaptiveStatus::Active(DifficultyLevel::Normal)
    );
    assert!(rig.controller.signal().probabilities.normal > 0.99);
}
