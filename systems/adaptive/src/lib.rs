#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Adaptive difficulty controller.
//!
//! The controller owns one adaptive session at a time. Activation pauses the
//! arena, prepares the classifier cooperatively across host frames and plays
//! the announcement sequence before resuming play under classifier control.
//! Every per-session component lives inside the session, so deactivation
//! drops it wholesale: a preparation still in flight cannot outlive the
//! session that started it.
//!
//! Two entry points drive the controller: [`AdaptiveController::advance`] once
//! per host frame with wall time, and [`AdaptiveController::observe`] with the
//! events of every simulated tick.

mod sequencer;
mod tuning;

use std::{fmt, task::Poll, time::Duration};

use cpu_defender_core::{
    ClassProbabilities, Command, DifficultyClass, DifficultyLevel, Event, TelemetrySnapshot,
};
use cpu_defender_system_classifier::{ClassifierError, DifficultyClassifier};
use cpu_defender_system_conditioner::{ConditionedSignal, SignalConditioner};
use cpu_defender_system_difficulty::{DifficultyStateMachine, LevelTransition};
use cpu_defender_system_level_effects::{Announcement, AnnouncementKind, LevelEffects};
use cpu_defender_system_telemetry::{Config as SamplerConfig, TelemetrySample, TelemetrySampler};

pub use cpu_defender_core::AdaptiveStatus;
pub use sequencer::{ActivationSequencer, Phase};
pub use tuning::{AdaptiveTuning, TuningError};

/// Produces a fresh classifier for a new session.
pub type ClassifierFactory = Box<dyn FnMut() -> Box<dyn DifficultyClassifier>>;

/// Things the controller reports to the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum AdaptiveNotice {
    /// Headline to show over the playfield.
    Announcement(Announcement),
    /// The difficulty level changed.
    LevelChanged(LevelTransition),
    /// The classifier could not be prepared; adaptive mode was switched off.
    LoadFailed(ClassifierError),
}

/// Per-activation state. Dropping it cancels everything it started.
#[derive(Debug)]
struct Session {
    id: u64,
    classifier: Box<dyn DifficultyClassifier>,
    sequencer: ActivationSequencer,
    sampler: TelemetrySampler,
    conditioner: SignalConditioner,
    machine: DifficultyStateMachine,
}

impl Session {
    fn status(&self) -> AdaptiveStatus {
        match self.sequencer.phase() {
            Phase::Loading | Phase::Online => AdaptiveStatus::Starting,
            Phase::Calibrating => AdaptiveStatus::Calibrating,
            Phase::Active if self.machine.is_calibrating() => AdaptiveStatus::Calibrating,
            Phase::Active => AdaptiveStatus::Active(self.machine.level()),
        }
    }
}

/// Owns adaptive sessions and translates classifier output into arena commands.
pub struct AdaptiveController {
    tuning: AdaptiveTuning,
    effects: LevelEffects,
    factory: ClassifierFactory,
    prepared: Option<Box<dyn DifficultyClassifier>>,
    session: Option<Session>,
    sessions_started: u64,
}

impl AdaptiveController {
    /// Creates a controller that builds the classifier named by the tuning.
    #[must_use]
    pub fn new(tuning: AdaptiveTuning) -> Self {
        let classifier = tuning.classifier.clone();
        let normalization = tuning.normalization;
        Self::with_factory(tuning, Box::new(move || classifier.build(normalization)))
    }

    /// Creates a controller with a caller supplied classifier factory.
    #[must_use]
    pub fn with_factory(tuning: AdaptiveTuning, factory: ClassifierFactory) -> Self {
        let effects = LevelEffects::new(tuning.effects, tuning.announcements);
        Self {
            tuning,
            effects,
            factory,
            prepared: None,
            session: None,
            sessions_started: 0,
        }
    }

    /// Tuning the controller was created with.
    #[must_use]
    pub fn tuning(&self) -> &AdaptiveTuning {
        &self.tuning
    }

    /// Level effect applicator shared with the host.
    #[must_use]
    pub fn effects(&self) -> &LevelEffects {
        &self.effects
    }

    /// Reports whether a session exists.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Current status for the HUD.
    #[must_use]
    pub fn status(&self) -> AdaptiveStatus {
        self.session
            .as_ref()
            .map_or(AdaptiveStatus::Manual, Session::status)
    }

    /// Current activation phase, if a session exists.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        self.session.as_ref().map(|session| session.sequencer.phase())
    }

    /// Difficulty level in force; level 1 while adaptive mode is off.
    #[must_use]
    pub fn level(&self) -> DifficultyLevel {
        self.session
            .as_ref()
            .map_or(DifficultyLevel::Normal, |session| session.machine.level())
    }

    /// Smoothed signal of the running session.
    #[must_use]
    pub fn signal(&self) -> ConditionedSignal {
        self.session
            .as_ref()
            .map_or(ConditionedSignal::neutral(), |session| {
                session.conditioner.signal()
            })
    }

    /// Number of sessions started over the controller's lifetime.
    #[must_use]
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    /// Reports whether the controller currently requires the arena to stay paused.
    #[must_use]
    pub fn holds_pause(&self) -> bool {
        self.phase().is_some_and(|phase| phase != Phase::Active)
    }

    /// Starts a session: clears the arena, pauses it and begins preparation.
    ///
    /// Activating while a session exists is a no-op.
    pub fn activate(&mut self, out: &mut Vec<Command>) {
        if self.session.is_some() {
            return;
        }

        self.sessions_started += 1;
        let classifier = match self.prepared.take() {
            Some(classifier) => classifier,
            None => (self.factory)(),
        };
        let sequence = Duration::from_millis(self.tuning.announcements.sequence_ms);
        let session = Session {
            id: self.sessions_started,
            classifier,
            sequencer: ActivationSequencer::new(sequence, sequence),
            sampler: TelemetrySampler::new(SamplerConfig::new(self.tuning.sample_period_frames)),
            conditioner: SignalConditioner::new(self.tuning.conditioner),
            machine: DifficultyStateMachine::new(self.tuning.difficulty),
        };
        tracing::info!(session = session.id, "adaptive mode activated");
        self.session = Some(session);

        out.push(Command::ClearHostiles);
        out.push(Command::SetPaused { paused: true });
    }

    /// Ends the session and restores manual difficulty.
    ///
    /// A classifier that finished preparing is kept for the next activation;
    /// one still preparing is dropped with the session.
    pub fn deactivate(&mut self, out: &mut Vec<Command>, notices: &mut Vec<AdaptiveNotice>) {
        let Some(session) = self.session.take() else {
            return;
        };

        tracing::info!(
            session = session.id,
            level = session.machine.level().number(),
            "adaptive mode deactivated"
        );
        if session.classifier.is_ready() {
            self.prepared = Some(session.classifier);
        }

        self.restore_manual(out);
        notices.push(AdaptiveNotice::Announcement(
            self.effects.announcement(AnnouncementKind::ManualMode),
        ));
    }

    /// Suspends or resumes the activation sequence, e.g. while an overlay is open.
    pub fn set_suspended(&mut self, suspended: bool) {
        if let Some(session) = self.session.as_mut() {
            if suspended {
                session.sequencer.pause();
            } else {
                session.sequencer.resume();
            }
        }
    }

    /// Host frame step: prepares the classifier and runs the announcement sequence.
    pub fn advance(
        &mut self,
        elapsed: Duration,
        out: &mut Vec<Command>,
        notices: &mut Vec<AdaptiveNotice>,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.sequencer.is_paused() {
            return;
        }

        let entered = match session.sequencer.phase() {
            Phase::Loading => match session.classifier.poll_prepare(elapsed) {
                Poll::Pending => return,
                Poll::Ready(Ok(())) => {
                    tracing::info!(session = session.id, "classifier ready");
                    session.sequencer.loading_complete()
                }
                Poll::Ready(Err(error)) => {
                    self.fail(error, out, notices);
                    return;
                }
            },
            Phase::Online | Phase::Calibrating => session.sequencer.advance(elapsed),
            Phase::Active => return,
        };

        for phase in entered {
            match phase {
                Phase::Online => notices.push(AdaptiveNotice::Announcement(
                    self.effects.announcement(AnnouncementKind::SystemOnline),
                )),
                Phase::Calibrating => notices.push(AdaptiveNotice::Announcement(
                    self.effects.announcement(AnnouncementKind::Calibrating),
                )),
                Phase::Active => {
                    session.sampler.reset();
                    self.effects.apply(DifficultyLevel::Normal, true, out);
                    out.push(Command::SetPaused { paused: false });
                    tracing::info!(session = session.id, "adaptive play started");
                }
                Phase::Loading => {}
            }
        }
    }

    /// Simulation step: samples telemetry and evaluates the difficulty level.
    ///
    /// `events` are the arena events of the ticks just simulated; `read`
    /// queries a fresh snapshot and is only invoked on sampling frames.
    pub fn observe<F>(
        &mut self,
        events: &[Event],
        read: F,
        out: &mut Vec<Command>,
        notices: &mut Vec<AdaptiveNotice>,
    ) where
        F: FnMut() -> TelemetrySnapshot,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.sequencer.phase() != Phase::Active {
            return;
        }

        let mut samples: Vec<TelemetrySample> = Vec::new();
        session.sampler.handle(events, read, &mut samples);

        for sample in samples {
            let probabilities = classify(session, &self.tuning, &sample);
            let signal = session.conditioner.update(&probabilities, &sample.snapshot);
            let evaluation = session.machine.evaluate(sample.elapsed_frames, &signal);

            if evaluation.calibration_completed {
                notices.push(AdaptiveNotice::Announcement(
                    self.effects
                        .announcement(AnnouncementKind::CalibrationComplete),
                ));
            }
            if let Some(transition) = evaluation.transition {
                self.effects.apply(transition.to(), true, out);
                notices.push(AdaptiveNotice::LevelChanged(transition));
                notices.push(AdaptiveNotice::Announcement(
                    self.effects.announce_transition(&transition),
                ));
            }
        }
    }

    fn fail(
        &mut self,
        error: ClassifierError,
        out: &mut Vec<Command>,
        notices: &mut Vec<AdaptiveNotice>,
    ) {
        if let Some(session) = self.session.take() {
            tracing::warn!(
                session = session.id,
                %error,
                "classifier unavailable, falling back to manual mode"
            );
        }
        self.restore_manual(out);
        notices.push(AdaptiveNotice::LoadFailed(error));
        notices.push(AdaptiveNotice::Announcement(
            self.effects.announcement(AnnouncementKind::Offline),
        ));
    }

    fn restore_manual(&self, out: &mut Vec<Command>) {
        self.effects.apply(DifficultyLevel::Normal, false, out);
        out.push(Command::SetPaused { paused: false });
    }
}

impl fmt::Debug for AdaptiveController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveController")
            .field("tuning", &self.tuning)
            .field("prepared", &self.prepared)
            .field("session", &self.session)
            .field("sessions_started", &self.sessions_started)
            .finish_non_exhaustive()
    }
}

/// Readiness gate: anything but a ready, well-behaved classifier reads as NORMAL.
fn classify(
    session: &Session,
    tuning: &AdaptiveTuning,
    sample: &TelemetrySample,
) -> ClassProbabilities {
    let fallback = ClassProbabilities::one_hot(DifficultyClass::Normal);
    if !session.classifier.is_ready() {
        return fallback;
    }

    let features = tuning.normalization.normalize(&sample.features);
    match session.classifier.predict(&features) {
        Ok(probabilities) => {
            tracing::debug!(
                session = session.id,
                easy = probabilities.easy,
                normal = probabilities.normal,
                hard = probabilities.hard,
                "classified sample"
            );
            probabilities
        }
        Err(error) => {
            tracing::warn!(session = session.id, %error, "prediction failed, using NORMAL");
            fallback
        }
    }
}
