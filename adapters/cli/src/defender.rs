//! CPU Defender session: the arena, its spawner and the adaptive controller
//! stepped together once per host frame.

use std::time::Duration;

use cpu_defender_core::{Command, DifficultyLevel, Event, GameState};
use cpu_defender_rendering::{AnnouncementBoard, DefenderView, EnemyView, HudLabel};
use cpu_defender_system_adaptive::{
    AdaptiveController, AdaptiveNotice, AdaptiveStatus, AdaptiveTuning,
};
use cpu_defender_system_classifier::ClassifierError;
use cpu_defender_system_difficulty::LevelTransition;
use cpu_defender_system_spawning::{Config as SpawningConfig, Spawning};
use cpu_defender_world::{self as world, query, World};
use glam::Vec2;

use crate::clock::FrameClock;

/// Player intent for one host frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct PlayerControls {
    pub(crate) movement: Vec2,
    pub(crate) aim: Option<Vec2>,
    pub(crate) fire: bool,
    pub(crate) repair: bool,
}

/// Level transition stamped with the arena frame it happened on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LevelChange {
    pub(crate) frame: u64,
    pub(crate) transition: LevelTransition,
}

#[derive(Debug)]
pub(crate) struct DefenderSession {
    world: World,
    spawning: Spawning,
    controller: AdaptiveController,
    board: AnnouncementBoard,
    clock: FrameClock,
    tutorial_open: bool,
    history: Vec<LevelChange>,
    load_failure: Option<ClassifierError>,
    notices: Vec<AdaptiveNotice>,
}

impl DefenderSession {
    pub(crate) fn new(tuning: AdaptiveTuning, seed: u64) -> Self {
        Self::with_controller(AdaptiveController::new(tuning), seed)
    }

    pub(crate) fn with_controller(controller: AdaptiveController, seed: u64) -> Self {
        let mut session = Self {
            world: World::new(),
            spawning: Spawning::new(SpawningConfig::new(seed)),
            controller,
            board: AnnouncementBoard::new(),
            clock: FrameClock::default(),
            tutorial_open: false,
            history: Vec::new(),
            load_failure: None,
            notices: Vec::new(),
        };
        let mut commands = Vec::new();
        session
            .controller
            .effects()
            .apply(DifficultyLevel::Normal, false, &mut commands);
        let _ = session.apply_all(commands);
        session
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn status(&self) -> AdaptiveStatus {
        self.controller.status()
    }

    pub(crate) fn history(&self) -> &[LevelChange] {
        &self.history
    }

    pub(crate) fn load_failure(&self) -> Option<&ClassifierError> {
        self.load_failure.as_ref()
    }

    pub(crate) fn is_over(&self) -> bool {
        query::game_state(&self.world) == GameState::GameOver
    }

    /// Switches adaptive mode on or off.
    pub(crate) fn toggle_adaptive(&mut self) {
        let mut commands = Vec::new();
        if self.controller.is_active() {
            self.controller
                .deactivate(&mut commands, &mut self.notices);
        } else {
            self.controller.activate(&mut commands);
        }
        let _ = self.apply_all(commands);
        self.sync_pause();
        self.drain_notices();
    }

    /// Opening the tutorial freezes both the arena and the activation sequence.
    pub(crate) fn set_tutorial(&mut self, open: bool) {
        if self.tutorial_open == open {
            return;
        }
        self.tutorial_open = open;
        self.controller.set_suspended(open);
        self.sync_pause();
    }

    /// Runs one host frame: announcements, the activation sequence, player
    /// input and as many simulation ticks as the elapsed time covers.
    pub(crate) fn frame(&mut self, elapsed: Duration, controls: PlayerControls) {
        self.board.advance(elapsed);

        if !self.tutorial_open {
            let mut commands = Vec::new();
            self.controller
                .advance(elapsed, &mut commands, &mut self.notices);
            let _ = self.apply_all(commands);
            self.drain_notices();
        }

        if let Some(target) = controls.aim {
            let _ = self.apply_all(vec![Command::AimAt { target }]);
        }
        if !query::is_paused(&self.world) {
            let mut commands = Vec::new();
            if controls.fire {
                commands.push(Command::Fire);
            }
            if controls.repair {
                commands.push(Command::RepairBase);
            }
            let _ = self.apply_all(commands);
        }

        for _ in 0..self.clock.ticks(elapsed) {
            self.tick(controls.movement);
        }
    }

    fn tick(&mut self, movement: Vec2) {
        let mut events = Vec::new();
        if movement != Vec2::ZERO {
            world::apply(
                &mut self.world,
                Command::MovePlayer {
                    direction: movement,
                },
                &mut events,
            );
        }
        world::apply(&mut self.world, Command::Tick, &mut events);
        if events.is_empty() {
            return;
        }

        let mut commands = Vec::new();
        let arena = query::arena(&self.world);
        self.spawning.handle(
            &events,
            &query::spawn_profile(&self.world),
            Vec2::new(arena.width(), arena.height()),
            query::ammo_crates(&self.world).len(),
            &mut commands,
        );
        let snapshot = &self.world;
        self.controller.observe(
            &events,
            || query::telemetry(snapshot),
            &mut commands,
            &mut self.notices,
        );
        let follow_up = self.apply_all(commands);
        if let Some(score) = follow_up.iter().chain(&events).find_map(|event| match event {
            Event::GameOver { score } => Some(*score),
            _ => None,
        }) {
            tracing::info!(score, frame = query::frame(&self.world), "cpu destroyed");
        }
        self.drain_notices();
    }

    fn sync_pause(&mut self) {
        let paused = self.tutorial_open || self.controller.holds_pause();
        let _ = self.apply_all(vec![Command::SetPaused { paused }]);
    }

    fn apply_all(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        events
    }

    fn drain_notices(&mut self) {
        for notice in self.notices.drain(..) {
            match notice {
                AdaptiveNotice::Announcement(announcement) => self.board.show(announcement),
                AdaptiveNotice::LevelChanged(transition) => {
                    let frame = query::frame(&self.world);
                    tracing::debug!(frame, "level change recorded");
                    self.history.push(LevelChange { frame, transition });
                }
                AdaptiveNotice::LoadFailed(error) => {
                    tracing::warn!(%error, "adaptive mode unavailable");
                    self.load_failure = Some(error);
                }
            }
        }
    }

    pub(crate) fn view(&self) -> DefenderView {
        let arena = query::arena(&self.world);
        let base = query::base(&self.world);
        let turret = query::turret(&self.world);
        let status = self.controller.status();
        DefenderView {
            arena: Vec2::new(arena.width(), arena.height()),
            base: base.position(),
            health_fraction: if base.max_health() > 0.0 {
                base.health() / base.max_health()
            } else {
                0.0
            },
            turret: turret.position(),
            heading: turret.heading(),
            bullets: query::bullets(&self.world)
                .iter()
                .map(|bullet| bullet.position())
                .collect(),
            enemies: query::enemies(&self.world)
                .iter()
                .map(|enemy| EnemyView {
                    position: enemy.position(),
                    kind: enemy.kind(),
                    radius: enemy.kind().radius(),
                })
                .collect(),
            mines: query::mines(&self.world)
                .iter()
                .map(|mine| mine.position())
                .collect(),
            crates: query::ammo_crates(&self.world)
                .iter()
                .map(|ammo_crate| ammo_crate.position())
                .collect(),
            score: query::score(&self.world),
            ammo: (turret.ammo(), query::spawn_profile(&self.world).max_ammo),
            adaptive: status != AdaptiveStatus::Manual,
            hud: HudLabel::for_status(status),
            announcement: self.board.current(),
            game_over: self.is_over().then(|| query::score(&self.world)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpu_defender_core::FRAME_DURATION;
    use cpu_defender_core::{DifficultyClass, DifficultyLevel};
    use cpu_defender_system_classifier::{ClassifierKind, FixedClassifier};
    use cpu_defender_system_level_effects::AnnouncementKind;

    fn session_predicting(class: DifficultyClass) -> DefenderSession {
        let mut tuning = AdaptiveTuning::default();
        tuning.classifier.kind = ClassifierKind::Fixed;
        let controller = AdaptiveController::with_factory(
            tuning,
            Box::new(move || Box::new(FixedClassifier::new(class))),
        );
        DefenderSession::with_controller(controller, 9)
    }

    fn fixed_session() -> DefenderSession {
        session_predicting(DifficultyClass::Normal)
    }

    fn run(session: &mut DefenderSession, frames: u32) {
        for _ in 0..frames {
            session.frame(FRAME_DURATION, PlayerControls::default());
        }
    }

    #[test]
    fn one_tick_per_fixed_host_frame() {
        let mut session = fixed_session();
        run(&mut session, 10);
        assert_eq!(query::frame(session.world()), 10);
    }

    #[test]
    fn activation_sequence_holds_the_arena_until_active() {
        let mut session = fixed_session();
        session.toggle_adaptive();
        assert!(query::is_paused(session.world()));

        session.frame(FRAME_DURATION, PlayerControls::default());
        assert_eq!(
            session.view().announcement.map(|announcement| announcement.kind),
            Some(AnnouncementKind::SystemOnline)
        );
        assert_eq!(query::frame(session.world()), 0);

        run(&mut session, 200);
        assert_eq!(session.status(), AdaptiveStatus::Calibrating);
        assert!(!query::is_paused(session.world()));
        assert!(query::frame(session.world()) > 0);
        assert_eq!(query::spawn_profile(session.world()).spawn_interval_frames, 90);
    }

    #[test]
    fn tutorial_freezes_the_sequence() {
        let mut session = fixed_session();
        session.toggle_adaptive();
        session.frame(FRAME_DURATION, PlayerControls::default());
        session.set_tutorial(true);
        run(&mut session, 400);
        assert_eq!(session.status(), AdaptiveStatus::Starting);
        assert_eq!(query::frame(session.world()), 0);

        session.set_tutorial(false);
        assert!(query::is_paused(session.world()));
        run(&mut session, 400);
        assert_eq!(session.status(), AdaptiveStatus::Calibrating);
        assert!(!query::is_paused(session.world()));
    }

    #[test]
    fn toggling_off_restores_manual_play() {
        let mut session = fixed_session();
        session.toggle_adaptive();
        run(&mut session, 300);
        session.toggle_adaptive();

        let view = session.view();
        assert!(!view.adaptive);
        assert_eq!(view.hud, None);
        assert_eq!(
            view.announcement.map(|announcement| announcement.kind),
            Some(AnnouncementKind::ManualMode)
        );
        assert_eq!(query::spawn_profile(session.world()).spawn_interval_frames, 120);
    }

    #[test]
    fn view_reports_turret_and_base() {
        let session = fixed_session();
        let view = session.view();
        assert_eq!(view.base, Vec2::new(350.0, 250.0));
        assert_eq!(view.turret, Vec2::new(350.0, 350.0));
        assert_eq!(view.health_fraction, 1.0);
        assert_eq!(view.ammo, (30, 30));
        assert_eq!(view.game_over, None);
    }

    #[test]
    fn level_changes_are_stamped_with_the_arena_frame() {
        let mut session = session_predicting(DifficultyClass::Hard);
        session.toggle_adaptive();
        run(&mut session, 700);

        let first = session.history().first().expect("a level change");
        assert_eq!(first.transition.from(), DifficultyLevel::Normal);
        assert_eq!(first.transition.to(), DifficultyLevel::Elevated);
        assert!(first.frame >= 300, "escalated inside calibration at {}", first.frame);
        assert!(first.frame <= query::frame(session.world()));
    }
}
