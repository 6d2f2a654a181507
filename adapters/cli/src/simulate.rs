//! Headless CPU Defender runs driven by the autopilot.

use std::fmt;

use clap::ValueEnum;
use cpu_defender_core::FRAME_DURATION;
use cpu_defender_system_adaptive::{AdaptiveStatus, AdaptiveTuning};
use cpu_defender_system_difficulty::LevelTransition;
use cpu_defender_world::query;

use crate::{
    autopilot::{Autopilot, Skill},
    defender::{DefenderSession, LevelChange},
};

/// Host frames allowed beyond the requested simulation length, covering
/// classifier preparation and the activation sequence.
const HOST_FRAME_SLACK: u64 = 36_000;

#[derive(Clone, Copy, Debug)]
pub(crate) struct SimulationOptions {
    pub(crate) frames: u64,
    pub(crate) adaptive: bool,
    pub(crate) skill: Skill,
    pub(crate) seed: u64,
}

/// Outcome of a headless run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SimulationReport {
    skill: Skill,
    frames: u64,
    host_frames: u64,
    score: u32,
    health: f32,
    max_health: f32,
    destroyed: bool,
    status: AdaptiveStatus,
    load_failure: Option<String>,
    history: Vec<LevelChange>,
}

pub(crate) fn run(tuning: AdaptiveTuning, options: SimulationOptions) -> SimulationReport {
    run_session(DefenderSession::new(tuning, options.seed), options)
}

pub(crate) fn run_session(
    mut session: DefenderSession,
    options: SimulationOptions,
) -> SimulationReport {
    let mut pilot = Autopilot::new(options.skill, options.seed);
    if options.adaptive {
        session.toggle_adaptive();
    }

    let mut host_frames = 0;
    while query::frame(session.world()) < options.frames
        && !session.is_over()
        && host_frames < options.frames + HOST_FRAME_SLACK
    {
        let controls = pilot.decide(session.world());
        session.frame(FRAME_DURATION, controls);
        host_frames += 1;
    }

    let world = session.world();
    let base = query::base(world);
    let report = SimulationReport {
        skill: options.skill,
        frames: query::frame(world),
        host_frames,
        score: query::score(world),
        health: base.health(),
        max_health: base.max_health(),
        destroyed: session.is_over(),
        status: session.status(),
        load_failure: session.load_failure().map(ToString::to_string),
        history: session.history().to_vec(),
    };
    tracing::info!(
        frames = report.frames,
        score = report.score,
        transitions = report.history.len(),
        "simulation finished"
    );
    report
}

fn level_label(status: AdaptiveStatus) -> String {
    match status {
        AdaptiveStatus::Manual => "manual".to_owned(),
        AdaptiveStatus::Starting => "starting".to_owned(),
        AdaptiveStatus::Calibrating => "calibrating".to_owned(),
        AdaptiveStatus::Active(level) => format!("level {}", level.number()),
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let skill = self
            .skill
            .to_possible_value()
            .map_or_else(String::new, |value| value.get_name().to_owned());
        writeln!(
            f,
            "simulated {} frames ({} host frames), skill {skill}",
            self.frames, self.host_frames
        )?;
        writeln!(f, "score: {}", self.score)?;
        writeln!(
            f,
            "base health: {:.0}/{:.0}{}",
            self.health,
            self.max_health,
            if self.destroyed { " (SYSTEM FAILURE)" } else { "" }
        )?;
        writeln!(f, "adaptive: {}", level_label(self.status))?;
        if let Some(error) = &self.load_failure {
            writeln!(f, "classifier unavailable: {error}")?;
        }
        writeln!(f, "level history:")?;
        if self.history.is_empty() {
            writeln!(f, "  (no transitions)")?;
        }
        for change in &self.history {
            let kind = match change.transition {
                LevelTransition::Escalated { .. } => "escalated".to_owned(),
                LevelTransition::Assisted { reason, .. } => format!("assisted, {reason:?}"),
            };
            writeln!(
                f,
                "  frame {:>6}: level {} -> {} ({kind})",
                change.frame,
                change.transition.from().number(),
                change.transition.to().number(),
            )?;
        }
        Ok(())
    }
}
