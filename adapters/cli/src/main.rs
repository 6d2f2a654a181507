#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the CPU Defender arcade cabinet.

mod autopilot;
mod cabinet;
mod clock;
mod defender;
mod logging;
mod simulate;
mod train;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cpu_defender_core::CABINET_TITLE;
use cpu_defender_rendering::{palette, Presentation, RenderingBackend};
use cpu_defender_rendering_macroquad::MacroquadBackend;
use cpu_defender_system_adaptive::AdaptiveTuning;
use cpu_defender_system_classifier::ClassifierKind;

use crate::{
    autopilot::Skill,
    cabinet::Cabinet,
    logging::LogFormat,
    simulate::SimulationOptions,
};

#[derive(Debug, Parser)]
#[command(name = "cpu-defender", version, about = "Arcade cabinet with an adaptive CPU Defender")]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Open the cabinet window.
    Play {
        #[command(flatten)]
        tuning: TuningArgs,

        /// Synchronise presentation with the display refresh rate.
        #[arg(long)]
        vsync: bool,

        /// Log frame timings once per second.
        #[arg(long)]
        show_fps: bool,
    },
    /// Run CPU Defender headlessly with an autopilot turret and print the level history.
    Simulate {
        #[command(flatten)]
        tuning: TuningArgs,

        /// Simulation frames to run (60 per second).
        #[arg(long, default_value_t = 7_200)]
        frames: u64,

        /// Switch adaptive mode on at the start of the run.
        #[arg(long)]
        adaptive: bool,

        /// Playing strength of the autopilot.
        #[arg(long, value_enum, default_value_t = Skill::Steady)]
        skill: Skill,
    },
    /// Train a classifier from the labelling rule and write it as a network artifact.
    Train {
        #[command(flatten)]
        tuning: TuningArgs,

        /// Destination of the JSON artifact; defaults to the configured model path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Classifier variants selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ClassifierArg {
    /// Network loaded from the model artifact.
    Pretrained,
    /// Network trained when adaptive mode starts.
    Trained,
    /// Constant NORMAL classification.
    Fixed,
}

impl From<ClassifierArg> for ClassifierKind {
    fn from(value: ClassifierArg) -> Self {
        match value {
            ClassifierArg::Pretrained => Self::Pretrained,
            ClassifierArg::Trained => Self::Trained,
            ClassifierArg::Fixed => Self::Fixed,
        }
    }
}

#[derive(Debug, Args)]
struct TuningArgs {
    /// TOML file overriding any subset of the adaptive tuning.
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Network artifact loaded by the pretrained classifier.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Classifier variant used by adaptive mode.
    #[arg(long, value_enum)]
    classifier: Option<ClassifierArg>,

    /// Seed for spawning and minigame randomness.
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
}

impl TuningArgs {
    fn resolve(&self) -> Result<AdaptiveTuning> {
        let mut tuning = match &self.tuning {
            Some(path) => AdaptiveTuning::load(path)
                .with_context(|| format!("failed to load tuning from `{}`", path.display()))?,
            None => AdaptiveTuning::default(),
        };
        if let Some(model) = &self.model {
            tuning.classifier.artifact_path = model.clone();
        }
        if let Some(kind) = self.classifier {
            tuning.classifier.kind = kind.into();
        }
        tracing::debug!(?tuning, "adaptive tuning resolved");
        Ok(tuning)
    }
}

/// Entry point for the CPU Defender command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format)?;

    match cli.command {
        Commands::Play {
            tuning,
            vsync,
            show_fps,
        } => {
            let mut cabinet = Cabinet::new(tuning.resolve()?, tuning.seed);
            let presentation = Presentation::new(CABINET_TITLE, palette::CABINET, cabinet.scene());
            MacroquadBackend::new()
                .with_vsync(vsync)
                .with_show_fps(show_fps)
                .run(presentation, move |elapsed, input, scene| {
                    cabinet.frame(elapsed, input, scene)
                })
                .context("cabinet window failed")
        }
        Commands::Simulate {
            tuning,
            frames,
            adaptive,
            skill,
        } => {
            let report = simulate::run(
                tuning.resolve()?,
                SimulationOptions {
                    frames,
                    adaptive,
                    skill,
                    seed: tuning.seed,
                },
            );
            print!("{report}");
            Ok(())
        }
        Commands::Train { tuning, output } => {
            let resolved = tuning.resolve()?;
            let output = output.unwrap_or_else(|| resolved.classifier.artifact_path.clone());
            let epochs = train::export(
                &resolved.classifier.training,
                resolved.normalization,
                &output,
            )?;
            println!("trained {epochs} epochs, wrote {}", output.display());
            Ok(())
        }
    }
}
