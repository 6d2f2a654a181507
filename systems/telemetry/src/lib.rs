#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Telemetry sampler that reads gameplay state into classifier features at a fixed cadence.

use cpu_defender_core::{Event, FeatureVector, TelemetrySnapshot, FRAMES_PER_SECOND};

/// Configuration parameters required to construct the telemetry sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    period_frames: u32,
}

impl Config {
    /// Creates a configuration that samples once every `period_frames` frames.
    ///
    /// A zero period is treated as one so the sampler always makes progress.
    #[must_use]
    pub const fn new(period_frames: u32) -> Self {
        let period_frames = if period_frames == 0 { 1 } else { period_frames };
        Self { period_frames }
    }

    /// Number of simulated frames between two samples.
    #[must_use]
    pub const fn period_frames(&self) -> u32 {
        self.period_frames
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(FRAMES_PER_SECOND)
    }
}

/// A single reading taken by the sampler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetrySample {
    /// Raw gameplay snapshot captured on the sampling frame.
    pub snapshot: TelemetrySnapshot,
    /// Classifier features extracted from the snapshot.
    pub features: FeatureVector,
    /// Simulated frames covered since the previous sample.
    pub elapsed_frames: u32,
}

/// Pure system that turns frame events into periodic telemetry samples.
#[derive(Debug)]
pub struct TelemetrySampler {
    config: Config,
    frames_since_sample: u32,
}

impl TelemetrySampler {
    /// Creates a sampler with an empty frame counter.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            frames_since_sample: 0,
        }
    }

    /// Configuration the sampler was created with.
    #[must_use]
    pub fn config(&self) -> Config {
        self.config
    }

    /// Frames counted towards the next sample.
    #[must_use]
    pub fn frames_since_sample(&self) -> u32 {
        self.frames_since_sample
    }

    /// Discards the partial period so the next sample starts from zero.
    pub fn reset(&mut self) {
        self.frames_since_sample = 0;
    }

    /// Counts advanced frames and emits a sample whenever a period completes.
    ///
    /// `read` is invoked only on sampling frames, so callers can defer the
    /// snapshot query until it is actually needed. Paused simulations emit no
    /// `FrameAdvanced` events and therefore never sample.
    pub fn handle<F>(&mut self, events: &[Event], mut read: F, out: &mut Vec<TelemetrySample>)
    where
        F: FnMut() -> TelemetrySnapshot,
    {
        for event in events {
            if !matches!(event, Event::FrameAdvanced { .. }) {
                continue;
            }

            self.frames_since_sample += 1;
            if self.frames_since_sample < self.config.period_frames {
                continue;
            }

            let elapsed_frames = self.frames_since_sample;
            self.frames_since_sample = 0;
            let snapshot = read();
            let features = FeatureVector::from_snapshot(&snapshot);
            tracing::debug!(
                score = snapshot.score,
                health = snapshot.base_health,
                enemies = snapshot.enemy_count,
                frame = snapshot.elapsed_frames,
                "telemetry sampled"
            );
            out.push(TelemetrySample {
                snapshot,
                features,
                elapsed_frames,
            });
        }
    }
}
