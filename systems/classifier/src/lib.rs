#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Difficulty classifier adapter.
//!
//! Every classifier variant implements [`DifficultyClassifier`]: preparation is
//! polled cooperatively from the host frame loop, readiness is queried before
//! any prediction, and predictions map [`NormalizedFeatures`] to
//! [`ClassProbabilities`]. Callers normalise raw telemetry with the
//! [`Normalization`] divisors the classifier was calibrated against.

mod network;
mod pretrained;
mod trained;

use std::{path::PathBuf, task::Poll, time::Duration};

use cpu_defender_core::{ClassProbabilities, DifficultyClass, FeatureVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use network::{Activation, LayerArtifact, ModelArtifact};
pub use pretrained::{ArtifactSource, FileArtifact, LoadPolicy, PretrainedClassifier};
pub use trained::{rule_label, TrainedClassifier, TrainingTuning};

/// Reasons a serialized classifier could not be loaded.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The artifact could not be read.
    #[error("classifier artifact `{path}` is missing: {reason}")]
    Missing {
        /// Location that was read.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },
    /// The artifact was read but is not a valid network description.
    #[error("classifier artifact is malformed: {0}")]
    Malformed(String),
    /// The artifact describes a network with incompatible dimensions.
    #[error("classifier artifact has mismatched shape: {0}")]
    ShapeMismatch(String),
}

/// Failures reported by classifier preparation and prediction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClassifierError {
    /// Prediction was requested before preparation completed.
    #[error("classifier is not ready")]
    NotReady,
    /// Loading a serialized network exhausted its attempts.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// On-the-fly training could not produce a usable network.
    #[error("classifier training failed: {0}")]
    Training(String),
    /// The network produced a non-finite probability.
    #[error("classifier produced a non-finite prediction")]
    InvalidOutput,
}

/// Uniform capability implemented by every classifier variant.
pub trait DifficultyClassifier: std::fmt::Debug {
    /// Reports whether [`DifficultyClassifier::predict`] may be called.
    fn is_ready(&self) -> bool;

    /// Performs a bounded slice of preparation work.
    ///
    /// `elapsed` is the host time since the previous poll. Returns `Pending`
    /// until the classifier is ready or has permanently failed. Polling a
    /// ready classifier is a no-op that returns `Ready(Ok(()))`.
    fn poll_prepare(&mut self, elapsed: Duration) -> Poll<Result<(), ClassifierError>>;

    /// Classifies a normalized feature vector. Pure with respect to its input.
    fn predict(&self, features: &NormalizedFeatures) -> Result<ClassProbabilities, ClassifierError>;
}

impl<C> DifficultyClassifier for Box<C>
where
    C: DifficultyClassifier + ?Sized,
{
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn poll_prepare(&mut self, elapsed: Duration) -> Poll<Result<(), ClassifierError>> {
        (**self).poll_prepare(elapsed)
    }

    fn predict(&self, features: &NormalizedFeatures) -> Result<ClassProbabilities, ClassifierError> {
        (**self).predict(features)
    }
}

/// Classifier that always reports a single class; ready immediately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClassifier {
    class: DifficultyClass,
}

impl FixedClassifier {
    /// Creates a classifier that always predicts `class`.
    #[must_use]
    pub const fn new(class: DifficultyClass) -> Self {
        Self { class }
    }
}

impl Default for FixedClassifier {
    fn default() -> Self {
        Self::new(DifficultyClass::Normal)
    }
}

impl DifficultyClassifier for FixedClassifier {
    fn is_ready(&self) -> bool {
        true
    }

    fn poll_prepare(&mut self, _elapsed: Duration) -> Poll<Result<(), ClassifierError>> {
        Poll::Ready(Ok(()))
    }

    fn predict(&self, _features: &NormalizedFeatures) -> Result<ClassProbabilities, ClassifierError> {
        Ok(ClassProbabilities::one_hot(self.class))
    }
}

/// Feature vector scaled into `0.0..=1.0` per channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedFeatures([f32; 4]);

impl NormalizedFeatures {
    /// Wraps pre-scaled values, clamping each into `0.0..=1.0` and mapping
    /// non-finite values to zero.
    #[must_use]
    pub fn new(values: [f32; 4]) -> Self {
        Self(values.map(|value| {
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                0.0
            }
        }))
    }

    /// Channels in classifier input order.
    #[must_use]
    pub fn as_array(&self) -> &[f32; 4] {
        &self.0
    }
}

/// Fixed divisors mapping raw telemetry onto the classifier's input range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Normalization {
    /// Score divisor.
    pub score: f32,
    /// Base health divisor.
    pub base_health: f32,
    /// Enemy count divisor.
    pub enemy_count: f32,
    /// Elapsed frame divisor.
    pub elapsed_frames: f32,
}

impl Normalization {
    /// Clamps each raw feature to `0..=divisor` and divides by the divisor.
    ///
    /// Non-finite values and non-positive divisors produce zero so a
    /// misbehaving caller can never inject NaN downstream.
    #[must_use]
    pub fn normalize(&self, features: &FeatureVector) -> NormalizedFeatures {
        NormalizedFeatures([
            scale(features.score, self.score),
            scale(features.base_health, self.base_health),
            scale(features.enemy_count, self.enemy_count),
            scale(features.elapsed_frames, self.elapsed_frames),
        ])
    }

    /// Divisors in classifier input order.
    #[must_use]
    pub const fn divisors(&self) -> [f32; 4] {
        [
            self.score,
            self.base_health,
            self.enemy_count,
            self.elapsed_frames,
        ]
    }
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            score: 5_000.0,
            base_health: 100.0,
            enemy_count: 20.0,
            elapsed_frames: 5_000.0,
        }
    }
}

fn scale(value: f32, divisor: f32) -> f32 {
    if !value.is_finite() || !divisor.is_finite() || divisor <= 0.0 {
        return 0.0;
    }
    value.clamp(0.0, divisor) / divisor
}

/// Classifier variant selected by configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Inference-only network loaded from an artifact.
    #[default]
    Pretrained,
    /// Network trained on the fly from the labelling rule.
    Trained,
    /// Constant NORMAL classification.
    Fixed,
}

/// Decoding applied to the output of a loaded network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Report the full probability triple.
    #[default]
    Probabilities,
    /// Report a one-hot triple for the most likely class.
    ArgMax,
}

/// Classifier selection and lifecycle parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierTuning {
    /// Which classifier variant to build.
    pub kind: ClassifierKind,
    /// Location of the serialized network for the pretrained variant.
    pub artifact_path: PathBuf,
    /// Load attempts before the pretrained variant gives up.
    pub max_attempts: u32,
    /// Delay between load attempts, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Output decoding for the pretrained variant.
    pub output: OutputMode,
    /// Hyper-parameters for the trained variant.
    pub training: TrainingTuning,
}

impl ClassifierTuning {
    /// Retry policy derived from the attempt and backoff settings.
    #[must_use]
    pub fn load_policy(&self) -> LoadPolicy {
        LoadPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    /// Builds the configured classifier variant.
    #[must_use]
    pub fn build(&self, normalization: Normalization) -> Box<dyn DifficultyClassifier> {
        match self.kind {
            ClassifierKind::Pretrained => Box::new(PretrainedClassifier::new(
                FileArtifact::new(self.artifact_path.clone()),
                self.load_policy(),
                self.output,
            )),
            ClassifierKind::Trained => {
                Box::new(TrainedClassifier::new(self.training.clone(), normalization))
            }
            ClassifierKind::Fixed => Box::new(FixedClassifier::default()),
        }
    }
}

impl Default for ClassifierTuning {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::default(),
            artifact_path: PathBuf::from("model/model.json"),
            max_attempts: 3,
            retry_backoff_ms: 1_000,
            output: OutputMode::default(),
            training: TrainingTuning::default(),
        }
    }
}
