use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    task::Poll,
    time::Duration,
};

use cpu_defender_core::ClassProbabilities;

use crate::{
    network::{ModelArtifact, Network},
    ClassifierError, DifficultyClassifier, LoadError, NormalizedFeatures, OutputMode,
};

/// Supplies the raw text of a serialized classifier network.
pub trait ArtifactSource: fmt::Debug {
    /// Reads the artifact, classifying failures as [`LoadError`] variants.
    fn read(&self) -> Result<String, LoadError>;
}

/// Artifact stored as a JSON file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileArtifact {
    path: PathBuf,
}

impl FileArtifact {
    /// Creates a source that reads the provided path on every attempt.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location the artifact is read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactSource for FileArtifact {
    fn read(&self) -> Result<String, LoadError> {
        fs::read_to_string(&self.path).map_err(|error| match error.kind() {
            io::ErrorKind::InvalidData => LoadError::Malformed(error.to_string()),
            _ => LoadError::Missing {
                path: self.path.display().to_string(),
                reason: error.to_string(),
            },
        })
    }
}

/// Retry policy applied while loading an artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl LoadPolicy {
    /// Creates a policy; a zero attempt budget still performs one attempt.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Total number of load attempts before giving up.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between two consecutive attempts.
    #[must_use]
    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1_000))
    }
}

#[derive(Debug)]
enum LoadState {
    Idle,
    Backoff { remaining: Duration },
    Ready(Network),
    Failed(LoadError),
}

/// Inference-only classifier backed by a serialized network.
#[derive(Debug)]
pub struct PretrainedClassifier<S> {
    source: S,
    policy: LoadPolicy,
    output: OutputMode,
    attempts: u32,
    state: LoadState,
}

impl<S> PretrainedClassifier<S>
where
    S: ArtifactSource,
{
    /// Creates a classifier that loads lazily on the first preparation poll.
    #[must_use]
    pub fn new(source: S, policy: LoadPolicy, output: OutputMode) -> Self {
        Self {
            source,
            policy,
            output,
            attempts: 0,
            state: LoadState::Idle,
        }
    }

    /// Number of load attempts performed so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Serialized form of the loaded network, once ready.
    #[must_use]
    pub fn artifact(&self) -> Option<ModelArtifact> {
        match &self.state {
            LoadState::Ready(network) => Some(network.to_artifact()),
            _ => None,
        }
    }

    fn attempt(&mut self) -> Poll<Result<(), ClassifierError>> {
        self.attempts += 1;
        let loaded = self.source.read().and_then(|text| {
            let artifact: ModelArtifact = serde_json::from_str(&text)
                .map_err(|error| LoadError::Malformed(error.to_string()))?;
            Network::from_artifact(&artifact)
        });

        match loaded {
            Ok(network) => {
                tracing::info!(attempts = self.attempts, "classifier artifact loaded");
                self.state = LoadState::Ready(network);
                Poll::Ready(Ok(()))
            }
            Err(error) if self.attempts < self.policy.max_attempts => {
                tracing::warn!(
                    attempt = self.attempts,
                    max_attempts = self.policy.max_attempts,
                    %error,
                    "classifier artifact load failed, retrying"
                );
                self.state = LoadState::Backoff {
                    remaining: self.policy.backoff,
                };
                Poll::Pending
            }
            Err(error) => {
                tracing::warn!(
                    attempts = self.attempts,
                    %error,
                    "classifier artifact unavailable"
                );
                self.state = LoadState::Failed(error.clone());
                Poll::Ready(Err(error.into()))
            }
        }
    }
}

impl<S> DifficultyClassifier for PretrainedClassifier<S>
where
    S: ArtifactSource,
{
    fn is_ready(&self) -> bool {
        matches!(self.state, LoadState::Ready(_))
    }

    fn poll_prepare(&mut self, elapsed: Duration) -> Poll<Result<(), ClassifierError>> {
        if let LoadState::Backoff { remaining } = &mut self.state {
            *remaining = remaining.saturating_sub(elapsed);
            if !remaining.is_zero() {
                return Poll::Pending;
            }
        }

        match self.state {
            LoadState::Ready(_) => Poll::Ready(Ok(())),
            LoadState::Failed(ref error) => Poll::Ready(Err(error.clone().into())),
            LoadState::Idle | LoadState::Backoff { .. } => self.attempt(),
        }
    }

    fn predict(&self, features: &NormalizedFeatures) -> Result<ClassProbabilities, ClassifierError> {
        let LoadState::Ready(network) = &self.state else {
            return Err(ClassifierError::NotReady);
        };

        let probabilities = ClassProbabilities::from_array(network.probabilities(features.as_array()));
        if !probabilities.is_finite() {
            return Err(ClassifierError::InvalidOutput);
        }

        Ok(match self.output {
            OutputMode::Probabilities => probabilities,
            OutputMode::ArgMax => ClassProbabilities::one_hot(probabilities.dominant()),
        })
    }
}

