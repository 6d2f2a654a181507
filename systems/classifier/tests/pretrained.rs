use std::{
    cell::Cell,
    fs,
    path::PathBuf,
    task::Poll,
    time::Duration,
};

use cpu_defender_core::{DifficultyClass, FeatureVector};
use cpu_defender_system_classifier::{
    Activation, ArtifactSource, ClassifierError, DifficultyClassifier, FileArtifact, LayerArtifact,
    LoadError, LoadPolicy, ModelArtifact, Normalization, NormalizedFeatures, OutputMode,
    PretrainedClassifier,
};

fn artifact_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "cpu-defender-classifier-{}-{name}.json",
        std::process::id()
    ))
}

fn write_artifact(name: &str, contents: &str) -> PathBuf {
    let path = artifact_path(name);
    fs::write(&path, contents).expect("temporary artifact is writable");
    path
}

fn passthrough_artifact() -> ModelArtifact {
    ModelArtifact {
        layers: vec![
            LayerArtifact {
                weights: vec![
                    vec![0.0, -4.0, 0.0, 0.0],
                    vec![0.0, 2.0, 0.0, 0.0],
                    vec![4.0, 0.0, 0.0, 0.0],
                ],
                bias: vec![2.0, 0.0, 0.0],
                activation: Activation::Linear,
            },
            LayerArtifact {
                weights: vec![
                    vec![1.0, 0.0, 0.0],
                    vec![0.0, 1.0, 0.0],
                    vec![0.0, 0.0, 1.0],
                ],
                bias: vec![0.0; 3],
                activation: Activation::Softmax,
            },
        ],
    }
}

fn policy() -> LoadPolicy {
    LoadPolicy::new(3, Duration::from_millis(1_000))
}

fn features(score: f32, health: f32) -> NormalizedFeatures {
    Normalization::default().normalize(&FeatureVector::new(score, health, 0.0, 0.0))
}

#[test]
fn valid_artifact_loads_on_first_poll() {
    let json = serde_json::to_string(&passthrough_artifact()).expect("artifact serializes");
    let path = write_artifact("valid", &json);
    let mut classifier = PretrainedClassifier::new(
        FileArtifact::new(&path),
        policy(),
        OutputMode::Probabilities,
    );

    assert!(!classifier.is_ready());
    assert_eq!(classifier.poll_prepare(Duration::ZERO), Poll::Ready(Ok(())));
    assert!(classifier.is_ready());
    assert_eq!(classifier.attempts(), 1);

    let struggling = classifier.predict(&features(0.0, 0.0)).expect("prediction");
    assert_eq!(struggling.dominant(), DifficultyClass::Easy);
    let dominating = classifier.predict(&features(5_000.0, 100.0)).expect("prediction");
    assert_eq!(dominating.dominant(), DifficultyClass::Hard);
    assert!((dominating.easy + dominating.normal + dominating.hard - 1.0).abs() < 1e-5);

    assert_eq!(classifier.artifact(), Some(passthrough_artifact()));
    let _ = fs::remove_file(path);
}

#[test]
fn argmax_output_is_one_hot() {
    let json = serde_json::to_string(&passthrough_artifact()).expect("artifact serializes");
    let path = write_artifact("argmax", &json);
    let mut classifier =
        PretrainedClassifier::new(FileArtifact::new(&path), policy(), OutputMode::ArgMax);
    assert!(classifier.poll_prepare(Duration::ZERO).is_ready());

    let probabilities = classifier.predict(&features(0.0, 60.0)).expect("prediction");
    let channels = probabilities.to_array();
    assert_eq!(channels.iter().filter(|value| **value == 1.0).count(), 1);
    assert_eq!(channels.iter().filter(|value| **value == 0.0).count(), 2);
    let _ = fs::remove_file(path);
}

#[test]
fn missing_artifact_exhausts_retries_with_backoff() {
    let path = artifact_path("missing");
    let _ = fs::remove_file(&path);
    let mut classifier =
        PretrainedClassifier::new(FileArtifact::new(&path), policy(), OutputMode::Probabilities);

    assert_eq!(classifier.poll_prepare(Duration::ZERO), Poll::Pending);
    assert_eq!(classifier.attempts(), 1);

    assert_eq!(classifier.poll_prepare(Duration::from_millis(600)), Poll::Pending);
    assert_eq!(classifier.attempts(), 1, "backoff must elapse before retrying");

    assert_eq!(classifier.poll_prepare(Duration::from_millis(400)), Poll::Pending);
    assert_eq!(classifier.attempts(), 2);

    let outcome = classifier.poll_prepare(Duration::from_secs(1));
    assert!(matches!(
        outcome,
        Poll::Ready(Err(ClassifierError::Load(LoadError::Missing { .. })))
    ));
    assert_eq!(classifier.attempts(), 3);
    assert!(!classifier.is_ready());

    let repeated = classifier.poll_prepare(Duration::from_secs(10));
    assert!(matches!(repeated, Poll::Ready(Err(_))));
    assert_eq!(classifier.attempts(), 3, "failure is terminal");
    assert_eq!(
        classifier.predict(&features(0.0, 100.0)),
        Err(ClassifierError::NotReady)
    );
}

#[test]
fn malformed_json_is_reported() {
    let path = write_artifact("malformed", "{ \"layers\": [ oops");
    let mut classifier = PretrainedClassifier::new(
        FileArtifact::new(&path),
        LoadPolicy::new(1, Duration::ZERO),
        OutputMode::Probabilities,
    );

    assert!(matches!(
        classifier.poll_prepare(Duration::ZERO),
        Poll::Ready(Err(ClassifierError::Load(LoadError::Malformed(_))))
    ));
    let _ = fs::remove_file(path);
}

#[test]
fn wrong_input_width_is_a_shape_mismatch() {
    let mut artifact = passthrough_artifact();
    for row in &mut artifact.layers[0].weights {
        let _ = row.pop();
    }
    let json = serde_json::to_string(&artifact).expect("artifact serializes");
    let path = write_artifact("shape", &json);
    let mut classifier = PretrainedClassifier::new(
        FileArtifact::new(&path),
        LoadPolicy::new(1, Duration::ZERO),
        OutputMode::Probabilities,
    );

    assert!(matches!(
        classifier.poll_prepare(Duration::ZERO),
        Poll::Ready(Err(ClassifierError::Load(LoadError::ShapeMismatch(_))))
    ));
    let _ = fs::remove_file(path);
}

#[derive(Debug)]
struct FlakySource {
    failures_remaining: Cell<u32>,
    contents: String,
}

impl ArtifactSource for FlakySource {
    fn read(&self) -> Result<String, LoadError> {
        let remaining = self.failures_remaining.get();
        if remaining > 0 {
            self.failures_remaining.set(remaining - 1);
            return Err(LoadError::Missing {
                path: "flaky".to_owned(),
                reason: "not yet published".to_owned(),
            });
        }
        Ok(self.contents.clone())
    }
}

#[test]
fn transient_failure_recovers_on_retry() {
    let source = FlakySource {
        failures_remaining: Cell::new(2),
        contents: serde_json::to_string(&passthrough_artifact()).expect("artifact serializes"),
    };
    let mut classifier = PretrainedClassifier::new(source, policy(), OutputMode::Probabilities);

    let mut polls = 0;
    let outcome = loop {
        polls += 1;
        match classifier.poll_prepare(Duration::from_millis(250)) {
            Poll::Ready(result) => break result,
            Poll::Pending => assert!(polls < 100, "preparation never completed"),
        }
    };

    assert_eq!(outcome, Ok(()));
    assert_eq!(classifier.attempts(), 3);
    assert!(classifier.is_ready());
}
