use std::{fs, task::Poll, time::Duration};

use cpu_defender_core::{FeatureVector, FRAME_DURATION};
use cpu_defender_system_classifier::{
    ClassifierError, ClassifierKind, ClassifierTuning, DifficultyClassifier, FileArtifact,
    LoadPolicy, Normalization, OutputMode, PretrainedClassifier, TrainedClassifier,
    TrainingTuning,
};

fn train(classifier: &mut TrainedClassifier) -> usize {
    let mut polls = 0;
    loop {
        polls += 1;
        match classifier.poll_prepare(FRAME_DURATION) {
            Poll::Ready(result) => {
                result.expect("training succeeds");
                return polls;
            }
            Poll::Pending => assert!(polls < 10_000, "training never completed"),
        }
    }
}

fn predict(classifier: &dyn DifficultyClassifier, raw: FeatureVector) -> [f32; 3] {
    let normalized = Normalization::default().normalize(&raw);
    classifier
        .predict(&normalized)
        .expect("trained classifier predicts")
        .to_array()
}

#[test]
fn training_yields_between_polls() {
    let tuning = TrainingTuning {
        epochs: 60,
        epochs_per_poll: 20,
        ..TrainingTuning::default()
    };
    let mut classifier = TrainedClassifier::new(tuning, Normalization::default());

    assert_eq!(
        classifier.predict(&Normalization::default().normalize(&FeatureVector::new(
            0.0, 100.0, 0.0, 0.0
        ))),
        Err(ClassifierError::NotReady)
    );
    assert_eq!(classifier.poll_prepare(Duration::ZERO), Poll::Pending);
    assert_eq!(classifier.epochs_completed(), 20);
    assert!(!classifier.is_ready());

    assert_eq!(classifier.poll_prepare(Duration::ZERO), Poll::Pending);
    assert_eq!(classifier.poll_prepare(Duration::ZERO), Poll::Ready(Ok(())));
    assert_eq!(classifier.epochs_completed(), 60);
    assert!(classifier.is_ready());
}

#[test]
fn trained_network_separates_reference_regions() {
    let mut classifier = TrainedClassifier::new(TrainingTuning::default(), Normalization::default());
    let _ = train(&mut classifier);

    let collapsing = predict(&classifier, FeatureVector::new(500.0, 10.0, 16.0, 2_000.0));
    assert!(
        collapsing[0] > collapsing[2],
        "low health should favour EASY over HARD: {collapsing:?}"
    );

    let dominating = predict(&classifier, FeatureVector::new(4_500.0, 100.0, 0.0, 2_000.0));
    assert!(
        dominating[2] > dominating[0],
        "full health with high score should favour HARD over EASY: {dominating:?}"
    );

    assert!(collapsing[0] > dominating[0]);
    assert!(dominating[2] > collapsing[2]);
}

#[test]
fn training_is_deterministic_and_idempotent() {
    let mut first = TrainedClassifier::new(TrainingTuning::default(), Normalization::default());
    let mut second = TrainedClassifier::new(TrainingTuning::default(), Normalization::default());
    let _ = train(&mut first);
    let _ = train(&mut second);

    let probe = FeatureVector::new(2_500.0, 70.0, 6.0, 1_000.0);
    assert_eq!(predict(&first, probe), predict(&second, probe));

    let epochs = first.epochs_completed();
    assert_eq!(first.poll_prepare(Duration::ZERO), Poll::Ready(Ok(())));
    assert_eq!(first.epochs_completed(), epochs, "retraining must be a no-op");
    assert_eq!(predict(&first, probe), predict(&second, probe));
}

#[test]
fn exported_network_loads_as_pretrained_artifact() {
    let tuning = TrainingTuning {
        epochs: 40,
        ..TrainingTuning::default()
    };
    let mut trained = TrainedClassifier::new(tuning, Normalization::default());
    assert!(trained.export_artifact().is_none());
    let _ = train(&mut trained);

    let artifact = trained.export_artifact().expect("trained network exports");
    let path = std::env::temp_dir().join(format!(
        "cpu-defender-classifier-{}-exported.json",
        std::process::id()
    ));
    fs::write(&path, serde_json::to_string(&artifact).expect("artifact serializes"))
        .expect("temporary artifact is writable");

    let mut loaded = PretrainedClassifier::new(
        FileArtifact::new(&path),
        LoadPolicy::new(1, Duration::ZERO),
        OutputMode::Probabilities,
    );
    assert_eq!(loaded.poll_prepare(Duration::ZERO), Poll::Ready(Ok(())));

    for raw in [
        FeatureVector::new(0.0, 20.0, 12.0, 100.0),
        FeatureVector::new(3_000.0, 95.0, 1.0, 4_000.0),
    ] {
        let expected = predict(&trained, raw);
        let actual = predict(&loaded, raw);
        for (left, right) in expected.iter().zip(actual.iter()) {
            assert!((left - right).abs() < 1e-5, "{expected:?} vs {actual:?}");
        }
    }
    let _ = fs::remove_file(path);
}

#[test]
fn configured_variant_is_built() {
    let tuning = ClassifierTuning {
        kind: ClassifierKind::Fixed,
        ..ClassifierTuning::default()
    };
    let classifier = tuning.build(Normalization::default());
    assert!(classifier.is_ready());
    assert_eq!(
        predict(classifier.as_ref(), FeatureVector::new(0.0, 0.0, 20.0, 0.0)),
        [0.0, 1.0, 0.0]
    );

    let pretrained = ClassifierTuning::default().build(Normalization::default());
    assert!(!pretrained.is_ready());
    let origin = Normalization::default().normalize(&FeatureVector::new(0.0, 0.0, 0.0, 0.0));
    assert_eq!(pretrained.predict(&origin), Err(ClassifierError::NotReady));
}
