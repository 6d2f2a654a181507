//! Offline training that writes a network artifact for the pretrained classifier.

use std::{fs, path::Path, task::Poll};

use anyhow::{anyhow, Context, Result};
use cpu_defender_core::FRAME_DURATION;
use cpu_defender_system_classifier::{
    DifficultyClassifier, Normalization, TrainedClassifier, TrainingTuning,
};

/// Trains a classifier to completion and stores it as JSON at `output`.
///
/// Returns the number of epochs performed.
pub(crate) fn export(
    training: &TrainingTuning,
    normalization: Normalization,
    output: &Path,
) -> Result<u32> {
    let mut classifier = TrainedClassifier::new(training.clone(), normalization);
    loop {
        match classifier.poll_prepare(FRAME_DURATION) {
            Poll::Pending => continue,
            Poll::Ready(result) => {
                result.context("classifier training failed")?;
                break;
            }
        }
    }

    let artifact = classifier
        .export_artifact()
        .ok_or_else(|| anyhow!("trained classifier produced no artifact"))?;
    let json = serde_json::to_string_pretty(&artifact).context("failed to encode the network")?;
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    fs::write(output, json).with_context(|| format!("failed to write `{}`", output.display()))?;

    tracing::info!(
        epochs = classifier.epochs_completed(),
        path = %output.display(),
        "network artifact written"
    );
    Ok(classifier.epochs_completed())
}
