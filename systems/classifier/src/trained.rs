use std::{task::Poll, time::Duration};

use cpu_defender_core::{ClassProbabilities, DifficultyClass, FeatureVector};
use ndarray::{Array, Array1, Array2, Axis, Dimension, Ix1, Ix2, Zip};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::{
    network::{
        softmax_inplace, Activation, DenseLayer, ModelArtifact, Network, INPUT_WIDTH, OUTPUT_WIDTH,
    },
    ClassifierError, DifficultyClassifier, Normalization, NormalizedFeatures,
};

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-8;
const LOG_FLOOR: f32 = 1e-7;

/// Hyper-parameters of the on-the-fly training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingTuning {
    /// Units in the single hidden layer.
    pub hidden_units: usize,
    /// Full-batch epochs performed in total.
    pub epochs: u32,
    /// Epochs performed per preparation poll.
    pub epochs_per_poll: u32,
    /// Adam step size.
    pub learning_rate: f32,
    /// Seed for weight initialisation.
    pub seed: u64,
}

impl Default for TrainingTuning {
    fn default() -> Self {
        Self {
            hidden_units: 12,
            epochs: 300,
            epochs_per_poll: 20,
            learning_rate: 0.05,
            seed: 0x00c0_ffee,
        }
    }
}

/// Labelling rule used to synthesize the training set from raw features.
#[must_use]
pub fn rule_label(features: &FeatureVector) -> DifficultyClass {
    let FeatureVector {
        score,
        base_health,
        enemy_count,
        ..
    } = *features;

    if base_health < 40.0 || (base_health < 60.0 && enemy_count > 8.0) {
        DifficultyClass::Easy
    } else if base_health > 80.0 && score > 1_000.0 && enemy_count < 4.0 {
        DifficultyClass::Hard
    } else {
        DifficultyClass::Normal
    }
}

#[derive(Debug)]
struct Dataset {
    inputs: Array2<f32>,
    targets: Array2<f32>,
    weights: Array1<f32>,
}

impl Dataset {
    /// Grid over the nominal feature ranges with class-balanced row weights
    /// that sum to one.
    fn synthesize(normalization: &Normalization) -> Self {
        let mut rows = Vec::new();
        for score in (0..=10).map(|step| step as f32 * 500.0) {
            for health in (0..=10).map(|step| step as f32 * 10.0) {
                for enemies in (0..=10).map(|step| step as f32 * 2.0) {
                    for time in (0..=5).map(|step| step as f32 * 1_000.0) {
                        rows.push(FeatureVector::new(score, health, enemies, time));
                    }
                }
            }
        }

        let mut inputs = Array2::zeros((rows.len(), INPUT_WIDTH));
        let mut targets = Array2::zeros((rows.len(), OUTPUT_WIDTH));
        let mut labels = Vec::with_capacity(rows.len());
        let mut counts = [0usize; OUTPUT_WIDTH];
        for (index, features) in rows.iter().enumerate() {
            let normalized = normalization.normalize(features);
            for (column, value) in normalized.as_array().iter().enumerate() {
                inputs[[index, column]] = *value;
            }
            let label = rule_label(features).index();
            targets[[index, label]] = 1.0;
            counts[label] += 1;
            labels.push(label);
        }

        let total = rows.len() as f32;
        let class_weight = counts.map(|count| {
            if count == 0 {
                0.0
            } else {
                total / (OUTPUT_WIDTH as f32 * count as f32)
            }
        });
        let mut weights = Array1::from_iter(labels.iter().map(|label| class_weight[*label]));
        let sum = weights.sum();
        if sum > 0.0 {
            weights /= sum;
        }

        Self {
            inputs,
            targets,
            weights,
        }
    }
}

#[derive(Debug)]
struct Moments<D: Dimension> {
    first: Array<f32, D>,
    second: Array<f32, D>,
}

impl<D: Dimension> Moments<D> {
    fn like(param: &Array<f32, D>) -> Self {
        Self {
            first: Array::zeros(param.raw_dim()),
            second: Array::zeros(param.raw_dim()),
        }
    }

    fn step(&mut self, param: &mut Array<f32, D>, grad: &Array<f32, D>, learning_rate: f32, t: i32) {
        self.first
            .zip_mut_with(grad, |m, &g| *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g);
        self.second
            .zip_mut_with(grad, |v, &g| *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g);
        let first_correction = 1.0 - ADAM_BETA1.powi(t);
        let second_correction = 1.0 - ADAM_BETA2.powi(t);
        Zip::from(param)
            .and(&self.first)
            .and(&self.second)
            .for_each(|p, &m, &v| {
                let m_hat = m / first_correction;
                let v_hat = v / second_correction;
                *p -= learning_rate * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
            });
    }
}

/// Full-batch training run for a 4-H-3 tanh/softmax network.
#[derive(Debug)]
struct Session {
    dataset: Dataset,
    hidden_weights: Array2<f32>,
    hidden_bias: Array1<f32>,
    output_weights: Array2<f32>,
    output_bias: Array1<f32>,
    moments: (Moments<Ix2>, Moments<Ix1>, Moments<Ix2>, Moments<Ix1>),
    learning_rate: f32,
    epochs: u32,
    completed: u32,
}

impl Session {
    fn start(tuning: &TrainingTuning, normalization: &Normalization) -> Result<Self, ClassifierError> {
        if tuning.hidden_units == 0 {
            return Err(ClassifierError::Training(
                "hidden layer requires at least one unit".to_owned(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(tuning.seed);
        let hidden_weights = xavier(&mut rng, tuning.hidden_units, INPUT_WIDTH)?;
        let output_weights = xavier(&mut rng, OUTPUT_WIDTH, tuning.hidden_units)?;
        let hidden_bias = Array1::zeros(tuning.hidden_units);
        let output_bias = Array1::zeros(OUTPUT_WIDTH);
        let moments = (
            Moments::like(&hidden_weights),
            Moments::like(&hidden_bias),
            Moments::like(&output_weights),
            Moments::like(&output_bias),
        );

        Ok(Self {
            dataset: Dataset::synthesize(normalization),
            hidden_weights,
            hidden_bias,
            output_weights,
            output_bias,
            moments,
            learning_rate: tuning.learning_rate,
            epochs: tuning.epochs,
            completed: 0,
        })
    }

    fn is_complete(&self) -> bool {
        self.completed >= self.epochs
    }

    /// Runs one epoch of gradient descent and returns the weighted
    /// cross-entropy measured before the update.
    fn epoch(&mut self) -> f32 {
        let inputs = &self.dataset.inputs;
        let targets = &self.dataset.targets;
        let weights = &self.dataset.weights;

        let hidden = (inputs.dot(&self.hidden_weights.t()) + &self.hidden_bias).mapv(f32::tanh);
        let mut probabilities = hidden.dot(&self.output_weights.t()) + &self.output_bias;
        for mut row in probabilities.rows_mut() {
            softmax_inplace(&mut row);
        }

        let picked = (&probabilities * targets).sum_axis(Axis(1));
        let loss: f32 = picked
            .iter()
            .zip(weights.iter())
            .map(|(probability, weight)| -weight * probability.max(LOG_FLOOR).ln())
            .sum();

        let mut output_delta = &probabilities - targets;
        output_delta *= &weights.view().insert_axis(Axis(1));
        let output_weight_grad = output_delta.t().dot(&hidden);
        let output_bias_grad = output_delta.sum_axis(Axis(0));
        let hidden_delta =
            output_delta.dot(&self.output_weights) * &hidden.mapv(|value| 1.0 - value * value);
        let hidden_weight_grad = hidden_delta.t().dot(inputs);
        let hidden_bias_grad = hidden_delta.sum_axis(Axis(0));

        self.completed += 1;
        let t = i32::try_from(self.completed).unwrap_or(i32::MAX);
        let rate = self.learning_rate;
        self.moments
            .0
            .step(&mut self.hidden_weights, &hidden_weight_grad, rate, t);
        self.moments.1.step(&mut self.hidden_bias, &hidden_bias_grad, rate, t);
        self.moments
            .2
            .step(&mut self.output_weights, &output_weight_grad, rate, t);
        self.moments.3.step(&mut self.output_bias, &output_bias_grad, rate, t);

        loss
    }

    fn network(&self) -> Network {
        Network::new(vec![
            DenseLayer::new(
                self.hidden_weights.clone(),
                self.hidden_bias.clone(),
                Activation::Tanh,
            ),
            DenseLayer::new(
                self.output_weights.clone(),
                self.output_bias.clone(),
                Activation::Softmax,
            ),
        ])
    }
}

fn xavier<R: Rng + ?Sized>(
    rng: &mut R,
    outputs: usize,
    inputs: usize,
) -> Result<Array2<f32>, ClassifierError> {
    let scale = (2.0 / (inputs + outputs) as f32).sqrt();
    let normal =
        Normal::new(0.0, scale).map_err(|error| ClassifierError::Training(error.to_string()))?;
    Ok(Array2::from_shape_fn((outputs, inputs), |_| normal.sample(rng)))
}

#[derive(Debug)]
enum TrainingState {
    Untrained,
    Training(Box<Session>),
    Trained(Network),
    Failed(ClassifierError),
}

/// Classifier that synthesizes a labelled dataset and trains itself across
/// preparation polls.
#[derive(Debug)]
pub struct TrainedClassifier {
    tuning: TrainingTuning,
    normalization: Normalization,
    state: TrainingState,
    epochs_completed: u32,
}

impl TrainedClassifier {
    /// Creates an untrained classifier. Training starts on the first poll.
    #[must_use]
    pub fn new(tuning: TrainingTuning, normalization: Normalization) -> Self {
        Self {
            tuning,
            normalization,
            state: TrainingState::Untrained,
            epochs_completed: 0,
        }
    }

    /// Epochs performed so far.
    #[must_use]
    pub fn epochs_completed(&self) -> u32 {
        self.epochs_completed
    }

    /// Serialized form of the trained network, loadable by the pretrained classifier.
    #[must_use]
    pub fn export_artifact(&self) -> Option<ModelArtifact> {
        match &self.state {
            TrainingState::Trained(network) => Some(network.to_artifact()),
            _ => None,
        }
    }
}

impl DifficultyClassifier for TrainedClassifier {
    fn is_ready(&self) -> bool {
        matches!(self.state, TrainingState::Trained(_))
    }

    fn poll_prepare(&mut self, _elapsed: Duration) -> Poll<Result<(), ClassifierError>> {
        if matches!(self.state, TrainingState::Untrained) {
            self.state = match Session::start(&self.tuning, &self.normalization) {
                Ok(session) => {
                    tracing::info!(
                        hidden_units = self.tuning.hidden_units,
                        epochs = self.tuning.epochs,
                        "classifier training started"
                    );
                    TrainingState::Training(Box::new(session))
                }
                Err(error) => TrainingState::Failed(error),
            };
        }

        let session = match &mut self.state {
            TrainingState::Trained(_) => return Poll::Ready(Ok(())),
            TrainingState::Failed(error) => return Poll::Ready(Err(error.clone())),
            TrainingState::Untrained => return Poll::Pending,
            TrainingState::Training(session) => session,
        };

        let mut loss = 0.0;
        for _ in 0..self.tuning.epochs_per_poll.max(1) {
            if session.is_complete() {
                break;
            }
            loss = session.epoch();
            if !loss.is_finite() {
                break;
            }
        }
        self.epochs_completed = session.completed;

        if !loss.is_finite() {
            let error = ClassifierError::Training(format!(
                "loss diverged after {} epochs",
                self.epochs_completed
            ));
            tracing::warn!(%error, "classifier training failed");
            self.state = TrainingState::Failed(error.clone());
            return Poll::Ready(Err(error));
        }

        if !session.is_complete() {
            tracing::debug!(epoch = self.epochs_completed, loss, "classifier training progress");
            return Poll::Pending;
        }

        let network = session.network();
        tracing::info!(epochs = self.epochs_completed, loss, "classifier training complete");
        self.state = TrainingState::Trained(network);
        Poll::Ready(Ok(()))
    }

    fn predict(&self, features: &NormalizedFeatures) -> Result<ClassProbabilities, ClassifierError> {
        let TrainingState::Trained(network) = &self.state else {
            return Err(ClassifierError::NotReady);
        };

        let probabilities = ClassProbabilities::from_array(network.probabilities(features.as_array()));
        if probabilities.is_finite() {
            Ok(probabilities)
        } else {
            Err(ClassifierError::InvalidOutput)
        }
    }
}
