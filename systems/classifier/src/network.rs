use ndarray::{Array1, Array2, ArrayBase, ArrayView1, DataMut, Ix1};
use serde::{Deserialize, Serialize};

use crate::LoadError;

/// Number of raw features consumed by every classifier network.
pub(crate) const INPUT_WIDTH: usize = 4;
/// Number of difficulty classes produced by every classifier network.
pub(crate) const OUTPUT_WIDTH: usize = 3;

/// Nonlinearity applied to the output of a dense layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Rectified linear unit.
    Relu,
    /// Hyperbolic tangent.
    Tanh,
    /// Logistic sigmoid.
    Sigmoid,
    /// Identity.
    Linear,
    /// Normalised exponential across the layer.
    Softmax,
}

impl Activation {
    fn apply(self, values: &mut Array1<f32>) {
        match self {
            Self::Relu => values.mapv_inplace(|value| value.max(0.0)),
            Self::Tanh => values.mapv_inplace(f32::tanh),
            Self::Sigmoid => values.mapv_inplace(|value| 1.0 / (1.0 + (-value).exp())),
            Self::Linear => {}
            Self::Softmax => softmax_inplace(values),
        }
    }
}

/// Serialized dense layer; weights are stored output-major (`weights[out][in]`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerArtifact {
    /// Weight rows, one per output unit.
    pub weights: Vec<Vec<f32>>,
    /// Bias per output unit.
    pub bias: Vec<f32>,
    /// Activation applied after the affine transform.
    pub activation: Activation,
}

/// Serialized feed-forward classifier network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Layers in evaluation order.
    pub layers: Vec<LayerArtifact>,
}

#[derive(Clone, Debug)]
pub(crate) struct DenseLayer {
    weights: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

impl DenseLayer {
    pub(crate) fn new(weights: Array2<f32>, bias: Array1<f32>, activation: Activation) -> Self {
        Self {
            weights,
            bias,
            activation,
        }
    }

    fn forward(&self, input: ArrayView1<'_, f32>) -> Array1<f32> {
        let mut output = self.weights.dot(&input) + &self.bias;
        self.activation.apply(&mut output);
        output
    }

    fn to_artifact(&self) -> LayerArtifact {
        LayerArtifact {
            weights: self.weights.rows().into_iter().map(|row| row.to_vec()).collect(),
            bias: self.bias.to_vec(),
            activation: self.activation,
        }
    }
}

/// Dense feed-forward network mapping four features to three class scores.
#[derive(Clone, Debug)]
pub(crate) struct Network {
    layers: Vec<DenseLayer>,
}

impl Network {
    pub(crate) fn new(layers: Vec<DenseLayer>) -> Self {
        Self { layers }
    }

    /// Builds a network from its serialized form, rejecting artifacts whose
    /// shapes do not chain from four inputs to three outputs.
    pub(crate) fn from_artifact(artifact: &ModelArtifact) -> Result<Self, LoadError> {
        if artifact.layers.is_empty() {
            return Err(LoadError::ShapeMismatch(
                "artifact declares no layers".to_owned(),
            ));
        }

        let mut inputs = INPUT_WIDTH;
        let mut layers = Vec::with_capacity(artifact.layers.len());
        for (index, layer) in artifact.layers.iter().enumerate() {
            let outputs = layer.weights.len();
            if outputs == 0 {
                return Err(LoadError::ShapeMismatch(format!(
                    "layer {index} has no output units"
                )));
            }
            if let Some(row) = layer.weights.iter().find(|row| row.len() != inputs) {
                return Err(LoadError::ShapeMismatch(format!(
                    "layer {index} expects {inputs} inputs but a weight row has {}",
                    row.len()
                )));
            }
            if layer.bias.len() != outputs {
                return Err(LoadError::ShapeMismatch(format!(
                    "layer {index} has {outputs} outputs but {} biases",
                    layer.bias.len()
                )));
            }

            let flat: Vec<f32> = layer.weights.iter().flatten().copied().collect();
            let weights = Array2::from_shape_vec((outputs, inputs), flat)
                .map_err(|error| LoadError::ShapeMismatch(error.to_string()))?;
            layers.push(DenseLayer::new(
                weights,
                Array1::from(layer.bias.clone()),
                layer.activation,
            ));
            inputs = outputs;
        }

        if inputs != OUTPUT_WIDTH {
            return Err(LoadError::ShapeMismatch(format!(
                "final layer produces {inputs} outputs, expected {OUTPUT_WIDTH}"
            )));
        }

        let network = Self { layers };
        let probe = network.forward(&[0.5; INPUT_WIDTH]);
        if !probe.iter().all(|value| value.is_finite()) {
            return Err(LoadError::Malformed(
                "probe prediction produced non-finite output".to_owned(),
            ));
        }

        Ok(network)
    }

    pub(crate) fn to_artifact(&self) -> ModelArtifact {
        ModelArtifact {
            layers: self.layers.iter().map(DenseLayer::to_artifact).collect(),
        }
    }

    pub(crate) fn forward(&self, input: &[f32; INPUT_WIDTH]) -> Array1<f32> {
        let mut activations = Array1::from(input.to_vec());
        for layer in &self.layers {
            activations = layer.forward(activations.view());
        }
        activations
    }

    /// Evaluates the network and returns a probability triple, applying a
    /// softmax when the final layer does not already produce one.
    pub(crate) fn probabilities(&self, input: &[f32; INPUT_WIDTH]) -> [f32; OUTPUT_WIDTH] {
        let mut output = self.forward(input);
        let normalised = matches!(
            self.layers.last().map(|layer| layer.activation),
            Some(Activation::Softmax)
        );
        if !normalised {
            softmax_inplace(&mut output);
        }

        let mut probabilities = [0.0; OUTPUT_WIDTH];
        for (slot, value) in probabilities.iter_mut().zip(output.iter()) {
            *slot = *value;
        }
        probabilities
    }
}

/// Numerically stable softmax; degenerate inputs collapse to a uniform distribution.
pub(crate) fn softmax_inplace<S>(values: &mut ArrayBase<S, Ix1>)
where
    S: DataMut<Elem = f32>,
{
    if values.is_empty() {
        return;
    }

    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    values.mapv_inplace(|value| (value - max).exp());
    let sum = values.sum();
    if sum > 0.0 && sum.is_finite() {
        *values /= sum;
    } else {
        let uniform = 1.0 / values.len() as f32;
        values.fill(uniform);
    }
}
