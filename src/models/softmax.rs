//! Softmax regression: the simplest concrete [`Model`].
use candle_core::{DType, Device, Tensor, D};
use candle_nn::ops::softmax;
use std::collections::HashMap;

use crate::models::Model;
use crate::{Result, TrainError};

/// Train accuracy thresholds at which the learning rate halves, once each.
const DECAY_LADDER: [f64; 4] = [0.60, 0.75, 0.85, 0.925];

/// Configuration for [`SoftmaxRegression`]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SoftmaxConfig {
    /// Number of input features
    pub input_dim: usize,

    /// Number of output classes
    pub num_classes: usize,

    /// Standard deviation of the normal distribution initializing the weights
    pub init_std: f64,

    /// Initial learning rate
    pub learning_rate: f64,
}

impl Default for SoftmaxConfig {
    fn default() -> Self {
        Self {
            input_dim: 2,
            num_classes: 2,
            init_std: 0.1,
            learning_rate: 0.1,
        }
    }
}

impl SoftmaxConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(TrainError::Config("input_dim must be > 0".to_string()));
        }

        if self.num_classes < 2 {
            return Err(TrainError::Config(
                "num_classes must be at least 2".to_string(),
            ));
        }

        if !self.init_std.is_finite() || self.init_std < 0.0 {
            return Err(TrainError::Config(format!(
                "init_std must be finite and non-negative, got {}",
                self.init_std
            )));
        }

        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TrainError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }

        Ok(())
    }
}

/// Single linear layer with a softmax output.
///
/// Updates apply the plain gradient of the softmax/cross-entropy
/// output delta handed in by the controller: `W -= lr * x^T @ delta`,
/// `b -= lr * sum(delta)`.
pub struct SoftmaxRegression {
    weight: Tensor,
    bias: Tensor,
    learning_rate: f64,
    decay_phase: usize,
}

impl SoftmaxRegression {
    /// Create a new model with normal-initialized weights.
    pub fn new(config: &SoftmaxConfig, device: &Device) -> Result<Self> {
        config.validate()?;

        let weight = Tensor::randn(
            0f32,
            config.init_std as f32,
            (config.input_dim, config.num_classes),
            device,
        )?;
        let bias = Tensor::zeros(config.num_classes, DType::F32, device)?;

        Ok(Self {
            weight,
            bias,
            learning_rate: config.learning_rate,
            decay_phase: 0,
        })
    }

    /// Export parameters for checkpointing
    pub fn to_tensors(&self) -> HashMap<String, Tensor> {
        let mut tensors = HashMap::new();
        tensors.insert("weight".to_string(), self.weight.clone());
        tensors.insert("bias".to_string(), self.bias.clone());
        tensors
    }

    /// Rebuild a model from checkpointed parameters.
    pub fn from_tensors(
        tensors: &HashMap<String, Tensor>,
        learning_rate: f64,
    ) -> Result<Self> {
        let weight = tensors
            .get("weight")
            .ok_or_else(|| TrainError::Data("checkpoint missing 'weight'".to_string()))?
            .clone();
        let bias = tensors
            .get("bias")
            .ok_or_else(|| TrainError::Data("checkpoint missing 'bias'".to_string()))?
            .clone();

        Ok(Self {
            weight,
            bias,
            learning_rate,
            decay_phase: 0,
        })
    }
}

impl Model for SoftmaxRegression {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let logits = x.matmul(&self.weight)?.broadcast_add(&self.bias)?;
        Ok(softmax(&logits, D::Minus1)?)
    }

    fn update(
        &mut self,
        error_signal: &Tensor,
        x: &Tensor,
        _predictions: &Tensor,
        learning_rate: f64,
    ) -> Result<()> {
        let grad_weight = x.t()?.matmul(error_signal)?;
        self.weight = self.weight.sub(&(grad_weight * learning_rate)?)?;

        let grad_bias = error_signal.sum(0)?;
        self.bias = self.bias.sub(&(grad_bias * learning_rate)?)?;

        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn adjust_learning_rate(&mut self, train_accuracy: f64) {
        while self.decay_phase < DECAY_LADDER.len() && train_accuracy > DECAY_LADDER[self.decay_phase]
        {
            self.learning_rate *= 0.5;
            self.decay_phase += 1;
        }
    }
}
