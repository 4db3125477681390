//! Model capability interface and concrete models.
pub mod softmax;

pub use softmax::{SoftmaxConfig, SoftmaxRegression};

use candle_core::Tensor;

use crate::Result;

/// Capability set the training controller drives.
///
/// The controller never sees a concrete model type: anything that can
/// run a forward pass, apply an update from an output-layer error
/// signal, and manage its own learning rate can be trained. Kernels
/// are free to parallelize internally; each call is synchronous from
/// the controller's point of view.
pub trait Model {
    /// Forward pass: inputs `[n, input_dim]` to predictions
    fn forward(&self, x: &Tensor) -> Result<Tensor>;

    /// Apply one parameter update from the output-layer error signal.
    ///
    /// `learning_rate` is the effective step size, already normalized
    /// by the training batch size.
    fn update(
        &mut self,
        error_signal: &Tensor,
        x: &Tensor,
        predictions: &Tensor,
        learning_rate: f64,
    ) -> Result<()>;

    /// Current base learning rate
    fn learning_rate(&self) -> f64;

    /// Adapt the learning rate given this epoch's training accuracy.
    /// Invoked by the controller once per non-diverged epoch.
    fn adjust_learning_rate(&mut self, train_accuracy: f64);
}
