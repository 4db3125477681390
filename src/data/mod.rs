//! Data sources feeding the training controller.
pub mod matrix;

pub use matrix::{DatasetMetadata, MatrixDataset};

use candle_core::{Device, Tensor};

use crate::batch::BatchRange;
use crate::Result;

/// One mini-batch of inputs and ground truth on the target device.
pub struct BatchData {
    /// Inputs: `[n, input_dim]` F32
    pub x: Tensor,
    /// Ground truth: `[n]` U32 labels for classification,
    /// `[n, dim]` F32 values for regression
    pub y: Tensor,
}

/// Index-by-range access to a fixed dataset.
pub trait DataSource {
    /// Number of samples
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize the samples in `range` as device tensors
    fn batch(&self, range: BatchRange, device: &Device) -> Result<BatchData>;
}
