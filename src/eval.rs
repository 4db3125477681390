//! Error evaluation over model predictions.
//!
//! The same error measure drives parameter updates (through the
//! output-layer error signal) and scores epochs (through the error
//! totals), so the training loss and the reported metric are one
//! function.
use candle_core::{DType, Device, Tensor, D};
use candle_nn::encoding::one_hot;
use serde::{Deserialize, Serialize};

use crate::data::DataSource;
use crate::models::Model;
use crate::Result;

/// Error measure used for both updates and epoch scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorMeasure {
    /// Zero-one loss: count of arg-max mispredictions
    Classification,
    /// Summed squared error
    Regression,
}

/// Error total for one batch of predictions.
///
/// Classification counts the predictions whose arg-max class disagrees
/// with the ground-truth label (an integral value); regression sums
/// the squared residuals. Pure function over its inputs.
pub fn batch_errors(predictions: &Tensor, targets: &Tensor, measure: ErrorMeasure) -> Result<f64> {
    match measure {
        ErrorMeasure::Classification => {
            let predicted = predictions.argmax(D::Minus1)?;
            let truth = targets.to_dtype(DType::U32)?;
            let mispredicted = predicted
                .ne(&truth)?
                .to_dtype(DType::F32)?
                .sum_all()?
                .to_scalar::<f32>()?;
            Ok(mispredicted as f64)
        }
        ErrorMeasure::Regression => {
            let residual = predictions.sub(targets)?;
            Ok(residual.sqr()?.sum_all()?.to_scalar::<f32>()? as f64)
        }
    }
}

/// Output-layer error signal driving the model's parameter update.
///
/// Classification: `predictions - one_hot(labels)`, the softmax
/// cross-entropy delta. Regression: `predictions - targets`.
pub fn error_signal(predictions: &Tensor, targets: &Tensor, measure: ErrorMeasure) -> Result<Tensor> {
    match measure {
        ErrorMeasure::Classification => {
            let classes = predictions.dim(D::Minus1)?;
            let truth = one_hot(targets.clone(), classes, 1f32, 0f32)?;
            Ok(predictions.sub(&truth)?)
        }
        ErrorMeasure::Regression => Ok(predictions.sub(targets)?),
    }
}

/// Error total over a whole dataset.
///
/// Prediction passes are chunked by `eval_batch_size` purely to bound
/// device memory; the chunk size must not change the returned total.
pub fn dataset_errors<M, S>(
    model: &M,
    data: &S,
    measure: ErrorMeasure,
    eval_batch_size: usize,
    device: &Device,
) -> Result<f64>
where
    M: Model,
    S: DataSource + ?Sized,
{
    let mut total = 0.0;

    for range in crate::batch::Batches::new(data.len(), eval_batch_size).iter() {
        let batch = data.batch(range, device)?;
        let predictions = model.forward(&batch.x)?;
        total += batch_errors(&predictions, &batch.y, measure)?;
    }

    Ok(total)
}
