//! minitrain - mini-batch training controller
//!
//! Drives iterative optimization of a parametric model over a fixed
//! dataset: partitions data into mini-batches, applies one update per
//! batch through the [`models::Model`] capability interface, measures
//! in-sample and out-of-sample error every epoch, and stops either on
//! a validation-error plateau or at the epoch limit.
//!
//! # Example
//!
//! ```ignore
//! use minitrain::{Trainer, TrainConfig};
//! use minitrain::models::SoftmaxRegression;
//!
//! let mut trainer = Trainer::new(TrainConfig::default(), device)?;
//! let report = trainer.train(&mut model, &train_set, &valid_set)?;
//! println!("stopped after {} epochs: {:?}", report.epochs_run, report.stop);
//! ```

pub mod batch;
pub mod data;
pub mod eval;
pub mod models;
pub mod training;

// Re-export commonly used items
pub use batch::{BatchRange, Batches};
pub use eval::ErrorMeasure;
pub use training::{StopReason, TrainConfig, Trainer, TrainingReport};

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrainError>;
