//! Training infrastructure: epoch controller, early stopping, checkpoints.
pub mod checkpoint;
pub mod early_stop;
pub mod trainer;

pub use checkpoint::{load_checkpoint, save_checkpoint, CheckpointMetadata};
pub use early_stop::has_plateaued;
pub use trainer::{EpochRecord, StopReason, TrainConfig, Trainer, TrainingReport};
