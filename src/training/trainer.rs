//! Epoch/batch training controller.
use candle_core::Device;
use rand::seq::SliceRandom;
use std::time::{Duration, Instant};

use crate::batch::{BatchRange, Batches};
use crate::data::DataSource;
use crate::eval::{dataset_errors, error_signal, ErrorMeasure};
use crate::models::Model;
use crate::training::early_stop::has_plateaued;
use crate::{Result, TrainError};

/// Training configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrainConfig {
    /// Initial learning rate. Models are constructed from this value;
    /// the live rate is theirs and may move between epochs.
    pub learning_rate: f64,
    /// Validation accuracy the early-stop gate requires before the
    /// plateau test is consulted
    pub min_valid_accuracy: f64,
    /// Epoch limit
    pub max_epoch: usize,
    /// Plateau window: stop once the validation error is no worse than
    /// every one of this many trailing epochs
    pub non_increase_window: usize,
    /// Samples per training mini-batch
    pub batch_size: usize,
    /// Samples per evaluation chunk. Larger than the training batch to
    /// trade memory for throughput; has no effect on results.
    pub eval_batch_size: usize,
    /// Shuffle mini-batch order each epoch. Off by default so runs
    /// are reproducible.
    pub shuffle: bool,
    /// Error measure for both updates and epoch scoring
    pub error_measure: ErrorMeasure,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            min_valid_accuracy: 0.5,
            max_epoch: 1024,
            non_increase_window: 8,
            batch_size: 32,
            eval_batch_size: 2048,
            shuffle: false,
            error_measure: ErrorMeasure::Classification,
        }
    }
}

impl TrainConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_epoch == 0 {
            return Err(TrainError::Config("max_epoch must be >= 1".to_string()));
        }

        if self.batch_size == 0 || self.eval_batch_size == 0 {
            return Err(TrainError::Config(
                "batch sizes must be >= 1".to_string(),
            ));
        }

        if self.non_increase_window == 0 {
            return Err(TrainError::Config(
                "non_increase_window must be >= 1".to_string(),
            ));
        }

        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TrainError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }

        if !(0.0..=1.0).contains(&self.min_valid_accuracy) {
            return Err(TrainError::Config(format!(
                "min_valid_accuracy must be within [0, 1], got {}",
                self.min_valid_accuracy
            )));
        }

        Ok(())
    }
}

/// Why a training run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Validation accuracy cleared the threshold and the validation
    /// error plateaued across the configured window
    Converged,
    /// Epoch limit reached without convergence
    MaxEpoch,
}

/// Per-epoch measurements
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train_errors: f64,
    pub valid_errors: f64,
    pub train_accuracy: f64,
    pub valid_accuracy: f64,
}

/// Outcome of one training run
#[derive(Debug)]
pub struct TrainingReport {
    pub stop: StopReason,
    /// Completed epochs
    pub epochs_run: usize,
    /// Out-of-sample error per epoch, indexed by epoch number.
    /// Diverged epochs still contribute an entry.
    pub history: Vec<f64>,
    /// One record per reported (non-diverged) epoch
    pub records: Vec<EpochRecord>,
    /// Epochs skipped because train accuracy went negative
    pub diverged_epochs: usize,
    pub elapsed: Duration,
    pub final_train_accuracy: f64,
    pub final_valid_accuracy: f64,
}

/// Epoch controller: runs the mini-batch update loop until the model
/// converges or the epoch limit is reached.
///
/// The controller owns the error history for the duration of one run;
/// the model is borrowed mutably and handed back updated in place.
pub struct Trainer {
    config: TrainConfig,
    device: Device,
}

impl Trainer {
    /// Create a trainer, rejecting structurally invalid configuration.
    pub fn new(config: TrainConfig, device: Device) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, device })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Run the training loop to completion.
    ///
    /// Per epoch: one forward/update cycle per mini-batch, strictly in
    /// sequence, then full train and validation error evaluation, the
    /// early-stop decision, and the learning-rate adapter.
    pub fn train<M, D>(&self, model: &mut M, train_set: &D, valid_set: &D) -> Result<TrainingReport>
    where
        M: Model,
        D: DataSource + ?Sized,
    {
        let n_train = train_set.len();
        let n_valid = valid_set.len();

        if n_train == 0 {
            return Err(TrainError::Data("training set is empty".to_string()));
        }
        if n_valid == 0 {
            return Err(TrainError::Data("validation set is empty".to_string()));
        }

        log::info!(
            "Training on {} samples, validating on {}, batch size {}",
            n_train,
            n_valid,
            self.config.batch_size
        );

        let started = Instant::now();
        let batches = Batches::new(n_train, self.config.batch_size);

        let mut history: Vec<f64> = Vec::new();
        let mut records: Vec<EpochRecord> = Vec::new();
        let mut diverged_epochs = 0;
        let mut last_train_errors = 0.0;
        let mut stop = StopReason::MaxEpoch;
        let mut epochs_run = self.config.max_epoch;

        for epoch in 0..self.config.max_epoch {
            // Step size normalized by batch cardinality; re-read each
            // epoch so adapter moves take effect.
            let lr = model.learning_rate() / self.config.batch_size as f64;

            if self.config.shuffle {
                let mut order: Vec<BatchRange> = batches.iter().collect();
                order.shuffle(&mut rand::thread_rng());
                for range in order {
                    self.train_batch(model, train_set, range, lr)?;
                }
            } else {
                for range in batches.iter() {
                    self.train_batch(model, train_set, range, lr)?;
                }
            }

            let measure = self.config.error_measure;
            let eval_bs = self.config.eval_batch_size;
            let train_errors = dataset_errors(model, train_set, measure, eval_bs, &self.device)?;
            let valid_errors = dataset_errors(model, valid_set, measure, eval_bs, &self.device)?;

            history.push(valid_errors);
            last_train_errors = train_errors;

            let train_accuracy = 1.0 - train_errors / n_train as f64;
            if train_accuracy < 0.0 {
                diverged_epochs += 1;
                log::warn!(
                    "epoch {}: diverged, error {:.1} exceeds {} samples; skipping policy",
                    epoch,
                    train_errors,
                    n_train
                );
                continue;
            }

            let valid_accuracy = 1.0 - valid_errors / n_valid as f64;

            log::info!(
                "epoch {:>4} | train {:6.2}% ({:>7} correct) | valid {:6.2}% ({:>7} correct)",
                epoch,
                train_accuracy * 100.0,
                (n_train as f64 - train_errors) as u64,
                valid_accuracy * 100.0,
                (n_valid as f64 - valid_errors) as u64
            );

            records.push(EpochRecord {
                epoch,
                train_errors,
                valid_errors,
                train_accuracy,
                valid_accuracy,
            });

            if valid_accuracy > self.config.min_valid_accuracy
                && has_plateaued(&history, epoch, self.config.non_increase_window)
            {
                stop = StopReason::Converged;
                epochs_run = epoch + 1;
                break;
            }

            model.adjust_learning_rate(train_accuracy);
        }

        let elapsed = started.elapsed();
        let final_train_accuracy = 1.0 - last_train_errors / n_train as f64;
        let final_valid_accuracy =
            1.0 - history.last().copied().unwrap_or(0.0) / n_valid as f64;

        log::info!(
            "{} epochs in {:.1}s ({:?})",
            epochs_run,
            elapsed.as_secs_f64(),
            stop
        );
        log::info!("[   In-Sample   ] {:.2}%", final_train_accuracy * 100.0);
        log::info!("[ Out-of-Sample ] {:.2}%", final_valid_accuracy * 100.0);

        Ok(TrainingReport {
            stop,
            epochs_run,
            history,
            records,
            diverged_epochs,
            elapsed,
            final_train_accuracy,
            final_valid_accuracy,
        })
    }

    /// One forward/update cycle. The update is applied before this
    /// returns, so the next batch's forward pass sees it.
    fn train_batch<M, D>(&self, model: &mut M, data: &D, range: BatchRange, lr: f64) -> Result<()>
    where
        M: Model,
        D: DataSource + ?Sized,
    {
        let batch = data.batch(range, &self.device)?;
        let predictions = model.forward(&batch.x)?;
        let signal = error_signal(&predictions, &batch.y, self.config.error_measure)?;
        model.update(&signal, &batch.x, &predictions, lr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BatchData;
    use candle_core::{DType, Tensor};

    /// Classification source: every label is class 0
    struct ZeroSource {
        n: usize,
    }

    impl DataSource for ZeroSource {
        fn len(&self) -> usize {
            self.n
        }

        fn batch(&self, range: BatchRange, device: &Device) -> Result<BatchData> {
            let n = range.len();
            Ok(BatchData {
                x: Tensor::zeros((n, 1), DType::F32, device)?,
                y: Tensor::zeros(n, DType::U32, device)?,
            })
        }
    }

    /// Regression source: all targets zero
    struct ZeroValueSource {
        n: usize,
    }

    impl DataSource for ZeroValueSource {
        fn len(&self) -> usize {
            self.n
        }

        fn batch(&self, range: BatchRange, device: &Device) -> Result<BatchData> {
            let n = range.len();
            Ok(BatchData {
                x: Tensor::zeros((n, 1), DType::F32, device)?,
                y: Tensor::zeros((n, 1), DType::F32, device)?,
            })
        }
    }

    /// Deterministic stub: always predicts `class`, never learns
    struct FixedClassModel {
        class: usize,
        lr: f64,
        adapter_calls: usize,
    }

    impl FixedClassModel {
        fn new(class: usize) -> Self {
            Self {
                class,
                lr: 0.1,
                adapter_calls: 0,
            }
        }
    }

    impl Model for FixedClassModel {
        fn forward(&self, x: &Tensor) -> Result<Tensor> {
            let n = x.dim(0)?;
            let mut data = vec![0f32; n * 2];
            for row in 0..n {
                data[row * 2 + self.class] = 1.0;
            }
            Ok(Tensor::from_vec(data, (n, 2), x.device())?)
        }

        fn update(&mut self, _: &Tensor, _: &Tensor, _: &Tensor, _: f64) -> Result<()> {
            Ok(())
        }

        fn learning_rate(&self) -> f64 {
            self.lr
        }

        fn adjust_learning_rate(&mut self, _: f64) {
            self.adapter_calls += 1;
        }
    }

    /// Regression stub predicting a constant far from every target
    struct RunawayModel {
        adapter_calls: usize,
    }

    impl Model for RunawayModel {
        fn forward(&self, x: &Tensor) -> Result<Tensor> {
            let n = x.dim(0)?;
            Ok(Tensor::full(10f32, (n, 1), x.device())?)
        }

        fn update(&mut self, _: &Tensor, _: &Tensor, _: &Tensor, _: f64) -> Result<()> {
            Ok(())
        }

        fn learning_rate(&self) -> f64 {
            0.1
        }

        fn adjust_learning_rate(&mut self, _: f64) {
            self.adapter_calls += 1;
        }
    }

    fn quick_config() -> TrainConfig {
        TrainConfig {
            max_epoch: 10,
            non_increase_window: 3,
            batch_size: 4,
            eval_batch_size: 8,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(TrainConfig::default().validate().is_ok());

        for broken in [
            TrainConfig {
                max_epoch: 0,
                ..TrainConfig::default()
            },
            TrainConfig {
                batch_size: 0,
                ..TrainConfig::default()
            },
            TrainConfig {
                non_increase_window: 0,
                ..TrainConfig::default()
            },
            TrainConfig {
                learning_rate: -1.0,
                ..TrainConfig::default()
            },
            TrainConfig {
                min_valid_accuracy: 1.5,
                ..TrainConfig::default()
            },
        ] {
            assert!(broken.validate().is_err());
            assert!(Trainer::new(broken, Device::Cpu).is_err());
        }
    }

    #[test]
    fn test_empty_datasets_rejected() {
        let trainer = Trainer::new(quick_config(), Device::Cpu).unwrap();
        let mut model = FixedClassModel::new(0);

        let empty = ZeroSource { n: 0 };
        let full = ZeroSource { n: 8 };

        assert!(trainer.train(&mut model, &empty, &full).is_err());
        assert!(trainer.train(&mut model, &full, &empty).is_err());
    }

    #[test]
    fn test_perfect_model_converges_at_first_epoch() -> Result<()> {
        let trainer = Trainer::new(quick_config(), Device::Cpu)?;
        let mut model = FixedClassModel::new(0);

        let train = ZeroSource { n: 10 };
        let valid = ZeroSource { n: 5 };
        let report = trainer.train(&mut model, &train, &valid)?;

        assert_eq!(report.stop, StopReason::Converged);
        assert_eq!(report.epochs_run, 1);
        assert_eq!(report.history, vec![0.0]);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].valid_accuracy, 1.0);
        assert_eq!(report.diverged_epochs, 0);
        // Converged before the adapter was ever consulted
        assert_eq!(model.adapter_calls, 0);

        Ok(())
    }

    #[test]
    fn test_rerun_is_identical() -> Result<()> {
        let trainer = Trainer::new(quick_config(), Device::Cpu)?;
        let train = ZeroSource { n: 10 };
        let valid = ZeroSource { n: 5 };

        let mut first_model = FixedClassModel::new(0);
        let first = trainer.train(&mut first_model, &train, &valid)?;

        let mut second_model = FixedClassModel::new(0);
        let second = trainer.train(&mut second_model, &train, &valid)?;

        assert_eq!(first.history, second.history);
        assert_eq!(first.epochs_run, second.epochs_run);
        assert_eq!(first.stop, second.stop);

        Ok(())
    }

    #[test]
    fn test_never_improving_model_hits_epoch_limit() -> Result<()> {
        let config = TrainConfig {
            max_epoch: 1,
            ..quick_config()
        };
        let trainer = Trainer::new(config, Device::Cpu)?;

        // Predicts class 1; every label is 0
        let mut model = FixedClassModel::new(1);
        let train = ZeroSource { n: 10 };
        let valid = ZeroSource { n: 5 };
        let report = trainer.train(&mut model, &train, &valid)?;

        assert_eq!(report.stop, StopReason::MaxEpoch);
        assert_eq!(report.epochs_run, 1);
        assert_eq!(report.history, vec![5.0]);
        assert_eq!(report.final_valid_accuracy, 0.0);
        assert_eq!(model.adapter_calls, 1);

        Ok(())
    }

    #[test]
    fn test_diverged_epochs_skip_policy_and_adapter() -> Result<()> {
        let config = TrainConfig {
            max_epoch: 3,
            error_measure: ErrorMeasure::Regression,
            ..quick_config()
        };
        let trainer = Trainer::new(config, Device::Cpu)?;

        // Squared error of 100 per sample dwarfs the sample count, so
        // train accuracy is negative every epoch
        let mut model = RunawayModel { adapter_calls: 0 };
        let train = ZeroValueSource { n: 10 };
        let valid = ZeroValueSource { n: 5 };
        let report = trainer.train(&mut model, &train, &valid)?;

        assert_eq!(report.stop, StopReason::MaxEpoch);
        assert_eq!(report.diverged_epochs, 3);
        assert!(report.records.is_empty());
        // History still carries one entry per epoch
        assert_eq!(report.history.len(), 3);
        assert_eq!(model.adapter_calls, 0);

        Ok(())
    }
}
