/// Train a softmax classifier on synthetic two-class blobs.
use candle_core::Device;
use ndarray::{Array1, Array2};
use rand::Rng;

use minitrain::data::MatrixDataset;
use minitrain::models::{Model, SoftmaxConfig, SoftmaxRegression};
use minitrain::training::{save_checkpoint, CheckpointMetadata};
use minitrain::{ErrorMeasure, TrainConfig, Trainer};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Device setup - try CUDA first, fall back to CPU. One-time step,
    // before the model and trainer exist.
    let device = if candle_core::utils::cuda_is_available() {
        Device::new_cuda(0)?
    } else {
        Device::Cpu
    };
    log::info!("Using device: {:?}", device);

    // Two well-separated clusters, one per class
    let n = 2000;
    let mut rng = rand::thread_rng();
    let mut features = Array2::<f32>::zeros((n, 2));
    let mut labels = Array1::<u32>::zeros(n);

    for i in 0..n {
        let class = (i % 2) as u32;
        let center = if class == 0 { -1.0f32 } else { 1.0 };
        features[[i, 0]] = center + rng.gen_range(-0.8..0.8);
        features[[i, 1]] = center + rng.gen_range(-0.8..0.8);
        labels[i] = class;
    }

    let dataset = MatrixDataset::classification(features, labels)?;
    let (train_set, valid_set) = dataset.split(5)?;

    let train_config = TrainConfig {
        learning_rate: 0.5,
        min_valid_accuracy: 0.8,
        max_epoch: 200,
        non_increase_window: 5,
        batch_size: 32,
        eval_batch_size: 2048,
        shuffle: false,
        error_measure: ErrorMeasure::Classification,
    };

    let model_config = SoftmaxConfig {
        input_dim: dataset.input_dim(),
        num_classes: 2,
        init_std: 0.1,
        learning_rate: train_config.learning_rate,
    };

    log::info!("Training configuration: {:#?}", train_config);

    let mut model = SoftmaxRegression::new(&model_config, &device)?;
    let trainer = Trainer::new(train_config.clone(), device)?;

    let report = trainer.train(&mut model, &train_set, &valid_set)?;

    log::info!(
        "Finished: {:?} after {} epochs, valid accuracy {:.2}%",
        report.stop,
        report.epochs_run,
        report.final_valid_accuracy * 100.0
    );

    let metadata = CheckpointMetadata {
        epochs_run: report.epochs_run,
        learning_rate: model.learning_rate(),
        valid_accuracy: Some(report.final_valid_accuracy),
        config: Some(serde_json::to_string(&train_config)?),
    };
    save_checkpoint(&model.to_tensors(), "blobs.safetensors", &metadata)?;

    Ok(())
}
