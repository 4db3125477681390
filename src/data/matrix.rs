//! In-memory dataset backed by ndarray matrices (.npy loadable)
use candle_core::{DType, Device, Tensor};
use ndarray::{s, Array1, Array2};
use ndarray_npy::ReadNpyExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::batch::BatchRange;
use crate::data::{BatchData, DataSource};
use crate::{Result, TrainError};

/// Metadata from dataset.json
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetMetadata {
    pub num_classes: usize,
    #[serde(default)]
    pub num_features: usize,
    #[serde(default)]
    pub description: String,
}

/// Ground truth storage for one dataset
#[derive(Debug, Clone)]
enum Targets {
    /// Class labels, `[N]`
    Labels(Array1<u32>),
    /// Regression values, `[N, dim]`
    Values(Array2<f32>),
}

/// Dataset held fully in host memory.
///
/// Feature rows are copied to the target device one batch at a time,
/// so only the active batch lives in device memory.
#[derive(Debug, Clone)]
pub struct MatrixDataset {
    features: Array2<f32>,
    targets: Targets,
}

impl MatrixDataset {
    /// Classification dataset from a feature matrix and class labels.
    pub fn classification(features: Array2<f32>, labels: Array1<u32>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(TrainError::Data(format!(
                "feature/label count mismatch: {} rows vs {} labels",
                features.nrows(),
                labels.len()
            )));
        }

        Ok(Self {
            features,
            targets: Targets::Labels(labels),
        })
    }

    /// Regression dataset from a feature matrix and target values.
    pub fn regression(features: Array2<f32>, values: Array2<f32>) -> Result<Self> {
        if features.nrows() != values.nrows() {
            return Err(TrainError::Data(format!(
                "feature/target count mismatch: {} rows vs {} targets",
                features.nrows(),
                values.nrows()
            )));
        }

        Ok(Self {
            features,
            targets: Targets::Values(values),
        })
    }

    /// Load a classification dataset from a directory containing
    /// `features.npy` (f32, `[N, dim]`), `labels.npy` (i64, `[N]`)
    /// and an optional `dataset.json`.
    pub fn from_directory<P: AsRef<Path>>(path: P) -> Result<(Self, DatasetMetadata)> {
        let dir = path.as_ref();

        log::info!("Loading dataset from: {:?}", dir);

        let features = <Array2<f32> as ReadNpyExt>::read_npy(File::open(dir.join("features.npy"))?)
            .map_err(|e| TrainError::Data(format!("failed to read features.npy: {}", e)))?;

        // Labels come out of numpy as i64
        let labels_i64 = <Array1<i64> as ReadNpyExt>::read_npy(File::open(dir.join("labels.npy"))?)
            .map_err(|e| TrainError::Data(format!("failed to read labels.npy: {}", e)))?;
        let labels = labels_i64.mapv(|x| x as u32);

        let metadata_path = dir.join("dataset.json");
        let metadata: DatasetMetadata = if metadata_path.exists() {
            let reader = BufReader::new(File::open(&metadata_path)?);
            serde_json::from_reader(reader)?
        } else {
            log::warn!("dataset.json not found, inferring metadata");
            DatasetMetadata {
                num_classes: labels.iter().max().map_or(0, |&m| m as usize + 1),
                num_features: features.ncols(),
                description: String::new(),
            }
        };

        log::info!(
            "Dataset loaded: {} examples, {} features, {} classes",
            features.nrows(),
            features.ncols(),
            metadata.num_classes
        );

        let dataset = Self::classification(features, labels)?;
        Ok((dataset, metadata))
    }

    /// Number of feature columns
    pub fn input_dim(&self) -> usize {
        self.features.ncols()
    }

    /// Split into (train, validation) holding out every `(ratio+1)`-th
    /// sample, so train:valid is `ratio`:1. Deterministic and
    /// order-preserving.
    pub fn split(&self, ratio: usize) -> Result<(Self, Self)> {
        if ratio == 0 {
            return Err(TrainError::Config(
                "split ratio must be at least 1".to_string(),
            ));
        }

        let stride = ratio + 1;
        let held_out = |i: &usize| i % stride == ratio;

        let valid_idx: Vec<usize> = (0..self.len()).filter(held_out).collect();
        let train_idx: Vec<usize> = (0..self.len()).filter(|i| !held_out(i)).collect();

        Ok((self.take(&train_idx), self.take(&valid_idx)))
    }

    fn take(&self, indices: &[usize]) -> Self {
        let features = self.features.select(ndarray::Axis(0), indices);
        let targets = match &self.targets {
            Targets::Labels(labels) => {
                Targets::Labels(indices.iter().map(|&i| labels[i]).collect())
            }
            Targets::Values(values) => Targets::Values(values.select(ndarray::Axis(0), indices)),
        };

        Self { features, targets }
    }
}

impl DataSource for MatrixDataset {
    fn len(&self) -> usize {
        self.features.nrows()
    }

    fn batch(&self, range: BatchRange, device: &Device) -> Result<BatchData> {
        let n = range.len();
        let dim = self.features.ncols();

        let rows = self.features.slice(s![range.start..range.end, ..]);
        let x_data: Vec<f32> = rows.iter().copied().collect();
        let x = Tensor::from_vec(x_data, (n, dim), device)?;

        let y = match &self.targets {
            Targets::Labels(labels) => {
                let y_data: Vec<u32> = labels
                    .slice(s![range.start..range.end])
                    .iter()
                    .copied()
                    .collect();
                Tensor::from_vec(y_data, n, device)?.to_dtype(DType::U32)?
            }
            Targets::Values(values) => {
                let out_dim = values.ncols();
                let y_data: Vec<f32> = values
                    .slice(s![range.start..range.end, ..])
                    .iter()
                    .copied()
                    .collect();
                Tensor::from_vec(y_data, (n, out_dim), device)?
            }
        };

        Ok(BatchData { x, y })
    }
}
