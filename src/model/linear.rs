//! Linear regression trained with full-batch SGD on burn

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::nn::{Linear, LinearConfig};
use burn::optim::{GradientsParams, Optimizer, SgdConfig};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};

use super::{check_training_input, FeatureRow, Regressor};
use crate::features::EventFeatureRow;
use crate::{PodiumError, Result};

/// CPU backend used outside of tests
pub type LinearBackend = Autodiff<NdArray<f32>>;

/// Spread below which a training column counts as constant
const MIN_STD: f32 = 1e-6;

/// Z-score statistics of the training features.
///
/// A column that was constant in training carries no information, so it
/// maps to z = 0 for every row, including rows it is later applied to.
#[derive(Debug, Clone)]
pub struct FeatureNormalization {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl FeatureNormalization {
    pub fn from_rows(rows: &[FeatureRow]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut sum = [0.0f64; EventFeatureRow::DIM];
        let mut sum_sq = [0.0f64; EventFeatureRow::DIM];
        for row in rows {
            for (j, v) in row.iter().enumerate() {
                sum[j] += v;
                sum_sq[j] += v * v;
            }
        }

        let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();
        let std = sum_sq
            .iter()
            .zip(&mean)
            .map(|(sq, m)| (sq / n - m * m).max(0.0).sqrt() as f32)
            .collect();

        FeatureNormalization {
            mean: mean.into_iter().map(|m| m as f32).collect(),
            std,
        }
    }

    /// Flattened row-major matrix of z-scores
    fn apply(&self, rows: &[FeatureRow]) -> Vec<f32> {
        rows.iter()
            .flat_map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, v)| {
                        if self.std[j] < MIN_STD {
                            0.0
                        } else {
                            (*v as f32 - self.mean[j]) / self.std[j]
                        }
                    })
            })
            .collect()
    }
}

/// Mean and spread of the training targets
#[derive(Debug, Clone, Copy)]
struct TargetNormalization {
    mean: f32,
    std: f32,
}

impl TargetNormalization {
    fn from_targets(targets: &[f64]) -> Self {
        let n = targets.len().max(1) as f64;
        let mean = targets.iter().sum::<f64>() / n;
        let var = targets.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n;
        TargetNormalization {
            mean: mean as f32,
            std: (var.sqrt() as f32).max(0.001),
        }
    }
}

/// Single linear layer over normalized features
pub struct LinearRegressor<B: AutodiffBackend = LinearBackend> {
    model: Option<Linear<B>>,
    feature_norm: Option<FeatureNormalization>,
    target_norm: Option<TargetNormalization>,
    epochs: usize,
    learning_rate: f64,
    seed: Option<u64>,
    device: B::Device,
}

impl LinearRegressor<LinearBackend> {
    pub fn new(epochs: usize, learning_rate: f64) -> Self {
        LinearRegressor::with_device(Default::default(), epochs, learning_rate)
    }
}

impl<B: AutodiffBackend> LinearRegressor<B> {
    pub fn with_device(device: B::Device, epochs: usize, learning_rate: f64) -> Self {
        LinearRegressor {
            model: None,
            feature_norm: None,
            target_norm: None,
            epochs,
            learning_rate,
            seed: None,
            device,
        }
    }

    /// Seed the backend before weights are initialized
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn matrix<K: Backend<Device = B::Device>>(&self, flat: Vec<f32>, rows: usize) -> Tensor<K, 2> {
        Tensor::<K, 1>::from_floats(flat.as_slice(), &self.device).reshape([rows, EventFeatureRow::DIM])
    }
}

impl<B: AutodiffBackend> Regressor for LinearRegressor<B> {
    fn name(&self) -> &str {
        "linear"
    }

    fn fit(&mut self, features: &[FeatureRow], targets: &[f64]) -> Result<()> {
        check_training_input(features, targets)?;
        if self.epochs == 0 {
            return Err(PodiumError::Model("linear model needs at least one epoch".to_string()));
        }
        if let Some(seed) = self.seed {
            B::seed(seed);
        }

        let n = features.len();
        let feature_norm = FeatureNormalization::from_rows(features);
        let target_norm = TargetNormalization::from_targets(targets);
        log::debug!(
            "Feature normalization: mean={:?}, std={:?}",
            feature_norm.mean,
            feature_norm.std
        );

        let x: Tensor<B, 2> = self.matrix(feature_norm.apply(features), n);
        let y_flat: Vec<f32> = targets
            .iter()
            .map(|t| (*t as f32 - target_norm.mean) / target_norm.std)
            .collect();
        let y = Tensor::<B, 1>::from_floats(y_flat.as_slice(), &self.device).reshape([n, 1]);

        let mut model: Linear<B> = LinearConfig::new(EventFeatureRow::DIM, 1).init(&self.device);
        let mut optimizer = SgdConfig::new().init::<B, Linear<B>>();

        for epoch in 0..self.epochs {
            let out = model.forward(x.clone());
            let loss = (out - y.clone()).powf_scalar(2.0).mean();
            let loss_val: f32 = loss.clone().into_scalar().elem();

            let grads = loss.backward();
            let grads_params = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(self.learning_rate, model, grads_params);

            if epoch % 100 == 0 || epoch + 1 == self.epochs {
                log::debug!("Epoch {}/{}: mse={:.4}", epoch + 1, self.epochs, loss_val);
            }
        }

        log::info!("Fitted linear model on {} rows for {} epochs", n, self.epochs);
        self.model = Some(model);
        self.feature_norm = Some(feature_norm);
        self.target_norm = Some(target_norm);
        Ok(())
    }

    fn predict(&self, features: &[FeatureRow]) -> Result<Vec<f64>> {
        let (Some(model), Some(feature_norm), Some(target_norm)) =
            (&self.model, &self.feature_norm, &self.target_norm)
        else {
            return Err(PodiumError::NotFitted);
        };
        if features.is_empty() {
            return Ok(Vec::new());
        }

        // Inference runs on the inner backend, outside the autodiff graph
        let x: Tensor<B::InnerBackend, 2> = self.matrix(feature_norm.apply(features), features.len());
        let out = model
            .valid()
            .forward(x)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| PodiumError::Model(format!("reading predictions: {:?}", e)))?;

        Ok(out
            .into_iter()
            .map(|z| (z * target_norm.std + target_norm.mean) as f64)
            .collect())
    }
}
