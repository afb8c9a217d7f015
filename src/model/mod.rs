//! Regression strategies
//!
//! Every model maps the four event features to a continuous finishing score:
//! - BoostedTrees: gradient-boosted regression trees (default)
//! - LinearRegressor: linear model trained with SGD on burn

pub mod boosting;
pub mod linear;

pub use boosting::{BoostedTrees, BoostedTreesConfig};
pub use linear::LinearRegressor;

use crate::features::EventFeatureRow;
use crate::{ModelConfig, ModelKind, PodiumError, Result};

/// One feature vector in [`crate::features::FEATURE_NAMES`] order
pub type FeatureRow = [f64; EventFeatureRow::DIM];

/// A pluggable `fit(X, y)` / `predict(X)` model
pub trait Regressor {
    fn name(&self) -> &str;

    fn fit(&mut self, features: &[FeatureRow], targets: &[f64]) -> Result<()>;

    fn predict(&self, features: &[FeatureRow]) -> Result<Vec<f64>>;
}

/// Build the regressor selected in the config
pub fn from_config(config: &ModelConfig) -> Box<dyn Regressor> {
    match config.kind {
        ModelKind::BoostedTrees => Box::new(BoostedTrees::new(BoostedTreesConfig::from(config))),
        ModelKind::Linear => Box::new(
            LinearRegressor::new(config.linear_epochs, config.linear_learning_rate).with_seed(config.seed),
        ),
    }
}

/// Reject empty, ragged or non-finite training input
pub(crate) fn check_training_input(features: &[FeatureRow], targets: &[f64]) -> Result<()> {
    if features.is_empty() {
        return Err(PodiumError::Model("empty training set".to_string()));
    }
    if features.len() != targets.len() {
        return Err(PodiumError::Model(format!(
            "{} feature rows but {} targets",
            features.len(),
            targets.len()
        )));
    }
    let finite = features.iter().flatten().chain(targets).all(|v| v.is_finite());
    if !finite {
        return Err(PodiumError::Model("non-finite training value".to_string()));
    }
    Ok(())
}
