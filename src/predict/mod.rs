//! Scoring and ranking
//!
//! Fit a regressor on historical rows, score the target event and turn the
//! scores into a predicted finishing order.

pub mod metrics;
pub mod predictor;
pub mod ranking;

pub use metrics::RankingMetrics;
pub use predictor::RankPredictor;
pub use ranking::{mean_absolute_error, RankConverter, RankedEntry};
