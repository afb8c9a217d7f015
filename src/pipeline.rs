//! End-to-end prediction run
//!
//! Roster → extraction over history and target → fit → score → rank.

use crate::data::{DatasetBuilder, SessionSource};
use crate::features::{Roster, SessionFeatureExtractor};
use crate::model;
use crate::predict::{RankConverter, RankPredictor, RankedEntry, RankingMetrics};
use crate::{Config, EventId, Result};
use serde::Serialize;

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub target: EventId,
    pub model: String,
    pub training_rows: usize,
    pub training_events: Vec<EventId>,
    pub ranking: Vec<RankedEntry>,
    pub metrics: RankingMetrics,
}

impl PredictionReport {
    pub fn mae(&self) -> Option<f64> {
        self.metrics.mae
    }
}

/// Predict the finishing order of the configured target event
pub fn run(config: &Config, source: &dyn SessionSource) -> Result<PredictionReport> {
    let roster = Roster::from_config(&config.season)?;
    let extractor = SessionFeatureExtractor::new(source, &roster, config.fallbacks);
    let builder = DatasetBuilder::new(&extractor);

    let target_event = config.season.target_event();
    log::info!(
        "Predicting {} from {} historical events via {}",
        target_event,
        config.season.history_rounds.len(),
        source.name()
    );
    let (training, target) = builder.build(&config.season.history_events(), target_event)?;

    let mut predictor = RankPredictor::new(model::from_config(&config.model));
    predictor.fit(&training)?;
    let scores = predictor.score(&target)?;

    let ranking = RankConverter::convert(&target, &scores)?;
    let metrics = RankingMetrics::from_ranking(&ranking);
    match metrics.mae {
        Some(mae) => log::info!("{}: MAE {:.2} over {} drivers", target_event, mae, metrics.scored),
        None => log::info!("{}: no race result to score against", target_event),
    }

    Ok(PredictionReport {
        target: target_event,
        model: predictor.model_name().to_string(),
        training_rows: training.len(),
        training_events: training.events(),
        ranking,
        metrics,
    })
}
