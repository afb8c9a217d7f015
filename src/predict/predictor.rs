//! Regression-based scorer

use crate::data::Dataset;
use crate::model::Regressor;
use crate::{PodiumError, Result};

/// Scores drivers with a regressor trained on finishing positions.
///
/// The regression target is the race position (1 = winner), so a lower
/// score always means an earlier predicted finish.
pub struct RankPredictor {
    model: Box<dyn Regressor>,
    fitted: bool,
}

impl RankPredictor {
    pub fn new(model: Box<dyn Regressor>) -> Self {
        RankPredictor { model, fitted: false }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Train on every labelled row of the dataset
    pub fn fit(&mut self, training: &Dataset) -> Result<()> {
        let labelled: Vec<_> = training
            .iter()
            .filter_map(|row| row.actual_position.map(|p| (row.features(), p as f64)))
            .collect();
        if labelled.is_empty() {
            return Err(PodiumError::NoTrainingData);
        }

        let (features, targets): (Vec<_>, Vec<_>) = labelled.into_iter().unzip();
        log::info!(
            "Training {} on {} rows",
            self.model.name(),
            features.len()
        );
        self.model.fit(&features, &targets)?;
        self.fitted = true;
        Ok(())
    }

    /// One score per row, in dataset order
    pub fn score(&self, target: &Dataset) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PodiumError::NotFitted);
        }
        let scores = self.model.predict(&target.features())?;
        if scores.len() != target.len() {
            return Err(PodiumError::Model(format!(
                "{} returned {} scores for {} rows",
                self.model.name(),
                scores.len(),
                target.len()
            )));
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::EventFeatureRow;
    use crate::model::{BoostedTrees, BoostedTreesConfig, FeatureRow};
    use crate::{DriverCode, EventId};

    fn row(round: u8, driver: &str, grid: u32, actual: Option<u32>) -> EventFeatureRow {
        EventFeatureRow {
            event: EventId::new(2025, round),
            driver: DriverCode::new(driver),
            team: "Alpha".to_string(),
            grid_position: grid,
            qualy_delta: 0.2 * (grid - 1) as f64,
            practice_delta: 0.1 * (grid - 1) as f64,
            team_score: 1.0 / grid as f64,
            actual_position: actual,
        }
    }

    /// Echoes the grid slot back as the score
    struct GridEcho;

    impl Regressor for GridEcho {
        fn name(&self) -> &str {
            "grid-echo"
        }

        fn fit(&mut self, _features: &[FeatureRow], _targets: &[f64]) -> Result<()> {
            Ok(())
        }

        fn predict(&self, features: &[FeatureRow]) -> Result<Vec<f64>> {
            Ok(features.iter().map(|x| x[0]).collect())
        }
    }

    #[test]
    fn test_score_before_fit() {
        let predictor = RankPredictor::new(Box::new(GridEcho));
        let target = Dataset::new(vec![row(3, "AAA", 1, None)]);
        assert!(matches!(predictor.score(&target), Err(PodiumError::NotFitted)));
    }

    #[test]
    fn test_fit_requires_labels() {
        let mut predictor = RankPredictor::new(Box::new(GridEcho));
        let unlabelled = Dataset::new(vec![row(1, "AAA", 1, None)]);
        assert!(matches!(predictor.fit(&unlabelled), Err(PodiumError::NoTrainingData)));
        assert!(!predictor.is_fitted());
    }

    #[test]
    fn test_scores_follow_dataset_order() {
        let mut predictor = RankPredictor::new(Box::new(GridEcho));
        predictor
            .fit(&Dataset::new(vec![row(1, "AAA", 1, Some(1))]))
            .unwrap();

        let target = Dataset::new(vec![row(2, "CCC", 3, None), row(2, "AAA", 1, None)]);
        assert_eq!(predictor.score(&target).unwrap(), vec![3.0, 1.0]);
    }

    #[test]
    fn test_lower_score_for_better_history() {
        let mut training = Vec::new();
        for round in 1..=4 {
            training.push(row(round, "AAA", 1, Some(1)));
            training.push(row(round, "BBB", 2, Some(2)));
            training.push(row(round, "CCC", 3, Some(3)));
        }

        let mut predictor = RankPredictor::new(Box::new(BoostedTrees::new(BoostedTreesConfig::default())));
        assert_eq!(predictor.model_name(), "boosted-trees");
        predictor.fit(&Dataset::new(training)).unwrap();

        let target = Dataset::new(vec![row(5, "CCC", 3, None), row(5, "AAA", 1, None)]);
        let scores = predictor.score(&target).unwrap();
        assert!(scores[1] < scores[0]);
    }
}
