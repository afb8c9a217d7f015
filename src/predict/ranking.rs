//! Scores to finishing order

use crate::data::Dataset;
use crate::{DriverCode, PodiumError, Result};
use serde::Serialize;

/// One driver in the predicted order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub driver: DriverCode,
    pub team: String,
    pub grid_position: u32,
    pub score: f64,
    /// 1-based, unique within a ranking
    pub predicted_position: u32,
    pub actual_position: Option<u32>,
    /// `|actual - predicted|` when the race has been run
    pub error: Option<u32>,
}

/// Converts model scores into a ranking
pub struct RankConverter;

impl RankConverter {
    /// Sort ascending by score and assign positions 1..N.
    ///
    /// The sort is stable so equal scores keep dataset order. NaN scores
    /// order after every number.
    pub fn convert(dataset: &Dataset, scores: &[f64]) -> Result<Vec<RankedEntry>> {
        if dataset.len() != scores.len() {
            return Err(PodiumError::Model(format!(
                "{} scores for {} rows",
                scores.len(),
                dataset.len()
            )));
        }

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| nan_last(scores[a]).total_cmp(&nan_last(scores[b])));

        Ok(order
            .into_iter()
            .zip(1u32..)
            .filter_map(|(i, predicted_position)| {
                let row = dataset.get(i)?;
                Some(RankedEntry {
                    driver: row.driver.clone(),
                    team: row.team.clone(),
                    grid_position: row.grid_position,
                    score: scores[i],
                    predicted_position,
                    actual_position: row.actual_position,
                    error: row
                        .actual_position
                        .map(|actual| actual.abs_diff(predicted_position)),
                })
            })
            .collect())
    }
}

/// `total_cmp` puts negative NaN first; fold every NaN to the top
fn nan_last(score: f64) -> f64 {
    if score.is_nan() {
        f64::INFINITY
    } else {
        score
    }
}

/// Mean position error over entries with a known result
pub fn mean_absolute_error(ranking: &[RankedEntry]) -> Option<f64> {
    let errors: Vec<u32> = ranking.iter().filter_map(|e| e.error).collect();
    if errors.is_empty() {
        return None;
    }
    Some(errors.iter().map(|&e| e as f64).sum::<f64>() / errors.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::EventFeatureRow;
    use crate::EventId;

    fn dataset(actual: &[Option<u32>]) -> Dataset {
        Dataset::new(
            actual
                .iter()
                .enumerate()
                .map(|(i, &actual_position)| EventFeatureRow {
                    event: EventId::new(2025, 23),
                    driver: DriverCode::new(&format!("D{:02}", i)),
                    team: "Alpha".to_string(),
                    grid_position: i as u32 + 1,
                    qualy_delta: 0.0,
                    practice_delta: 0.0,
                    team_score: 1.0,
                    actual_position,
                })
                .collect(),
        )
    }

    fn positions(ranking: &[RankedEntry]) -> Vec<u32> {
        ranking.iter().map(|e| e.predicted_position).collect()
    }

    #[test]
    fn test_positions_are_a_permutation() {
        let data = dataset(&[None; 5]);
        let ranking = RankConverter::convert(&data, &[3.2, 1.1, 9.0, 0.5, 4.4]).unwrap();

        let mut seen = positions(&ranking);
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(ranking[0].driver, DriverCode::new("D03"));
        assert_eq!(ranking[4].driver, DriverCode::new("D02"));
        assert!(ranking.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[test]
    fn test_ties_keep_dataset_order() {
        let data = dataset(&[None; 4]);
        let scores = [2.0, 1.0, 2.0, 1.0];
        let first = RankConverter::convert(&data, &scores).unwrap();
        let second = RankConverter::convert(&data, &scores).unwrap();

        let drivers: Vec<&str> = first.iter().map(|e| e.driver.as_str()).collect();
        assert_eq!(drivers, vec!["D01", "D03", "D00", "D02"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_nan_scores_rank_last() {
        let data = dataset(&[None; 3]);
        let ranking = RankConverter::convert(&data, &[f64::NAN, 2.0, -f64::NAN]).unwrap();
        let drivers: Vec<&str> = ranking.iter().map(|e| e.driver.as_str()).collect();
        assert_eq!(drivers, vec!["D01", "D00", "D02"]);
    }

    #[test]
    fn test_length_mismatch() {
        let data = dataset(&[None; 3]);
        assert!(matches!(
            RankConverter::convert(&data, &[1.0, 2.0]),
            Err(PodiumError::Model(_))
        ));
    }

    #[test]
    fn test_mae_zero_only_when_perfect() {
        let data = dataset(&[Some(1), Some(2), Some(3)]);
        let perfect = RankConverter::convert(&data, &[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(mean_absolute_error(&perfect), Some(0.0));

        let swapped = RankConverter::convert(&data, &[0.2, 0.1, 0.3]).unwrap();
        let mae = mean_absolute_error(&swapped).unwrap();
        assert!((mae - 2.0 / 3.0).abs() < 1e-12);
        assert!(mae > 0.0);
    }

    #[test]
    fn test_mae_ignores_unknown_positions() {
        let data = dataset(&[Some(2), None, Some(1)]);
        let ranking = RankConverter::convert(&data, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(ranking[1].error, None);
        // D00 predicted 1st finished 2nd, D02 predicted 3rd finished 1st
        assert_eq!(mean_absolute_error(&ranking), Some(1.5));
    }

    #[test]
    fn test_mae_none_without_results() {
        let data = dataset(&[None, None]);
        let ranking = RankConverter::convert(&data, &[1.0, 2.0]).unwrap();
        assert_eq!(mean_absolute_error(&ranking), None);
        assert_eq!(mean_absolute_error(&[]), None);
    }
}
