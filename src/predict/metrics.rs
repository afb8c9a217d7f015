//! Ranking quality against the actual race result

use super::ranking::{mean_absolute_error, RankedEntry};
use serde::Serialize;
use std::fmt;

const PODIUM: u32 = 3;

/// Summary of how close a ranking came to the classified finish
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankingMetrics {
    /// Entries with a known finishing position
    pub scored: usize,
    /// Mean absolute position error, `None` when nothing is scored
    pub mae: Option<f64>,
    /// Predicted position matched exactly
    pub exact: usize,
    /// Off by at most one place
    pub within_one: usize,
    /// Predicted top three who finished in the top three
    pub podium_hits: usize,
}

impl RankingMetrics {
    pub fn from_ranking(ranking: &[RankedEntry]) -> Self {
        let errors: Vec<u32> = ranking.iter().filter_map(|e| e.error).collect();
        let podium_hits = ranking
            .iter()
            .filter(|e| e.predicted_position <= PODIUM)
            .filter(|e| e.actual_position.is_some_and(|p| p <= PODIUM))
            .count();

        RankingMetrics {
            scored: errors.len(),
            mae: mean_absolute_error(ranking),
            exact: errors.iter().filter(|&&e| e == 0).count(),
            within_one: errors.iter().filter(|&&e| e <= 1).count(),
            podium_hits,
        }
    }

    pub fn has_results(&self) -> bool {
        self.scored > 0
    }

    /// Podium places that could have been hit
    pub fn podium_slots(&self) -> usize {
        self.scored.min(PODIUM as usize)
    }
}

impl fmt::Display for RankingMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mae {
            Some(mae) => write!(
                f,
                "MAE: {:.2} | exact {}/{} | within one {}/{} | podium {}/{}",
                mae,
                self.exact,
                self.scored,
                self.within_one,
                self.scored,
                self.podium_hits,
                self.podium_slots()
            ),
            None => write!(f, "MAE: n/a (no race result)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DriverCode;

    fn entry(driver: &str, predicted: u32, actual: Option<u32>) -> RankedEntry {
        RankedEntry {
            driver: DriverCode::new(driver),
            team: "Alpha".to_string(),
            grid_position: predicted,
            score: predicted as f64,
            predicted_position: predicted,
            actual_position: actual,
            error: actual.map(|a| a.abs_diff(predicted)),
        }
    }

    #[test]
    fn test_counts() {
        let ranking = vec![
            entry("AAA", 1, Some(2)),
            entry("BBB", 2, Some(1)),
            entry("CCC", 3, Some(5)),
            entry("DDD", 4, Some(4)),
            entry("EEE", 5, Some(3)),
            entry("FFF", 6, None),
        ];
        let metrics = RankingMetrics::from_ranking(&ranking);

        assert_eq!(metrics.scored, 5);
        assert_eq!(metrics.exact, 1);
        assert_eq!(metrics.within_one, 3);
        assert_eq!(metrics.podium_hits, 2);
        assert_eq!(metrics.mae, Some(6.0 / 5.0));
        assert_eq!(
            metrics.to_string(),
            "MAE: 1.20 | exact 1/5 | within one 3/5 | podium 2/3"
        );
    }

    #[test]
    fn test_podium_slots_capped_by_scored() {
        let ranking = vec![entry("AAA", 1, Some(1)), entry("BBB", 2, Some(2))];
        let metrics = RankingMetrics::from_ranking(&ranking);
        assert_eq!(metrics.podium_slots(), 2);
        assert_eq!(
            metrics.to_string(),
            "MAE: 0.00 | exact 2/2 | within one 2/2 | podium 2/2"
        );
    }

    #[test]
    fn test_unscored_ranking() {
        let ranking = vec![entry("AAA", 1, None), entry("BBB", 2, None)];
        let metrics = RankingMetrics::from_ranking(&ranking);
        assert!(!metrics.has_results());
        assert_eq!(metrics.mae, None);
        assert_eq!(metrics.to_string(), "MAE: n/a (no race result)");
    }
}
