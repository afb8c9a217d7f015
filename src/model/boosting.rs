//! Gradient-boosted regression trees
//!
//! Squared-error boosting: start from the mean target, then fit each shallow
//! tree to the current residuals and add it scaled by the learning rate.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{check_training_input, FeatureRow, Regressor};
use crate::features::EventFeatureRow;
use crate::{ModelConfig, PodiumError, Result};

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct BoostedTreesConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each tree
    pub subsample: f64,
    pub seed: u64,
}

impl Default for BoostedTreesConfig {
    fn default() -> Self {
        BoostedTreesConfig {
            n_estimators: 150,
            learning_rate: 0.05,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            seed: 42,
        }
    }
}

impl From<&ModelConfig> for BoostedTreesConfig {
    fn from(config: &ModelConfig) -> Self {
        BoostedTreesConfig {
            n_estimators: config.n_estimators,
            learning_rate: config.learning_rate,
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf.max(1),
            subsample: config.subsample,
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, x: &FeatureRow) -> f64 {
        match self {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if x[*feature] <= *threshold {
                    left.predict(x)
                } else {
                    right.predict(x)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Ensemble of regression trees fit to residuals
#[derive(Debug, Clone)]
pub struct BoostedTrees {
    config: BoostedTreesConfig,
    base_score: f64,
    trees: Vec<TreeNode>,
}

impl BoostedTrees {
    pub fn new(config: BoostedTreesConfig) -> Self {
        BoostedTrees {
            config,
            base_score: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Deepest tree in the ensemble
    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(TreeNode::depth).max().unwrap_or(0)
    }

    fn raw_predict(&self, x: &FeatureRow) -> f64 {
        self.base_score
            + self.config.learning_rate * self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
    }

    /// Grow one tree on the residuals of the given rows
    fn build_tree(&self, features: &[FeatureRow], residuals: &[f64], rows: &[usize], depth: usize) -> TreeNode {
        let leaf = || TreeNode::Leaf {
            value: rows.iter().map(|&i| residuals[i]).sum::<f64>() / rows.len().max(1) as f64,
        };

        if depth >= self.config.max_depth || rows.len() < 2 * self.config.min_samples_leaf {
            return leaf();
        }

        let Some(split) = best_split(features, residuals, rows, self.config.min_samples_leaf) else {
            return leaf();
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&i| features[i][split.feature] <= split.threshold);

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build_tree(features, residuals, &left_rows, depth + 1)),
            right: Box::new(self.build_tree(features, residuals, &right_rows, depth + 1)),
        }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
}

/// Split maximizing the squared-error reduction, first found on ties
fn best_split(features: &[FeatureRow], residuals: &[f64], rows: &[usize], min_leaf: usize) -> Option<Split> {
    let n = rows.len() as f64;
    let total: f64 = rows.iter().map(|&i| residuals[i]).sum();
    let parent_score = total * total / n;

    let mut best: Option<(f64, Split)> = None;
    for feature in 0..EventFeatureRow::DIM {
        let mut sorted = rows.to_vec();
        sorted.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

        let mut left_sum = 0.0;
        for k in 0..sorted.len() - 1 {
            left_sum += residuals[sorted[k]];
            let here = features[sorted[k]][feature];
            let next = features[sorted[k + 1]][feature];
            if here == next {
                continue;
            }

            let n_left = k + 1;
            let n_right = sorted.len() - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
            let gain = score - parent_score;
            if gain > 1e-12 && best.as_ref().map_or(true, |(g, _)| gain > *g) {
                best = Some((
                    gain,
                    Split {
                        feature,
                        threshold: (here + next) / 2.0,
                    },
                ));
            }
        }
    }

    best.map(|(_, split)| split)
}

impl Regressor for BoostedTrees {
    fn name(&self) -> &str {
        "boosted-trees"
    }

    fn fit(&mut self, features: &[FeatureRow], targets: &[f64]) -> Result<()> {
        check_training_input(features, targets)?;
        if !(self.config.subsample > 0.0 && self.config.subsample <= 1.0) {
            return Err(PodiumError::Model(format!(
                "subsample must be in (0, 1], got {}",
                self.config.subsample
            )));
        }

        let n = features.len();
        self.base_score = targets.iter().sum::<f64>() / n as f64;
        self.trees.clear();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let sample_size = ((n as f64 * self.config.subsample).ceil() as usize).clamp(1, n);
        let mut predictions = vec![self.base_score; n];

        for round in 0..self.config.n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(y, p)| y - p)
                .collect();

            let mut rows: Vec<usize> = (0..n).collect();
            if sample_size < n {
                rows.shuffle(&mut rng);
                rows.truncate(sample_size);
                rows.sort_unstable();
            }

            let tree = self.build_tree(features, &residuals, &rows, 0);
            for (p, x) in predictions.iter_mut().zip(features) {
                *p += self.config.learning_rate * tree.predict(x);
            }
            self.trees.push(tree);

            if round % 50 == 0 || round + 1 == self.config.n_estimators {
                let mse = targets
                    .iter()
                    .zip(&predictions)
                    .map(|(y, p)| (y - p).powi(2))
                    .sum::<f64>()
                    / n as f64;
                log::debug!("Tree {}/{}: train mse={:.4}", round + 1, self.config.n_estimators, mse);
            }
        }

        log::info!(
            "Fitted {} trees on {} rows (base score {:.2})",
            self.trees.len(),
            n,
            self.base_score
        );
        Ok(())
    }

    fn predict(&self, features: &[FeatureRow]) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(PodiumError::NotFitted);
        }
        Ok(features.iter().map(|x| self.raw_predict(x)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_rows(n: usize) -> (Vec<FeatureRow>, Vec<f64>) {
        let x = (1..=n).map(|g| [g as f64, 0.1 * g as f64, 0.5, 1.0]).collect();
        let y = (1..=n).map(|g| g as f64).collect();
        (x, y)
    }

    #[test]
    fn test_predict_before_fit() {
        let model = BoostedTrees::new(BoostedTreesConfig::default());
        assert!(matches!(model.predict(&[[1.0, 0.0, 0.0, 1.0]]), Err(PodiumError::NotFitted)));
    }

    #[test]
    fn test_learns_monotone_relationship() {
        let (x, y) = grid_rows(10);
        let mut model = BoostedTrees::new(BoostedTreesConfig::default());
        model.fit(&x, &y).unwrap();

        // Within half a place of every target, so the order is recovered
        let preds = model.predict(&x).unwrap();
        for (p, t) in preds.iter().zip(&y) {
            assert!((p - t).abs() < 0.5, "prediction {} for target {}", p, t);
        }
        assert_eq!(model.n_trees(), 150);
        assert!(model.max_depth() <= 3);
    }

    #[test]
    fn test_constant_target_gives_constant_prediction() {
        let x = vec![[1.0, 0.0, 0.0, 1.0], [2.0, 0.3, 0.1, 0.5], [3.0, 0.6, 0.2, 0.2]];
        let y = vec![4.0, 4.0, 4.0];
        let mut model = BoostedTrees::new(BoostedTreesConfig::default());
        model.fit(&x, &y).unwrap();

        for p in model.predict(&x).unwrap() {
            assert!((p - 4.0).abs() < 1e-9);
        }
        assert_eq!(model.max_depth(), 0);
    }

    #[test]
    fn test_more_trees_fit_closer() {
        let (x, y) = grid_rows(8);
        let mse = |n_estimators| {
            let mut model = BoostedTrees::new(BoostedTreesConfig {
                n_estimators,
                ..BoostedTreesConfig::default()
            });
            model.fit(&x, &y).unwrap();
            let preds = model.predict(&x).unwrap();
            preds.iter().zip(&y).map(|(p, t)| (p - t).powi(2)).sum::<f64>()
        };
        assert!(mse(150) < mse(10));
    }

    #[test]
    fn test_subsample_is_seeded() {
        let (x, y) = grid_rows(12);
        let config = BoostedTreesConfig {
            subsample: 0.5,
            ..BoostedTreesConfig::default()
        };

        let mut a = BoostedTrees::new(config.clone());
        let mut b = BoostedTrees::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_rejects_bad_subsample() {
        let (x, y) = grid_rows(3);
        let mut model = BoostedTrees::new(BoostedTreesConfig {
            subsample: 0.0,
            ..BoostedTreesConfig::default()
        });
        assert!(model.fit(&x, &y).is_err());
    }
}
