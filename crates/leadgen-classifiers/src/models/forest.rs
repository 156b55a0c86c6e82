use anyhow::{anyhow, bail, Context, Result};
use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ForestConfig;
use crate::models::classifier_trait::ClassifierModel;

/// Bagged CART classifier: one Gini tree per bootstrap sample, majority vote.
///
/// Bagging only. `linfa-trees` considers every feature at every split, so
/// unlike a max_features="sqrt" random forest there is no per-split feature
/// subsampling and tree diversity comes from the bootstrap samples alone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestConfig,
    trees: Vec<DecisionTree<f64, usize>>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(params: ForestConfig) -> Self {
        RandomForest {
            params,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &ForestConfig {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Mean impurity decrease per feature, averaged over trees and
    /// normalized to sum to one. Empty when the forest is not fitted.
    pub fn feature_importances(&self) -> Vec<f64> {
        if self.trees.is_empty() {
            return Vec::new();
        }
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            let importances = tree.feature_importance();
            let sum: f64 = importances.iter().filter(|v| v.is_finite()).sum();
            if sum <= 0.0 {
                continue;
            }
            for (acc, v) in total.iter_mut().zip(importances) {
                if v.is_finite() {
                    *acc += v / sum;
                }
            }
        }
        let norm: f64 = total.iter().sum();
        if norm > 0.0 {
            total.iter_mut().for_each(|v| *v /= norm);
        }
        total
    }

    fn fit_tree(&self, x: &Array2<f64>, y: &[usize], seed: u64) -> Result<DecisionTree<f64, usize>> {
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(seed);
        let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

        let records = x.select(Axis(0), &sample);
        let targets = Array1::from_iter(sample.iter().map(|&i| y[i]));
        let dataset = Dataset::new(records, targets);

        DecisionTree::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(self.params.max_depth)
            .min_weight_split(self.params.min_weight_split)
            .min_weight_leaf(self.params.min_weight_leaf)
            .fit(&dataset)
            .map_err(|e| anyhow!("Failed to fit decision tree: {}", e))
    }
}

impl ClassifierModel for RandomForest {
    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        _x_eval: Option<&Array2<f64>>,
        _y_eval: Option<&[usize]>,
    ) -> Result<()> {
        if x.nrows() == 0 {
            bail!("Cannot fit a random forest on an empty training set");
        }
        if x.nrows() != y.len() {
            bail!("{} training rows but {} labels", x.nrows(), y.len());
        }
        if self.params.n_estimators == 0 {
            bail!("n_estimators must be at least 1");
        }

        let base_seed = self.params.seed;
        let trees = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|i| self.fit_tree(x, y, base_seed.wrapping_add(i as u64)))
            .collect::<Result<Vec<_>>>()
            .context("Random forest training failed")?;

        log::debug!(
            "Fitted {} trees on {} rows x {} features",
            trees.len(),
            x.nrows(),
            x.ncols()
        );
        self.trees = trees;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            bail!("Random forest is not fitted");
        }
        if x.ncols() != self.n_features {
            bail!(
                "Expected {} features, got {}",
                self.n_features,
                x.ncols()
            );
        }
        let votes: Vec<Array1<usize>> = self.trees.par_iter().map(|tree| tree.predict(x)).collect();

        let mut positive = vec![0usize; x.nrows()];
        for labels in &votes {
            for (acc, &label) in positive.iter_mut().zip(labels.iter()) {
                *acc += usize::from(label == 1);
            }
        }
        let n_trees = self.trees.len() as f64;
        Ok(positive.into_iter().map(|v| v as f64 / n_trees).collect())
    }

    fn name(&self) -> &str {
        "random_forest"
    }
}
