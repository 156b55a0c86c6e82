//! Binary classification metrics.
use anyhow::{bail, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::models::classifier_trait::ClassifierModel;

/// Metrics snapshot computed once on the held-out split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Accuracy, precision, recall and F1 with zero-division mapped to 0, and
/// ROC-AUC over the positive-class probabilities.
pub fn classification_metrics(y_true: &[usize], y_pred: &[usize], proba: &[f64]) -> Result<ClassificationMetrics> {
    if y_true.is_empty() {
        bail!("Cannot compute metrics on an empty evaluation set");
    }
    if y_true.len() != y_pred.len() || y_true.len() != proba.len() {
        bail!(
            "Length mismatch: {} labels, {} predictions, {} probabilities",
            y_true.len(),
            y_pred.len(),
            proba.len()
        );
    }

    let (mut tp, mut fp, mut fn_, mut correct) = (0usize, 0usize, 0usize, 0usize);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == 1, p == 1) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
        if t == p {
            correct += 1;
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(ClassificationMetrics {
        accuracy: ratio(correct, y_true.len()),
        precision,
        recall,
        f1,
        roc_auc: roc_auc(y_true, proba),
    })
}

/// Rank-based ROC-AUC (Mann-Whitney U) with averaged ranks for ties.
///
/// Undefined for single-class ground truth; returns 0.5 with a warning.
pub fn roc_auc(y_true: &[usize], scores: &[f64]) -> f64 {
    let n_pos = y_true.iter().filter(|&&t| t == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        log::warn!("ROC-AUC is undefined with a single class in the ground truth; using 0.5");
        return 0.5;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based average rank of the tie group i..=j
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(t, _)| **t == 1)
        .map(|(_, r)| *r)
        .sum();
    let n_pos = n_pos as f64;
    (pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64)
}

pub fn evaluate_classifier<M: ClassifierModel + ?Sized>(
    model: &M,
    x: &Array2<f64>,
    y: &[usize],
) -> Result<ClassificationMetrics> {
    let proba = model.predict_proba(x)?;
    let pred: Vec<usize> = proba.iter().map(|&p| usize::from(p > 0.5)).collect();
    classification_metrics(y, &pred, &proba)
}
