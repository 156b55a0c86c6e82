//! The attention-model scoring wrapper. Always trained on the lead scoring
//! dataset and kept in memory only.
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use leadgen_classifiers::config::ModelType;
use leadgen_classifiers::data_handling::{
    train_test_split, Column, DatasetAdapter, DatasetSplit, DatasetVariant, Frame, LeadRecord,
};
use leadgen_classifiers::error::ModelError;
use leadgen_classifiers::models::classifier_trait::ClassifierModel;
use leadgen_classifiers::preprocessing::{CategoryCodes, Scaler};
use leadgen_classifiers::scoring::{LeadScorer, LeadStatus, ScoredLead};
use leadgen_classifiers::stats::{classification_metrics, ClassificationMetrics};
use leadgen_classifiers::transform::transform_request;
use ndarray::Array2;

use crate::config::AttentionConfig;
use crate::models::tabnet_model::TabAttentionNet;
use crate::utils::stats::TrainingHistory;

struct Encoders {
    categorical_columns: Vec<String>,
    numeric_columns: Vec<String>,
    codes: CategoryCodes,
    scaler: Scaler,
}

impl Encoders {
    fn fit(split: &DatasetSplit) -> Result<Self> {
        let frame = &split.train.features;
        Ok(Encoders {
            categorical_columns: split.categorical_columns.clone(),
            numeric_columns: split.numeric_columns.clone(),
            codes: CategoryCodes::fit(frame, &split.categorical_columns)?,
            scaler: Scaler::fit(frame, &split.numeric_columns)?,
        })
    }

    /// `[codes..., standardized numerics...]` per row.
    fn encode(&self, frame: &Frame) -> Result<Array2<f64>> {
        let n_cat = self.categorical_columns.len();
        let mut x = Array2::<f64>::zeros((frame.nrows(), n_cat + self.numeric_columns.len()));
        for (row, codes) in self.codes.transform(frame)?.into_iter().enumerate() {
            for (j, code) in codes.into_iter().enumerate() {
                x[(row, j)] = f64::from(code);
            }
        }
        for (j, name) in self.numeric_columns.iter().enumerate() {
            for (row, &v) in frame.numeric(name)?.iter().enumerate() {
                x[(row, n_cat + j)] = self.scaler.scale(j, v);
            }
        }
        Ok(x)
    }
}

pub struct AttentionClassifier {
    config: AttentionConfig,
    encoders: Option<Encoders>,
    net: Option<TabAttentionNet>,
    metrics: Option<ClassificationMetrics>,
}

impl AttentionClassifier {
    pub const VARIANT: DatasetVariant = DatasetVariant::LeadScoring;

    pub fn new(config: AttentionConfig) -> Self {
        AttentionClassifier {
            config,
            encoders: None,
            net: None,
            metrics: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.net.is_some()
    }

    pub fn history(&self) -> Option<&TrainingHistory> {
        self.net.as_ref().map(TabAttentionNet::history)
    }

    pub fn train<P: AsRef<Path>>(&mut self, data_dir: P) -> Result<ClassificationMetrics> {
        let split = DatasetAdapter::new(Self::VARIANT, data_dir).load_and_prepare()?;
        self.train_on_split(&split)
    }

    /// Fit the encoders and network on `split.train`, holding out a seeded
    /// validation share for early stopping, then evaluate on `split.test`.
    pub fn train_on_split(&mut self, split: &DatasetSplit) -> Result<ClassificationMetrics> {
        let encoders = Encoders::fit(split).context("Failed to fit attention encoders")?;
        let x = encoders.encode(&split.train.features)?;
        let y = &split.train.target;

        let (fit_rows, val_rows) =
            train_test_split(y.len(), self.config.validation_fraction, self.config.seed);
        let (fit_rows, val_rows) = if fit_rows.is_empty() {
            (val_rows, Vec::new())
        } else {
            (fit_rows, val_rows)
        };
        let x_fit = x.select(ndarray::Axis(0), &fit_rows);
        let y_fit: Vec<usize> = fit_rows.iter().map(|&i| y[i]).collect();
        let x_val = x.select(ndarray::Axis(0), &val_rows);
        let y_val: Vec<usize> = val_rows.iter().map(|&i| y[i]).collect();

        let mut net = TabAttentionNet::new(
            encoders.codes.cardinalities(),
            encoders.numeric_columns.len(),
            self.config.clone(),
        )?;
        net.fit(&x_fit, &y_fit, Some(&x_val), Some(&y_val))
            .context("Attention network training failed")?;

        let best_validation = net.history().best_accuracy();
        self.encoders = Some(encoders);
        self.net = Some(net);

        let metrics = self.evaluate(&split.test.features, &split.test.target)?;
        match best_validation {
            Some(val) => log::info!(
                "Attention model trained: validation accuracy {:.4}, test accuracy {:.4}, roc_auc {:.4}",
                val,
                metrics.accuracy,
                metrics.roc_auc
            ),
            None => log::info!(
                "Attention model trained without validation rows: test accuracy {:.4}, roc_auc {:.4}",
                metrics.accuracy,
                metrics.roc_auc
            ),
        }
        Ok(metrics)
    }

    fn fitted(&self) -> Result<(&Encoders, &TabAttentionNet), ModelError> {
        match (&self.encoders, &self.net) {
            (Some(e), Some(n)) => Ok((e, n)),
            _ => Err(ModelError::Unavailable("lead_scoring transformer".to_string())),
        }
    }

    pub fn evaluate(&mut self, features: &Frame, labels: &[usize]) -> Result<ClassificationMetrics> {
        let (encoders, net) = self.fitted()?;
        let x = encoders.encode(features)?;
        let proba = net.predict_proba(&x)?;
        let pred: Vec<usize> = proba.iter().map(|&p| usize::from(p > 0.5)).collect();
        let metrics = classification_metrics(labels, &pred, &proba)?;
        self.metrics = Some(metrics);
        Ok(metrics)
    }

    pub fn predict_record(&self, record: &LeadRecord) -> Result<ScoredLead> {
        let (encoders, net) = self.fitted()?;
        let native = transform_request(record, Self::VARIANT);
        let mut frame = Frame::from_records(
            std::slice::from_ref(&native),
            &encoders.numeric_columns,
            &encoders.categorical_columns,
        );
        // absent or unparsable numerics count as a raw 0
        for name in &encoders.numeric_columns {
            if let Some(Column::Numeric(values)) = frame.column_mut(name) {
                values.iter_mut().filter(|v| v.is_nan()).for_each(|v| *v = 0.0);
            }
        }

        let x = encoders.encode(&frame)?;
        let probability = net
            .predict_proba(&x)?
            .first()
            .copied()
            .ok_or_else(|| anyhow!("Model returned no prediction"))?;
        let label = usize::from(probability > 0.5);
        Ok(ScoredLead {
            score: label as u32,
            probability,
            status: LeadStatus::from_label(label),
        })
    }
}

impl LeadScorer for AttentionClassifier {
    fn kind(&self) -> ModelType {
        ModelType::Transformer
    }

    fn variant(&self) -> DatasetVariant {
        Self::VARIANT
    }

    fn predict(&self, record: &LeadRecord) -> Result<ScoredLead> {
        self.predict_record(record)
    }

    fn metrics(&self) -> Option<&ClassificationMetrics> {
        self.metrics.as_ref()
    }
}
