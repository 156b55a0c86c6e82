//! The random-forest scoring wrapper and its fitted pipeline.
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{ForestConfig, ModelType};
use crate::data_handling::{DatasetAdapter, DatasetSplit, DatasetVariant, Frame, LeadRecord};
use crate::error::ModelError;
use crate::io::artifacts::{ArtifactStore, FeatureImportance, PipelineSidecar};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::forest::RandomForest;
use crate::preprocessing::ColumnTransformer;
use crate::scoring::{LeadScorer, LeadStatus, ScoredLead};
use crate::stats::{evaluate_classifier, ClassificationMetrics};
use crate::transform::transform_request;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Untrained,
    Trained,
    Saved,
    Loaded,
}

/// Preprocessor plus forest, bound to one variant and its fit-time columns.
/// This is the unit written to a model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub variant: DatasetVariant,
    pub categorical_columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    preprocessor: ColumnTransformer,
    forest: RandomForest,
}

impl FittedPipeline {
    pub fn fit(split: &DatasetSplit, config: &ForestConfig) -> Result<Self> {
        let preprocessor = ColumnTransformer::fit(
            &split.train.features,
            &split.numeric_columns,
            &split.categorical_columns,
        )?;
        let x = preprocessor.transform(&split.train.features)?;
        let mut forest = RandomForest::new(config.clone());
        forest.fit(&x, &split.train.target, None, None)?;
        Ok(FittedPipeline {
            variant: split.variant,
            categorical_columns: split.categorical_columns.clone(),
            numeric_columns: split.numeric_columns.clone(),
            preprocessor,
            forest,
        })
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Positive-class probabilities for every row of `frame`.
    pub fn predict_proba(&self, frame: &Frame) -> Result<Vec<f64>> {
        let x = self.preprocessor.transform(frame)?;
        self.forest.predict_proba(&x)
    }

    pub fn evaluate(&self, frame: &Frame, labels: &[usize]) -> Result<ClassificationMetrics> {
        let x = self.preprocessor.transform(frame)?;
        evaluate_classifier(&self.forest, &x, labels)
    }

    /// Reject an artifact whose forest width disagrees with its preprocessor,
    /// or whose columns disagree with the sidecar written for the same
    /// variant. A sidecar for the other variant is not evidence either way.
    fn check_against(&self, store: &ArtifactStore) -> Result<()> {
        let expected = self.preprocessor.n_features();
        if self.forest.n_features() != expected {
            return Err(ModelError::ArtifactLoad(format!(
                "forest expects {} features but the preprocessor produces {}",
                self.forest.n_features(),
                expected
            ))
            .into());
        }

        let sidecar = match store.read_sidecar() {
            Ok(Some(sidecar)) => sidecar,
            Ok(None) => return Ok(()),
            Err(e) => {
                log::warn!("Ignoring unreadable pipeline sidecar: {:#}", e);
                return Ok(());
            }
        };
        if sidecar.dataset_type != self.variant {
            log::debug!(
                "Sidecar describes the {} model; skipping column check for {}",
                sidecar.dataset_type,
                self.variant
            );
            return Ok(());
        }
        if sidecar.cat_cols != self.categorical_columns || sidecar.num_cols != self.numeric_columns {
            return Err(ModelError::ArtifactLoad(format!(
                "{} artifact columns do not match {}",
                self.variant,
                store.sidecar_path().display()
            ))
            .into());
        }
        Ok(())
    }

    /// Importance table sorted by descending importance, or `None` when the
    /// preprocessor's names do not line up with the forest's features.
    pub fn feature_importance(&self) -> Option<Vec<FeatureImportance>> {
        let names = self.feature_names();
        let importances = self.forest.feature_importances();
        if names.len() != importances.len() {
            return None;
        }
        let mut rows: Vec<FeatureImportance> = names
            .into_iter()
            .zip(importances)
            .map(|(feature, importance)| FeatureImportance { feature, importance })
            .collect();
        rows.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Some(rows)
    }
}

/// Random-forest lead scorer for one dataset variant.
pub struct EnsembleModel {
    variant: DatasetVariant,
    store: ArtifactStore,
    config: ForestConfig,
    pipeline: Option<FittedPipeline>,
    metrics: Option<ClassificationMetrics>,
    state: ModelState,
}

impl EnsembleModel {
    pub fn new(variant: DatasetVariant, store: ArtifactStore, config: ForestConfig) -> Self {
        EnsembleModel {
            variant,
            store,
            config,
            pipeline: None,
            metrics: None,
            state: ModelState::Untrained,
        }
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn pipeline(&self) -> Option<&FittedPipeline> {
        self.pipeline.as_ref()
    }

    pub fn categorical_columns(&self) -> &[String] {
        self.pipeline.as_ref().map(|p| p.categorical_columns.as_slice()).unwrap_or_default()
    }

    pub fn numeric_columns(&self) -> &[String] {
        self.pipeline.as_ref().map(|p| p.numeric_columns.as_slice()).unwrap_or_default()
    }

    fn fitted(&self) -> Result<&FittedPipeline, ModelError> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| ModelError::Unavailable(format!("{} random forest", self.variant)))
    }

    /// Train on the variant's source file in the data directory.
    pub fn train(&mut self) -> Result<ClassificationMetrics> {
        let split = DatasetAdapter::new(self.variant, self.store.data_dir()).load_and_prepare()?;
        self.train_on_split(&split)
    }

    /// Fit, persist the importance table, then evaluate on the held-out rows.
    pub fn train_on_split(&mut self, split: &DatasetSplit) -> Result<ClassificationMetrics> {
        log::info!(
            "Training {} random forest ({} trees) on {} rows",
            self.variant,
            self.config.n_estimators,
            split.train.len()
        );
        let pipeline = FittedPipeline::fit(split, &self.config)
            .with_context(|| format!("Failed to train {} random forest", self.variant))?;

        match pipeline.feature_importance() {
            Some(rows) => {
                let path = self.store.write_feature_importance(self.variant, &rows)?;
                log::info!("Feature importance written to {}", path.display());
            }
            None => log::warn!("Feature names do not match importances; skipping importance table"),
        }

        self.variant = split.variant;
        self.pipeline = Some(pipeline);
        self.state = ModelState::Trained;

        let metrics = self.evaluate(&split.test.features, &split.test.target)?;
        log::info!(
            "{} random forest trained: accuracy {:.4}, roc_auc {:.4}",
            self.variant,
            metrics.accuracy,
            metrics.roc_auc
        );
        Ok(metrics)
    }

    /// Score the held-out rows and persist the snapshot.
    pub fn evaluate(&mut self, features: &Frame, labels: &[usize]) -> Result<ClassificationMetrics> {
        let metrics = self.fitted()?.evaluate(features, labels)?;
        self.store.write_metrics(self.variant, &metrics)?;
        self.metrics = Some(metrics);
        Ok(metrics)
    }

    /// Write the pipeline artifact and the shared column sidecar.
    pub fn save(&mut self, filename: Option<&str>) -> Result<PathBuf> {
        let pipeline = self.fitted()?;
        self.store.ensure_dir()?;
        let path = match filename {
            Some(name) => self.store.resolve(name),
            None => self.store.model_path(self.variant),
        };

        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        bincode::serialize_into(BufWriter::new(file), pipeline)
            .with_context(|| format!("Failed to write model to {}", path.display()))?;

        self.store.write_sidecar(&PipelineSidecar {
            dataset_type: pipeline.variant,
            cat_cols: pipeline.categorical_columns.clone(),
            num_cols: pipeline.numeric_columns.clone(),
        })?;

        log::info!("Model saved to {}", path.display());
        self.state = ModelState::Saved;
        Ok(path)
    }

    /// Restore a saved pipeline. The artifact's own variant wins over the
    /// requested one.
    pub fn load(
        variant: DatasetVariant,
        store: ArtifactStore,
        config: ForestConfig,
        filename: Option<&str>,
    ) -> Result<Self> {
        let path = match filename {
            Some(name) => store.resolve(name),
            None => store.model_path(variant),
        };
        if !path.exists() {
            return Err(ModelError::ArtifactNotFound(path).into());
        }

        let file = File::open(&path).map_err(|e| ModelError::ArtifactLoad(e.to_string()))?;
        let pipeline: FittedPipeline = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| ModelError::ArtifactLoad(format!("{}: {}", path.display(), e)))?;
        if pipeline.variant != variant {
            log::warn!(
                "Artifact {} holds a {} model, expected {}",
                path.display(),
                pipeline.variant,
                variant
            );
        }

        pipeline.check_against(&store)?;

        let variant = pipeline.variant;
        let metrics = match store.read_metrics(variant) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Ignoring unreadable metrics for {}: {:#}", variant, e);
                None
            }
        };
        log::info!("Model loaded from {}", path.display());

        Ok(EnsembleModel {
            variant,
            store,
            config,
            pipeline: Some(pipeline),
            metrics,
            state: ModelState::Loaded,
        })
    }

    pub fn predict_record(&self, record: &LeadRecord) -> Result<ScoredLead> {
        let pipeline = self.fitted()?;
        let native = transform_request(record, pipeline.variant);
        let frame = Frame::from_records(
            std::slice::from_ref(&native),
            &pipeline.numeric_columns,
            &pipeline.categorical_columns,
        );
        let probability = pipeline
            .predict_proba(&frame)?
            .first()
            .copied()
            .ok_or_else(|| anyhow!("Model returned no prediction"))?;
        let label = u32::from(probability > 0.5);
        Ok(ScoredLead {
            score: label * 100,
            probability,
            status: LeadStatus::from_probability(probability),
        })
    }
}

impl LeadScorer for EnsembleModel {
    fn kind(&self) -> ModelType {
        ModelType::RandomForest
    }

    fn variant(&self) -> DatasetVariant {
        self.variant
    }

    fn predict(&self, record: &LeadRecord) -> Result<ScoredLead> {
        self.predict_record(record)
    }

    fn metrics(&self) -> Option<&ClassificationMetrics> {
        self.metrics.as_ref()
    }
}
