//! On-disk layout of models, metrics and feature-importance tables.
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data_handling::DatasetVariant;
use crate::stats::ClassificationMetrics;

pub const CONFIG_SIDECAR_FILE: &str = "lead_scoring_model_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Column lists of the last saved ensemble, written next to the model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSidecar {
    pub dataset_type: DatasetVariant,
    pub cat_cols: Vec<String>,
    pub num_cols: Vec<String>,
}

/// Flat-file store rooted at the service data directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    data_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        ArtifactStore {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create data directory {}", self.data_dir.display()))
    }

    /// Relative names resolve inside the data directory; absolute paths pass through.
    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    pub fn model_file(variant: DatasetVariant) -> &'static str {
        match variant {
            DatasetVariant::Bank => "lead_scoring_model.bin",
            DatasetVariant::LeadScoring => "lead_scoring_custom_model.bin",
        }
    }

    pub fn metrics_file(variant: DatasetVariant) -> &'static str {
        match variant {
            DatasetVariant::Bank => "model_metrics.json",
            DatasetVariant::LeadScoring => "lead_scoring_model_metrics.json",
        }
    }

    pub fn importance_file(variant: DatasetVariant) -> &'static str {
        match variant {
            DatasetVariant::Bank => "feature_importance.csv",
            DatasetVariant::LeadScoring => "lead_scoring_feature_importance.csv",
        }
    }

    pub fn source_path(&self, variant: DatasetVariant) -> PathBuf {
        self.data_dir.join(variant.source_file())
    }

    pub fn model_path(&self, variant: DatasetVariant) -> PathBuf {
        self.data_dir.join(Self::model_file(variant))
    }

    pub fn metrics_path(&self, variant: DatasetVariant) -> PathBuf {
        self.data_dir.join(Self::metrics_file(variant))
    }

    pub fn importance_path(&self, variant: DatasetVariant) -> PathBuf {
        self.data_dir.join(Self::importance_file(variant))
    }

    pub fn sidecar_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_SIDECAR_FILE)
    }

    pub fn write_metrics(&self, variant: DatasetVariant, metrics: &ClassificationMetrics) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.metrics_path(variant);
        write_json(&path, metrics)?;
        Ok(path)
    }

    /// `Ok(None)` when no metrics were persisted for the variant.
    pub fn read_metrics(&self, variant: DatasetVariant) -> Result<Option<ClassificationMetrics>> {
        let path = self.metrics_path(variant);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn write_feature_importance(&self, variant: DatasetVariant, rows: &[FeatureImportance]) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.importance_path(variant);
        let mut wtr = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(path)
    }

    /// `Ok(None)` when the table does not exist; an unreadable table is an error.
    pub fn read_feature_importance(&self, variant: DatasetVariant) -> Result<Option<Vec<FeatureImportance>>> {
        let path = self.importance_path(variant);
        if !path.exists() {
            return Ok(None);
        }
        let mut rdr = csv::Reader::from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let rows = rdr
            .deserialize()
            .collect::<Result<Vec<FeatureImportance>, _>>()
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(rows))
    }

    pub fn write_sidecar(&self, sidecar: &PipelineSidecar) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.sidecar_path();
        write_json(&path, sidecar)?;
        Ok(path)
    }

    pub fn read_sidecar(&self) -> Result<Option<PipelineSidecar>> {
        let path = self.sidecar_path();
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_and_importance_roundtrip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(store.read_metrics(DatasetVariant::Bank).unwrap().is_none());

        let metrics = ClassificationMetrics {
            accuracy: 0.9,
            precision: 0.8,
            recall: 0.7,
            f1: 0.75,
            roc_auc: 0.85,
        };
        store.write_metrics(DatasetVariant::Bank, &metrics).unwrap();
        assert_eq!(store.read_metrics(DatasetVariant::Bank).unwrap(), Some(metrics));
        assert!(store.read_metrics(DatasetVariant::LeadScoring).unwrap().is_none());

        let rows = vec![
            FeatureImportance { feature: "duration".into(), importance: 0.6 },
            FeatureImportance { feature: "job_admin.".into(), importance: 0.4 },
        ];
        store.write_feature_importance(DatasetVariant::LeadScoring, &rows).unwrap();
        let text = fs::read_to_string(store.importance_path(DatasetVariant::LeadScoring)).unwrap();
        assert!(text.starts_with("feature,importance"));
        assert_eq!(
            store.read_feature_importance(DatasetVariant::LeadScoring).unwrap(),
            Some(rows)
        );
    }

    #[test]
    fn broken_importance_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        fs::write(store.importance_path(DatasetVariant::Bank), "feature,importance\nx,not-a-number\n").unwrap();
        assert!(store.read_feature_importance(DatasetVariant::Bank).is_err());
    }
}
