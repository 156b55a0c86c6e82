//! Lead records, dataset variants and the column-oriented frames fed to the
//! preprocessing stage.
//!
//! `DatasetAdapter` turns one of the two source CSVs into a deterministic
//! train/test split, applying the variant-specific target mapping, dropped
//! columns and imputation.
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::io::dataset_csv::read_frame;
use crate::transform;

/// Seed of the 80/20 train/test split.
pub const SPLIT_SEED: u64 = 42;
pub const TEST_FRACTION: f64 = 0.2;

/// A scalar value of a lead record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value; text is parsed leniently.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) if v.is_finite() => Some(*v),
            FieldValue::Float(_) => None,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Categorical view of the value.
    pub fn as_category(&self) -> String {
        match self {
            FieldValue::Integer(v) => v.to_string(),
            FieldValue::Float(v) => v.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

/// A partially populated lead: field name to scalar.
///
/// Deserializing drops `null` fields, so "absent" and "null" are the same.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Option<FieldValue>>")]
pub struct LeadRecord(BTreeMap<String, FieldValue>);

impl From<BTreeMap<String, Option<FieldValue>>> for LeadRecord {
    fn from(map: BTreeMap<String, Option<FieldValue>>) -> Self {
        LeadRecord(map.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))).collect())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for LeadRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        LeadRecord(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl LeadRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// The two supported training datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetVariant {
    Bank,
    LeadScoring,
}

impl DatasetVariant {
    pub const ALL: [DatasetVariant; 2] = [DatasetVariant::Bank, DatasetVariant::LeadScoring];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetVariant::Bank => "bank",
            DatasetVariant::LeadScoring => "lead_scoring",
        }
    }

    pub fn source_file(&self) -> &'static str {
        match self {
            DatasetVariant::Bank => "bank-additional-full.csv",
            DatasetVariant::LeadScoring => "Lead Scoring.csv",
        }
    }

    pub fn delimiter(&self) -> u8 {
        match self {
            DatasetVariant::Bank => b';',
            DatasetVariant::LeadScoring => b',',
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            DatasetVariant::Bank => "y",
            DatasetVariant::LeadScoring => "Converted",
        }
    }

    /// Identifier columns removed before modelling.
    pub fn dropped_columns(&self) -> &'static [&'static str] {
        match self {
            DatasetVariant::Bank => &[],
            DatasetVariant::LeadScoring => &["Prospect ID", "Lead Number"],
        }
    }

    /// Columns whose missing cells become 0 before the generic imputation.
    pub fn zero_filled_columns(&self) -> &'static [&'static str] {
        match self {
            DatasetVariant::Bank => &[],
            DatasetVariant::LeadScoring => {
                &["TotalVisits", "Total Time Spent on Website", "Page Views Per Visit"]
            }
        }
    }

    /// Lenient request selector: `lead_scoring` in any case, otherwise bank.
    pub fn from_selector(s: &str) -> Self {
        s.parse().unwrap_or(DatasetVariant::Bank)
    }
}

impl fmt::Display for DatasetVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetVariant {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bank" => Ok(DatasetVariant::Bank),
            "lead_scoring" => Ok(DatasetVariant::LeadScoring),
            other => Err(ModelError::UnknownVariant(other.to_string())),
        }
    }
}

/// One column of a frame. Missing numeric cells are NaN.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Categorical(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Numeric(_))
    }

    fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Numeric(v) => Column::Numeric(rows.iter().map(|&i| v[i]).collect()),
            Column::Categorical(v) => Column::Categorical(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// Named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Column>,
    nrows: usize,
}

impl Frame {
    pub fn new(names: Vec<String>, columns: Vec<Column>) -> Result<Self> {
        if names.len() != columns.len() {
            bail!("{} column names for {} columns", names.len(), columns.len());
        }
        let nrows = columns.first().map(Column::len).unwrap_or(0);
        if let Some((name, col)) = names.iter().zip(&columns).find(|(_, c)| c.len() != nrows) {
            bail!("column '{}' has {} rows, expected {}", name, col.len(), nrows);
        }
        Ok(Frame { names, columns, nrows })
    }

    /// Build a frame from records, taking exactly the given columns.
    ///
    /// Absent or unparsable numeric values become NaN; absent categorical
    /// values become `None`.
    pub fn from_records(records: &[LeadRecord], numeric: &[String], categorical: &[String]) -> Self {
        let mut names = Vec::with_capacity(numeric.len() + categorical.len());
        let mut columns = Vec::with_capacity(numeric.len() + categorical.len());
        for name in numeric {
            let values = records
                .iter()
                .map(|r| r.get(name).and_then(FieldValue::as_f64).unwrap_or(f64::NAN))
                .collect();
            names.push(name.clone());
            columns.push(Column::Numeric(values));
        }
        for name in categorical {
            let values = records
                .iter()
                .map(|r| r.get(name).map(FieldValue::as_category))
                .collect();
            names.push(name.clone());
            columns.push(Column::Categorical(values));
        }
        Frame {
            names,
            columns,
            nrows: records.len(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.position(name).map(move |i| &mut self.columns[i])
    }

    pub fn numeric(&self, name: &str) -> Result<&[f64]> {
        match self.column(name) {
            Some(Column::Numeric(v)) => Ok(v),
            Some(Column::Categorical(_)) => bail!("column '{}' is not numeric", name),
            None => bail!("missing column '{}'", name),
        }
    }

    pub fn categorical(&self, name: &str) -> Result<&[Option<String>]> {
        match self.column(name) {
            Some(Column::Categorical(v)) => Ok(v),
            Some(Column::Numeric(_)) => bail!("column '{}' is not categorical", name),
            None => bail!("missing column '{}'", name),
        }
    }

    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.position(name)?;
        self.names.remove(idx);
        Some(self.columns.remove(idx))
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.iter().filter(|(_, c)| c.is_numeric()).map(|(n, _)| n.to_string()).collect()
    }

    pub fn categorical_columns(&self) -> Vec<String> {
        self.iter().filter(|(_, c)| !c.is_numeric()).map(|(n, _)| n.to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    pub fn take_rows(&self, rows: &[usize]) -> Frame {
        Frame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            nrows: rows.len(),
        }
    }
}

/// A feature frame with its 0/1 targets.
#[derive(Debug, Clone)]
pub struct LabeledFrame {
    pub features: Frame,
    pub target: Vec<usize>,
}

impl LabeledFrame {
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn take_rows(&self, rows: &[usize]) -> LabeledFrame {
        LabeledFrame {
            features: self.features.take_rows(rows),
            target: rows.iter().map(|&i| self.target[i]).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub variant: DatasetVariant,
    pub train: LabeledFrame,
    pub test: LabeledFrame,
    pub categorical_columns: Vec<String>,
    pub numeric_columns: Vec<String>,
}

/// Shuffle `0..n` with a seeded RNG; the first `ceil(test_fraction * n)`
/// indices are the test rows. Returns `(train, test)`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let n_test = ((test_fraction * n as f64).ceil() as usize).min(n);
    let train = indices.split_off(n_test);
    (train, indices)
}

/// Loads a variant's source CSV and prepares a train/test split.
#[derive(Debug, Clone)]
pub struct DatasetAdapter {
    variant: DatasetVariant,
    source: PathBuf,
    test_fraction: f64,
    seed: u64,
}

impl DatasetAdapter {
    pub fn new<P: AsRef<Path>>(variant: DatasetVariant, data_dir: P) -> Self {
        DatasetAdapter {
            variant,
            source: data_dir.as_ref().join(variant.source_file()),
            test_fraction: TEST_FRACTION,
            seed: SPLIT_SEED,
        }
    }

    /// Read from an explicit file instead of the variant's default name.
    pub fn with_source<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.source = path.into();
        self
    }

    pub fn variant(&self) -> DatasetVariant {
        self.variant
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn load_and_prepare(&self) -> Result<DatasetSplit> {
        log::info!(
            "Loading {} dataset from {}",
            self.variant,
            self.source.display()
        );
        let frame = read_frame(&self.source, self.variant.delimiter())
            .with_context(|| format!("Failed to load {} dataset", self.variant))?;

        let (features, target) = match self.variant {
            DatasetVariant::Bank => prepare_bank(frame)?,
            DatasetVariant::LeadScoring => prepare_lead_scoring(frame)?,
        };
        if target.is_empty() {
            bail!(ModelError::InvalidData(format!("{} dataset has no rows", self.variant)));
        }

        let categorical_columns = features.categorical_columns();
        let numeric_columns = features.numeric_columns();
        let data = LabeledFrame { features, target };

        let (train_idx, test_idx) = train_test_split(data.len(), self.test_fraction, self.seed);
        let split = DatasetSplit {
            variant: self.variant,
            train: data.take_rows(&train_idx),
            test: data.take_rows(&test_idx),
            categorical_columns,
            numeric_columns,
        };

        log::info!(
            "{} dataset: {} train rows, {} test rows, {} categorical / {} numeric columns",
            self.variant,
            split.train.len(),
            split.test.len(),
            split.categorical_columns.len(),
            split.numeric_columns.len()
        );
        Ok(split)
    }

    /// Map a request record onto this variant's column names.
    pub fn transform_request(&self, record: &LeadRecord) -> LeadRecord {
        transform::transform_request(record, self.variant)
    }
}

fn take_target(frame: &mut Frame, variant: DatasetVariant) -> Result<Column> {
    frame.drop_column(variant.target_column()).ok_or_else(|| {
        anyhow!(ModelError::InvalidData(format!(
            "missing target column '{}'",
            variant.target_column()
        )))
    })
}

fn prepare_bank(mut frame: Frame) -> Result<(Frame, Vec<usize>)> {
    let target = match take_target(&mut frame, DatasetVariant::Bank)? {
        Column::Categorical(values) => values
            .iter()
            .enumerate()
            .map(|(row, v)| match v.as_deref() {
                Some("yes") => Ok(1),
                Some("no") => Ok(0),
                other => Err(anyhow!(ModelError::InvalidData(format!(
                    "unexpected target value {:?} at row {}",
                    other,
                    row + 1
                )))),
            })
            .collect::<Result<Vec<_>>>()?,
        Column::Numeric(_) => bail!(ModelError::InvalidData(
            "bank target 'y' must hold yes/no values".to_string()
        )),
    };
    Ok((frame, target))
}

fn prepare_lead_scoring(mut frame: Frame) -> Result<(Frame, Vec<usize>)> {
    for name in DatasetVariant::LeadScoring.zero_filled_columns() {
        if let Some(Column::Numeric(values)) = frame.column_mut(name) {
            values.iter_mut().filter(|v| v.is_nan()).for_each(|v| *v = 0.0);
        }
    }

    let target = match take_target(&mut frame, DatasetVariant::LeadScoring)? {
        Column::Numeric(values) => values
            .iter()
            .enumerate()
            .map(|(row, &v)| {
                if v == 1.0 {
                    Ok(1)
                } else if v == 0.0 {
                    Ok(0)
                } else {
                    Err(anyhow!(ModelError::InvalidData(format!(
                        "unexpected target value {} at row {}",
                        v,
                        row + 1
                    ))))
                }
            })
            .collect::<Result<Vec<_>>>()?,
        Column::Categorical(_) => bail!(ModelError::InvalidData(
            "lead scoring target 'Converted' must be 0/1".to_string()
        )),
    };

    for name in DatasetVariant::LeadScoring.dropped_columns() {
        frame.drop_column(name);
    }

    impute(&mut frame);
    Ok((frame, target))
}

/// Fill remaining gaps: numeric with the column mean, categorical with the
/// column mode (ties go to the lexicographically smallest value).
fn impute(frame: &mut Frame) {
    for col in frame.columns.iter_mut() {
        match col {
            Column::Numeric(values) => {
                let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
                let mean = if present.is_empty() {
                    0.0
                } else {
                    present.iter().sum::<f64>() / present.len() as f64
                };
                values.iter_mut().filter(|v| v.is_nan()).for_each(|v| *v = mean);
            }
            Column::Categorical(values) => {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for v in values.iter().flatten() {
                    *counts.entry(v.as_str()).or_default() += 1;
                }
                // BTreeMap iterates in key order, so the first maximum wins ties.
                let mode = counts
                    .iter()
                    .fold(None::<(&str, usize)>, |best, (&k, &c)| match best {
                        Some((_, bc)) if bc >= c => best,
                        _ => Some((k, c)),
                    })
                    .map(|(k, _)| k.to_string());
                if let Some(mode) = mode {
                    for v in values.iter_mut().filter(|v| v.is_none()) {
                        *v = Some(mode.clone());
                    }
                }
            }
        }
    }
}
