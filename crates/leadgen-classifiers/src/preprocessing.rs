//! Column preprocessing shared by both model families.
//!
//! `Scaler` standardizes numeric columns, `OneHotEncoder` expands categorical
//! columns for the forest and `CategoryCodes` integer-codes them for the
//! embedding layers of the attention network. `ColumnTransformer` combines
//! the first two into the matrix the forest is trained on.
use anyhow::{Context, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data_handling::Frame;

/// Per-column mean/std standardization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Scaler {
    /// Population std below this is treated as a constant column.
    const MIN_STD: f64 = 1e-12;

    /// Fit on the given numeric columns, ignoring NaN cells.
    pub fn fit(frame: &Frame, columns: &[String]) -> Result<Self> {
        let mut mean = Vec::with_capacity(columns.len());
        let mut std = Vec::with_capacity(columns.len());
        for name in columns {
            let values = frame.numeric(name)?;
            let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
            let n = present.len() as f64;
            let (m, s) = if present.is_empty() {
                (0.0, 1.0)
            } else {
                let m = present.iter().sum::<f64>() / n;
                let var = present.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n;
                let s = var.sqrt();
                (m, if s < Self::MIN_STD { 1.0 } else { s })
            };
            mean.push(m);
            std.push(s);
        }
        Ok(Scaler {
            columns: columns.to_vec(),
            mean,
            std,
        })
    }

    /// Standardize one value of column `idx`. NaN maps to 0, the fit-time mean.
    pub fn scale(&self, idx: usize, value: f64) -> f64 {
        if value.is_nan() {
            0.0
        } else {
            (value - self.mean[idx]) / self.std[idx]
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// One-hot encoding with sorted categories; unknown values encode as zeros.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub columns: Vec<String>,
    pub categories: Vec<Vec<String>>,
}

fn sorted_categories(values: &[Option<String>]) -> Vec<String> {
    let mut cats: Vec<String> = values.iter().flatten().cloned().collect();
    cats.sort();
    cats.dedup();
    cats
}

impl OneHotEncoder {
    pub fn fit(frame: &Frame, columns: &[String]) -> Result<Self> {
        let categories = columns
            .iter()
            .map(|name| frame.categorical(name).map(sorted_categories))
            .collect::<Result<Vec<_>>>()?;
        Ok(OneHotEncoder {
            columns: columns.to_vec(),
            categories,
        })
    }

    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// `"{column}_{category}"` for every output slot.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(col, cats)| cats.iter().map(move |c| format!("{}_{}", col, c)))
            .collect()
    }

    /// Position of `value` inside column `idx`'s block.
    pub fn slot(&self, idx: usize, value: Option<&str>) -> Option<usize> {
        let cats = &self.categories[idx];
        value.and_then(|v| cats.binary_search_by(|c| c.as_str().cmp(v)).ok())
    }
}

/// Ordinal codes per categorical column: sorted categories map to `1..=k`,
/// code 0 is reserved for unknown or missing values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryCodes {
    pub columns: Vec<String>,
    pub categories: Vec<Vec<String>>,
}

impl CategoryCodes {
    pub const UNKNOWN: u32 = 0;

    pub fn fit(frame: &Frame, columns: &[String]) -> Result<Self> {
        let categories = columns
            .iter()
            .map(|name| frame.categorical(name).map(sorted_categories))
            .collect::<Result<Vec<_>>>()?;
        Ok(CategoryCodes {
            columns: columns.to_vec(),
            categories,
        })
    }

    pub fn code(&self, idx: usize, value: Option<&str>) -> u32 {
        let cats = &self.categories[idx];
        value
            .and_then(|v| cats.binary_search_by(|c| c.as_str().cmp(v)).ok())
            .map(|pos| pos as u32 + 1)
            .unwrap_or(Self::UNKNOWN)
    }

    /// Embedding table sizes, including the reserved unknown slot.
    pub fn cardinalities(&self) -> Vec<usize> {
        self.categories.iter().map(|c| c.len() + 1).collect()
    }

    /// Code every row of `frame`; the result is row-major, one entry per column.
    pub fn transform(&self, frame: &Frame) -> Result<Vec<Vec<u32>>> {
        let mut rows = vec![Vec::with_capacity(self.columns.len()); frame.nrows()];
        for (idx, name) in self.columns.iter().enumerate() {
            let values = frame
                .categorical(name)
                .with_context(|| format!("Failed to encode column '{}'", name))?;
            for (row, v) in rows.iter_mut().zip(values) {
                row.push(self.code(idx, v.as_deref()));
            }
        }
        Ok(rows)
    }
}

/// Standardized numeric columns followed by one-hot categorical blocks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub scaler: Scaler,
    pub encoder: OneHotEncoder,
}

impl ColumnTransformer {
    pub fn fit(frame: &Frame, numeric: &[String], categorical: &[String]) -> Result<Self> {
        Ok(ColumnTransformer {
            scaler: Scaler::fit(frame, numeric).context("Failed to fit numeric scaler")?,
            encoder: OneHotEncoder::fit(frame, categorical)
                .context("Failed to fit one-hot encoder")?,
        })
    }

    pub fn n_features(&self) -> usize {
        self.scaler.width() + self.encoder.width()
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.scaler.columns.clone();
        names.extend(self.encoder.feature_names());
        names
    }

    pub fn transform(&self, frame: &Frame) -> Result<Array2<f64>> {
        let mut x = Array2::<f64>::zeros((frame.nrows(), self.n_features()));

        for (idx, name) in self.scaler.columns.iter().enumerate() {
            let values = frame
                .numeric(name)
                .with_context(|| format!("Failed to scale column '{}'", name))?;
            for (row, &v) in values.iter().enumerate() {
                x[(row, idx)] = self.scaler.scale(idx, v);
            }
        }

        let mut offset = self.scaler.width();
        for (idx, name) in self.encoder.columns.iter().enumerate() {
            let values = frame
                .categorical(name)
                .with_context(|| format!("Failed to encode column '{}'", name))?;
            for (row, v) in values.iter().enumerate() {
                if let Some(slot) = self.encoder.slot(idx, v.as_deref()) {
                    x[(row, offset + slot)] = 1.0;
                }
            }
            offset += self.encoder.categories[idx].len();
        }
        Ok(x)
    }
}
