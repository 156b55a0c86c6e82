//! Delimited source-file reader with column type inference.
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::data_handling::{Column, Frame};

/// Cell values read as missing.
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing(cell: &str) -> bool {
    NA_TOKENS.contains(&cell)
}

/// Read a delimited file into a `Frame`.
///
/// A column is numeric when every non-missing cell parses as a float;
/// otherwise it is categorical. Missing cells become NaN or `None`.
pub fn read_frame<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Frame> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open dataset file: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read dataset header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() {
        return Err(anyhow!("Dataset file {} has no columns", path.display()));
    }

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        for (col, values) in cells.iter_mut().enumerate() {
            let cell = record.get(col).unwrap_or_default();
            values.push(if is_missing(cell) {
                None
            } else {
                Some(cell.to_string())
            });
        }
    }

    let columns = cells.into_iter().map(infer_column).collect();
    Frame::new(headers, columns)
}

fn infer_column(values: Vec<Option<String>>) -> Column {
    let parsed: Option<Vec<f64>> = values
        .iter()
        .map(|v| match v {
            None => Some(f64::NAN),
            Some(s) => s.trim().parse::<f64>().ok(),
        })
        .collect();
    match parsed {
        Some(numbers) => Column::Numeric(numbers),
        None => Column::Categorical(values),
    }
}
