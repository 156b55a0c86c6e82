//! leadgen-classifiers: dataset adaptation and ensemble lead scoring.
//!
//! This crate owns everything the random-forest side of the service needs:
//! lead records and the two dataset variants, the pure request-to-schema
//! mapping, preprocessing (standardization, one-hot and ordinal encoding),
//! a bagged CART forest built on `linfa-trees`, the fitted pipeline with its
//! artifact store, and the classification metrics shared with the tabular
//! attention model.
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod scoring;
pub mod stats;
pub mod transform;

pub use error::ModelError;
