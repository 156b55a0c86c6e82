//! leadgen-tabular: a TabNet-style attention classifier built on candle.
//!
//! The network integer-codes categorical columns into learned embeddings,
//! standardizes numeric columns, and runs a few sequential attention steps
//! whose feature masks are constrained by a relaxation prior.
pub mod building_blocks;
pub mod config;
pub mod models;
pub mod utils;
