use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Hyper-parameters of the bagged decision-tree forest.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub seed: u64,
    /// `None` grows every tree until its leaves are pure.
    pub max_depth: Option<usize>,
    pub min_weight_split: f32,
    pub min_weight_leaf: f32,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            seed: 42,
            max_depth: None,
            min_weight_split: 2.0,
            min_weight_leaf: 1.0,
        }
    }
}

impl ForestConfig {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            seed,
            ..Default::default()
        }
    }
}

/// The two model families a request can select.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[default]
    RandomForest,
    Transformer,
}

impl ModelType {
    pub const ALL: [ModelType; 2] = [ModelType::RandomForest, ModelType::Transformer];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::RandomForest => "random_forest",
            ModelType::Transformer => "transformer",
        }
    }

    /// Request selectors are lenient: anything that is not `transformer`
    /// selects the random forest.
    pub fn from_selector(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random_forest" | "rf" => Ok(ModelType::RandomForest),
            "transformer" | "tabnet" => Ok(ModelType::Transformer),
            other => Err(ModelError::UnknownModelType(other.to_string())),
        }
    }
}
