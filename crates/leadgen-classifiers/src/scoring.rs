//! Scoring output shared by both wrappers.
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::ModelType;
use crate::data_handling::{DatasetVariant, LeadRecord};
use crate::stats::ClassificationMetrics;

/// Status vocabulary. The ensemble reports hot/warm/cold, the attention
/// model converted/not_converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Hot,
    Warm,
    Cold,
    Converted,
    NotConverted,
}

impl LeadStatus {
    pub const HOT_THRESHOLD: f64 = 0.7;
    pub const WARM_THRESHOLD: f64 = 0.4;

    pub fn from_probability(probability: f64) -> Self {
        if probability >= Self::HOT_THRESHOLD {
            LeadStatus::Hot
        } else if probability >= Self::WARM_THRESHOLD {
            LeadStatus::Warm
        } else {
            LeadStatus::Cold
        }
    }

    pub fn from_label(label: usize) -> Self {
        if label == 1 {
            LeadStatus::Converted
        } else {
            LeadStatus::NotConverted
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Hot => "hot",
            LeadStatus::Warm => "warm",
            LeadStatus::Cold => "cold",
            LeadStatus::Converted => "converted",
            LeadStatus::NotConverted => "not_converted",
        }
    }
}

/// A single model prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredLead {
    pub score: u32,
    pub probability: f64,
    pub status: LeadStatus,
}

/// A trained model the gateway can score with.
pub trait LeadScorer: Send + Sync {
    fn kind(&self) -> ModelType;

    fn variant(&self) -> DatasetVariant;

    fn predict(&self, record: &LeadRecord) -> Result<ScoredLead>;

    fn metrics(&self) -> Option<&ClassificationMetrics>;
}
