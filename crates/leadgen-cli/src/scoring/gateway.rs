//! Request normalization, model routing and graceful degradation.
use std::sync::Arc;

use leadgen_classifiers::config::ModelType;
use leadgen_classifiers::data_handling::{DatasetVariant, LeadRecord};
use leadgen_classifiers::scoring::{LeadStatus, ScoredLead};
use leadgen_classifiers::transform::SchemaMapping;
use serde::{Deserialize, Serialize};

use crate::scoring::registry::{ModelHandle, ModelRegistry, ModelSlot};
use crate::scoring::sample::comparison_sample;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub score: u32,
    pub probability: f64,
    pub status: LeadStatus,
    pub dataset_type: DatasetVariant,
    pub error: Option<String>,
}

impl ScoringResult {
    pub const NEUTRAL_SCORE: u32 = 50;
    pub const NEUTRAL_PROBABILITY: f64 = 0.5;

    fn scored(lead: ScoredLead, dataset_type: DatasetVariant, error: Option<String>) -> Self {
        ScoringResult {
            score: lead.score,
            probability: lead.probability,
            status: lead.status,
            dataset_type,
            error,
        }
    }

    /// Returned when no model can score the lead.
    pub fn neutral(dataset_type: DatasetVariant, error: impl Into<String>) -> Self {
        ScoringResult {
            score: Self::NEUTRAL_SCORE,
            probability: Self::NEUTRAL_PROBABILITY,
            status: LeadStatus::Warm,
            dataset_type,
            error: Some(error.into()),
        }
    }
}

/// A lead with its selector fields extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRequest {
    pub record: LeadRecord,
    pub dataset_type: DatasetVariant,
    pub model_type: ModelType,
}

/// Pull `dataset_type` and `model_type` out of the record, defaulting to
/// bank / random_forest, and fill in both spellings of the economic indicators.
pub fn normalize(mut record: LeadRecord) -> ScoringRequest {
    let dataset_type = record
        .remove("dataset_type")
        .map(|v| DatasetVariant::from_selector(&v.as_category()))
        .unwrap_or(DatasetVariant::Bank);
    let model_type = record
        .remove("model_type")
        .map(|v| ModelType::from_selector(&v.as_category()))
        .unwrap_or_default();
    reconcile_indicators(&mut record);
    ScoringRequest {
        record,
        dataset_type,
        model_type,
    }
}

/// For each economic indicator present in only one spelling, copy it to the
/// other, using the bank schema table.
pub fn reconcile_indicators(record: &mut LeadRecord) {
    SchemaMapping::for_variant(DatasetVariant::Bank).reconcile(record);
}

/// One side of a model comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparisonEntry {
    Scored(ScoringResult),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub lead_data: LeadRecord,
    pub bank_model: ComparisonEntry,
    pub lead_scoring_model: ComparisonEntry,
}

pub struct ScoringGateway {
    registry: Arc<ModelRegistry>,
}

impl ScoringGateway {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        ScoringGateway { registry }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Score a raw lead. Always returns a well-formed result.
    pub fn score(&self, record: LeadRecord) -> ScoringResult {
        let request = normalize(record);
        let requested = request.dataset_type;
        let slot = ModelSlot::for_request(requested, request.model_type);
        log::info!(
            "Scoring lead with {} fields using {}",
            request.record.len(),
            slot
        );

        let (model, fallback_error) = match self.resolve_with_fallback(slot) {
            Some(resolved) => resolved,
            None => {
                log::warn!("No model available for {}; returning neutral score", slot);
                return ScoringResult::neutral(requested, "No valid model available for scoring");
            }
        };

        match model.predict(&request.record) {
            Ok(lead) => {
                log::info!(
                    "Lead scored {} ({}) by the {} {} model",
                    lead.score,
                    lead.status.as_str(),
                    model.variant(),
                    model.kind()
                );
                ScoringResult::scored(lead, model.variant(), fallback_error)
            }
            Err(e) => {
                log::error!("Error scoring lead: {:#}", e);
                ScoringResult::neutral(requested, format!("Error scoring lead: {:#}", e))
            }
        }
    }

    /// The slot's model, or the bank forest annotated with why the fallback
    /// happened.
    fn resolve_with_fallback(&self, slot: ModelSlot) -> Option<(ModelHandle, Option<String>)> {
        match self.registry.get_or_train(slot) {
            Ok(model) => Some((model, None)),
            Err(e) if slot != ModelSlot::BankForest => {
                let reason = format!("Model not trained or loaded: {:#}", e);
                log::warn!("{}; falling back to the bank model", reason);
                self.registry
                    .get_or_train(ModelSlot::BankForest)
                    .ok()
                    .map(|bank| (bank, Some(reason)))
            }
            Err(_) => None,
        }
    }

    /// Score one payload with both ensembles, each resolved independently.
    pub fn compare(&self, record: Option<LeadRecord>) -> Comparison {
        let request = normalize(record.unwrap_or_else(comparison_sample));
        let bank_model = self.compare_one(ModelSlot::BankForest, "Bank", &request.record);
        let lead_scoring_model = self.compare_one(ModelSlot::LeadScoringForest, "Lead scoring", &request.record);
        Comparison {
            lead_data: request.record,
            bank_model,
            lead_scoring_model,
        }
    }

    fn compare_one(&self, slot: ModelSlot, label: &str, record: &LeadRecord) -> ComparisonEntry {
        let model = match self.registry.get_or_train(slot) {
            Ok(model) => model,
            Err(e) => {
                return ComparisonEntry::Failed {
                    error: format!("{} model not available: {:#}", label, e),
                }
            }
        };
        match model.predict(record) {
            Ok(lead) => ComparisonEntry::Scored(ScoringResult::scored(lead, slot.variant(), None)),
            Err(e) => ComparisonEntry::Failed {
                error: format!("{} model prediction error: {:#}", label, e),
            },
        }
    }
}
