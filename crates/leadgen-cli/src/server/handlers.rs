//! Route handlers. Model work runs on the blocking pool.
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use leadgen_classifiers::config::ModelType;
use leadgen_classifiers::data_handling::{DatasetVariant, LeadRecord};
use leadgen_classifiers::io::artifacts::FeatureImportance;
use leadgen_classifiers::stats::ClassificationMetrics;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::spawn_blocking;

use crate::scoring::gateway::{Comparison, ScoringResult};
use crate::scoring::registry::ModelSlot;
use crate::scoring::sample::sample_lead;
use crate::server::error::{ApiError, ApiResult};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DatasetQuery {
    pub dataset_type: Option<String>,
    pub model_type: Option<String>,
}

impl DatasetQuery {
    fn variant(&self) -> DatasetVariant {
        self.dataset_type
            .as_deref()
            .map(DatasetVariant::from_selector)
            .unwrap_or(DatasetVariant::Bank)
    }

    fn model(&self) -> ModelType {
        self.model_type
            .as_deref()
            .map(ModelType::from_selector)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub metrics: ClassificationMetrics,
    pub dataset_type: DatasetVariant,
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to LeadGenius AI API",
        "models": ModelType::ALL,
        "datasets": DatasetVariant::ALL,
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// A lead body must be a JSON object of scalars or nulls.
fn lead_body(payload: Result<Json<LeadRecord>, JsonRejection>) -> ApiResult<LeadRecord> {
    payload
        .map(|Json(lead)| lead)
        .map_err(|rejection| ApiError::BadRequest(format!("Invalid lead data: {}", rejection.body_text())))
}

pub async fn score(
    State(state): State<AppState>,
    payload: Result<Json<LeadRecord>, JsonRejection>,
) -> ApiResult<Json<ScoringResult>> {
    let lead = lead_body(payload)?;
    let gateway = state.gateway.clone();
    let result = spawn_blocking(move || gateway.score(lead)).await?;
    Ok(Json(result))
}

pub async fn train(State(state): State<AppState>, Query(query): Query<DatasetQuery>) -> ApiResult<Json<MetricsResponse>> {
    let slot = ModelSlot::for_request(query.variant(), query.model());
    let registry = state.registry.clone();
    let metrics = spawn_blocking(move || registry.retrain(slot))
        .await?
        .map_err(|e| ApiError::Internal(format!("Error training model: {:#}", e)))?;
    Ok(Json(MetricsResponse {
        metrics,
        dataset_type: slot.variant(),
    }))
}

pub async fn metrics(State(state): State<AppState>, Query(query): Query<DatasetQuery>) -> ApiResult<Json<MetricsResponse>> {
    let variant = query.variant();
    let slot = ModelSlot::for_request(variant, ModelType::RandomForest);
    let not_found = || {
        let label = match variant {
            DatasetVariant::Bank => "Bank",
            DatasetVariant::LeadScoring => "Lead scoring",
        };
        ApiError::NotFound(format!("{} model metrics not available", label))
    };

    if let Some(metrics) = state.registry.peek(slot).and_then(|m| m.metrics().copied()) {
        return Ok(Json(MetricsResponse { metrics, dataset_type: variant }));
    }
    let persisted = state.registry.store().read_metrics(variant).map_err(|e| {
        log::warn!("Unreadable metrics file for {}: {:#}", variant, e);
        not_found()
    })?;
    persisted
        .map(|metrics| Json(MetricsResponse { metrics, dataset_type: variant }))
        .ok_or_else(not_found)
}

pub async fn feature_importance(
    State(state): State<AppState>,
    Query(query): Query<DatasetQuery>,
) -> ApiResult<Json<Vec<FeatureImportance>>> {
    let variant = query.variant();
    match state.registry.store().read_feature_importance(variant) {
        Ok(Some(rows)) => Ok(Json(rows)),
        Ok(None) => Err(ApiError::NotFound(format!(
            "Feature importance data not available for {} dataset",
            variant
        ))),
        Err(e) => Err(ApiError::Internal(format!("Error retrieving feature importance: {:#}", e))),
    }
}

pub async fn sample() -> Json<LeadRecord> {
    Json(sample_lead())
}

pub async fn compare_default(State(state): State<AppState>) -> ApiResult<Json<Comparison>> {
    let gateway = state.gateway.clone();
    Ok(Json(spawn_blocking(move || gateway.compare(None)).await?))
}

pub async fn compare_with(
    State(state): State<AppState>,
    payload: Result<Json<LeadRecord>, JsonRejection>,
) -> ApiResult<Json<Comparison>> {
    let lead = lead_body(payload)?;
    let gateway = state.gateway.clone();
    Ok(Json(spawn_blocking(move || gateway.compare(Some(lead))).await?))
}
