//! axum router and server loop.
pub mod error;
pub mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::config::ServiceConfig;
use crate::scoring::gateway::ScoringGateway;
use crate::scoring::registry::ModelRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub gateway: Arc<ScoringGateway>,
}

impl AppState {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        AppState {
            gateway: Arc::new(ScoringGateway::new(Arc::clone(&registry))),
            registry,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(Arc::new(ModelRegistry::new(
            config.store(),
            config.forest.clone(),
            config.attention.clone(),
        )))
    }
}

/// Service routes under `api_prefix` plus `/` and `/health` at the root.
pub fn create_router(state: AppState, api_prefix: &str) -> Router {
    let api = Router::new()
        .route("/score", post(handlers::score))
        .route("/train", get(handlers::train))
        .route("/metrics", get(handlers::metrics))
        .route("/feature-importance", get(handlers::feature_importance))
        .route("/sample", get(handlers::sample))
        .route(
            "/compare-models",
            get(handlers::compare_default).post(handlers::compare_with),
        );

    let root = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health));

    let prefix = api_prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        root.merge(api)
    } else {
        root.nest(prefix, api)
    };

    app.layer(CorsLayer::permissive()).with_state(state)
}

pub async fn serve(config: ServiceConfig) -> Result<()> {
    let addr = config.socket_addr()?;
    let state = AppState::from_config(&config);
    let app = create_router(state, &config.api_prefix);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!(
        "LeadGenius scoring service listening on http://{} (routes under '{}')",
        addr,
        config.api_prefix
    );
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
