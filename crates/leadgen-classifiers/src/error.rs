use std::path::PathBuf;

use thiserror::Error;

/// Lifecycle failures that callers branch on.
///
/// Data and IO problems travel as `anyhow::Error` with context; these are the
/// cases the registry and HTTP layer need to tell apart.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not trained or loaded: {0}")]
    Unavailable(String),

    #[error("model file not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("error loading model: {0}")]
    ArtifactLoad(String),

    #[error("unknown dataset type: {0}")]
    UnknownVariant(String),

    #[error("unknown model type: {0}")]
    UnknownModelType(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
