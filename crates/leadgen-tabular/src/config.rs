use serde::{Deserialize, Serialize};

/// Architecture and training settings of the attention classifier.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AttentionConfig {
    /// Width of the decision output of each step.
    pub n_d: usize,
    /// Width of the attention output fed to the next step.
    pub n_a: usize,
    pub n_steps: usize,
    /// Prior relaxation; 1.0 forces each feature into a single step.
    pub gamma: f64,
    pub embedding_dim: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    pub patience: usize,
    pub validation_fraction: f64,
    pub seed: u64,
    pub device: String,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            n_d: 8,
            n_a: 8,
            n_steps: 3,
            gamma: 1.3,
            embedding_dim: 4,
            learning_rate: 0.02,
            batch_size: 1024,
            max_epochs: 100,
            patience: 10,
            validation_fraction: 0.2,
            seed: 42,
            device: "cpu".to_string(),
        }
    }
}
