//! Process-wide model slots with lazy, single-flight training.
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use anyhow::Result;
use leadgen_classifiers::config::{ForestConfig, ModelType};
use leadgen_classifiers::data_handling::DatasetVariant;
use leadgen_classifiers::io::artifacts::ArtifactStore;
use leadgen_classifiers::pipeline::EnsembleModel;
use leadgen_classifiers::scoring::LeadScorer;
use leadgen_classifiers::stats::ClassificationMetrics;
use leadgen_tabular::config::AttentionConfig;
use leadgen_tabular::models::attention_classifier::AttentionClassifier;

/// Shared handle to a trained model.
pub type ModelHandle = Arc<dyn LeadScorer>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSlot {
    BankForest,
    LeadScoringForest,
    LeadScoringAttention,
}

impl ModelSlot {
    pub const ALL: [ModelSlot; 3] = [
        ModelSlot::BankForest,
        ModelSlot::LeadScoringForest,
        ModelSlot::LeadScoringAttention,
    ];

    /// The attention model only exists for lead scoring; bank requests always
    /// use the bank forest.
    pub fn for_request(variant: DatasetVariant, model: ModelType) -> Self {
        match (variant, model) {
            (DatasetVariant::Bank, _) => ModelSlot::BankForest,
            (DatasetVariant::LeadScoring, ModelType::RandomForest) => ModelSlot::LeadScoringForest,
            (DatasetVariant::LeadScoring, ModelType::Transformer) => ModelSlot::LeadScoringAttention,
        }
    }

    pub fn variant(&self) -> DatasetVariant {
        match self {
            ModelSlot::BankForest => DatasetVariant::Bank,
            _ => DatasetVariant::LeadScoring,
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            ModelSlot::LeadScoringAttention => ModelType::Transformer,
            _ => ModelType::RandomForest,
        }
    }

    fn index(&self) -> usize {
        match self {
            ModelSlot::BankForest => 0,
            ModelSlot::LeadScoringForest => 1,
            ModelSlot::LeadScoringAttention => 2,
        }
    }
}

impl fmt::Display for ModelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.variant(), self.model_type())
    }
}

/// Three slots, each behind its own lock. Holding a slot's lock while
/// training makes concurrent first requests wait for a single training run.
pub struct ModelRegistry {
    store: ArtifactStore,
    forest: ForestConfig,
    attention: AttentionConfig,
    slots: [Mutex<Option<ModelHandle>>; 3],
}

impl ModelRegistry {
    pub fn new(store: ArtifactStore, forest: ForestConfig, attention: AttentionConfig) -> Self {
        ModelRegistry {
            store,
            forest,
            attention,
            slots: [Mutex::new(None), Mutex::new(None), Mutex::new(None)],
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    fn lock(&self, slot: ModelSlot) -> MutexGuard<'_, Option<ModelHandle>> {
        // a panic during training leaves the slot's previous value intact
        self.slots[slot.index()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current model of a slot, or `None`. Never trains and never waits for
    /// a training run in progress.
    pub fn peek(&self, slot: ModelSlot) -> Option<ModelHandle> {
        match self.slots[slot.index()].try_lock() {
            Ok(guard) => guard.clone(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().clone(),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// The slot's model, loading or training it first when empty. Failures
    /// leave the slot empty so the next call retries.
    pub fn get_or_train(&self, slot: ModelSlot) -> Result<ModelHandle> {
        let mut guard = self.lock(slot);
        if let Some(handle) = guard.as_ref() {
            return Ok(Arc::clone(handle));
        }

        let handle = match slot {
            ModelSlot::LeadScoringAttention => self.train_attention().map(|(h, _)| h),
            _ => match self.load_ensemble(slot.variant()) {
                Some(handle) => Ok(handle),
                None => self.train_ensemble(slot.variant()).map(|(h, _)| h),
            },
        };
        match handle {
            Ok(handle) => {
                *guard = Some(Arc::clone(&handle));
                Ok(handle)
            }
            Err(e) => {
                log::error!("Model {} unavailable: {:#}", slot, e);
                Err(e)
            }
        }
    }

    /// Train a fresh model for the slot and replace the current one.
    pub fn retrain(&self, slot: ModelSlot) -> Result<ClassificationMetrics> {
        let mut guard = self.lock(slot);
        let (handle, metrics) = match slot {
            ModelSlot::LeadScoringAttention => self.train_attention()?,
            _ => self.train_ensemble(slot.variant())?,
        };
        *guard = Some(handle);
        Ok(metrics)
    }

    /// Resolve the lead-scoring slots ahead of the first request.
    pub fn warm_up(&self) -> Vec<(ModelSlot, Result<()>)> {
        [ModelSlot::LeadScoringForest, ModelSlot::LeadScoringAttention]
            .into_iter()
            .map(|slot| (slot, self.get_or_train(slot).map(|_| ())))
            .collect()
    }

    fn load_ensemble(&self, variant: DatasetVariant) -> Option<ModelHandle> {
        if !self.store.model_path(variant).exists() {
            return None;
        }
        match EnsembleModel::load(variant, self.store.clone(), self.forest.clone(), None) {
            Ok(model) => {
                let handle: ModelHandle = Arc::new(model);
                Some(handle)
            }
            Err(e) => {
                log::warn!("Failed to load {} model, retraining: {:#}", variant, e);
                None
            }
        }
    }

    fn train_ensemble(&self, variant: DatasetVariant) -> Result<(ModelHandle, ClassificationMetrics)> {
        let mut model = EnsembleModel::new(variant, self.store.clone(), self.forest.clone());
        let metrics = model.train()?;
        model.save(None)?;
        let handle: ModelHandle = Arc::new(model);
        Ok((handle, metrics))
    }

    fn train_attention(&self) -> Result<(ModelHandle, ClassificationMetrics)> {
        let mut model = AttentionClassifier::new(self.attention.clone());
        let metrics = model.train(self.store.data_dir())?;
        let handle: ModelHandle = Arc::new(model);
        Ok((handle, metrics))
    }
}
