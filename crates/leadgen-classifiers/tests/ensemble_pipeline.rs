mod common;

use std::fs;

use leadgen_classifiers::config::ForestConfig;
use leadgen_classifiers::data_handling::DatasetVariant;
use leadgen_classifiers::error::ModelError;
use leadgen_classifiers::io::artifacts::{ArtifactStore, PipelineSidecar};
use leadgen_classifiers::pipeline::{EnsembleModel, ModelState};
use leadgen_classifiers::scoring::{LeadScorer, LeadStatus};

fn small_forest() -> ForestConfig {
    ForestConfig::new(20, 42)
}

fn trained_bank(dir: &std::path::Path) -> EnsembleModel {
    common::write_bank_csv(dir, 150);
    let mut model = EnsembleModel::new(DatasetVariant::Bank, ArtifactStore::new(dir), small_forest());
    model.train().unwrap();
    model
}

#[test]
fn training_persists_metrics_and_importance() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained_bank(dir.path());
    assert_eq!(model.state(), ModelState::Trained);

    let store = ArtifactStore::new(dir.path());
    let persisted = store.read_metrics(DatasetVariant::Bank).unwrap().unwrap();
    assert_eq!(Some(&persisted), model.metrics());
    assert!((0.0..=1.0).contains(&persisted.accuracy));

    let table = store.read_feature_importance(DatasetVariant::Bank).unwrap().unwrap();
    assert!(!table.is_empty());
    assert!(table.windows(2).all(|w| w[0].importance >= w[1].importance));
    assert!(table.iter().any(|row| row.feature == "duration"));
    assert!(table.iter().any(|row| row.feature.starts_with("job_")));
}

#[test]
fn bank_scores_are_zero_or_hundred_with_consistent_status() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained_bank(dir.path());

    let mut lead = common::bank_sample();
    for duration in [60i64, 200, 500, 850] {
        lead.insert("duration", duration);
        let scored = model.predict(&lead).unwrap();
        assert!(scored.score == 0 || scored.score == 100);
        assert_eq!(scored.score == 100, scored.probability > 0.5);
        assert_eq!(scored.status, LeadStatus::from_probability(scored.probability));
    }
}

#[test]
fn missing_fields_still_score() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained_bank(dir.path());

    let mut sparse = leadgen_classifiers::data_handling::LeadRecord::new();
    sparse.insert("age", 50i64);
    sparse.insert("job", "astronaut");
    sparse.insert("duration", "not a number");

    let scored = model.predict(&sparse).unwrap();
    assert!((0.0..=1.0).contains(&scored.probability));
}

#[test]
fn save_then_load_predicts_identically() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = trained_bank(dir.path());
    let path = model.save(None).unwrap();
    assert_eq!(model.state(), ModelState::Saved);
    assert!(path.ends_with("lead_scoring_model.bin"));
    assert!(dir.path().join("lead_scoring_model_config.json").exists());

    let loaded = EnsembleModel::load(
        DatasetVariant::Bank,
        ArtifactStore::new(dir.path()),
        small_forest(),
        None,
    )
    .unwrap();
    assert_eq!(loaded.state(), ModelState::Loaded);
    assert_eq!(loaded.numeric_columns(), model.numeric_columns());
    assert_eq!(loaded.metrics(), model.metrics());

    let sample = common::bank_sample();
    assert_eq!(
        loaded.predict(&sample).unwrap(),
        model.predict(&sample).unwrap()
    );
}

#[test]
fn load_checks_columns_against_the_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let mut model = trained_bank(dir.path());
    model.save(None).unwrap();

    let saved = store.read_sidecar().unwrap().unwrap();
    assert_eq!(saved.dataset_type, DatasetVariant::Bank);
    assert_eq!(saved.num_cols, model.numeric_columns());

    // a sidecar left by the other variant does not block loading
    store
        .write_sidecar(&PipelineSidecar {
            dataset_type: DatasetVariant::LeadScoring,
            cat_cols: vec!["Lead Origin".to_string()],
            num_cols: vec!["TotalVisits".to_string()],
        })
        .unwrap();
    assert!(EnsembleModel::load(DatasetVariant::Bank, store.clone(), small_forest(), None).is_ok());

    let mut drifted = saved.clone();
    drifted.num_cols.pop();
    store.write_sidecar(&drifted).unwrap();
    let err = EnsembleModel::load(DatasetVariant::Bank, store, small_forest(), None)
        .err()
        .unwrap();
    assert!(matches!(err.downcast_ref::<ModelError>(), Some(ModelError::ArtifactLoad(_))));
}

#[test]
fn retraining_with_the_same_seed_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let a = trained_bank(dir.path());
    let mut b = EnsembleModel::new(DatasetVariant::Bank, ArtifactStore::new(dir.path()), small_forest());
    b.train().unwrap();

    let sample = common::bank_sample();
    assert_eq!(
        a.predict(&sample).unwrap().probability,
        b.predict(&sample).unwrap().probability
    );
}

#[test]
fn lead_scoring_variant_trains_and_saves_under_its_own_name() {
    let dir = tempfile::tempdir().unwrap();
    common::write_lead_scoring_csv(dir.path(), 120);
    let store = ArtifactStore::new(dir.path());
    let mut model = EnsembleModel::new(DatasetVariant::LeadScoring, store.clone(), small_forest());
    model.train().unwrap();
    let path = model.save(None).unwrap();
    assert!(path.ends_with("lead_scoring_custom_model.bin"));
    assert!(store.metrics_path(DatasetVariant::LeadScoring).exists());
    assert!(!store.metrics_path(DatasetVariant::Bank).exists());
}

#[test]
fn untrained_model_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let model = EnsembleModel::new(DatasetVariant::Bank, ArtifactStore::new(dir.path()), small_forest());
    let err = model.predict(&common::bank_sample()).unwrap_err();
    assert!(matches!(err.downcast_ref::<ModelError>(), Some(ModelError::Unavailable(_))));
}

#[test]
fn load_reports_missing_and_corrupt_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());

    let missing = EnsembleModel::load(DatasetVariant::Bank, store.clone(), small_forest(), None)
        .err()
        .unwrap();
    assert!(matches!(
        missing.downcast_ref::<ModelError>(),
        Some(ModelError::ArtifactNotFound(_))
    ));

    fs::write(store.model_path(DatasetVariant::Bank), b"not a model").unwrap();
    let corrupt = EnsembleModel::load(DatasetVariant::Bank, store, small_forest(), None)
        .err()
        .unwrap();
    assert!(matches!(
        corrupt.downcast_ref::<ModelError>(),
        Some(ModelError::ArtifactLoad(_))
    ));
}
