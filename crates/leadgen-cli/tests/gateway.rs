mod common;

use std::path::Path;
use std::sync::Arc;

use leadgen_classifiers::config::{ForestConfig, ModelType};
use leadgen_classifiers::data_handling::{DatasetVariant, FieldValue};
use leadgen_classifiers::io::artifacts::ArtifactStore;
use leadgen_classifiers::scoring::{LeadScorer, LeadStatus};
use leadgen_cli::scoring::gateway::{ComparisonEntry, ScoringGateway};
use leadgen_cli::scoring::registry::{ModelRegistry, ModelSlot};
use leadgen_tabular::config::AttentionConfig;

fn registry(dir: &Path) -> Arc<ModelRegistry> {
    Arc::new(ModelRegistry::new(
        ArtifactStore::new(dir),
        ForestConfig::new(10, 42),
        AttentionConfig {
            max_epochs: 5,
            patience: 2,
            batch_size: 64,
            ..Default::default()
        },
    ))
}

#[test]
fn no_data_gives_neutral_score() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = ScoringGateway::new(registry(dir.path()));

    let mut lead = common::bank_lead();
    lead.insert("dataset_type", "lead_scoring");
    let result = gateway.score(lead);
    assert_eq!(result.score, 50);
    assert_eq!(result.probability, 0.5);
    assert_eq!(result.status, LeadStatus::Warm);
    assert_eq!(result.dataset_type, DatasetVariant::LeadScoring);
    assert_eq!(result.error.as_deref(), Some("No valid model available for scoring"));
}

#[test]
fn missing_lead_scoring_data_falls_back_to_bank() {
    let dir = tempfile::tempdir().unwrap();
    common::write_bank_csv(dir.path(), 150);
    let gateway = ScoringGateway::new(registry(dir.path()));

    let mut lead = common::bank_lead();
    lead.insert("dataset_type", "lead_scoring");
    lead.insert("model_type", "transformer");
    let result = gateway.score(lead);

    assert_eq!(result.dataset_type, DatasetVariant::Bank);
    assert!(result.score == 0 || result.score == 100);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .starts_with("Model not trained or loaded"));
}

#[test]
fn bank_model_is_trained_once_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    common::write_bank_csv(dir.path(), 150);
    let models = registry(dir.path());
    let gateway = ScoringGateway::new(Arc::clone(&models));

    let first = gateway.score(common::bank_lead());
    assert!(first.error.is_none());
    assert!(models.peek(ModelSlot::BankForest).is_some());
    assert!(models.store().model_path(DatasetVariant::Bank).exists());

    // A fresh registry loads the saved artifact instead of retraining.
    std::fs::remove_file(models.store().source_path(DatasetVariant::Bank)).unwrap();
    let reloaded = ScoringGateway::new(registry(dir.path()));
    let second = reloaded.score(common::bank_lead());
    assert_eq!(second, first);
}

#[test]
fn concurrent_first_requests_share_one_training_run() {
    let dir = tempfile::tempdir().unwrap();
    common::write_bank_csv(dir.path(), 150);
    let models = registry(dir.path());

    let (a, b) = std::thread::scope(|s| {
        let first = s.spawn(|| models.get_or_train(ModelSlot::BankForest).unwrap());
        let second = s.spawn(|| models.get_or_train(ModelSlot::BankForest).unwrap());
        (first.join().unwrap(), second.join().unwrap())
    });
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.kind(), ModelType::RandomForest);
    assert_eq!(a.variant(), DatasetVariant::Bank);

    let artifacts: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "bin"))
        .collect();
    assert_eq!(artifacts, vec![models.store().model_path(DatasetVariant::Bank)]);
}

#[test]
fn dotted_indicator_names_score_like_underscored_ones() {
    let dir = tempfile::tempdir().unwrap();
    common::write_bank_csv(dir.path(), 150);
    let gateway = ScoringGateway::new(registry(dir.path()));

    let underscored = common::bank_lead();
    let mut dotted = underscored.clone();
    for (dot, under) in [
        ("emp.var.rate", "emp_var_rate"),
        ("cons.price.idx", "cons_price_idx"),
        ("cons.conf.idx", "cons_conf_idx"),
        ("nr.employed", "nr_employed"),
    ] {
        if let Some(value) = dotted.remove(under) {
            dotted.insert(dot, value);
        }
    }
    assert_eq!(gateway.score(dotted), gateway.score(underscored));
}

#[test]
fn comparison_reports_each_model_independently() {
    let dir = tempfile::tempdir().unwrap();
    common::write_bank_csv(dir.path(), 150);
    let gateway = ScoringGateway::new(registry(dir.path()));

    let comparison = gateway.compare(None);
    match &comparison.bank_model {
        ComparisonEntry::Scored(result) => assert_eq!(result.dataset_type, DatasetVariant::Bank),
        other => panic!("bank model should score, got {:?}", other),
    }
    match &comparison.lead_scoring_model {
        ComparisonEntry::Failed { error } => {
            assert!(error.starts_with("Lead scoring model not available"))
        }
        other => panic!("lead scoring model should fail, got {:?}", other),
    }
    assert!(!comparison.lead_data.contains("dataset_type"));
    assert_eq!(
        comparison.lead_data.get("emp.var.rate"),
        comparison.lead_data.get("emp_var_rate")
    );
    assert!(matches!(comparison.lead_data.get("age"), Some(FieldValue::Integer(_))));
}
