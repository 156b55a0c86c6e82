mod common;

use leadgen_classifiers::config::ModelType;
use leadgen_classifiers::data_handling::LeadRecord;
use leadgen_classifiers::error::ModelError;
use leadgen_classifiers::scoring::{LeadScorer, LeadStatus};
use leadgen_tabular::config::AttentionConfig;
use leadgen_tabular::models::attention_classifier::AttentionClassifier;

fn quick_config() -> AttentionConfig {
    AttentionConfig {
        max_epochs: 15,
        patience: 5,
        batch_size: 64,
        ..Default::default()
    }
}

fn lead() -> LeadRecord {
    let mut r = LeadRecord::new();
    r.insert("Lead Origin", "API");
    r.insert("Lead Source", "Google");
    r.insert("Total Time Spent on Website", 1500i64);
    r.insert("TotalVisits", 4i64);
    r.insert("dataset_type", "lead_scoring");
    r
}

#[test]
fn trains_and_scores_with_binary_labels() {
    let dir = tempfile::tempdir().unwrap();
    common::write_lead_scoring_csv(dir.path(), 200);

    let mut model = AttentionClassifier::new(quick_config());
    let metrics = model.train(dir.path()).unwrap();
    assert!((0.0..=1.0).contains(&metrics.accuracy));
    assert_eq!(model.metrics(), Some(&metrics));

    let history = model.history().unwrap();
    assert!(history.n_epochs() >= 1 && history.n_epochs() <= 15);
    assert!(history.best_epoch.is_some());
    let best = history.best_accuracy().unwrap();
    assert!((0.0..=1.0).contains(&best));
    assert_eq!(model.kind(), ModelType::Transformer);

    for record in [lead(), LeadRecord::new()] {
        let scored = model.predict(&record).unwrap();
        assert!(scored.score <= 1);
        let expected = if scored.score == 1 {
            LeadStatus::Converted
        } else {
            LeadStatus::NotConverted
        };
        assert_eq!(scored.status, expected);
        assert!((0.0..=1.0).contains(&scored.probability));
    }
}

#[test]
fn unknown_categories_and_junk_numbers_still_score() {
    let dir = tempfile::tempdir().unwrap();
    common::write_lead_scoring_csv(dir.path(), 120);
    let mut model = AttentionClassifier::new(quick_config());
    model.train(dir.path()).unwrap();

    let mut odd = lead();
    odd.insert("Lead Source", "Carrier Pigeon");
    odd.insert("TotalVisits", "lots");
    assert!(model.predict(&odd).is_ok());
}

#[test]
fn same_seed_trains_the_same_model() {
    let dir = tempfile::tempdir().unwrap();
    common::write_lead_scoring_csv(dir.path(), 120);

    let mut a = AttentionClassifier::new(quick_config());
    let mut b = AttentionClassifier::new(quick_config());
    a.train(dir.path()).unwrap();
    b.train(dir.path()).unwrap();
    assert_eq!(
        a.predict(&lead()).unwrap().probability,
        b.predict(&lead()).unwrap().probability
    );
}

#[test]
fn untrained_model_is_unavailable() {
    let model = AttentionClassifier::new(quick_config());
    let err = model.predict(&lead()).unwrap_err();
    assert!(matches!(err.downcast_ref::<ModelError>(), Some(ModelError::Unavailable(_))));
}

#[test]
fn missing_dataset_fails_training() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = AttentionClassifier::new(quick_config());
    assert!(model.train(dir.path()).is_err());
    assert!(!model.is_trained());
}
