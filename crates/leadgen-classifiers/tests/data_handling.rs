mod common;

use std::fs;

use leadgen_classifiers::data_handling::{Column, DatasetAdapter, DatasetVariant};
use leadgen_classifiers::error::ModelError;

#[test]
fn bank_split_is_80_20_with_inferred_columns() {
    let dir = tempfile::tempdir().unwrap();
    common::write_bank_csv(dir.path(), 100);

    let split = DatasetAdapter::new(DatasetVariant::Bank, dir.path())
        .load_and_prepare()
        .unwrap();
    assert_eq!(split.test.len(), 20);
    assert_eq!(split.train.len(), 80);
    assert!(split.train.target.iter().all(|&t| t <= 1));

    assert!(split.categorical_columns.contains(&"job".to_string()));
    assert!(split.numeric_columns.contains(&"emp.var.rate".to_string()));
    assert!(!split.categorical_columns.contains(&"y".to_string()));
    assert!(!split.numeric_columns.contains(&"y".to_string()));
    for c in &split.categorical_columns {
        assert!(!split.numeric_columns.contains(c));
    }
}

#[test]
fn split_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    common::write_bank_csv(dir.path(), 60);
    let adapter = DatasetAdapter::new(DatasetVariant::Bank, dir.path());
    let a = adapter.load_and_prepare().unwrap();
    let b = adapter.load_and_prepare().unwrap();
    assert_eq!(a.test.target, b.test.target);
    assert_eq!(a.test.features, b.test.features);
}

#[test]
fn lead_scoring_drops_ids_and_fills_gaps() {
    let dir = tempfile::tempdir().unwrap();
    common::write_lead_scoring_csv(dir.path(), 80);

    let split = DatasetAdapter::new(DatasetVariant::LeadScoring, dir.path())
        .load_and_prepare()
        .unwrap();
    for dropped in ["Prospect ID", "Lead Number", "Converted"] {
        assert!(split.train.features.column(dropped).is_none(), "{dropped} kept");
    }
    assert!(split.numeric_columns.contains(&"TotalVisits".to_string()));
    assert!(split.categorical_columns.contains(&"Lead Source".to_string()));

    for part in [&split.train, &split.test] {
        for (name, col) in part.features.iter() {
            match col {
                Column::Numeric(v) => assert!(v.iter().all(|x| !x.is_nan()), "NaN left in {name}"),
                Column::Categorical(v) => assert!(v.iter().all(Option::is_some), "gap left in {name}"),
            }
        }
    }
}

#[test]
fn unexpected_bank_target_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("bank-additional-full.csv"),
        "\"age\";\"job\";\"y\"\n30;\"admin.\";\"yes\"\n40;\"services\";\"maybe\"\n",
    )
    .unwrap();
    let err = DatasetAdapter::new(DatasetVariant::Bank, dir.path())
        .load_and_prepare()
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<ModelError>(), Some(ModelError::InvalidData(_))));
}

#[test]
fn missing_source_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(DatasetAdapter::new(DatasetVariant::LeadScoring, dir.path())
        .load_and_prepare()
        .is_err());
}

#[test]
fn explicit_source_overrides_default_name() {
    let dir = tempfile::tempdir().unwrap();
    let written = common::write_bank_csv(dir.path(), 30);
    let renamed = dir.path().join("campaign.csv");
    fs::rename(&written, &renamed).unwrap();

    let split = DatasetAdapter::new(DatasetVariant::Bank, dir.path())
        .with_source(&renamed)
        .load_and_prepare()
        .unwrap();
    assert_eq!(split.train.len() + split.test.len(), 30);
}
