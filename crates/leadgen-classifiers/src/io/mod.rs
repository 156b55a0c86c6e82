pub mod artifacts;
pub mod dataset_csv;
