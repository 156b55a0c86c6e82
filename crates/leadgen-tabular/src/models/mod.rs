pub mod attention_classifier;
pub mod tabnet_model;
