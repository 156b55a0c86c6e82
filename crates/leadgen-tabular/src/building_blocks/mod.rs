pub mod attentive;
pub mod nn;
