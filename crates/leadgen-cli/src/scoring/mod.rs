pub mod gateway;
pub mod registry;
pub mod sample;
