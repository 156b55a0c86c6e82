pub mod stats;
pub mod utils;
