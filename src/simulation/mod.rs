pub mod types;
pub mod scenarios;

pub use types::*;
pub use scenarios::{Difficulty, Scenario, SCENARIOS};
