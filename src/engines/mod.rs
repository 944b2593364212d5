pub mod aggregation;
pub mod evaluation;
pub mod evolution;
pub mod generation;
