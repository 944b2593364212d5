use super::traits::{invalid, ConfigSection};
use crate::error::EvolutionError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Mutations drawn per generation; always a whole number of opposed pairs
    pub batch_size: usize,
    pub perturbation_radius: f64,
    /// Upper bound on category draws before sampling gives up
    pub max_sample_attempts: usize,
    /// Stop after this many completed generations (unbounded when unset)
    pub max_generations: Option<usize>,
    pub rng_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            perturbation_radius: 0.1,
            max_sample_attempts: 1000,
            max_generations: None,
            rng_seed: None,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), EvolutionError> {
        if self.batch_size < 2 || self.batch_size % 2 != 0 {
            return Err(invalid::<Self>("batch_size must be an even number of at least 2"));
        }
        if self.perturbation_radius <= 0.0 || self.perturbation_radius >= 1.0 {
            return Err(invalid::<Self>("perturbation_radius must be between 0 and 1"));
        }
        if self.max_sample_attempts == 0 {
            return Err(invalid::<Self>("max_sample_attempts must be at least 1"));
        }
        Ok(())
    }
}
