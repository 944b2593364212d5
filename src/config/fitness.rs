use super::traits::{invalid, ConfigSection};
use crate::error::EvolutionError;
use serde::{Deserialize, Serialize};

/// Weights of the fitness formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    pub kill_weight: f64,
    pub shots_fired_weight: f64,
    pub hits_landed_weight: f64,
    pub accuracy_weight: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            kill_weight: 1.0,
            shots_fired_weight: 0.002,
            hits_landed_weight: 0.01,
            accuracy_weight: 5.0,
        }
    }
}

impl ConfigSection for FitnessConfig {
    fn section_name() -> &'static str {
        "fitness"
    }

    fn validate(&self) -> Result<(), EvolutionError> {
        let weights = [
            self.kill_weight,
            self.shots_fired_weight,
            self.hits_landed_weight,
            self.accuracy_weight,
        ];
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(invalid::<Self>("weights must be finite"));
        }
        Ok(())
    }
}
