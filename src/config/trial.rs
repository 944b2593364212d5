use super::traits::{invalid, ConfigSection};
use crate::error::EvolutionError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    /// External program that runs a trial over the working set
    pub command: String,
    pub args: Vec<String>,
    /// JSON scoreboard written by the command
    pub results_file: PathBuf,
    pub poll_interval_ms: u64,
    /// Pause after submission before the first poll
    pub settle_ms: u64,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            results_file: PathBuf::from("Autospawn/results.json"),
            poll_interval_ms: 1000,
            settle_ms: 5000,
        }
    }
}

impl ConfigSection for TrialConfig {
    fn section_name() -> &'static str {
        "trial"
    }

    fn validate(&self) -> Result<(), EvolutionError> {
        if self.poll_interval_ms == 0 {
            return Err(invalid::<Self>("poll_interval_ms must be positive"));
        }
        Ok(())
    }
}
