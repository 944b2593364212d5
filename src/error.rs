use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvolutionError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("No seed document found in {0}")]
    NoSeed(PathBuf),

    #[error("Trial executor unavailable: {0}")]
    ExecutorUnavailable(String),

    #[error("Trial failed: {0}")]
    TrialFailed(String),

    #[error("Missing trial statistics for participant '{0}'")]
    MissingStats(String),

    #[error(
        "Inconsistent reference value for {part_id}/{module_id}/{param_name}: {first} vs {second}"
    )]
    InconsistentReference {
        part_id: String,
        module_id: String,
        param_name: String,
        first: f64,
        second: f64,
    },

    #[error("Mutation sampling exhausted after {attempts} draws ({sampled} of {target} mutations)")]
    SamplingExhausted {
        attempts: usize,
        sampled: usize,
        target: usize,
    },

    #[error("Generation produced no effective variants")]
    NoEffectiveVariants,

    #[error("Generation cancelled before its results were processed")]
    GenerationCancelled,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Lineage error: {0}")]
    Lineage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),
}

impl EvolutionError {
    /// Errors that abort only the current generation. The engine re-seeds
    /// with the unchanged prior document and keeps running.
    pub fn is_generation_recoverable(&self) -> bool {
        matches!(
            self,
            EvolutionError::MissingStats(_) | EvolutionError::InconsistentReference { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EvolutionError>;
