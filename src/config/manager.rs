use super::{
    evolution::EvolutionConfig,
    fitness::FitnessConfig,
    traits::ConfigSection,
    trial::TrialConfig,
    workspace::WorkspaceConfig,
};
use crate::error::EvolutionError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix of environment overrides, e.g. `CRAFTEVO__EVOLUTION__BATCH_SIZE=6`
pub const ENV_PREFIX: &str = "CRAFTEVO";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub workspace: WorkspaceConfig,
    pub trial: TrialConfig,
    pub fitness: FitnessConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), EvolutionError> {
        self.evolution.validate()?;
        self.workspace.validate()?;
        self.trial.validate()?;
        self.fitness.validate()?;
        Ok(())
    }

    /// Layer a TOML file under environment overrides and validate the result
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EvolutionError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvolutionError> {
        let config = AppConfig::load(path)?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvolutionError> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| EvolutionError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| EvolutionError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply `f` and keep the result only if it validates
    pub fn update<F>(&self, f: F) -> Result<(), EvolutionError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}
