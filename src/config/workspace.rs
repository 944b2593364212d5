use super::traits::{invalid, ConfigSection};
use crate::error::EvolutionError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory roles shared with the trial executor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Variant documents consumed by the trial executor
    pub working_dir: PathBuf,
    /// One seed per completed generation; the newest is active
    pub seed_dir: PathBuf,
    /// Optional opponents, one copied into the working area per generation
    pub adversary_dir: PathBuf,
    /// One lineage record per run
    pub lineage_dir: PathBuf,
    pub document_extension: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("Autospawn"),
            seed_dir: PathBuf::from("Autospawn/evolutions/seeds"),
            adversary_dir: PathBuf::from("Autospawn/adversaries"),
            lineage_dir: PathBuf::from("Autospawn/evolutions"),
            document_extension: "craft".to_string(),
        }
    }
}

impl WorkspaceConfig {
    /// Every role rooted under `root`, using the default layout
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            working_dir: root.clone(),
            seed_dir: root.join("evolutions").join("seeds"),
            adversary_dir: root.join("adversaries"),
            lineage_dir: root.join("evolutions"),
            ..Self::default()
        }
    }
}

impl ConfigSection for WorkspaceConfig {
    fn section_name() -> &'static str {
        "workspace"
    }

    fn validate(&self) -> Result<(), EvolutionError> {
        if self.document_extension.is_empty() || self.document_extension.contains('.') {
            return Err(invalid::<Self>("document_extension must be a bare extension like 'craft'"));
        }
        if self.seed_dir == self.working_dir {
            return Err(invalid::<Self>("seed_dir must differ from working_dir"));
        }
        if self.adversary_dir == self.working_dir {
            return Err(invalid::<Self>("adversary_dir must differ from working_dir"));
        }
        Ok(())
    }
}
