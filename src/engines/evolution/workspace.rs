use crate::config::WorkspaceConfig;
use crate::document::{ConfigTree, SHIP_FIELD};
use crate::error::{EvolutionError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Filesystem roles: working area, seed area, adversary area and lineage
/// directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    config: WorkspaceConfig,
}

impl Workspace {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn prepare(&self) -> Result<()> {
        for dir in [
            &self.config.working_dir,
            &self.config.seed_dir,
            &self.config.adversary_dir,
            &self.config.lineage_dir,
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Remove every participant document from the working area
    pub fn clear_working_area(&self) -> Result<usize> {
        let documents = self.documents_in(&self.config.working_dir)?;
        for path in &documents {
            fs::remove_file(path)?;
        }
        Ok(documents.len())
    }

    /// Newest document in the seed area by creation time
    pub fn latest_seed(&self) -> Result<(String, PathBuf)> {
        let mut newest: Option<(SystemTime, String, PathBuf)> = None;

        for path in self.documents_in(&self.config.seed_dir)? {
            let metadata = fs::metadata(&path)?;
            let stamp = metadata.created().or_else(|_| metadata.modified())?;
            let name = file_name(&path);
            let is_newer = match &newest {
                Some((best, best_name, _)) => (stamp, &name) > (*best, best_name),
                None => true,
            };
            if is_newer {
                newest = Some((stamp, name, path));
            }
        }

        newest
            .map(|(_, name, path)| (name, path))
            .ok_or_else(|| EvolutionError::NoSeed(self.config.seed_dir.clone()))
    }

    pub fn load_latest_seed(&self) -> Result<(String, ConfigTree)> {
        let (name, path) = self.latest_seed()?;
        log::info!("Using latest seed: {}", name);
        Ok((name, ConfigTree::load(path)?))
    }

    /// Write a participant to the working area under its own name
    pub fn save_participant(&self, mut tree: ConfigTree, name: &str) -> Result<PathBuf> {
        let root = tree.root();
        tree.set_or_add_value(root, SHIP_FIELD, name);
        let path = self.document_path(&self.config.working_dir, name);
        tree.save(&path)?;
        Ok(path)
    }

    /// Persist the seed produced by generation `group_id`; returns its file name
    pub fn save_seed(&self, tree: &ConfigTree, group_id: u32) -> Result<String> {
        let path = self.document_path(&self.config.seed_dir, &format!("G{}", group_id));
        tree.save(&path)?;
        Ok(file_name(&path))
    }

    /// Uniformly chosen opponent document, if the adversary area has any
    pub fn pick_adversary<R: Rng>(&self, rng: &mut R) -> Result<Option<PathBuf>> {
        if !self.config.adversary_dir.is_dir() {
            return Ok(None);
        }
        let candidates = self.documents_in(&self.config.adversary_dir)?;
        Ok(candidates.choose(rng).cloned())
    }

    pub fn lineage_path(&self, run_id: &str) -> PathBuf {
        self.config.lineage_dir.join(format!("{}.cfg", run_id))
    }

    fn document_path(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.{}", name, self.config.document_extension))
    }

    /// Documents directly inside `dir`, sorted by path
    fn documents_in(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut documents = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let matches = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == self.config.document_extension.as_str());
            if matches {
                documents.push(path);
            }
        }
        documents.sort();
        Ok(documents)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Participant name of a document path (its file stem)
pub fn participant_name(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
