use crate::config::TrialConfig;
use crate::error::{EvolutionError, Result};
use crate::types::TrialStats;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

/// Boundary to whatever actually runs the competition
pub trait TrialExecutor: Send {
    /// Begin a trial over the given participant documents
    fn submit(&mut self, working_set: &[PathBuf]) -> Result<()>;

    /// Polled until it returns `Ok(false)`
    fn trial_in_progress(&mut self) -> Result<bool>;

    /// Statistics of a finished trial, by participant name
    fn stats_for(&self, participant: &str) -> Option<TrialStats>;

    /// Best-effort cancellation of a running trial
    fn abort(&mut self) {}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantTally {
    #[serde(default)]
    pub shots_fired: u32,
    #[serde(default)]
    pub hits_landed: u32,
}

/// Results file written by an external trial.
///
/// Kill maps are keyed by victim and hold the credited participant, so a
/// victim can be counted at most once per attribution kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialScoreboard {
    #[serde(default)]
    pub participants: HashMap<String, ParticipantTally>,
    #[serde(default)]
    pub clean_kills: HashMap<String, String>,
    #[serde(default)]
    pub missile_kills: HashMap<String, String>,
    #[serde(default)]
    pub ram_kills: HashMap<String, String>,
}

impl TrialScoreboard {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn stats_for(&self, participant: &str) -> Option<TrialStats> {
        let tally = self.participants.get(participant)?;
        Some(TrialStats {
            shots_fired: tally.shots_fired,
            hits_landed: tally.hits_landed,
            clean_kills: credited(&self.clean_kills, participant),
            missile_kills: credited(&self.missile_kills, participant),
            ram_kills: credited(&self.ram_kills, participant),
        })
    }
}

fn credited(kills: &HashMap<String, String>, participant: &str) -> u32 {
    kills.values().filter(|killer| killer.as_str() == participant).count() as u32
}

/// Runs trials through an external program.
///
/// The program receives the working-set paths as trailing arguments and must
/// leave a [`TrialScoreboard`] JSON at `results_file` before exiting.
pub struct CommandTrialExecutor {
    command: String,
    args: Vec<String>,
    results_file: PathBuf,
    child: Option<Child>,
    scoreboard: Option<TrialScoreboard>,
}

impl CommandTrialExecutor {
    pub fn new(config: &TrialConfig) -> Result<Self> {
        if config.command.trim().is_empty() {
            return Err(EvolutionError::ExecutorUnavailable(
                "no trial command configured".to_string(),
            ));
        }
        Ok(Self {
            command: config.command.clone(),
            args: config.args.clone(),
            results_file: config.results_file.clone(),
            child: None,
            scoreboard: None,
        })
    }
}

impl TrialExecutor for CommandTrialExecutor {
    fn submit(&mut self, working_set: &[PathBuf]) -> Result<()> {
        if self.child.is_some() {
            return Err(EvolutionError::InvalidState("trial already running".to_string()));
        }
        self.scoreboard = None;
        match std::fs::remove_file(&self.results_file) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let child = Command::new(&self.command)
            .args(&self.args)
            .args(working_set)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    EvolutionError::ExecutorUnavailable(format!("'{}' not found", self.command))
                }
                _ => EvolutionError::Io(e),
            })?;

        log::info!("Trial started: {} ({} participants)", self.command, working_set.len());
        self.child = Some(child);
        Ok(())
    }

    fn trial_in_progress(&mut self) -> Result<bool> {
        let Some(child) = self.child.as_mut() else {
            return Ok(false);
        };
        let Some(status) = child.try_wait()? else {
            return Ok(true);
        };
        self.child = None;

        if !status.success() {
            return Err(EvolutionError::TrialFailed(format!(
                "'{}' exited with {}",
                self.command, status
            )));
        }
        let scoreboard = TrialScoreboard::load(&self.results_file).map_err(|e| {
            EvolutionError::TrialFailed(format!(
                "unreadable results {}: {}",
                self.results_file.display(),
                e
            ))
        })?;
        self.scoreboard = Some(scoreboard);
        Ok(false)
    }

    fn stats_for(&self, participant: &str) -> Option<TrialStats> {
        self.scoreboard.as_ref().and_then(|s| s.stats_for(participant))
    }

    fn abort(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                log::warn!("Failed to stop trial process: {}", e);
            }
            let _ = child.wait();
        }
    }
}

impl Drop for CommandTrialExecutor {
    fn drop(&mut self) {
        self.abort();
    }
}
