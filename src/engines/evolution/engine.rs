use super::lineage::{self, GenerationResult, LineageRecord};
use super::progress::ProgressCallback;
use super::workspace::{participant_name, Workspace};
use crate::config::AppConfig;
use crate::document::ConfigTree;
use crate::engines::aggregation::{AggregateOutcome, CentroidAggregator};
use crate::engines::evaluation::{
    CancelToken, FitnessScorer, TrialCoordinator, TrialExecutor, TrialOutcome,
};
use crate::engines::generation::{
    MutationCatalog, MutationOperator, MutationSampler, VariantMaterializer,
};
use crate::error::{EvolutionError, Result};
use crate::types::{EvolutionState, EvolutionStatus, GenerationOutcome, Variant, VariantGroup};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

/// Prepended to an adversary whose file name matches a variant or reference
pub const ADVERSARY_PREFIX: &str = "ADV_";

/// Result of driving one generation
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationStep {
    Completed(GenerationResult),
    /// Stop was requested; the in-flight generation is abandoned
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub generations: usize,
    pub cancelled: bool,
    pub last_seed: Option<String>,
}

/// Working set of a generation after materialization
struct PreparedGeneration {
    seed_name: String,
    working_set: Vec<PathBuf>,
    participants: Vec<String>,
    adversary: Option<String>,
}

/// Owns the generation loop, run identifiers and the lineage record.
///
/// One engine is built per process and every component hangs off it; nothing
/// is global. All work happens on the caller's thread and the only suspension
/// point is the trial wait inside [`TrialCoordinator::run`].
pub struct EvolutionEngine {
    config: AppConfig,
    workspace: Workspace,
    sampler: MutationSampler,
    materializer: VariantMaterializer,
    scorer: FitnessScorer,
    aggregator: CentroidAggregator,
    coordinator: TrialCoordinator,
    rng: StdRng,
    state: EvolutionState,
    group_id: u32,
    next_variant_id: u32,
    results: Vec<GenerationResult>,
}

impl EvolutionEngine {
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_catalog(config, MutationCatalog::default())
    }

    pub fn with_catalog(config: AppConfig, catalog: MutationCatalog) -> Result<Self> {
        config.validate()?;

        let rng = match config.evolution.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            workspace: Workspace::new(config.workspace.clone()),
            sampler: MutationSampler::new(catalog, &config.evolution),
            materializer: VariantMaterializer::new(),
            scorer: FitnessScorer::new(config.fitness),
            aggregator: CentroidAggregator::new(),
            coordinator: TrialCoordinator::new(&config.trial),
            rng,
            state: EvolutionState::idle(),
            group_id: 0,
            next_variant_id: 0,
            results: Vec::new(),
            config,
        })
    }

    pub fn status(&self) -> EvolutionStatus {
        self.state.status
    }

    /// Id of the generation in progress (or the next one to run)
    pub fn generation_id(&self) -> u32 {
        self.group_id
    }

    pub fn run_id(&self) -> &str {
        &self.state.id
    }

    pub fn state(&self) -> &EvolutionState {
        &self.state
    }

    pub fn results(&self) -> &[GenerationResult] {
        &self.results
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn lineage_path(&self) -> Option<PathBuf> {
        (!self.state.id.is_empty()).then(|| self.workspace.lineage_path(&self.state.id))
    }

    /// Begin a new run. Rejected unless idle; fails if no seed exists.
    pub fn start(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.workspace.prepare()?;
        self.workspace.latest_seed()?;

        let base = Utc::now().timestamp().to_string();
        let mut run_id = base.clone();
        let mut suffix = 2;
        while self.workspace.lineage_path(&run_id).exists() {
            run_id = format!("{}-{}", base, suffix);
            suffix += 1;
        }

        log::info!("Evolution {} starting", run_id);
        self.state = EvolutionState::new(run_id);
        self.group_id = 1;
        self.next_variant_id = 1;
        self.results.clear();
        self.persist_lineage()?;
        Ok(())
    }

    /// Continue a stopped run from its lineage record.
    ///
    /// A group that was persisted but never received a RESULT (the run was
    /// stopped mid-trial) is closed as aborted with the unchanged seed, so the
    /// resumed run starts at a fresh group id.
    pub fn resume(&mut self, run_id: &str) -> Result<()> {
        self.ensure_idle()?;
        self.workspace.prepare()?;
        self.workspace.latest_seed()?;

        let record = LineageRecord::load(self.workspace.lineage_path(run_id))?;
        log::info!(
            "Evolution {} resuming at group {}",
            record.evolution_id,
            record.current_group_id
        );

        self.state = EvolutionState {
            id: record.evolution_id,
            status: EvolutionStatus::Preparing,
            groups: record.groups,
        };
        self.group_id = record.current_group_id;
        self.next_variant_id = record.next_variant_id;
        self.results = record.results;

        if self.has_abandoned_group() {
            if let Err(e) = self.close_abandoned_group() {
                self.state.status = EvolutionStatus::Idle;
                return Err(e);
            }
        }
        Ok(())
    }

    fn has_abandoned_group(&self) -> bool {
        self.state.groups.last().is_some_and(|g| g.id == self.group_id)
            && !self.results.iter().any(|r| r.group_id == self.group_id)
    }

    fn close_abandoned_group(&mut self) -> Result<()> {
        log::warn!(
            "Evolution {}: group {} was abandoned, closing it as aborted",
            self.state.id,
            self.group_id
        );
        let (_, seed) = self.workspace.load_latest_seed()?;
        let next_seed = self.workspace.save_seed(&seed, self.group_id)?;

        self.results.push(GenerationResult {
            group_id: self.group_id,
            outcome: GenerationOutcome::Aborted,
            max_score: None,
            reference_score: None,
            next_seed,
            completed_at: Utc::now().to_rfc3339(),
            anomaly: Some(EvolutionError::GenerationCancelled.to_string()),
            scores: Vec::new(),
        });
        self.group_id += 1;
        self.persist_lineage()
    }

    /// Force the engine idle, abandoning any in-flight generation. Files
    /// already written stay as they are. Returns false if already idle.
    pub fn stop(&mut self) -> bool {
        if self.state.status == EvolutionStatus::Idle {
            log::debug!("Evolution not running");
            return false;
        }
        log::info!("Evolution {} stopping", self.state.id);
        self.state.status = EvolutionStatus::Idle;
        true
    }

    /// Run generations until cancelled, the generation limit is reached, or a
    /// run-fatal error occurs. The engine is idle when this returns.
    pub fn run(
        &mut self,
        executor: &mut dyn TrialExecutor,
        cancel: &CancelToken,
        progress: &mut dyn ProgressCallback,
    ) -> Result<RunSummary> {
        let limit = self.config.evolution.max_generations;
        let mut generations = 0;
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if limit.is_some_and(|max| generations >= max) {
                break;
            }

            match self.run_generation(executor, cancel, progress) {
                Ok(GenerationStep::Completed(_)) => generations += 1,
                Ok(GenerationStep::Cancelled) => {
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    log::error!("Evolution {} failed: {}", self.state.id, e);
                    self.stop();
                    progress.on_status_change(EvolutionStatus::Idle, self.group_id);
                    return Err(e);
                }
            }
        }

        self.stop();
        progress.on_status_change(EvolutionStatus::Idle, self.group_id);

        Ok(RunSummary {
            run_id: self.state.id.clone(),
            generations,
            cancelled,
            last_seed: self.results.last().map(|r| r.next_seed.clone()),
        })
    }

    /// Drive one full generation: sample, materialize, trial, aggregate.
    ///
    /// Missing statistics and inconsistent reference values abort only this
    /// generation: it re-seeds with the unchanged document and still completes.
    /// Anything else, including a batch with no effective variant, is returned
    /// as a run-fatal error.
    pub fn run_generation(
        &mut self,
        executor: &mut dyn TrialExecutor,
        cancel: &CancelToken,
        progress: &mut dyn ProgressCallback,
    ) -> Result<GenerationStep> {
        if self.state.status == EvolutionStatus::Idle {
            return Err(EvolutionError::InvalidState("evolution not started".to_string()));
        }
        if cancel.is_cancelled() {
            self.stop();
            return Ok(GenerationStep::Cancelled);
        }

        progress.on_generation_start(self.group_id);
        self.set_status(EvolutionStatus::GeneratingVariants, progress);

        self.workspace.clear_working_area()?;
        let (seed_name, seed) = self.workspace.load_latest_seed()?;

        let prepared = match self.generate_variants(seed_name, &seed) {
            Ok(prepared) => prepared,
            Err(e) if e.is_generation_recoverable() => {
                return self
                    .abort_generation(&seed, &e, progress)
                    .map(GenerationStep::Completed);
            }
            Err(e) => return Err(e),
        };

        if cancel.is_cancelled() {
            self.stop();
            return Ok(GenerationStep::Cancelled);
        }
        self.set_status(EvolutionStatus::RunningTournament, progress);
        match self.coordinator.run(executor, &prepared.working_set, cancel)? {
            TrialOutcome::Completed => {}
            TrialOutcome::Cancelled => {
                self.stop();
                return Ok(GenerationStep::Cancelled);
            }
        }

        self.set_status(EvolutionStatus::ProcessingResults, progress);
        match self.process_results(&prepared, &seed, executor) {
            Ok(result) => self.finish_generation(result, progress).map(GenerationStep::Completed),
            Err(e) if e.is_generation_recoverable() => self
                .abort_generation(&seed, &e, progress)
                .map(GenerationStep::Completed),
            Err(e) => Err(e),
        }
    }

    fn generate_variants(&mut self, seed_name: String, seed: &ConfigTree) -> Result<PreparedGeneration> {
        let mutations = self.sampler.sample(seed, &mut self.rng)?;
        let materialized = self.materializer.materialize_batch(seed, &mutations);

        let mut variants = Vec::new();
        let mut working_set = Vec::new();
        let mut participants = Vec::new();

        for candidate in materialized {
            if !candidate.is_effective() {
                log::warn!(
                    "Group {}: {} changed nothing, variant dropped",
                    self.group_id,
                    candidate.mutation.describe()
                );
                continue;
            }
            let id = self.next_variant_id;
            self.next_variant_id += 1;
            let name = format!("V{}", id);

            working_set.push(self.workspace.save_participant(candidate.tree, &name)?);
            participants.push(name.clone());
            variants.push(Variant {
                id,
                name,
                mutated_parts: candidate.mutated_parts,
            });
        }

        if variants.is_empty() {
            return Err(EvolutionError::NoEffectiveVariants);
        }

        let reference_name = format!("R{}", self.group_id);
        working_set.push(self.workspace.save_participant(seed.clone(), &reference_name)?);
        participants.push(reference_name.clone());

        let adversary = match self.workspace.pick_adversary(&mut self.rng)? {
            Some(path) => {
                let mut name = participant_name(&path);
                while participants.contains(&name) {
                    log::warn!(
                        "Group {}: adversary {} collides with a participant, renamed",
                        self.group_id,
                        name
                    );
                    name = format!("{}{}", ADVERSARY_PREFIX, name);
                }
                let opponent = ConfigTree::load(&path)?;
                working_set.push(self.workspace.save_participant(opponent, &name)?);
                participants.push(name.clone());
                log::info!("Group {}: adversary {}", self.group_id, name);
                Some(name)
            }
            None => None,
        };

        log::info!(
            "Group {}: {} variants from seed {}",
            self.group_id,
            variants.len(),
            seed_name
        );

        self.state.groups.push(VariantGroup {
            id: self.group_id,
            seed_name: seed_name.clone(),
            reference_name,
            variants,
        });
        self.persist_lineage()?;

        Ok(PreparedGeneration {
            seed_name,
            working_set,
            participants,
            adversary,
        })
    }

    fn process_results(
        &self,
        prepared: &PreparedGeneration,
        seed: &ConfigTree,
        executor: &dyn TrialExecutor,
    ) -> Result<GenerationResult> {
        let group = self
            .state
            .groups
            .last()
            .filter(|g| g.id == self.group_id)
            .ok_or_else(|| EvolutionError::InvalidState("no variant group for this generation".to_string()))?;

        let scores = self
            .scorer
            .score_all(&prepared.participants, |name| executor.stats_for(name))?;
        if let Some(adversary) = &prepared.adversary {
            log::info!("Group {}: adversary {} scored {:.4}", group.id, adversary, scores[adversary]);
        }

        let aggregate = self.aggregator.aggregate(group, &scores, seed)?;
        let (outcome, next_tree) = match aggregate.outcome {
            AggregateOutcome::Improved { tree, unresolved } => {
                if !unresolved.is_empty() {
                    log::warn!("Group {}: {} target(s) unresolved", group.id, unresolved.len());
                }
                (GenerationOutcome::Improved, tree)
            }
            AggregateOutcome::Unchanged => (GenerationOutcome::Unchanged, seed.clone()),
        };

        let group_id = group.id;
        let next_seed = self.workspace.save_seed(&next_tree, group_id)?;
        log::info!(
            "Group {}: {} from {}, next seed {}",
            group_id,
            outcome.as_str(),
            prepared.seed_name,
            next_seed
        );

        let mut scores: Vec<(String, f64)> = scores.into_iter().collect();
        scores.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(GenerationResult {
            group_id,
            outcome,
            max_score: Some(aggregate.max_score),
            reference_score: Some(aggregate.reference_score),
            next_seed,
            completed_at: Utc::now().to_rfc3339(),
            anomaly: None,
            scores,
        })
    }

    /// Re-seed with the unchanged prior document and record the anomaly
    fn abort_generation(
        &mut self,
        seed: &ConfigTree,
        error: &EvolutionError,
        progress: &mut dyn ProgressCallback,
    ) -> Result<GenerationResult> {
        log::warn!("Group {} aborted: {}", self.group_id, error);
        let next_seed = self.workspace.save_seed(seed, self.group_id)?;

        let result = GenerationResult {
            group_id: self.group_id,
            outcome: GenerationOutcome::Aborted,
            max_score: None,
            reference_score: None,
            next_seed,
            completed_at: Utc::now().to_rfc3339(),
            anomaly: Some(error.to_string()),
            scores: Vec::new(),
        };
        self.finish_generation(result, progress)
    }

    fn finish_generation(
        &mut self,
        result: GenerationResult,
        progress: &mut dyn ProgressCallback,
    ) -> Result<GenerationResult> {
        self.results.push(result.clone());
        self.group_id += 1;
        self.persist_lineage()?;
        self.set_status(EvolutionStatus::Preparing, progress);
        progress.on_generation_complete(&result);
        Ok(result)
    }

    fn set_status(&mut self, status: EvolutionStatus, progress: &mut dyn ProgressCallback) {
        self.state.status = status;
        progress.on_status_change(status, self.group_id);
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.state.status != EvolutionStatus::Idle {
            return Err(EvolutionError::InvalidState(format!(
                "evolution {} already running",
                self.state.id
            )));
        }
        Ok(())
    }

    fn persist_lineage(&self) -> Result<()> {
        let tree = lineage::to_tree(
            &self.state.id,
            self.group_id,
            self.next_variant_id,
            &self.state.groups,
            &self.results,
        );
        tree.save(self.workspace.lineage_path(&self.state.id))
    }
}
