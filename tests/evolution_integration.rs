use craftevo::config::{AppConfig, WorkspaceConfig};
use craftevo::document::ConfigTree;
use craftevo::engines::evaluation::{CancelToken, TrialExecutor};
use craftevo::engines::evolution::{
    participant_name, EvolutionEngine, LineageRecord, SilentProgressCallback, ADVERSARY_PREFIX,
};
use craftevo::engines::generation::MutationCatalog;
use craftevo::error::{EvolutionError, Result};
use craftevo::services::EvolutionRunner;
use craftevo::types::{EvolutionStatus, GenerationOutcome, TrialStats};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const SEED_CRAFT: &str = r#"
ship = Glider
PART
{
	part = cockpit_4294
	MODULE
	{
		name = BDModulePilotAI
		steerMult = 2.0
	}
}
"#;

/// Trial executor that reports canned statistics after a few polls
struct ScriptedExecutor {
    stats: HashMap<String, TrialStats>,
    polls_per_trial: usize,
    remaining_polls: usize,
    submissions: Arc<Mutex<Vec<Vec<String>>>>,
    cancel_on_submit: Option<CancelToken>,
}

impl ScriptedExecutor {
    fn new(kills: &[(&str, u32)]) -> Self {
        let stats = kills
            .iter()
            .map(|(name, clean_kills)| {
                (
                    name.to_string(),
                    TrialStats {
                        clean_kills: *clean_kills,
                        ..TrialStats::default()
                    },
                )
            })
            .collect();
        Self {
            stats,
            polls_per_trial: 2,
            remaining_polls: 0,
            submissions: Arc::new(Mutex::new(Vec::new())),
            cancel_on_submit: None,
        }
    }
}

impl TrialExecutor for ScriptedExecutor {
    fn submit(&mut self, working_set: &[PathBuf]) -> Result<()> {
        let names = working_set.iter().map(|p| participant_name(p)).collect();
        self.submissions.lock().unwrap().push(names);
        self.remaining_polls = self.polls_per_trial;
        if let Some(token) = &self.cancel_on_submit {
            token.cancel();
        }
        Ok(())
    }

    fn trial_in_progress(&mut self) -> Result<bool> {
        if self.cancel_on_submit.is_some() {
            return Ok(true);
        }
        if self.remaining_polls == 0 {
            return Ok(false);
        }
        self.remaining_polls -= 1;
        Ok(true)
    }

    fn stats_for(&self, participant: &str) -> Option<TrialStats> {
        self.stats.get(participant).copied()
    }
}

fn test_config(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.workspace = WorkspaceConfig::rooted_at(root);
    config.evolution.batch_size = 2;
    config.evolution.rng_seed = Some(42);
    config.evolution.max_generations = Some(1);
    config.trial.settle_ms = 0;
    config.trial.poll_interval_ms = 1;
    config
}

fn write_seed(config: &AppConfig) -> PathBuf {
    fs::create_dir_all(&config.workspace.seed_dir).unwrap();
    let path = config.workspace.seed_dir.join("Seed.craft");
    fs::write(&path, SEED_CRAFT).unwrap();
    path
}

fn steer_only_engine(config: AppConfig) -> EvolutionEngine {
    EvolutionEngine::with_catalog(config, MutationCatalog::new(&[], &["steerMult"])).unwrap()
}

fn steer_mult(path: &Path) -> f64 {
    let tree = ConfigTree::load(path).unwrap();
    let module = tree
        .find_first(tree.root(), "MODULE", "name", "BDModulePilotAI")
        .unwrap();
    tree.get_f64(module, "steerMult").unwrap()
}

#[test]
fn test_generation_moves_seed_and_records_lineage() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_seed(&config);

    let mut engine = steer_only_engine(config.clone());
    let mut executor = ScriptedExecutor::new(&[("V1", 10), ("V2", 2), ("R1", 4)]);
    let submissions = Arc::clone(&executor.submissions);

    engine.start().unwrap();
    assert_eq!(engine.status(), EvolutionStatus::Preparing);
    assert_eq!(engine.generation_id(), 1);

    let summary = engine
        .run(&mut executor, &CancelToken::new(), &mut SilentProgressCallback)
        .unwrap();

    assert_eq!(summary.generations, 1);
    assert!(!summary.cancelled);
    assert_eq!(summary.last_seed.as_deref(), Some("G1.craft"));
    assert_eq!(engine.status(), EvolutionStatus::Idle);
    assert_eq!(engine.generation_id(), 2);

    assert_eq!(
        submissions.lock().unwrap().as_slice(),
        &[vec!["V1".to_string(), "V2".to_string(), "R1".to_string()]]
    );

    // Every participant carries its own name
    let v1 = ConfigTree::load(dir.path().join("V1.craft")).unwrap();
    assert_eq!(v1.get_value(v1.root(), "ship"), Some("V1"));
    assert!((steer_mult(&dir.path().join("V1.craft")) - 2.2).abs() < 1e-9);
    assert!((steer_mult(&dir.path().join("V2.craft")) - 1.8).abs() < 1e-9);
    assert!((steer_mult(&dir.path().join("R1.craft")) - 2.0).abs() < 1e-9);

    let next_seed = config.workspace.seed_dir.join("G1.craft");
    assert!((steer_mult(&next_seed) - 2.16).abs() < 1e-9);

    let record = LineageRecord::load(engine.lineage_path().unwrap()).unwrap();
    assert_eq!(record.evolution_id, summary.run_id);
    assert_eq!(record.current_group_id, 2);
    assert_eq!(record.next_variant_id, 3);
    assert_eq!(record.groups.len(), 1);

    let group = &record.groups[0];
    assert_eq!(group.seed_name, "Seed.craft");
    assert_eq!(group.reference_name, "R1");
    let names: Vec<&str> = group.variants.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["V1", "V2"]);
    let mutation = &group.variants[0].mutated_parts[0];
    assert_eq!(mutation.part_id, "cockpit_4294");
    assert_eq!(mutation.module_id, "BDModulePilotAI");
    assert_eq!(mutation.param_name, "steerMult");
    assert_eq!(mutation.reference_value, 2.0);

    assert_eq!(record.results.len(), 1);
    let result = &record.results[0];
    assert_eq!(result.outcome, GenerationOutcome::Improved);
    assert_eq!(result.max_score, Some(10.0));
    assert_eq!(result.reference_score, Some(4.0));
    assert_eq!(result.next_seed, "G1.craft");
    assert_eq!(result.scores.len(), 3);
    assert!(result.anomaly.is_none());
}

#[test]
fn test_missing_statistics_abort_with_unchanged_seed() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let seed_path = write_seed(&config);

    let mut engine = steer_only_engine(config.clone());
    let mut executor = ScriptedExecutor::new(&[("V1", 10), ("R1", 4)]);

    engine.start().unwrap();
    let summary = engine
        .run(&mut executor, &CancelToken::new(), &mut SilentProgressCallback)
        .unwrap();
    assert_eq!(summary.generations, 1);

    let next_seed = config.workspace.seed_dir.join("G1.craft");
    assert_eq!(
        ConfigTree::load(&next_seed).unwrap(),
        ConfigTree::load(&seed_path).unwrap()
    );

    let record = LineageRecord::load(engine.lineage_path().unwrap()).unwrap();
    assert_eq!(record.current_group_id, 2);
    let result = &record.results[0];
    assert_eq!(result.outcome, GenerationOutcome::Aborted);
    assert!(result.anomaly.as_deref().unwrap().contains("V2"));
    assert!(result.max_score.is_none());
}

#[test]
fn test_cancellation_during_trial_leaves_complete_group() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_seed(&config);

    let cancel = CancelToken::new();
    let mut engine = steer_only_engine(config.clone());
    let mut executor = ScriptedExecutor::new(&[]);
    executor.cancel_on_submit = Some(cancel.clone());

    engine.start().unwrap();
    let summary = engine
        .run(&mut executor, &cancel, &mut SilentProgressCallback)
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.generations, 0);
    assert_eq!(engine.status(), EvolutionStatus::Idle);
    assert!(!config.workspace.seed_dir.join("G1.craft").exists());

    let record = LineageRecord::load(engine.lineage_path().unwrap()).unwrap();
    assert_eq!(record.groups.len(), 1);
    assert_eq!(record.groups[0].variants.len(), 2);
    assert!(record.groups[0]
        .variants
        .iter()
        .all(|v| v.mutated_parts.len() == 1));
    assert!(record.results.is_empty());
}

#[test]
fn test_cancellation_before_generation_records_nothing() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_seed(&config);

    let cancel = CancelToken::new();
    cancel.cancel();
    let mut engine = steer_only_engine(config);
    let mut executor = ScriptedExecutor::new(&[]);

    engine.start().unwrap();
    let summary = engine
        .run(&mut executor, &cancel, &mut SilentProgressCallback)
        .unwrap();

    assert!(summary.cancelled);
    assert!(executor.submissions.lock().unwrap().is_empty());
    let record = LineageRecord::load(engine.lineage_path().unwrap()).unwrap();
    assert!(record.groups.is_empty());
    assert_eq!(record.current_group_id, 1);
}

#[test]
fn test_seed_without_modules_ends_run_without_trial() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.evolution.max_generations = Some(200);
    fs::create_dir_all(&config.workspace.seed_dir).unwrap();
    fs::write(
        config.workspace.seed_dir.join("Bare.craft"),
        "ship = Bare\nPART\n{\n\tpart = hull_1\n}\n",
    )
    .unwrap();

    let mut engine = EvolutionEngine::new(config.clone()).unwrap();
    let mut executor = ScriptedExecutor::new(&[]);

    engine.start().unwrap();
    let result = engine.run(&mut executor, &CancelToken::new(), &mut SilentProgressCallback);

    assert!(matches!(result, Err(EvolutionError::SamplingExhausted { attempts: 0, .. })));
    assert_eq!(engine.status(), EvolutionStatus::Idle);
    assert!(executor.submissions.lock().unwrap().is_empty());
    assert!(!config.workspace.seed_dir.join("G1.craft").exists());

    let record = LineageRecord::load(engine.lineage_path().unwrap()).unwrap();
    assert!(record.groups.is_empty());
    assert!(record.results.is_empty());
    assert_eq!(record.current_group_id, 1);
}

#[test]
fn test_no_effective_variant_ends_run() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.evolution.max_generations = Some(200);
    fs::create_dir_all(&config.workspace.seed_dir).unwrap();
    fs::write(
        config.workspace.seed_dir.join("Idle.craft"),
        "ship = Idle\nPART\n{\n\tpart = cockpit_1\n\tMODULE\n\t{\n\t\tname = BDModulePilotAI\n\t\tmaxSpeed = 300\n\t}\n}\n",
    )
    .unwrap();

    let mut engine = steer_only_engine(config.clone());
    let mut executor = ScriptedExecutor::new(&[]);

    engine.start().unwrap();
    let result = engine.run(&mut executor, &CancelToken::new(), &mut SilentProgressCallback);

    assert!(matches!(result, Err(EvolutionError::NoEffectiveVariants)));
    assert_eq!(engine.status(), EvolutionStatus::Idle);
    assert!(executor.submissions.lock().unwrap().is_empty());
    assert!(!config.workspace.seed_dir.join("G1.craft").exists());
    assert!(engine.results().is_empty());
}

#[test]
fn test_start_rejected_while_running() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_seed(&config);

    let mut engine = steer_only_engine(config);
    engine.start().unwrap();
    assert!(matches!(engine.start(), Err(EvolutionError::InvalidState(_))));

    assert!(engine.stop());
    assert!(!engine.stop());
    assert_eq!(engine.status(), EvolutionStatus::Idle);
}

#[test]
fn test_start_without_seed_stays_idle() {
    let dir = TempDir::new().unwrap();
    let mut engine = steer_only_engine(test_config(dir.path()));

    assert!(matches!(engine.start(), Err(EvolutionError::NoSeed(_))));
    assert_eq!(engine.status(), EvolutionStatus::Idle);
}

#[test]
fn test_adversary_is_scored_but_not_aggregated() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_seed(&config);
    fs::create_dir_all(&config.workspace.adversary_dir).unwrap();
    fs::write(config.workspace.adversary_dir.join("Ace.craft"), SEED_CRAFT).unwrap();

    let mut engine = steer_only_engine(config.clone());
    let mut executor = ScriptedExecutor::new(&[("V1", 10), ("V2", 2), ("R1", 4), ("Ace", 50)]);
    let submissions = Arc::clone(&executor.submissions);

    engine.start().unwrap();
    engine
        .run(&mut executor, &CancelToken::new(), &mut SilentProgressCallback)
        .unwrap();

    assert!(submissions.lock().unwrap()[0].contains(&"Ace".to_string()));
    let ace = ConfigTree::load(dir.path().join("Ace.craft")).unwrap();
    assert_eq!(ace.get_value(ace.root(), "ship"), Some("Ace"));

    let result = &engine.results()[0];
    assert_eq!(result.outcome, GenerationOutcome::Improved);
    assert_eq!(result.max_score, Some(10.0));
    assert!(result.scores.iter().any(|(name, score)| name == "Ace" && *score == 50.0));
}

#[test]
fn test_adversary_named_like_reference_is_renamed() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_seed(&config);
    fs::create_dir_all(&config.workspace.adversary_dir).unwrap();
    fs::write(
        config.workspace.adversary_dir.join("R1.craft"),
        SEED_CRAFT.replace("steerMult = 2.0", "steerMult = 9.0"),
    )
    .unwrap();

    let renamed = format!("{}R1", ADVERSARY_PREFIX);
    let mut engine = steer_only_engine(config.clone());
    let mut executor =
        ScriptedExecutor::new(&[("V1", 10), ("V2", 2), ("R1", 4), (renamed.as_str(), 50)]);
    let submissions = Arc::clone(&executor.submissions);

    engine.start().unwrap();
    engine
        .run(&mut executor, &CancelToken::new(), &mut SilentProgressCallback)
        .unwrap();

    assert_eq!(
        submissions.lock().unwrap()[0],
        ["V1", "V2", "R1", renamed.as_str()]
    );
    assert!((steer_mult(&dir.path().join("R1.craft")) - 2.0).abs() < 1e-9);
    let adversary_path = dir.path().join(format!("{}.craft", renamed));
    assert!((steer_mult(&adversary_path) - 9.0).abs() < 1e-9);
    let adversary = ConfigTree::load(&adversary_path).unwrap();
    assert_eq!(adversary.get_value(adversary.root(), "ship"), Some(renamed.as_str()));

    let result = &engine.results()[0];
    assert_eq!(result.outcome, GenerationOutcome::Improved);
    assert_eq!(result.reference_score, Some(4.0));
    assert!(result.scores.iter().any(|(name, score)| *name == renamed && *score == 50.0));
}

#[test]
fn test_resume_continues_identifiers() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_seed(&config);
    let kills = [("V1", 10), ("V2", 2), ("R1", 4), ("V3", 1), ("V4", 6), ("R2", 3)];

    let mut first = steer_only_engine(config.clone());
    first.start().unwrap();
    first
        .run(&mut ScriptedExecutor::new(&kills), &CancelToken::new(), &mut SilentProgressCallback)
        .unwrap();
    let run_id = first.run_id().to_string();

    let mut second = steer_only_engine(config.clone());
    second.resume(&run_id).unwrap();
    assert_eq!(second.generation_id(), 2);
    second
        .run(&mut ScriptedExecutor::new(&kills), &CancelToken::new(), &mut SilentProgressCallback)
        .unwrap();

    let record = LineageRecord::load(second.lineage_path().unwrap()).unwrap();
    assert_eq!(record.groups.len(), 2);
    assert_eq!(record.groups[1].seed_name, "G1.craft");
    assert_eq!(record.groups[1].reference_name, "R2");
    let names: Vec<&str> = record.groups[1].variants.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["V3", "V4"]);
    assert_eq!(record.next_variant_id, 5);
    assert_eq!(record.current_group_id, 3);
    assert!(config.workspace.seed_dir.join("G2.craft").exists());
}

#[test]
fn test_resume_after_cancelled_trial_closes_abandoned_group() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let seed_path = write_seed(&config);

    let cancel = CancelToken::new();
    let mut first = steer_only_engine(config.clone());
    let mut executor = ScriptedExecutor::new(&[]);
    executor.cancel_on_submit = Some(cancel.clone());
    first.start().unwrap();
    assert!(first.run(&mut executor, &cancel, &mut SilentProgressCallback).unwrap().cancelled);
    let run_id = first.run_id().to_string();

    let mut second = steer_only_engine(config.clone());
    second.resume(&run_id).unwrap();
    assert_eq!(second.generation_id(), 2);
    assert_eq!(
        ConfigTree::load(config.workspace.seed_dir.join("G1.craft")).unwrap(),
        ConfigTree::load(&seed_path).unwrap()
    );

    let kills = [("V3", 6), ("V4", 1), ("R2", 3)];
    let summary = second
        .run(&mut ScriptedExecutor::new(&kills), &CancelToken::new(), &mut SilentProgressCallback)
        .unwrap();
    assert_eq!(summary.generations, 1);

    let record = LineageRecord::load(second.lineage_path().unwrap()).unwrap();
    let group_ids: Vec<u32> = record.groups.iter().map(|g| g.id).collect();
    assert_eq!(group_ids, [1, 2]);
    let references: Vec<&str> = record.groups.iter().map(|g| g.reference_name.as_str()).collect();
    assert_eq!(references, ["R1", "R2"]);

    let result_ids: Vec<u32> = record.results.iter().map(|r| r.group_id).collect();
    assert_eq!(result_ids, [1, 2]);
    assert_eq!(record.results[0].outcome, GenerationOutcome::Aborted);
    assert!(record.results[0].anomaly.as_deref().unwrap().contains("cancelled"));
    assert_eq!(record.results[1].outcome, GenerationOutcome::Improved);

    let names: Vec<&str> = record
        .group(2)
        .unwrap()
        .variants
        .iter()
        .map(|v| v.name.as_str())
        .collect();
    assert_eq!(names, ["V3", "V4"]);
    assert_eq!(record.current_group_id, 3);
}

#[test]
fn test_runner_stop_cancels_running_trial() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.evolution.max_generations = None;
    write_seed(&config);

    let mut executor = ScriptedExecutor::new(&[]);
    executor.polls_per_trial = usize::MAX;
    let mut runner = EvolutionRunner::with_engine(steer_only_engine(config), Box::new(executor));

    runner.start().unwrap();
    assert!(runner.stop());

    let summary = runner.wait().unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.generations, 0);
    assert_eq!(runner.current_status(), EvolutionStatus::Idle);
}

#[test]
fn test_runner_drives_engine_in_background() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_seed(&config);

    let executor = ScriptedExecutor::new(&[("V1", 10), ("V2", 2), ("R1", 4)]);
    let mut runner = EvolutionRunner::with_engine(steer_only_engine(config), Box::new(executor));

    runner.start().unwrap();
    assert!(!runner.run_id().is_empty());

    let summary = runner.wait().unwrap();
    assert_eq!(summary.generations, 1);
    assert_eq!(runner.current_status(), EvolutionStatus::Idle);
    assert_eq!(runner.current_generation_id(), 2);
    assert!(!runner.stop());
}
