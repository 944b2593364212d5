use craftevo::config::FitnessConfig;
use craftevo::engines::evaluation::FitnessScorer;
use craftevo::error::EvolutionError;
use craftevo::types::TrialStats;
use std::collections::HashMap;

fn stats(shots_fired: u32, hits_landed: u32, clean_kills: u32, missile_kills: u32, ram_kills: u32) -> TrialStats {
    TrialStats {
        shots_fired,
        hits_landed,
        clean_kills,
        missile_kills,
        ram_kills,
    }
}

#[test]
fn test_default_weights_score() {
    let scorer = FitnessScorer::default();
    let score = scorer.score("A", &stats(10, 5, 1, 0, 0));
    assert!((score - 3.57).abs() < 1e-9, "score was {}", score);
}

#[test]
fn test_every_kill_kind_counts() {
    let scorer = FitnessScorer::default();
    let score = scorer.score("A", &stats(0, 0, 1, 2, 3));
    assert!((score - 6.0).abs() < 1e-9);
}

#[test]
fn test_no_shots_means_zero_accuracy() {
    let scorer = FitnessScorer::default();
    assert_eq!(scorer.score("idle", &TrialStats::default()), 0.0);
}

#[test]
fn test_custom_weights() {
    let scorer = FitnessScorer::new(FitnessConfig {
        kill_weight: 2.0,
        shots_fired_weight: 0.0,
        hits_landed_weight: 0.0,
        accuracy_weight: 10.0,
    });
    let score = scorer.score("B", &stats(4, 1, 3, 0, 0));
    assert!((score - 8.5).abs() < 1e-9);
}

#[test]
fn test_score_all_requires_every_participant() {
    let table: HashMap<&str, TrialStats> = [("V1", stats(10, 5, 1, 0, 0)), ("R1", stats(2, 1, 0, 0, 0))]
        .into_iter()
        .collect();
    let scorer = FitnessScorer::default();

    let names = vec!["V1".to_string(), "R1".to_string()];
    let scores = scorer.score_all(&names, |name| table.get(name).copied()).unwrap();
    assert_eq!(scores.len(), 2);
    assert!((scores["V1"] - 3.57).abs() < 1e-9);

    let names = vec!["V1".to_string(), "V2".to_string()];
    let result = scorer.score_all(&names, |name| table.get(name).copied());
    assert!(matches!(result, Err(EvolutionError::MissingStats(name)) if name == "V2"));
}
