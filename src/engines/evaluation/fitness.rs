use crate::config::FitnessConfig;
use crate::error::{EvolutionError, Result};
use crate::types::TrialStats;
use std::collections::HashMap;

/// Converts trial statistics into a scalar fitness.
///
/// `kills*w_k + shots*w_s + hits*w_h + accuracy*w_a`, where accuracy is
/// `hits / shots` (zero when nothing was fired). Scores are left on their raw
/// scale; normalization is the aggregator's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitnessScorer {
    weights: FitnessConfig,
}

impl FitnessScorer {
    pub fn new(weights: FitnessConfig) -> Self {
        Self { weights }
    }

    pub fn score(&self, participant: &str, stats: &TrialStats) -> f64 {
        let accuracy = if stats.shots_fired > 0 {
            stats.hits_landed as f64 / stats.shots_fired as f64
        } else {
            0.0
        };

        let score = self.weights.kill_weight * stats.kills() as f64
            + self.weights.shots_fired_weight * stats.shots_fired as f64
            + self.weights.hits_landed_weight * stats.hits_landed as f64
            + self.weights.accuracy_weight * accuracy;

        log::debug!("Score for {} => {:.4}", participant, score);
        score
    }

    /// Score every named participant. A participant without statistics fails
    /// the whole call rather than being scored as zero.
    pub fn score_all<F>(&self, participants: &[String], lookup: F) -> Result<HashMap<String, f64>>
    where
        F: Fn(&str) -> Option<TrialStats>,
    {
        let mut scores = HashMap::with_capacity(participants.len());
        for name in participants {
            let stats = lookup(name).ok_or_else(|| EvolutionError::MissingStats(name.clone()))?;
            scores.insert(name.clone(), self.score(name, &stats));
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_shots_has_zero_accuracy() {
        let scorer = FitnessScorer::default();
        let stats = TrialStats {
            ram_kills: 2,
            ..TrialStats::default()
        };
        assert_eq!(scorer.score("A", &stats), 2.0);
    }

    #[test]
    fn test_score_all_reports_missing_participant() {
        let scorer = FitnessScorer::default();
        let names = vec!["V1".to_string(), "R1".to_string()];
        let result = scorer.score_all(&names, |name| {
            (name == "V1").then(TrialStats::default)
        });
        match result {
            Err(EvolutionError::MissingStats(name)) => assert_eq!(name, "R1"),
            other => panic!("expected MissingStats, got {:?}", other),
        }
    }
}
