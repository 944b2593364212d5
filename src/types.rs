use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of an evolution run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvolutionStatus {
    Idle,
    Preparing,
    GeneratingVariants,
    RunningTournament,
    ProcessingResults,
}

impl fmt::Display for EvolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EvolutionStatus::Idle => "Idle",
            EvolutionStatus::Preparing => "Preparing",
            EvolutionStatus::GeneratingVariants => "GeneratingVariants",
            EvolutionStatus::RunningTournament => "RunningTournament",
            EvolutionStatus::ProcessingResults => "ProcessingResults",
        };
        f.write_str(label)
    }
}

/// One field changed by a mutation, with the values actually applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutatedPart {
    pub part_id: String,
    pub module_id: String,
    pub param_name: String,
    pub reference_value: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: u32,
    pub name: String,
    pub mutated_parts: Vec<MutatedPart>,
}

/// One generation's variants, plus the name of the unmutated reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantGroup {
    pub id: u32,
    pub seed_name: String,
    pub reference_name: String,
    pub variants: Vec<Variant>,
}

/// Mutable top-level state of a run. Groups are append-only.
#[derive(Debug, Clone)]
pub struct EvolutionState {
    pub id: String,
    pub status: EvolutionStatus,
    pub groups: Vec<VariantGroup>,
}

impl EvolutionState {
    /// State before any run has started
    pub fn idle() -> Self {
        Self {
            id: String::new(),
            status: EvolutionStatus::Idle,
            groups: Vec::new(),
        }
    }

    pub fn new(id: String) -> Self {
        Self {
            id,
            status: EvolutionStatus::Preparing,
            groups: Vec::new(),
        }
    }
}

/// Raw per-participant statistics reported by a trial
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialStats {
    pub shots_fired: u32,
    pub hits_landed: u32,
    pub clean_kills: u32,
    pub missile_kills: u32,
    pub ram_kills: u32,
}

impl TrialStats {
    pub fn kills(&self) -> u32 {
        self.clean_kills + self.missile_kills + self.ram_kills
    }
}

/// How a generation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationOutcome {
    Improved,
    Unchanged,
    Aborted,
}

impl GenerationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationOutcome::Improved => "improved",
            GenerationOutcome::Unchanged => "unchanged",
            GenerationOutcome::Aborted => "aborted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "improved" => Some(GenerationOutcome::Improved),
            "unchanged" => Some(GenerationOutcome::Unchanged),
            "aborted" => Some(GenerationOutcome::Aborted),
            _ => None,
        }
    }
}
