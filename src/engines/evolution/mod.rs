pub mod engine;
pub mod lineage;
pub mod progress;
pub mod workspace;

pub use engine::{EvolutionEngine, GenerationStep, RunSummary, ADVERSARY_PREFIX};
pub use lineage::{GenerationResult, LineageRecord};
pub use progress::{ProgressCallback, SilentProgressCallback};
pub use workspace::{participant_name, Workspace};
