pub mod coordinator;
pub mod fitness;
pub mod trial;

pub use coordinator::{CancelToken, TrialCoordinator, TrialOutcome};
pub use fitness::FitnessScorer;
pub use trial::{CommandTrialExecutor, ParticipantTally, TrialExecutor, TrialScoreboard};
