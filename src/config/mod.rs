pub mod traits;
pub mod evolution;
pub mod workspace;
pub mod trial;
pub mod fitness;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use evolution::EvolutionConfig;
pub use workspace::WorkspaceConfig;
pub use trial::TrialConfig;
pub use fitness::FitnessConfig;
pub use traits::ConfigSection;
