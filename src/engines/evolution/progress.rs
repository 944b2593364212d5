use super::lineage::GenerationResult;
use crate::types::EvolutionStatus;

pub trait ProgressCallback: Send {
    fn on_status_change(&mut self, status: EvolutionStatus, group_id: u32);
    fn on_generation_start(&mut self, group_id: u32);
    fn on_generation_complete(&mut self, result: &GenerationResult);
}

/// Discards every notification
pub struct SilentProgressCallback;

impl ProgressCallback for SilentProgressCallback {
    fn on_status_change(&mut self, _status: EvolutionStatus, _group_id: u32) {}

    fn on_generation_start(&mut self, _group_id: u32) {}

    fn on_generation_complete(&mut self, _result: &GenerationResult) {}
}
