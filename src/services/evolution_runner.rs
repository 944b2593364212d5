use crate::config::AppConfig;
use crate::engines::evaluation::{CancelToken, TrialExecutor};
use crate::engines::evolution::{EvolutionEngine, GenerationResult, ProgressCallback, RunSummary};
use crate::error::{EvolutionError, Result};
use crate::types::EvolutionStatus;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Progress update from the evolution thread
#[derive(Clone, Debug)]
pub struct ProgressUpdate {
    pub group_id: u32,
    pub status: EvolutionStatus,
    pub message: String,
    pub result: Option<GenerationResult>,
}

type ThreadOutput = (EvolutionEngine, Box<dyn TrialExecutor>, Result<RunSummary>);

/// Progress callback that forwards every notification through a channel
struct ChannelProgressCallback {
    progress_tx: Sender<ProgressUpdate>,
    status: EvolutionStatus,
}

impl ChannelProgressCallback {
    fn send(&self, group_id: u32, message: String, result: Option<GenerationResult>) {
        // The receiver may already be gone when the runner is dropped
        let _ = self.progress_tx.send(ProgressUpdate {
            group_id,
            status: self.status,
            message,
            result,
        });
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_status_change(&mut self, status: EvolutionStatus, group_id: u32) {
        self.status = status;
        self.send(group_id, format!("Group {}: {}", group_id, status), None);
    }

    fn on_generation_start(&mut self, group_id: u32) {
        log::info!("Generation {} starting", group_id);
        self.send(group_id, format!("Generation {} starting...", group_id), None);
    }

    fn on_generation_complete(&mut self, result: &GenerationResult) {
        let message = format!(
            "Generation {} {}, next seed {}",
            result.group_id,
            result.outcome.as_str(),
            result.next_seed
        );
        log::info!("{}", message);
        self.send(result.group_id, message, Some(result.clone()));
    }
}

/// Runs an [`EvolutionEngine`] on a background thread and exposes the
/// control surface to the caller's thread.
///
/// The engine and executor move into the worker for the length of a run and
/// come back when it ends, so a stopped runner can be started again.
pub struct EvolutionRunner {
    engine: Option<EvolutionEngine>,
    executor: Option<Box<dyn TrialExecutor>>,
    handle: Option<JoinHandle<ThreadOutput>>,
    progress_rx: Option<Receiver<ProgressUpdate>>,
    cancel: CancelToken,
    status: EvolutionStatus,
    generation_id: u32,
    run_id: String,
    last_summary: Option<RunSummary>,
    last_error: Option<EvolutionError>,
}

impl EvolutionRunner {
    pub fn new(config: AppConfig, executor: Box<dyn TrialExecutor>) -> Result<Self> {
        Ok(Self::with_engine(EvolutionEngine::new(config)?, executor))
    }

    pub fn with_engine(engine: EvolutionEngine, executor: Box<dyn TrialExecutor>) -> Self {
        Self {
            status: engine.status(),
            generation_id: engine.generation_id(),
            run_id: engine.run_id().to_string(),
            engine: Some(engine),
            executor: Some(executor),
            handle: None,
            progress_rx: None,
            cancel: CancelToken::new(),
            last_summary: None,
            last_error: None,
        }
    }

    /// Start a new run in the background. Seed and state checks happen
    /// before this returns.
    pub fn start(&mut self) -> Result<()> {
        let mut engine = self.take_engine()?;
        if let Err(e) = engine.start() {
            self.engine = Some(engine);
            return Err(e);
        }
        self.launch(engine)
    }

    /// Continue a stopped run from its lineage record in the background
    pub fn resume(&mut self, run_id: &str) -> Result<()> {
        let mut engine = self.take_engine()?;
        if let Err(e) = engine.resume(run_id) {
            self.engine = Some(engine);
            return Err(e);
        }
        self.launch(engine)
    }

    /// Request cancellation. Returns false if nothing was running.
    pub fn stop(&mut self) -> bool {
        if self.handle.is_none() {
            return false;
        }
        log::info!("Stop requested for evolution {}", self.run_id);
        self.cancel.cancel();
        true
    }

    /// True while the worker thread is alive. Does not consume progress.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn current_status(&mut self) -> EvolutionStatus {
        self.refresh();
        self.status
    }

    pub fn current_generation_id(&mut self) -> u32 {
        self.refresh();
        self.generation_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn last_summary(&self) -> Option<&RunSummary> {
        self.last_summary.as_ref()
    }

    /// Error that ended the last run, until taken by [`Self::wait`]
    pub fn last_error(&self) -> Option<&EvolutionError> {
        self.last_error.as_ref()
    }

    /// Poll for a progress update (non-blocking)
    pub fn poll_progress(&mut self) -> Option<ProgressUpdate> {
        let update = self.progress_rx.as_ref()?.try_recv().ok()?;
        self.apply(&update);
        Some(update)
    }

    /// Drain pending progress and collect the worker if it has finished
    pub fn refresh(&mut self) {
        while self.poll_progress().is_some() {}

        let finished = self.handle.as_ref().is_some_and(|h| h.is_finished());
        if finished {
            if let Some(handle) = self.handle.take() {
                self.collect(handle);
            }
        }
    }

    /// Block until the current run ends
    pub fn wait(&mut self) -> Result<RunSummary> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| EvolutionError::InvalidState("evolution not running".to_string()))?;
        self.collect(handle);

        if let Some(error) = self.last_error.take() {
            return Err(error);
        }
        self.last_summary
            .clone()
            .ok_or_else(|| EvolutionError::InvalidState("run produced no summary".to_string()))
    }

    fn take_engine(&mut self) -> Result<EvolutionEngine> {
        self.refresh();
        if self.handle.is_some() {
            return Err(EvolutionError::InvalidState(format!(
                "evolution {} already running",
                self.run_id
            )));
        }
        self.engine
            .take()
            .ok_or_else(|| EvolutionError::InvalidState("evolution engine was lost".to_string()))
    }

    fn launch(&mut self, mut engine: EvolutionEngine) -> Result<()> {
        let Some(mut executor) = self.executor.take() else {
            engine.stop();
            self.engine = Some(engine);
            return Err(EvolutionError::ExecutorUnavailable("no trial executor".to_string()));
        };

        let (progress_tx, progress_rx) = channel();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();

        self.status = engine.status();
        self.generation_id = engine.generation_id();
        self.run_id = engine.run_id().to_string();
        self.last_summary = None;
        self.last_error = None;

        let handle = thread::Builder::new()
            .name(format!("evolution-{}", self.run_id))
            .spawn(move || {
                let mut progress = ChannelProgressCallback {
                    progress_tx,
                    status: engine.status(),
                };
                let result = engine.run(executor.as_mut(), &worker_cancel, &mut progress);
                (engine, executor, result)
            })?;

        self.cancel = cancel;
        self.progress_rx = Some(progress_rx);
        self.handle = Some(handle);
        Ok(())
    }

    fn collect(&mut self, handle: JoinHandle<ThreadOutput>) {
        match handle.join() {
            Ok((engine, executor, result)) => {
                while self.poll_progress().is_some() {}
                self.status = engine.status();
                self.generation_id = engine.generation_id();
                self.engine = Some(engine);
                self.executor = Some(executor);
                match result {
                    Ok(summary) => self.last_summary = Some(summary),
                    Err(e) => self.last_error = Some(e),
                }
            }
            Err(_) => {
                log::error!("Evolution thread panicked");
                self.status = EvolutionStatus::Idle;
                self.last_error = Some(EvolutionError::InvalidState(
                    "evolution thread panicked".to_string(),
                ));
            }
        }
    }

    fn apply(&mut self, update: &ProgressUpdate) {
        self.status = update.status;
        self.generation_id = match &update.result {
            Some(result) => result.group_id + 1,
            None => update.group_id,
        };
    }
}

impl Drop for EvolutionRunner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
