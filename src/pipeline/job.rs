// src/pipeline/job.rs
use super::script::extraction_script;
use log::{debug, error, info, warn};
use pagelink_traits::EngineEvent;
use pagelink_types::{AnchorRegistry, ExtractionPayload, IndexMode};

/// Lifecycle of one render job.
///
/// `Unstarted -> Loading -> [Extracting ->] Printing -> Finished`, with
/// `Failed` reachable from every state that is not terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Unstarted,
    Loading,
    Extracting,
    Printing,
    Finished,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            JobState::Unstarted => 0,
            JobState::Loading => 1,
            JobState::Extracting => 2,
            JobState::Printing => 3,
            JobState::Finished | JobState::Failed => 4,
        }
    }
}

/// What the driver must do next on behalf of the job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobAction {
    /// Start loading the document.
    Load,
    /// Enable scripting and evaluate this script.
    Extract(String),
    /// Print to the job's output.
    Print,
    /// Nothing to do until the next engine event.
    Wait,
    /// The PDF is written; tear down.
    Finish,
    /// The job failed; tear down and report.
    Abort(String),
}

/// The render job state machine. It never touches the engine itself: it
/// consumes [`EngineEvent`]s and answers with the next [`JobAction`].
#[derive(Debug)]
pub struct RenderJob {
    state: JobState,
    mode: IndexMode,
    registry: AnchorRegistry,
    toc_page: Option<usize>,
    error: Option<String>,
}

impl RenderJob {
    pub fn new(mode: IndexMode) -> Self {
        Self {
            state: JobState::Unstarted,
            mode,
            registry: AnchorRegistry::new(),
            toc_page: None,
            error: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    pub fn toc_page(&self) -> Option<usize> {
        self.toc_page
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn into_parts(self) -> (AnchorRegistry, Option<usize>) {
        (self.registry, self.toc_page)
    }

    pub fn start(&mut self) -> JobAction {
        if self.advance(JobState::Loading) {
            info!("[JOB] Loading document (index mode: {}).", self.mode);
            JobAction::Load
        } else {
            JobAction::Wait
        }
    }

    /// Moves to `Failed` unless the job already ended.
    pub fn fail(&mut self, reason: impl Into<String>) -> JobAction {
        let reason = reason.into();
        if self.state.is_terminal() {
            warn!("[JOB] Ignoring failure in state {:?}: {}", self.state, reason);
            return JobAction::Wait;
        }
        error!("[JOB] Failed while {:?}: {}", self.state, reason);
        self.state = JobState::Failed;
        self.error = Some(reason.clone());
        JobAction::Abort(reason)
    }

    pub fn on_event(&mut self, event: EngineEvent) -> JobAction {
        match (self.state, event) {
            (JobState::Loading, EngineEvent::LoadStarted) => {
                debug!("[JOB] Load started.");
                JobAction::Wait
            }
            (JobState::Loading, EngineEvent::LoadCommitted) => {
                debug!("[JOB] Load committed.");
                JobAction::Wait
            }
            (JobState::Loading, EngineEvent::LoadFinished) => self.on_loaded(),
            (JobState::Loading, EngineEvent::LoadFailed(reason)) => {
                self.fail(format!("document failed to load: {}", reason))
            }
            (JobState::Extracting, EngineEvent::ScriptResult(result)) => {
                self.on_script_result(result);
                self.print()
            }
            (JobState::Printing, EngineEvent::PrintFinished(Ok(()))) => {
                self.advance(JobState::Finished);
                info!("[JOB] Print finished.");
                JobAction::Finish
            }
            (JobState::Printing, EngineEvent::PrintFinished(Err(reason))) => {
                self.fail(format!("print failed: {}", reason))
            }
            (state, event) => {
                warn!("[JOB] Ignoring {:?} in state {:?}.", event, state);
                JobAction::Wait
            }
        }
    }

    fn on_loaded(&mut self) -> JobAction {
        match extraction_script(self.mode) {
            Some(script) => {
                self.advance(JobState::Extracting);
                debug!("[JOB] Document loaded; extracting anchors.");
                JobAction::Extract(script)
            }
            None => {
                debug!("[JOB] Document loaded; indexing is off.");
                self.print()
            }
        }
    }

    fn on_script_result(&mut self, result: Result<String, String>) {
        let json = match result {
            Ok(json) => json,
            Err(reason) => {
                error!("[JOB] Extraction script failed, printing without links: {}", reason);
                return;
            }
        };
        match ExtractionPayload::from_json(&json) {
            Ok(payload) => {
                self.registry = payload.to_registry();
                self.toc_page = payload.toc_page();
                info!(
                    "[JOB] Extracted {} anchors and {} targets (TOC page: {:?}).",
                    self.registry.len(),
                    payload.target_data.len(),
                    self.toc_page
                );
            }
            Err(e) => {
                error!("[JOB] Unreadable extraction result, printing without links: {}", e);
            }
        }
    }

    fn print(&mut self) -> JobAction {
        self.advance(JobState::Printing);
        JobAction::Print
    }

    fn advance(&mut self, next: JobState) -> bool {
        let allowed = !self.state.is_terminal() && next.rank() > self.state.rank();
        if allowed {
            debug!("[JOB] {:?} -> {:?}", self.state, next);
            self.state = next;
        } else {
            warn!("[JOB] Refusing transition {:?} -> {:?}.", self.state, next);
        }
        allowed
    }
}
