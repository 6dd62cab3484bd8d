//! RenderEngine trait for abstracting the HTML rendering backend.
//!
//! The job orchestrator only ever talks to an engine through this trait, so a
//! headless browser, a test double or any other backend can sit behind it.

use pagelink_types::PageSetup;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for engine operations that fail before any event is emitted.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Failed to launch rendering engine: {0}")]
    Launch(String),

    #[error("Engine protocol error: {0}")]
    Protocol(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Print failed: {0}")]
    Print(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

/// Completion notices sent by an engine to the job that drives it.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    LoadStarted,
    LoadCommitted,
    LoadFinished,
    LoadFailed(String),
    /// Serialized result of a script evaluation, or the error message.
    ScriptResult(Result<String, String>),
    PrintFinished(Result<(), String>),
}

pub type EventSender = async_channel::Sender<EngineEvent>;
pub type EventReceiver = async_channel::Receiver<EngineEvent>;

/// Creates the unbounded channel a job listens on.
pub fn event_channel() -> (EventSender, EventReceiver) {
    async_channel::unbounded()
}

/// Where the document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    /// Markup passed inline. Relative references resolve against `base_uri`.
    Html { text: String, base_uri: Option<String> },
    /// A document the engine fetches itself.
    Uri(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub source: DocumentSource,
    /// Extra CSS applied on top of the document's own styles.
    pub stylesheet: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintRequest {
    pub page_setup: PageSetup,
    pub output: PathBuf,
}

/// A rendering surface that can load a document, run scripts in it and print
/// it to a paginated PDF.
///
/// Every operation only *starts* work. Completion is reported by sending an
/// [`EngineEvent`] on the supplied channel, so a job's event loop is never
/// blocked by the engine. Operations are called from within the job's tokio
/// runtime, so implementations may spawn tasks onto it.
///
/// # Implementations
///
/// - `ChromiumEngine` (in the `pagelink` crate): headless browser over the
///   DevTools protocol
/// - [`StaticEngine`](crate::StaticEngine): canned answers, always available
pub trait RenderEngine: Send {
    /// Returns a human-readable name for this engine (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Start loading a document.
    ///
    /// Progress is reported as `LoadStarted`, `LoadCommitted`, then
    /// `LoadFinished` or `LoadFailed`.
    ///
    /// # Errors
    ///
    /// Only for failures detected before the load could be started.
    fn load(&mut self, request: LoadRequest, events: EventSender) -> Result<(), EngineError>;

    /// Allow scripts to run on the loaded surface. Scripts are disabled until
    /// this is called.
    fn enable_scripts(&mut self);

    /// Evaluate `script` and report its string result as `ScriptResult`.
    fn evaluate_script(&mut self, script: String, events: EventSender);

    /// Paginate the loaded document into `request.output` and report
    /// `PrintFinished`.
    fn print(&mut self, request: PrintRequest, events: EventSender);

    /// Release the surface. Called once, after the last event was consumed.
    fn close(&mut self) {}
}
