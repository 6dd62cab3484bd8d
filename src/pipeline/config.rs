// src/pipeline/config.rs
use pagelink_pdf_index::IndexOptions;
use pagelink_traits::{DocumentSource, EngineError, RenderEngine, StaticEngine};
use pagelink_types::{IndexMode, PageSetup};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Creates a fresh engine for each render job.
pub type EngineFactory =
    Arc<dyn Fn() -> Result<Box<dyn RenderEngine>, EngineError> + Send + Sync>;

/// Wraps a [`StaticEngine`]; every job gets a clone sharing one call log.
pub fn static_factory(engine: StaticEngine) -> EngineFactory {
    Arc::new(move || Ok(Box::new(engine.clone()) as Box<dyn RenderEngine>))
}

/// Where the finished PDF goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    /// Keep the PDF in memory and hand back the bytes.
    Memory,
}

/// Everything one render job needs. Passed by value to the worker.
#[derive(Clone)]
pub struct JobConfig {
    pub source: DocumentSource,
    pub stylesheet: Option<String>,
    pub page_setup: PageSetup,
    pub index_mode: IndexMode,
    pub index_options: IndexOptions,
    pub output: OutputTarget,
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            DocumentSource::Html { text, base_uri } => {
                format!("Html({} bytes, base {:?})", text.len(), base_uri)
            }
            DocumentSource::Uri(uri) => format!("Uri({})", uri),
        };
        f.debug_struct("JobConfig")
            .field("source", &source)
            .field("stylesheet", &self.stylesheet.as_ref().map(String::len))
            .field("page_setup", &self.page_setup)
            .field("index_mode", &self.index_mode)
            .field("index_options", &self.index_options)
            .field("output", &self.output)
            .finish()
    }
}
