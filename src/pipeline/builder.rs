// src/pipeline/builder.rs
use super::config::{EngineFactory, JobConfig, OutputTarget};
use super::orchestrator::PdfPrinter;
use crate::engine;
use crate::error::PrinterError;
use pagelink_pdf_index::IndexOptions;
use pagelink_traits::DocumentSource;
use pagelink_types::{IndexMode, PageSetup};
use std::fs;
use std::path::{Path, PathBuf};

/// A builder for creating a `PdfPrinter`.
#[derive(Default)]
pub struct PrinterBuilder {
    html: Option<String>,
    uri: Option<String>,
    base_uri: Option<String>,
    output: Option<OutputTarget>,
    page_setup: PageSetup,
    stylesheet: Option<String>,
    index_mode: IndexMode,
    index_options: IndexOptions,
    engine: Option<EngineFactory>,
}

impl PrinterBuilder {
    /// Creates a builder for an A4 portrait print with indexing off.
    pub fn new() -> Self { Default::default() }

    /// Prints the given markup. Replaces any URI set earlier.
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self.uri = None;
        self
    }

    /// Prints the document at `uri`. Plain paths are accepted too.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self.html = None;
        self
    }

    /// Base against which relative references in inline HTML resolve.
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self { self.base_uri = Some(base_uri.into()); self }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self { self.output = Some(OutputTarget::File(path.into())); self }

    /// Keep the PDF in memory; see `PdfArtifact::Bytes`.
    pub fn with_output_memory(mut self) -> Self { self.output = Some(OutputTarget::Memory); self }

    /// Named paper size and orientation. Unknown values fall back to A4 and
    /// portrait.
    pub fn with_layout(mut self, size: &str, orientation: &str) -> Self {
        self.page_setup = PageSetup::from_name(size, orientation);
        self
    }

    pub fn with_page_setup(mut self, page_setup: PageSetup) -> Self { self.page_setup = page_setup; self }

    /// Page setup from the text of a GTK key file (`[Page Setup]` group).
    pub fn with_page_setup_keyfile(mut self, keyfile: &str) -> Result<Self, PrinterError> {
        self.page_setup = PageSetup::from_keyfile(keyfile)?;
        Ok(self)
    }

    /// Reads a GTK key file from disk; see [`Self::with_page_setup_keyfile`].
    pub fn with_page_setup_file<P: AsRef<Path>>(self, path: P) -> Result<Self, PrinterError> {
        let text = fs::read_to_string(path.as_ref())?;
        self.with_page_setup_keyfile(&text)
    }

    /// Extra CSS applied on top of the document's own styles.
    pub fn with_stylesheet(mut self, css: impl Into<String>) -> Self { self.stylesheet = Some(css.into()); self }

    pub fn with_index_mode(mut self, mode: IndexMode) -> Self { self.index_mode = mode; self }

    pub fn with_index_options(mut self, options: IndexOptions) -> Self { self.index_options = options; self }

    /// Overrides the engine. Without this the process-wide browser set up by
    /// [`engine::init`] is used.
    pub fn with_engine(mut self, factory: EngineFactory) -> Self { self.engine = Some(factory); self }

    /// Consumes the builder and creates the `PdfPrinter`.
    pub fn build(self) -> Result<PdfPrinter, PrinterError> {
        let source = match (self.html, self.uri) {
            (Some(text), _) => DocumentSource::Html { text, base_uri: self.base_uri },
            (None, Some(uri)) => DocumentSource::Uri(uri),
            (None, None) => {
                return Err(PrinterError::Config(
                    "No document has been configured. Use `with_html` or `with_uri`.".to_string(),
                ));
            }
        };
        let output = self.output.ok_or_else(|| {
            PrinterError::Config(
                "No output has been configured. Use `with_output_file` or `with_output_memory`."
                    .to_string(),
            )
        })?;
        let engine = match self.engine {
            Some(factory) => factory,
            None => engine::default_factory()?,
        };

        let config = JobConfig {
            source,
            stylesheet: self.stylesheet,
            page_setup: self.page_setup,
            index_mode: self.index_mode,
            index_options: self.index_options,
            output,
        };
        Ok(PdfPrinter::new(config, engine))
    }
}
