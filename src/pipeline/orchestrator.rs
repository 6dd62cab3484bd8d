// src/pipeline/orchestrator.rs
use super::config::{EngineFactory, JobConfig, OutputTarget};
use super::worker::{run_job, JobOutcome, WorkerRequest};
use crate::error::PrinterError;
use log::{debug, info};
use pagelink_pdf_index::{index_pdf_bytes, index_pdf_file, EmitSummary};
use pagelink_traits::{LoadRequest, PrintRequest};
use pagelink_types::AnchorRecord;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempPath;

/// The printed document, on disk or in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfArtifact {
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl PdfArtifact {
    /// Reads the file if needed.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        match self {
            PdfArtifact::File(path) => fs::read(path),
            PdfArtifact::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PdfArtifact::Bytes(bytes) => Some(bytes),
            PdfArtifact::File(_) => None,
        }
    }
}

/// Result of [`PdfPrinter::make_pdf`].
#[derive(Debug, Clone)]
pub struct PrintOutput {
    pub pdf: PdfArtifact,
    /// Every anchor measured in the document, resolved or not.
    pub anchors: Vec<AnchorRecord>,
    /// 0-based page flagged as table of contents.
    pub toc_page: Option<usize>,
    /// Present when the PDF was post-processed.
    pub summary: Option<EmitSummary>,
}

/// An intermediate PDF in the temp directory. Removed when dropped.
fn intermediate_pdf() -> io::Result<TempPath> {
    let temp = tempfile::Builder::new()
        .prefix("pagelink-")
        .suffix(".pdf")
        .tempfile()?
        .into_temp_path();
    debug!("Intermediate PDF at {}.", temp.display());
    Ok(temp)
}

/// Prints one configured document.
pub struct PdfPrinter {
    config: JobConfig,
    engine: EngineFactory,
}

impl PdfPrinter {
    pub(crate) fn new(config: JobConfig, engine: EngineFactory) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Renders, prints and (if indexing) post-processes the document.
    ///
    /// With indexing off and a file output the engine prints straight to the
    /// destination. Otherwise it prints to an intermediate file that is
    /// indexed into the destination (or read into memory) and then removed,
    /// whether or not that step succeeded.
    pub fn make_pdf(&self) -> Result<PrintOutput, PrinterError> {
        let start = Instant::now();
        let indexing = self.config.index_mode.is_enabled();

        let output = match (&self.config.output, indexing) {
            (OutputTarget::File(dest), false) => {
                let outcome = self.print_to(dest)?;
                Ok(self.output(PdfArtifact::File(dest.clone()), outcome, None))
            }
            (OutputTarget::File(dest), true) => {
                let temp = intermediate_pdf()?;
                let outcome = self.print_to(&temp)?;
                let summary = index_pdf_file(
                    &temp,
                    dest,
                    outcome.registry.records(),
                    outcome.toc_page,
                    &self.config.index_options,
                )?;
                Ok(self.output(PdfArtifact::File(dest.clone()), outcome, Some(summary)))
            }
            (OutputTarget::Memory, _) => {
                let temp = intermediate_pdf()?;
                let outcome = self.print_to(&temp)?;
                self.read_back(&temp, outcome)
            }
        };

        if output.is_ok() {
            info!("PDF ready in {:.2?}.", start.elapsed());
        }
        output
    }

    fn print_to(&self, path: &Path) -> Result<JobOutcome, PrinterError> {
        let request = WorkerRequest {
            load: LoadRequest {
                source: self.config.source.clone(),
                stylesheet: self.config.stylesheet.clone(),
            },
            print: PrintRequest {
                page_setup: self.config.page_setup.clone(),
                output: path.to_path_buf(),
            },
            mode: self.config.index_mode,
        };
        run_job(self.engine.clone(), request)
    }

    /// Reads the intermediate PDF into memory, indexing it if enabled.
    fn read_back(&self, temp: &Path, outcome: JobOutcome) -> Result<PrintOutput, PrinterError> {
        let printed = fs::read(temp)?;
        if !self.config.index_mode.is_enabled() {
            return Ok(self.output(PdfArtifact::Bytes(printed), outcome, None));
        }
        let (bytes, summary) = index_pdf_bytes(
            &printed,
            outcome.registry.records(),
            outcome.toc_page,
            &self.config.index_options,
        )?;
        Ok(self.output(PdfArtifact::Bytes(bytes), outcome, Some(summary)))
    }

    fn output(&self, pdf: PdfArtifact, outcome: JobOutcome, summary: Option<EmitSummary>) -> PrintOutput {
        PrintOutput {
            pdf,
            anchors: outcome.registry.into_records(),
            toc_page: outcome.toc_page,
            summary,
        }
    }
}
