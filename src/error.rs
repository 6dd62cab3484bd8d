// src/error.rs
use pagelink_pdf_index::IndexError;
use pagelink_traits::EngineError;
use pagelink_types::{IndexModeError, PageSetupError};
use thiserror::Error;

/// Everything that can go wrong while producing a PDF.
#[derive(Error, Debug)]
pub enum PrinterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rendering engine could not be initialised: {0}")]
    EngineInit(String),

    #[error("Rendering engine failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Render job failed: {0}")]
    Job(String),

    #[error("Post-processing the PDF failed: {0}")]
    Index(#[from] IndexError),

    #[error("Invalid page setup: {0}")]
    PageSetup(#[from] PageSetupError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IndexModeError> for PrinterError {
    fn from(e: IndexModeError) -> Self {
        PrinterError::Config(e.to_string())
    }
}
