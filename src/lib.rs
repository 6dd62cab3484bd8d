//! Render HTML to paginated PDF through a headless browser, then turn the
//! document's in-page links into PDF link annotations and its numbered
//! headings into a nested outline.
//!
//! # Example
//!
//! ```ignore
//! use pagelink::{engine, IndexMode, PrinterBuilder};
//!
//! engine::init(engine::EngineOptions::default())?;
//! let output = PrinterBuilder::new()
//!     .with_html(html)
//!     .with_layout("A4", "portrait")
//!     .with_index_mode(IndexMode::Basic)
//!     .with_output_file("report.pdf")
//!     .build()?
//!     .make_pdf()?;
//! engine::shutdown();
//! ```

pub mod engine;
pub mod error;
pub mod pipeline;

pub use error::PrinterError;
pub use pipeline::{
    CompletionGate, EngineFactory, JobAction, JobConfig, JobState, OutputTarget, PdfArtifact,
    PdfPrinter, PrintOutput, PrinterBuilder, RenderJob, static_factory,
};

pub use pagelink_pdf_index::{EmitSummary, IndexOptions};
pub use pagelink_traits::{DocumentSource, RenderEngine, StaticEngine};
pub use pagelink_types::{AnchorRecord, IndexMode, Margins, Orientation, PageSetup};
