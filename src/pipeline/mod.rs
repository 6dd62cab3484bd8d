//! Render job orchestration.
//!
//! - [`PrinterBuilder`]: fluent builder for configuring a print
//! - [`PdfPrinter`]: runs the job and post-processes the PDF
//! - [`RenderJob`]: the load / extract / print state machine
//! - [`CompletionGate`]: hands the job result back to the calling thread
//!
//! # Example
//!
//! ```ignore
//! use pagelink::{IndexMode, PrinterBuilder};
//!
//! let output = PrinterBuilder::new()
//!     .with_html("<div class=\"page\">...</div>")
//!     .with_index_mode(IndexMode::Basic)
//!     .with_output_memory()
//!     .build()?
//!     .make_pdf()?;
//! ```

mod builder;
pub mod config;
mod gate;
mod job;
mod orchestrator;
pub mod script;
pub(crate) mod worker;

pub use builder::PrinterBuilder;
pub use config::{static_factory, EngineFactory, JobConfig, OutputTarget};
pub use gate::CompletionGate;
pub use job::{JobAction, JobState, RenderJob};
pub use orchestrator::{PdfArtifact, PdfPrinter, PrintOutput};
