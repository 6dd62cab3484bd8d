pub mod fixtures;
pub mod pdf_assertions;

use lopdf::Document as LopdfDocument;
use pagelink::{
    static_factory, EngineFactory, IndexMode, IndexOptions, PrintOutput, PrinterBuilder,
    PrinterError, RenderEngine, StaticEngine,
};
use pagelink_traits::{EngineError, EventSender, LoadRequest, PrintRequest};
use std::sync::Arc;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Wrapper around an indexed PDF with helper methods
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub doc: LopdfDocument,
}

impl GeneratedPdf {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Box<dyn std::error::Error>> {
        let doc = LopdfDocument::load_mem(&bytes)?;
        Ok(Self { bytes, doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }
}

/// Prints `html` through `engine` into memory.
pub fn print_to_memory(
    engine: StaticEngine,
    mode: IndexMode,
    options: IndexOptions,
) -> Result<PrintOutput, PrinterError> {
    PrinterBuilder::new()
        .with_html("<div class=\"page\"></div>")
        .with_index_mode(mode)
        .with_index_options(options)
        .with_output_memory()
        .with_engine(static_factory(engine))
        .build()?
        .make_pdf()
}

/// Runs a full indexing job whose engine prints `pdf` and whose extraction
/// script answers with `payload`.
pub fn index_with_payload(
    pdf: Vec<u8>,
    payload: serde_json::Value,
    mode: IndexMode,
) -> Result<(PrintOutput, GeneratedPdf), Box<dyn std::error::Error>> {
    let engine = StaticEngine::new(pdf).with_script_result(Ok(payload.to_string()));
    let output = print_to_memory(engine, mode, IndexOptions::default())?;
    let bytes = output.pdf.to_bytes()?;
    let pdf = GeneratedPdf::from_bytes(bytes)?;
    Ok((output, pdf))
}

/// Behaves like the wrapped engine until asked to print, then panics.
pub struct PanicOnPrint(pub StaticEngine);

impl RenderEngine for PanicOnPrint {
    fn name(&self) -> &'static str {
        "panic-on-print"
    }

    fn load(&mut self, request: LoadRequest, events: EventSender) -> Result<(), EngineError> {
        self.0.load(request, events)
    }

    fn enable_scripts(&mut self) {
        self.0.enable_scripts();
    }

    fn evaluate_script(&mut self, script: String, events: EventSender) {
        self.0.evaluate_script(script, events);
    }

    fn print(&mut self, _request: PrintRequest, _events: EventSender) {
        panic!("engine panicked while printing");
    }
}

pub fn panic_on_print_factory(engine: StaticEngine) -> EngineFactory {
    Arc::new(move || Ok(Box::new(PanicOnPrint(engine.clone())) as Box<dyn RenderEngine>))
}
