// src/pipeline/worker.rs
use super::config::EngineFactory;
use super::gate::CompletionGate;
use super::job::{JobAction, RenderJob};
use crate::error::PrinterError;
use log::{debug, error, info, warn};
use pagelink_traits::{EventReceiver, EventSender, LoadRequest, PrintRequest, event_channel};
use pagelink_types::{AnchorRegistry, IndexMode};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tokio::runtime::Builder;

/// Serializes render jobs: the engine handles one document at a time.
static JOB_LOCK: Mutex<()> = Mutex::new(());

/// What one job asks of the engine.
#[derive(Debug, Clone)]
pub(crate) struct WorkerRequest {
    pub load: LoadRequest,
    pub print: PrintRequest,
    pub mode: IndexMode,
}

/// What a finished job hands back to the caller.
#[derive(Debug, Default)]
pub(crate) struct JobOutcome {
    pub registry: AnchorRegistry,
    pub toc_page: Option<usize>,
}

/// Runs one job on a dedicated thread and blocks until it is done.
///
/// The worker owns a current-thread runtime for the lifetime of the job. The
/// runtime is dropped before the gate is signalled, and a panicking worker
/// still signals (with an error).
pub(crate) fn run_job(
    factory: EngineFactory,
    request: WorkerRequest,
) -> Result<JobOutcome, PrinterError> {
    let _serialized = JOB_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    let gate = Arc::new(CompletionGate::new());
    let worker_gate = Arc::clone(&gate);

    let handle = thread::Builder::new()
        .name("pagelink-render".to_string())
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| run_on_private_loop(factory, request)))
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    error!("[WORKER] Render worker panicked: {}", message);
                    Err(PrinterError::Job(format!("render worker panicked: {}", message)))
                });
            worker_gate.signal(result);
        })?;

    let result = gate.wait().unwrap_or_else(|| {
        Err(PrinterError::Job("render worker exited without a result".to_string()))
    });
    if handle.join().is_err() {
        warn!("[WORKER] Render thread could not be joined cleanly.");
    }
    result
}

fn run_on_private_loop(
    factory: EngineFactory,
    request: WorkerRequest,
) -> Result<JobOutcome, PrinterError> {
    let runtime = Builder::new_current_thread().enable_all().build()?;
    let result = runtime.block_on(drive(factory, request));
    drop(runtime);
    debug!("[WORKER] Event loop torn down.");
    result
}

/// Opens the channel for the next engine request, replacing the previous
/// one. Only the engine holds the sender, so the receiver reports a closed
/// channel once the engine drops it without answering.
fn request_channel(slot: &mut Option<EventReceiver>) -> EventSender {
    let (events, receiver) = event_channel();
    *slot = Some(receiver);
    events
}

async fn drive(factory: EngineFactory, request: WorkerRequest) -> Result<JobOutcome, PrinterError> {
    let mut engine = factory()?;
    info!("[WORKER] Starting render job on the '{}' engine.", engine.name());

    let mut pending: Option<EventReceiver> = None;
    let mut job = RenderJob::new(request.mode);
    let mut action = job.start();

    loop {
        let immediate = match action {
            JobAction::Load => {
                let events = request_channel(&mut pending);
                match engine.load(request.load.clone(), events) {
                    Ok(()) => None,
                    Err(e) => Some(job.fail(e.to_string())),
                }
            }
            JobAction::Extract(script) => {
                let events = request_channel(&mut pending);
                engine.enable_scripts();
                engine.evaluate_script(script, events);
                None
            }
            JobAction::Print => {
                debug!("[WORKER] Printing to {}.", request.print.output.display());
                let events = request_channel(&mut pending);
                engine.print(request.print.clone(), events);
                None
            }
            JobAction::Wait => None,
            JobAction::Finish => break,
            JobAction::Abort(reason) => {
                engine.close();
                return Err(PrinterError::Job(reason));
            }
        };

        action = match immediate {
            Some(next) => next,
            None => match &pending {
                Some(receiver) => match receiver.recv().await {
                    Ok(event) => job.on_event(event),
                    Err(_) => job.fail(format!(
                        "the '{}' engine stopped without reporting back",
                        engine.name()
                    )),
                },
                None => job.fail("no engine request in flight"),
            },
        };
    }

    engine.close();
    let (registry, toc_page) = job.into_parts();
    info!("[WORKER] Render job finished with {} anchors.", registry.len());
    Ok(JobOutcome { registry, toc_page })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
