//! An engine that renders nothing and answers from memory.

use crate::engine::{
    EngineError, EngineEvent, EventSender, LoadRequest, PrintRequest, RenderEngine,
};
use log::debug;
use std::sync::{Arc, Mutex};

/// One call made on a [`StaticEngine`], in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Load(LoadRequest),
    EnableScripts,
    Evaluate(String),
    Print(PrintRequest),
    Close,
}

/// Shared view of the calls an engine received. Cloning shares the log.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<EngineCall>>>);

impl CallLog {
    fn push(&self, call: EngineCall) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(call);
        }
    }

    /// Snapshot of the calls so far. Empty if the lock is poisoned.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn evaluated_scripts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::Evaluate(_)))
            .count()
    }
}

/// An in-memory engine.
///
/// Loads succeed immediately, scripts answer with a configured result and
/// printing writes a configured PDF to the requested path. Works anywhere,
/// no browser needed.
#[derive(Debug, Clone)]
pub struct StaticEngine {
    pdf: Vec<u8>,
    script_result: Result<String, String>,
    load_error: Option<String>,
    print_error: Option<String>,
    log: CallLog,
}

impl StaticEngine {
    /// Creates an engine whose print step writes `pdf`.
    pub fn new(pdf: Vec<u8>) -> Self {
        Self {
            pdf,
            script_result: Ok(String::from("{}")),
            load_error: None,
            print_error: None,
            log: CallLog::default(),
        }
    }

    pub fn with_script_result(mut self, result: Result<String, String>) -> Self {
        self.script_result = result;
        self
    }

    pub fn with_load_error(mut self, message: impl Into<String>) -> Self {
        self.load_error = Some(message.into());
        self
    }

    pub fn with_print_error(mut self, message: impl Into<String>) -> Self {
        self.print_error = Some(message.into());
        self
    }

    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    fn emit(events: &EventSender, event: EngineEvent) {
        if events.try_send(event).is_err() {
            debug!("[ENGINE] static: event channel closed; dropping event.");
        }
    }
}

impl RenderEngine for StaticEngine {
    fn name(&self) -> &'static str {
        "static"
    }

    fn load(&mut self, request: LoadRequest, events: EventSender) -> Result<(), EngineError> {
        self.log.push(EngineCall::Load(request));
        Self::emit(&events, EngineEvent::LoadStarted);
        match &self.load_error {
            Some(message) => Self::emit(&events, EngineEvent::LoadFailed(message.clone())),
            None => {
                Self::emit(&events, EngineEvent::LoadCommitted);
                Self::emit(&events, EngineEvent::LoadFinished);
            }
        }
        Ok(())
    }

    fn enable_scripts(&mut self) {
        self.log.push(EngineCall::EnableScripts);
    }

    fn evaluate_script(&mut self, script: String, events: EventSender) {
        self.log.push(EngineCall::Evaluate(script));
        Self::emit(&events, EngineEvent::ScriptResult(self.script_result.clone()));
    }

    fn print(&mut self, request: PrintRequest, events: EventSender) {
        let output = request.output.clone();
        self.log.push(EngineCall::Print(request));
        let result = match &self.print_error {
            Some(message) => Err(message.clone()),
            None => std::fs::write(&output, &self.pdf)
                .map_err(|e| format!("writing {}: {}", output.display(), e)),
        };
        Self::emit(&events, EngineEvent::PrintFinished(result));
    }

    fn close(&mut self) {
        self.log.push(EngineCall::Close);
    }
}
