// src/engine/mod.rs
//! Process-wide engine setup.
//!
//! [`init`] locates the browser and prepares a display once per process;
//! [`default_factory`] then hands out one fresh [`ChromiumEngine`] per job.
//! [`shutdown`] stops any display we started. Both are idempotent.

mod cdp;
mod chromium;
mod display;

pub use chromium::{ChromiumEngine, LaunchSettings};
pub use display::{DisplayMode, XvfbMode};

use crate::error::PrinterError;
use crate::pipeline::config::EngineFactory;
use display::DisplayGuard;
use log::{debug, info};
use pagelink_traits::RenderEngine;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Environment variable naming the browser binary.
pub const BROWSER_ENV: &str = "PAGELINK_BROWSER";

const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
];

/// Options for [`init`].
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Browser binary. Falls back to `$PAGELINK_BROWSER`, then `PATH`.
    pub browser: Option<PathBuf>,
    pub display: DisplayMode,
    /// Extra command-line flags for every browser launch.
    pub browser_args: Vec<String>,
}

impl EngineOptions {
    pub fn with_browser(mut self, browser: impl Into<PathBuf>) -> Self {
        self.browser = Some(browser.into());
        self
    }

    pub fn with_display(mut self, display: DisplayMode) -> Self {
        self.display = display;
        self
    }

    pub fn with_browser_arg(mut self, arg: impl Into<String>) -> Self {
        self.browser_args.push(arg.into());
        self
    }
}

struct EngineRuntime {
    browser: PathBuf,
    display: DisplayGuard,
    args: Vec<String>,
}

static RUNTIME: Mutex<Option<EngineRuntime>> = Mutex::new(None);

/// Prepares the engine for this process. Calling it again is a no-op.
pub fn init(options: EngineOptions) -> Result<(), PrinterError> {
    let mut runtime = RUNTIME.lock().unwrap_or_else(PoisonError::into_inner);
    if runtime.is_some() {
        debug!("[ENGINE] Already initialised.");
        return Ok(());
    }

    let browser = find_browser(options.browser.as_deref())?;
    let display = DisplayGuard::prepare(options.display)?;
    info!(
        "[ENGINE] Using {} ({}).",
        browser.display(),
        if display.is_headless() { "headless" } else { "on a display" }
    );
    *runtime = Some(EngineRuntime {
        browser,
        display,
        args: options.browser_args,
    });
    Ok(())
}

/// Releases what [`init`] set up. Calling it again is a no-op.
pub fn shutdown() {
    let taken = RUNTIME.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(mut runtime) = taken {
        runtime.display.stop();
        info!("[ENGINE] Shut down.");
    }
}

pub fn is_initialised() -> bool {
    RUNTIME.lock().unwrap_or_else(PoisonError::into_inner).is_some()
}

/// A factory for the initialised browser engine.
pub fn default_factory() -> Result<EngineFactory, PrinterError> {
    let runtime = RUNTIME.lock().unwrap_or_else(PoisonError::into_inner);
    let runtime = runtime.as_ref().ok_or_else(|| {
        PrinterError::EngineInit("engine::init() has not been called".to_string())
    })?;
    let settings = LaunchSettings {
        browser: runtime.browser.clone(),
        headless: runtime.display.is_headless(),
        display: runtime.display.display().map(str::to_string),
        extra_args: runtime.args.clone(),
    };
    Ok(Arc::new(move || {
        Ok(Box::new(ChromiumEngine::new(settings.clone())) as Box<dyn RenderEngine>)
    }))
}

fn find_browser(explicit: Option<&std::path::Path>) -> Result<PathBuf, PrinterError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            which::which(path).map_err(|_| {
                PrinterError::EngineInit(format!("browser {} not found", path.display()))
            })
        };
    }
    if let Some(path) = std::env::var_os(BROWSER_ENV).filter(|v| !v.is_empty()) {
        return find_browser(Some(std::path::Path::new(&path)));
    }
    BROWSER_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| {
            PrinterError::EngineInit(format!(
                "no browser found; tried {} (set {} to override)",
                BROWSER_CANDIDATES.join(", "),
                BROWSER_ENV
            ))
        })
}
