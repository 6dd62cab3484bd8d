// src/engine/display.rs
use crate::error::PrinterError;
use log::{debug, info, warn};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const XVFB_DISPLAY: &str = ":99";
const XVFB_SOCKET: &str = "/tmp/.X11-unix/X99";
const XVFB_STARTUP: Duration = Duration::from_secs(5);

/// What to do with a virtual display we started ourselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum XvfbMode {
    /// Stop it in `engine::shutdown()`.
    #[default]
    StartStop,
    /// Leave it running for later processes.
    KeepRunning,
}

/// How the browser gets a display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// The browser runs headless; no display needed.
    #[default]
    Headless,
    /// The browser runs on an X display: the current one if any, otherwise a
    /// virtual one on `:99`.
    Xvfb(XvfbMode),
}

/// The display prepared by `engine::init`.
#[derive(Debug)]
pub(crate) struct DisplayGuard {
    headless: bool,
    /// `DISPLAY` to hand the browser. `None` when it inherits ours.
    display: Option<String>,
    server: Option<Child>,
    mode: XvfbMode,
}

impl DisplayGuard {
    pub fn prepare(mode: DisplayMode) -> Result<Self, PrinterError> {
        let xvfb_mode = match mode {
            DisplayMode::Headless => {
                return Ok(Self {
                    headless: true,
                    display: None,
                    server: None,
                    mode: XvfbMode::default(),
                });
            }
            DisplayMode::Xvfb(xvfb_mode) => xvfb_mode,
        };

        if let Some(existing) = existing_display() {
            info!("[ENGINE] Using existing display {}.", existing);
            return Ok(Self { headless: false, display: None, server: None, mode: xvfb_mode });
        }

        let server = start_xvfb()?;
        Ok(Self {
            headless: false,
            display: Some(XVFB_DISPLAY.to_string()),
            server,
            mode: xvfb_mode,
        })
    }

    /// Value for the browser's `DISPLAY`, if it needs one.
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    pub fn is_headless(&self) -> bool {
        self.headless
    }

    pub fn stop(&mut self) {
        let Some(mut server) = self.server.take() else {
            return;
        };
        match self.mode {
            XvfbMode::KeepRunning => {
                info!("[ENGINE] Leaving Xvfb (pid {}) running.", server.id());
            }
            XvfbMode::StartStop => {
                if let Err(e) = server.kill() {
                    warn!("[ENGINE] Could not stop Xvfb: {}", e);
                }
                let _ = server.wait();
                info!("[ENGINE] Xvfb stopped.");
            }
        }
    }
}

fn existing_display() -> Option<String> {
    ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
}

/// Starts `Xvfb :99` unless its socket already exists. Returns the child when
/// we started one.
fn start_xvfb() -> Result<Option<Child>, PrinterError> {
    if Path::new(XVFB_SOCKET).exists() {
        info!("[ENGINE] Xvfb already running on {}.", XVFB_DISPLAY);
        return Ok(None);
    }

    let binary = which::which("Xvfb").map_err(|e| {
        PrinterError::EngineInit(format!("no display available and Xvfb not found: {}", e))
    })?;
    let mut child = Command::new(&binary)
        .args([XVFB_DISPLAY, "-screen", "0", "1920x1080x24", "-nolisten", "tcp"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| PrinterError::EngineInit(format!("starting {}: {}", binary.display(), e)))?;

    let deadline = Instant::now() + XVFB_STARTUP;
    while !Path::new(XVFB_SOCKET).exists() {
        if let Ok(Some(status)) = child.try_wait() {
            return Err(PrinterError::EngineInit(format!("Xvfb exited early ({})", status)));
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            return Err(PrinterError::EngineInit(format!(
                "Xvfb did not create {} within {:?}",
                XVFB_SOCKET, XVFB_STARTUP
            )));
        }
        thread::sleep(Duration::from_millis(50));
    }
    debug!("[ENGINE] Xvfb (pid {}) is up on {}.", child.id(), XVFB_DISPLAY);
    Ok(Some(child))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_needs_no_display() {
        let mut guard = DisplayGuard::prepare(DisplayMode::Headless).unwrap();
        assert!(guard.is_headless());
        assert_eq!(guard.display(), None);
        guard.stop();
    }
}
