// src/engine/chromium.rs
use super::cdp::{CdpConnection, CdpEvent};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info, warn};
use pagelink_traits::{
    DocumentSource, EngineError, EngineEvent, EventSender, LoadRequest, PrintRequest, RenderEngine,
};
use pagelink_types::{mm_to_inches, PageSetup};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::{NamedTempFile, TempDir};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::broadcast;
use url::Url;

const DEVTOOLS_BANNER: &str = "DevTools listening on ";
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// How to start the browser for one job.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub browser: PathBuf,
    pub headless: bool,
    /// `DISPLAY` for a non-headless browser.
    pub display: Option<String>,
    pub extra_args: Vec<String>,
}

/// A browser process and the profile directory it writes to.
///
/// Dropping it stops the process and waits for it to exit before the
/// profile is removed.
struct BrowserProcess {
    child: Child,
    _profile: TempDir,
}

impl Drop for BrowserProcess {
    fn drop(&mut self) {
        terminate(&mut self.child, EXIT_GRACE);
    }
}

/// Kills `child` and polls until it has exited or `grace` runs out.
/// Returns whether the process is known to be gone.
fn terminate(child: &mut Child, grace: Duration) -> bool {
    match child.try_wait() {
        Ok(Some(_)) => return true,
        Ok(None) => {}
        Err(e) => {
            warn!("[ENGINE] Could not query browser status: {}", e);
            return false;
        }
    }
    if let Err(e) = child.start_kill() {
        debug!("[ENGINE] chromium already gone: {}", e);
    }

    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("[ENGINE] chromium exited with {}.", status);
                return true;
            }
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(20)),
            Ok(None) => {
                warn!("[ENGINE] chromium still running after {:?}.", grace);
                return false;
            }
            Err(e) => {
                warn!("[ENGINE] Could not wait for browser exit: {}", e);
                return false;
            }
        }
    }
}

/// A live page in a browser started for this job.
struct PageSession {
    cdp: Arc<CdpConnection>,
    session_id: String,
    _staged_html: Option<NamedTempFile>,
    _browser: Mutex<BrowserProcess>,
}

impl PageSession {
    async fn call(&self, method: &str, params: Value) -> Result<Value, EngineError> {
        self.cdp.call(method, params, Some(&self.session_id)).await
    }
}

type SessionSlot = Arc<Mutex<Option<Arc<PageSession>>>>;

/// Drives a Chromium-family browser over the DevTools protocol.
///
/// Each engine launches its own browser with a throw-away profile, so no
/// state leaks between jobs. Operations spawn tasks on the caller's runtime
/// and report back through the event channel.
pub struct ChromiumEngine {
    settings: LaunchSettings,
    session: SessionSlot,
    scripts_enabled: Arc<AtomicBool>,
}

impl ChromiumEngine {
    pub fn new(settings: LaunchSettings) -> Self {
        Self {
            settings,
            session: Arc::default(),
            scripts_enabled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn current_session(&self) -> Option<Arc<PageSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

fn emit(events: &EventSender, event: EngineEvent) {
    if events.try_send(event).is_err() {
        debug!("[ENGINE] Job stopped listening; dropping event.");
    }
}

fn spawn<F>(future: F) -> Result<(), EngineError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|e| EngineError::Launch(format!("no async runtime: {}", e)))?;
    handle.spawn(future);
    Ok(())
}

impl RenderEngine for ChromiumEngine {
    fn name(&self) -> &'static str {
        "chromium"
    }

    fn load(&mut self, request: LoadRequest, events: EventSender) -> Result<(), EngineError> {
        let settings = self.settings.clone();
        let slot = Arc::clone(&self.session);
        spawn(async move {
            emit(&events, EngineEvent::LoadStarted);
            match open_page(settings, request, &events).await {
                Ok(session) => {
                    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(session));
                    emit(&events, EngineEvent::LoadFinished);
                }
                Err(e) => emit(&events, EngineEvent::LoadFailed(e.to_string())),
            }
        })
    }

    fn enable_scripts(&mut self) {
        self.scripts_enabled.store(true, Ordering::SeqCst);
    }

    fn evaluate_script(&mut self, script: String, events: EventSender) {
        let session = self.current_session();
        let enabled = self.scripts_enabled.load(Ordering::SeqCst);
        let reply_to = events.clone();
        let spawned = spawn(async move {
            let result = match session {
                Some(session) => evaluate(&session, &script, enabled).await,
                None => Err(EngineError::Script("no document loaded".to_string())),
            };
            emit(&events, EngineEvent::ScriptResult(result.map_err(|e| e.to_string())));
        });
        if let Err(e) = spawned {
            emit(&reply_to, EngineEvent::ScriptResult(Err(e.to_string())));
        }
    }

    fn print(&mut self, request: PrintRequest, events: EventSender) {
        let session = self.current_session();
        let reply_to = events.clone();
        let spawned = spawn(async move {
            let result = match session {
                Some(session) => print_pdf(&session, &request).await,
                None => Err(EngineError::Print("no document loaded".to_string())),
            };
            emit(&events, EngineEvent::PrintFinished(result.map_err(|e| e.to_string())));
        });
        if let Err(e) = spawned {
            emit(&reply_to, EngineEvent::PrintFinished(Err(e.to_string())));
        }
    }

    fn close(&mut self) {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(session) = session {
            // The last reference stops the browser and removes its profile.
            drop(session);
            info!("[ENGINE] chromium closed.");
        }
    }
}

// ============================================================================
// Load
// ============================================================================

async fn launch(settings: &LaunchSettings) -> Result<(BrowserProcess, String), EngineError> {
    let profile = tempfile::Builder::new().prefix("pagelink-profile-").tempdir()?;

    let mut command = Command::new(&settings.browser);
    if settings.headless {
        command.arg("--headless=new");
    }
    command
        .args([
            "--remote-debugging-port=0",
            "--no-first-run",
            "--no-default-browser-check",
            "--disable-gpu",
            "--disable-extensions",
            "--hide-scrollbars",
            "--mute-audio",
        ])
        .arg(format!("--user-data-dir={}", profile.path().display()))
        .args(&settings.extra_args)
        .arg("about:blank")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(display) = &settings.display {
        command.env("DISPLAY", display);
    }

    let mut child = command.spawn().map_err(|e| {
        EngineError::Launch(format!("starting {}: {}", settings.browser.display(), e))
    })?;
    let stderr = child.stderr.take();
    let browser = BrowserProcess {
        child,
        _profile: profile,
    };
    let stderr =
        stderr.ok_or_else(|| EngineError::Launch("browser stderr not captured".to_string()))?;

    let mut lines = BufReader::new(stderr).lines();
    let ws_url = loop {
        match lines.next_line().await? {
            Some(line) => {
                if let Some(url) = line.strip_prefix(DEVTOOLS_BANNER) {
                    break url.trim().to_string();
                }
                debug!("[ENGINE] chromium: {}", line);
            }
            None => {
                return Err(EngineError::Launch(
                    "browser exited before opening the DevTools endpoint".to_string(),
                ));
            }
        }
    };
    // Keep draining so the browser never blocks on a full pipe.
    tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            debug!("[ENGINE] chromium: {}", line);
        }
    });

    info!("[ENGINE] chromium (pid {:?}) listening on {}.", browser.child.id(), ws_url);
    Ok((browser, ws_url))
}

async fn open_page(
    settings: LaunchSettings,
    request: LoadRequest,
    events: &EventSender,
) -> Result<PageSession, EngineError> {
    let (browser, ws_url) = launch(&settings).await?;
    let cdp = CdpConnection::connect(&ws_url).await?;

    let target = cdp
        .call("Target.createTarget", json!({ "url": "about:blank" }), None)
        .await?;
    let target_id = string_field(&target, "targetId")?;
    let attached = cdp
        .call(
            "Target.attachToTarget",
            json!({ "targetId": target_id, "flatten": true }),
            None,
        )
        .await?;
    let session_id = string_field(&attached, "sessionId")?;

    let (url, staged_html) = document_url(&request.source)?;
    let session = PageSession {
        cdp,
        session_id,
        _staged_html: staged_html,
        _browser: Mutex::new(browser),
    };

    session.call("Page.enable", json!({})).await?;
    session
        .call("Page.setLifecycleEventsEnabled", json!({ "enabled": true }))
        .await?;
    session
        .call("Emulation.setScriptExecutionDisabled", json!({ "value": true }))
        .await?;

    let mut page_events = session.cdp.subscribe();
    let navigated = session.call("Page.navigate", json!({ "url": url.as_str() })).await?;
    if let Some(error) = navigated.get("errorText").and_then(Value::as_str) {
        return Err(EngineError::Launch(format!("navigating to {}: {}", url, error)));
    }
    let frame_id = string_field(&navigated, "frameId")?;
    let loader_id = navigated.get("loaderId").and_then(Value::as_str).map(str::to_string);
    emit(events, EngineEvent::LoadCommitted);

    // The initial about:blank document fires its own load; only the
    // navigation's loader counts.
    wait_for_event(&mut page_events, "document load", |event| {
        is_document_load(event, &session.session_id, &frame_id, loader_id.as_deref())
    })
    .await?;
    debug!("[ENGINE] {} loaded.", url);

    if let Some(css) = &request.stylesheet {
        inject_stylesheet(&session, css).await?;
    }
    Ok(session)
}

/// Whether `event` is the load lifecycle event of the navigation identified
/// by `frame_id` and, when the browser reported one, `loader_id`.
fn is_document_load(
    event: &CdpEvent,
    session_id: &str,
    frame_id: &str,
    loader_id: Option<&str>,
) -> bool {
    event.method == "Page.lifecycleEvent"
        && event.session_id.as_deref() == Some(session_id)
        && event.params["name"] == "load"
        && event.params["frameId"] == frame_id
        && loader_id.is_none_or(|id| event.params["loaderId"] == id)
}

async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<CdpEvent>,
    what: &str,
    mut matches: F,
) -> Result<CdpEvent, EngineError>
where
    F: FnMut(&CdpEvent) -> bool,
{
    loop {
        match events.recv().await {
            Ok(event) if matches(&event) => return Ok(event),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("[ENGINE] Missed {} DevTools events.", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(EngineError::Protocol(format!(
                    "connection closed while waiting for {}",
                    what
                )));
            }
        }
    }
}

async fn inject_stylesheet(session: &PageSession, css: &str) -> Result<(), EngineError> {
    session.call("DOM.enable", json!({})).await?;
    session.call("CSS.enable", json!({})).await?;
    let tree = session.call("Page.getFrameTree", json!({})).await?;
    let frame_id = tree
        .pointer("/frameTree/frame/id")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::Protocol("frame tree has no main frame".to_string()))?;
    let sheet = session
        .call("CSS.createStyleSheet", json!({ "frameId": frame_id }))
        .await?;
    let sheet_id = string_field(&sheet, "styleSheetId")?;
    session
        .call(
            "CSS.setStyleSheetText",
            json!({ "styleSheetId": sheet_id, "text": css }),
        )
        .await?;
    debug!("[ENGINE] Injected {} bytes of CSS.", css.len());
    Ok(())
}

/// Resolves the URL to navigate to. Inline HTML is staged in a file next to
/// its base so relative references keep working.
fn document_url(source: &DocumentSource) -> Result<(Url, Option<NamedTempFile>), EngineError> {
    match source {
        DocumentSource::Uri(uri) => Ok((resolve_uri(uri)?, None)),
        DocumentSource::Html { text, base_uri } => {
            let (dir, base_tag) = staging_dir(base_uri.as_deref());
            let mut staged = tempfile::Builder::new()
                .prefix(".pagelink-")
                .suffix(".html")
                .tempfile_in(&dir)
                .or_else(|_| tempfile::Builder::new().suffix(".html").tempfile())?;
            let html = match base_tag {
                Some(base) => format!("<base href=\"{}\">{}", base, text),
                None => text.clone(),
            };
            std::io::Write::write_all(&mut staged, html.as_bytes())?;
            let url = Url::from_file_path(staged.path()).map_err(|_| {
                EngineError::Io(format!("{} is not an absolute path", staged.path().display()))
            })?;
            Ok((url, Some(staged)))
        }
    }
}

fn resolve_uri(uri: &str) -> Result<Url, EngineError> {
    if let Ok(url) = Url::parse(uri) {
        return Ok(url);
    }
    let path = std::fs::canonicalize(uri)?;
    Url::from_file_path(&path)
        .map_err(|_| EngineError::Io(format!("{} is not a usable path", path.display())))
}

/// Directory to stage inline HTML in, plus a `<base>` for remote bases.
fn staging_dir(base_uri: Option<&str>) -> (PathBuf, Option<String>) {
    let local = |path: &Path| -> PathBuf {
        if path.is_dir() {
            path.to_path_buf()
        } else {
            path.parent().map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir)
        }
    };
    match base_uri {
        None => (std::env::temp_dir(), None),
        Some(base) => match Url::parse(base) {
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => (local(&path), None),
                Err(()) => (std::env::temp_dir(), None),
            },
            Ok(url) => (std::env::temp_dir(), Some(url.to_string())),
            Err(_) => (local(Path::new(base)), None),
        },
    }
}

// ============================================================================
// Script evaluation and printing
// ============================================================================

async fn evaluate(session: &PageSession, script: &str, enabled: bool) -> Result<String, EngineError> {
    if enabled {
        session
            .call("Emulation.setScriptExecutionDisabled", json!({ "value": false }))
            .await?;
    }
    let reply = session
        .call(
            "Runtime.evaluate",
            json!({ "expression": script, "returnByValue": true, "awaitPromise": true }),
        )
        .await?;

    if let Some(details) = reply.get("exceptionDetails") {
        let message = details
            .pointer("/exception/description")
            .or_else(|| details.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("script threw");
        return Err(EngineError::Script(message.to_string()));
    }
    match reply.pointer("/result/value") {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(EngineError::Script("script returned no value".to_string())),
    }
}

/// `Page.printToPDF` parameters. Paper size is given in portrait inches; the
/// browser turns it for landscape.
pub fn print_params(setup: &PageSetup) -> Value {
    json!({
        "landscape": setup.is_landscape(),
        "printBackground": true,
        "preferCSSPageSize": false,
        "paperWidth": mm_to_inches(setup.width_mm),
        "paperHeight": mm_to_inches(setup.height_mm),
        "marginTop": mm_to_inches(setup.margins.top),
        "marginBottom": mm_to_inches(setup.margins.bottom),
        "marginLeft": mm_to_inches(setup.margins.left),
        "marginRight": mm_to_inches(setup.margins.right),
    })
}

async fn print_pdf(session: &PageSession, request: &PrintRequest) -> Result<(), EngineError> {
    debug!("[ENGINE] Page setup:\n{}", request.page_setup.to_keyfile());
    let reply = session
        .call("Page.printToPDF", print_params(&request.page_setup))
        .await?;
    let data = reply
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::Print("printToPDF returned no data".to_string()))?;
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| EngineError::Print(format!("invalid PDF payload: {}", e)))?;
    tokio::fs::write(&request.output, &bytes).await?;
    info!(
        "[ENGINE] Printed {} bytes to {}.",
        bytes.len(),
        request.output.display()
    );
    Ok(())
}

fn string_field(value: &Value, key: &str) -> Result<String, EngineError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EngineError::Protocol(format!("reply is missing '{}'", key)))
}
