// src/engine/cdp.rs
//! Minimal DevTools protocol client: JSON commands over one websocket,
//! answered by id, plus a broadcast of protocol events.

use futures::{SinkExt, StreamExt};
use log::{debug, trace, warn};
use pagelink_traits::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, String>>>>>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Command<'a> {
    id: u64,
    method: &'a str,
    params: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Incoming {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<ProtocolError>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct ProtocolError {
    message: String,
}

/// A protocol event such as `Page.loadEventFired`.
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

pub struct CdpConnection {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Pending,
    events: broadcast::Sender<CdpEvent>,
    next_id: AtomicU64,
}

impl CdpConnection {
    /// Connects and spawns the reader and writer tasks on the current runtime.
    pub async fn connect(ws_url: &str) -> Result<Arc<Self>, EngineError> {
        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| EngineError::Protocol(format!("connecting to {}: {}", ws_url, e)))?;
        debug!("[ENGINE] DevTools connected at {}.", ws_url);

        let (mut sink, mut source) = stream.split();
        let (outgoing, mut queue) = mpsc::unbounded_channel::<Message>();
        let pending: Pending = Arc::default();
        let (events, _) = broadcast::channel(256);

        tokio::spawn(async move {
            while let Some(message) = queue.recv().await {
                if let Err(e) = sink.send(message).await {
                    warn!("[ENGINE] DevTools write failed: {}", e);
                    break;
                }
            }
        });

        let reader_pending = Arc::clone(&pending);
        let reader_events = events.clone();
        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => dispatch(&text, &reader_pending, &reader_events),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("[ENGINE] DevTools read failed: {}", e);
                        break;
                    }
                }
            }
            let mut pending = reader_pending.lock().unwrap_or_else(PoisonError::into_inner);
            for (_, waiter) in pending.drain() {
                let _ = waiter.send(Err("DevTools connection closed".to_string()));
            }
        });

        Ok(Arc::new(Self {
            outgoing,
            pending,
            events,
            next_id: AtomicU64::new(1),
        }))
    }

    /// Receives every event from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }

    /// Sends a command and waits for its result.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value, EngineError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let text = serde_json::to_string(&Command { id, method, params, session_id })
            .map_err(|e| EngineError::Protocol(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);

        trace!("[ENGINE] -> {}", text);
        self.outgoing
            .send(Message::Text(text))
            .map_err(|_| EngineError::Protocol("DevTools connection closed".to_string()))?;

        rx.await
            .map_err(|_| EngineError::Protocol(format!("{} got no reply", method)))?
            .map_err(|message| EngineError::Protocol(format!("{}: {}", method, message)))
    }
}

fn dispatch(text: &str, pending: &Pending, events: &broadcast::Sender<CdpEvent>) {
    let incoming: Incoming = match serde_json::from_str(text) {
        Ok(incoming) => incoming,
        Err(e) => {
            warn!("[ENGINE] Unreadable DevTools message: {}", e);
            return;
        }
    };

    if let Some(id) = incoming.id {
        let waiter = pending.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
        if let Some(waiter) = waiter {
            let reply = match incoming.error {
                Some(error) => Err(error.message),
                None => Ok(incoming.result.unwrap_or(Value::Null)),
            };
            let _ = waiter.send(reply);
        }
    } else if let Some(method) = incoming.method {
        trace!("[ENGINE] <- {}", method);
        // No subscribers is fine.
        let _ = events.send(CdpEvent {
            method,
            params: incoming.params,
            session_id: incoming.session_id,
        });
    }
}
