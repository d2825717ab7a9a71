//! DevTools protocol (CDP) WebSocket client.
//!
//! Speaks JSON-RPC-style CDP to a page target: commands carry
//! auto-incremented ids and are correlated back to their callers; messages
//! without an id are events and are forwarded on a channel the caller
//! receives at connect time. The animator holds the client for commands
//! while the recorder task owns the event stream, so the two never contend
//! for a receiver.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::BrowserError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>>;

/// Default per-command response timeout.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// An event pushed by the browser (a message with `method` but no `id`).
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

/// A response correlated to a previously sent command.
#[derive(Debug, Clone)]
pub struct CdpResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<CdpResponseError>,
}

/// The `error` object of a failed CDP response.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CdpResponseError {
    pub code: i64,
    pub message: String,
    pub data: Option<String>,
}

// ---------------------------------------------------------------------------
// CdpClient
// ---------------------------------------------------------------------------

/// Shared handle to one DevTools WebSocket connection.
///
/// Cloning is cheap; all clones multiplex commands over the same socket.
/// The event receiver is handed out once, by [`CdpClient::connect`].
#[derive(Clone)]
pub struct CdpClient {
    next_id: Arc<AtomicU64>,
    pending: PendingMap,
    writer: Arc<Mutex<WsSink>>,
    _reader: Arc<tokio::task::JoinHandle<()>>,
}

impl CdpClient {
    /// Connect to a DevTools page target.
    ///
    /// `ws_url` is the target's `webSocketDebuggerUrl`, as listed by the
    /// browser's `/json/list` HTTP endpoint. Returns the command handle
    /// and the stream of events the target pushes.
    pub async fn connect(
        ws_url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CdpEvent>), BrowserError> {
        tracing::info!(url = ws_url, "connecting to DevTools target");

        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| BrowserError::ConnectionFailed {
                url: ws_url.to_string(),
                reason: e.to_string(),
            })?;
        let (writer, reader) = ws_stream.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let reader_pending = Arc::clone(&pending);
        let reader_task = tokio::spawn(async move {
            read_loop(reader, reader_pending, event_tx).await;
        });

        let client = Self {
            next_id: Arc::new(AtomicU64::new(1)),
            pending,
            writer: Arc::new(Mutex::new(writer)),
            _reader: Arc::new(reader_task),
        };
        Ok((client, event_rx))
    }

    /// Send a command and wait for its result (default timeout).
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value, BrowserError> {
        self.send_command_with_timeout(method, params, COMMAND_TIMEOUT)
            .await
    }

    /// Send a command and wait for its result with an explicit timeout.
    pub async fn send_command_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, BrowserError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = build_cdp_message(id, method, params).to_string();
        tracing::trace!(id = id, method = method, "CDP command");

        // Register before sending so a fast response cannot be dropped.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let sent = self
            .writer
            .lock()
            .await
            .send(Message::Text(payload.into()))
            .await;
        if let Err(e) = sent {
            self.pending.lock().await.remove(&id);
            return Err(BrowserError::Protocol {
                detail: format!("failed to send WebSocket message: {e}"),
            });
        }

        match tokio::time::timeout(timeout, rx).await {
            Err(_) => {
                // Nothing will answer this id anymore; drop its slot.
                self.pending.lock().await.remove(&id);
                Err(BrowserError::Timeout {
                    method: method.to_string(),
                    duration: timeout,
                })
            }
            Ok(Err(_)) => Err(BrowserError::Protocol {
                detail: "response channel closed unexpectedly".to_string(),
            }),
            Ok(Ok(response)) => response_result(response),
        }
    }

    /// Enable a CDP domain (`Page`, `DOM`, `Runtime`, ...). Most domains
    /// stay silent until explicitly enabled.
    pub async fn enable_domain(&self, domain: &str) -> Result<(), BrowserError> {
        self.send_command(&format!("{domain}.enable"), serde_json::json!({}))
            .await?;
        Ok(())
    }
}

/// Convert a correlated response into the command's result value.
fn response_result(response: CdpResponse) -> Result<Value, BrowserError> {
    match response.error {
        Some(err) => Err(BrowserError::CdpError {
            code: err.code,
            message: err.message,
            data: err.data,
        }),
        None => Ok(response.result.unwrap_or(Value::Null)),
    }
}

/// Reads WebSocket messages and dispatches responses/events until the
/// connection drops. Pending callers are failed out on disconnect.
async fn read_loop(
    mut reader: WsSource,
    pending: PendingMap,
    event_tx: mpsc::UnboundedSender<CdpEvent>,
) {
    while let Some(next) = reader.next().await {
        let text = match next {
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket read error, stopping reader");
                break;
            }
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket closed by remote");
                break;
            }
            Ok(msg) => match message_text(msg) {
                Some(text) => text,
                None => continue,
            },
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(json) => dispatch_message(&json, &pending, &event_tx).await,
            Err(e) => tracing::warn!(error = %e, "unparseable CDP message"),
        }
    }

    fail_pending(&pending).await;
}

/// Text payload of a data message; pings, pongs, and frames that are not
/// valid UTF-8 carry no CDP traffic.
fn message_text(msg: Message) -> Option<String> {
    match msg {
        Message::Text(t) => Some(t.to_string()),
        Message::Binary(b) => String::from_utf8(b.to_vec()).ok(),
        _ => None,
    }
}

/// Route one parsed wire message to its waiting caller or the event stream.
async fn dispatch_message(
    json: &Value,
    pending: &PendingMap,
    event_tx: &mpsc::UnboundedSender<CdpEvent>,
) {
    if let Some(response) = parse_cdp_response(json) {
        match pending.lock().await.remove(&response.id) {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => tracing::trace!(id = response.id, "response for unknown command id"),
        }
    } else if let Some(event) = parse_cdp_event(json) {
        // Nobody listening is fine; the event is simply dropped.
        let _ = event_tx.send(event);
    }
}

/// Answer every still-pending command with a connection-closed error.
async fn fail_pending(pending: &PendingMap) {
    for (id, tx) in pending.lock().await.drain() {
        let _ = tx.send(CdpResponse {
            id,
            result: None,
            error: Some(CdpResponseError {
                code: -1,
                message: "WebSocket connection closed".to_string(),
                data: None,
            }),
        });
    }
}

// ---------------------------------------------------------------------------
// Message helpers
// ---------------------------------------------------------------------------

/// Build a CDP command envelope (exposed for tests).
pub fn build_cdp_message(id: u64, method: &str, params: Value) -> Value {
    serde_json::json!({ "id": id, "method": method, "params": params })
}

/// Interpret a wire message as a command response. Responses carry an `id`.
pub fn parse_cdp_response(json: &Value) -> Option<CdpResponse> {
    let id = json.get("id")?.as_u64()?;
    Some(CdpResponse {
        id,
        result: json.get("result").cloned(),
        error: json
            .get("error")
            .and_then(|e| serde_json::from_value(e.clone()).ok()),
    })
}

/// Interpret a wire message as an event. Events carry `method` but no `id`.
pub fn parse_cdp_event(json: &Value) -> Option<CdpEvent> {
    if json.get("id").is_some() {
        return None;
    }
    let method = json.get("method")?.as_str()?.to_string();
    let params = json.get("params").cloned().unwrap_or(Value::Null);
    Some(CdpEvent { method, params })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
