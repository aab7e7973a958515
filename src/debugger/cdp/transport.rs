//! Concrete CDP transport: JSON-RPC 2.0-shaped messages over a WebSocket,
//! as exposed by a browser's or WASM runtime's `--remote-debugging-port`
//! (spec §1, external collaborator). One background task demultiplexes
//! incoming frames: messages carrying an `id` complete a pending call,
//! everything else is a CDP event and is fanned out on a broadcast
//! channel.

use crate::debugger::cdp::{CdpClient, CdpEvent, CallFrame};
use crate::debugger::error::{Error, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

type PendingCalls = Rc<RefCell<HashMap<u64, oneshot::Sender<Value>>>>;

/// A live WebSocket connection to a CDP endpoint. Owns the demultiplexing
/// task for the lifetime of the session; dropping the last clone of the
/// `Rc` this lives behind cancels it.
pub struct WebSocketTransport {
    outbound: RefCell<futures_util::stream::SplitSink<WsStream, Message>>,
    pending: PendingCalls,
    next_id: Cell<u64>,
    events: broadcast::Sender<(Option<String>, CdpEvent)>,
    _reader: JoinHandle<()>,
}

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

impl WebSocketTransport {
    /// Connect to a CDP WebSocket debugger URL (as returned by the
    /// runtime's `/json/list` HTTP endpoint).
    pub async fn connect(url: &str) -> Result<Rc<Self>> {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| Error::CdpTransport(e.to_string()))?;
        let (sink, mut stream) = ws.split();

        let pending: PendingCalls = Rc::new(RefCell::new(HashMap::new()));
        let (events_tx, _) = broadcast::channel(1024);

        let pending_for_task = pending.clone();
        let events_for_task = events_tx.clone();
        let reader = tokio::task::spawn_local(async move {
            while let Some(msg) = stream.next().await {
                let Ok(Message::Text(text)) = msg else { continue };
                let Ok(value) = serde_json::from_str::<Value>(&text) else { continue };
                route_incoming(value, &pending_for_task, &events_for_task);
            }
        });

        Ok(Rc::new(Self {
            outbound: RefCell::new(sink),
            pending,
            next_id: Cell::new(1),
            events: events_tx,
            _reader: reader,
        }))
    }
}

fn route_incoming(
    value: Value,
    pending: &PendingCalls,
    events: &broadcast::Sender<(Option<String>, CdpEvent)>,
) {
    if let Some(id) = value.get("id").and_then(Value::as_u64) {
        if let Some(tx) = pending.borrow_mut().remove(&id) {
            let result = value.get("result").cloned().unwrap_or(Value::Null);
            let _ = tx.send(result);
        }
        return;
    }

    let Some(method) = value.get("method").and_then(Value::as_str) else {
        return;
    };
    let params = value.get("params").cloned().unwrap_or(Value::Null);
    let session_id = value
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_owned);

    if let Some(event) = decode_event(method, &params) {
        let _ = events.send((session_id, event));
    }
}

fn decode_event(method: &str, params: &Value) -> Option<CdpEvent> {
    match method {
        "Debugger.scriptParsed" => Some(CdpEvent::ScriptParsed {
            script_id: params.get("scriptId")?.as_str()?.to_owned(),
            url: params.get("url")?.as_str()?.to_owned(),
            script_language: params
                .get("scriptLanguage")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }),
        "Debugger.paused" => Some(CdpEvent::Paused {
            call_frames: serde_json::from_value::<Vec<CallFrame>>(
                params.get("callFrames")?.clone(),
            )
            .ok()?,
            reason: params.get("reason")?.as_str()?.to_owned(),
        }),
        "Debugger.resumed" => Some(CdpEvent::Resumed),
        "Target.attachedToTarget" => Some(CdpEvent::AttachedToTarget {
            session_id: params.get("sessionId")?.as_str()?.to_owned(),
            target_id: params.get("targetInfo")?.get("targetId")?.as_str()?.to_owned(),
        }),
        "Target.detachedFromTarget" => Some(CdpEvent::DetachedFromTarget {
            session_id: params.get("sessionId")?.as_str()?.to_owned(),
        }),
        "Page.loadEventFired" => Some(CdpEvent::PageLoadEventFired),
        _ => None,
    }
}

#[async_trait(?Send)]
impl CdpClient for WebSocketTransport {
    async fn call(&self, session_id: Option<&str>, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let mut frame = json!({ "id": id, "method": method, "params": params });
        if let Some(sid) = session_id {
            frame["sessionId"] = Value::String(sid.to_owned());
        }

        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().insert(id, tx);

        self.outbound
            .borrow_mut()
            .send(Message::Text(frame.to_string()))
            .await
            .map_err(|e| Error::CdpTransport(e.to_string()))?;

        rx.await
            .map_err(|_| Error::CdpTransport(format!("connection closed while awaiting call {id}")))
    }

    fn subscribe(&self) -> broadcast::Receiver<(Option<String>, CdpEvent)> {
        self.events.subscribe()
    }
}
