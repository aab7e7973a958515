//! The downstream CDP surface (spec §6.1) the core depends on, and the
//! concrete WebSocket transport underneath it. The transport and the
//! browser/runtime launcher are "external collaborators" (spec §1): the
//! core only ever talks to the [`CdpClient`] trait.

pub mod discover;
pub mod proxy;
pub mod transport;

use crate::debugger::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// A CDP `Runtime.RemoteObject` (the subset this bridge needs).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub unserializable_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub object_id: Option<String>,
}

/// A CDP `Runtime.PropertyDescriptor` (the subset this bridge needs).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(default)]
    pub value: RemoteObject,
}

/// A CDP `Debugger.Location`. WASM source positions use `line_number: 0`
/// plus `column_number` equal to the byte offset (spec §2).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpLocation {
    pub script_id: String,
    pub line_number: u32,
    #[serde(default)]
    pub column_number: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(rename = "type")]
    pub r#type: String,
    pub object: RemoteObject,
}

/// A CDP `Debugger.CallFrame` (the subset this bridge needs).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub call_frame_id: String,
    pub function_name: String,
    pub location: CdpLocation,
    #[serde(default)]
    pub scope_chain: Vec<Scope>,
}

/// Decoded CDP events this bridge subscribes to (spec §6.1).
#[derive(Debug, Clone)]
pub enum CdpEvent {
    ScriptParsed {
        script_id: String,
        url: String,
        script_language: Option<String>,
    },
    Paused {
        call_frames: Vec<CallFrame>,
        reason: String,
    },
    Resumed,
    AttachedToTarget {
        session_id: String,
        target_id: String,
    },
    DetachedFromTarget {
        session_id: String,
    },
    PageLoadEventFired,
}

/// The downstream collaborator: a JSON-RPC-over-WebSocket channel to the
/// debuggee. Every command is a suspend point (spec §5); events are
/// fanned out to every subscriber via a broadcast channel so that each
/// [`proxy::SessionProxy`] can filter independently without stealing
/// events from another target's thread.
#[async_trait(?Send)]
pub trait CdpClient {
    /// Issue a CDP command, optionally tagged with a session id, and
    /// await its response's `result` payload.
    async fn call(&self, session_id: Option<&str>, method: &str, params: Value) -> Result<Value>;

    /// Subscribe to the event stream. Each call returns an independent
    /// receiver; a slow or absent subscriber never blocks others.
    fn subscribe(&self) -> broadcast::Receiver<(Option<String>, CdpEvent)>;
}
