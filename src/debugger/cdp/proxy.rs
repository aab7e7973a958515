//! CDP Session Proxy (spec §4.6): decorates an underlying [`CdpClient`] so
//! every call is auto-tagged with a target's session id, and so event
//! subscription only ever sees that session's events. Each [`Thread`]
//! (one per debuggable target) owns its own proxy over the same shared
//! transport.

use crate::debugger::cdp::{CdpClient, CdpEvent};
use crate::debugger::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::rc::Rc;
use tokio::sync::broadcast;

/// The default/top-level target has no CDP session id; we represent it
/// as the empty string rather than `Option<String>` so it composes with
/// `HashMap` keys and log lines without repeated unwrapping (spec §3,
/// `Thread.session_id`).
pub const DEFAULT_SESSION: &str = "";

#[derive(Clone)]
pub struct SessionProxy {
    inner: Rc<dyn CdpClient>,
    session_id: String,
}

impl SessionProxy {
    pub fn new(inner: Rc<dyn CdpClient>, session_id: impl Into<String>) -> Self {
        Self {
            inner,
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn tag(&self) -> Option<&str> {
        if self.session_id.is_empty() {
            None
        } else {
            Some(&self.session_id)
        }
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.inner.call(self.tag(), method, params).await
    }

    /// A receiver that only yields events addressed to this proxy's
    /// session (or, for the default session, events with no session tag
    /// at all).
    pub fn events(&self) -> SessionEvents {
        SessionEvents {
            inner: self.inner.subscribe(),
            session_id: self.session_id.clone(),
        }
    }
}

pub struct SessionEvents {
    inner: broadcast::Receiver<(Option<String>, CdpEvent)>,
    session_id: String,
}

impl SessionEvents {
    /// Await the next event belonging to this session, skipping events
    /// addressed to other targets. Lagged events (the subscriber fell
    /// behind the broadcast channel's buffer) are silently resynchronized
    /// to the oldest still-buffered event, matching the rest of the
    /// bridge's "best effort, never wedge the UI" stance on event loss.
    pub async fn recv(&mut self) -> Option<CdpEvent> {
        loop {
            match self.inner.recv().await {
                Ok((tag, event)) => {
                    let matches = match &tag {
                        Some(id) => *id == self.session_id,
                        None => self.session_id.is_empty(),
                    };
                    if matches {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[async_trait(?Send)]
impl CdpClient for SessionProxy {
    async fn call(&self, session_id: Option<&str>, method: &str, params: Value) -> Result<Value> {
        let tag = session_id.or_else(|| self.tag());
        self.inner.call(tag, method, params).await
    }

    fn subscribe(&self) -> broadcast::Receiver<(Option<String>, CdpEvent)> {
        self.inner.subscribe()
    }
}
