//! Debug Session (spec §4.5): owns the registry, the breakpoint
//! registry, and the thread table. Routes user commands to the focused
//! thread; creates/destroys threads on CDP target attach/detach.

use crate::debugger::breakpoint::BreakpointRegistry;
use crate::debugger::cdp::proxy::{SessionProxy, DEFAULT_SESSION};
use crate::debugger::cdp::{CdpClient, CdpEvent};
use crate::debugger::error::{Error, Result};
use crate::debugger::registry::FileRegistry;
use crate::debugger::thread::{ResolvedFrame, Thread, ThreadState, VariableView};
use crate::debugger::value::TypedValue;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Optional `serverRoot`/`webRoot` path remap applied to outgoing stack
/// frames (spec §4.5, "Path remap").
#[derive(Debug, Clone, Default)]
pub struct PathRemap {
    pub server_root: Option<String>,
    pub web_root: Option<String>,
}

impl PathRemap {
    fn apply(&self, file: String) -> String {
        match (&self.server_root, &self.web_root) {
            (Some(server), Some(web)) => match file.strip_prefix(server.as_str()) {
                Some(rest) => format!("{web}{rest}"),
                None => file,
            },
            _ => file,
        }
    }
}

/// Events the outer adapter (CLI or DAP) reacts to.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ThreadStarted { thread_id: u32 },
    ThreadExited { thread_id: u32 },
    BreakpointChanged,
}

pub struct DebugSession {
    cdp: Rc<dyn CdpClient>,
    registry: Rc<RefCell<FileRegistry>>,
    breakpoints: Rc<RefCell<BreakpointRegistry>>,
    threads: HashMap<u32, Thread>,
    focused_thread: u32,
    next_thread_id: u32,
    path_remap: PathRemap,
}

impl DebugSession {
    pub fn new(cdp: Rc<dyn CdpClient>, path_remap: PathRemap) -> Self {
        let registry = Rc::new(RefCell::new(FileRegistry::new()));
        let breakpoints = Rc::new(RefCell::new(BreakpointRegistry::new()));
        let default_proxy = SessionProxy::new(cdp.clone(), DEFAULT_SESSION);
        let default_thread = Thread::new(0, default_proxy, registry.clone(), breakpoints.clone());

        let mut threads = HashMap::new();
        threads.insert(0, default_thread);

        Self {
            cdp,
            registry,
            breakpoints,
            threads,
            focused_thread: 0,
            next_thread_id: 1,
            path_remap,
        }
    }

    pub async fn activate(&mut self) -> Result<()> {
        self.cdp.call(None, "Page.enable", serde_json::json!({})).await?;
        self.cdp
            .call(None, "Target.setDiscoverTargets", serde_json::json!({"discover": true}))
            .await?;
        self.cdp
            .call(
                None,
                "Target.setAutoAttach",
                serde_json::json!({"autoAttach": true, "waitForDebuggerOnStart": true, "flatten": true}),
            )
            .await?;
        self.threads.get(&0).unwrap().activate().await
    }

    /// Dispatch one top-level CDP event, creating/destroying threads as
    /// needed, or routing it to the matching Thread.
    pub async fn handle_event(&mut self, session_id: Option<String>, event: CdpEvent) -> Result<Option<SessionEvent>> {
        match event {
            CdpEvent::AttachedToTarget { session_id, .. } => {
                let id = self.next_thread_id;
                self.next_thread_id += 1;
                let proxy = SessionProxy::new(self.cdp.clone(), session_id);
                let thread = Thread::new(id, proxy, self.registry.clone(), self.breakpoints.clone());
                thread.activate().await?;
                self.threads.insert(id, thread);
                if let Some(t) = self.threads.get_mut(&id) {
                    t.reconcile_breakpoints().await?;
                }
                // A newly attached worker may immediately re-verify
                // breakpoints against modules the shared registry already
                // holds; ThreadStarted still takes priority as the event
                // surfaced here, matching the one-event-per-dispatch shape.
                Ok(Some(SessionEvent::ThreadStarted { thread_id: id }))
            }
            CdpEvent::DetachedFromTarget { session_id: sid } => {
                let id = self
                    .threads
                    .iter()
                    .find(|(_, t)| t.session_id() == sid)
                    .map(|(id, _)| *id);
                if let Some(id) = id {
                    self.threads.remove(&id);
                    if self.focused_thread == id {
                        self.focused_thread = 0;
                    }
                    return Ok(Some(SessionEvent::ThreadExited { thread_id: id }));
                }
                Ok(None)
            }
            CdpEvent::PageLoadEventFired => {
                self.registry.borrow_mut().reset();
                let session_id = self.threads.get(&0).expect("default thread always exists").session_id().to_string();
                let proxy = SessionProxy::new(self.cdp.clone(), session_id);
                let default = Thread::new(0, proxy, self.registry.clone(), self.breakpoints.clone());
                self.threads.clear();
                self.threads.insert(0, default);
                self.focused_thread = 0;
                Ok(None)
            }
            other => {
                let id = match &session_id {
                    Some(sid) => self.threads.iter().find(|(_, t)| t.session_id() == sid).map(|(id, _)| *id),
                    None => Some(0),
                };
                let Some(id) = id else { return Ok(None) };
                let thread = self.threads.get_mut(&id).ok_or(Error::ThreadNotFound(id))?;
                let changed = thread.handle_event(other).await?;
                Ok(changed.then_some(SessionEvent::BreakpointChanged))
            }
        }
    }

    fn thread(&self, id: Option<u32>) -> Result<&Thread> {
        let id = id.unwrap_or(self.focused_thread);
        self.threads.get(&id).ok_or(Error::ThreadNotFound(id))
    }

    fn thread_mut(&mut self, id: Option<u32>) -> Result<&mut Thread> {
        let id = id.unwrap_or(self.focused_thread);
        self.threads.get_mut(&id).ok_or(Error::ThreadNotFound(id))
    }

    pub fn set_focused_thread(&mut self, id: u32) -> Result<()> {
        if !self.threads.contains_key(&id) {
            return Err(Error::ThreadNotFound(id));
        }
        self.focused_thread = id;
        Ok(())
    }

    pub fn get_thread_list(&self) -> Vec<(u32, ThreadState)> {
        let mut list: Vec<_> = self.threads.iter().map(|(id, t)| (*id, t.state())).collect();
        list.sort_by_key(|(id, _)| *id);
        list
    }

    pub async fn set_break_point(&mut self, file: String, line: u32, column: Option<u32>) -> Result<u32> {
        let id = self.breakpoints.borrow_mut().insert(file, line, column);
        self.reconcile_all().await?;
        Ok(id.0)
    }

    pub async fn remove_break_point(&mut self, id: u32) -> Result<()> {
        self.breakpoints
            .borrow_mut()
            .remove(crate::debugger::breakpoint::BreakpointId(id))
            .ok_or(Error::BreakpointNotFound(crate::debugger::breakpoint::BreakpointId(id)))?;
        self.reconcile_all().await?;
        Ok(())
    }

    pub async fn remove_all_break_points(&mut self, path: &str) -> Result<()> {
        self.breakpoints.borrow_mut().remove_all_for_file(path);
        self.reconcile_all().await?;
        Ok(())
    }

    async fn reconcile_all(&mut self) -> Result<bool> {
        let mut changed = false;
        for thread in self.threads.values_mut() {
            changed |= thread.reconcile_breakpoints().await?;
        }
        Ok(changed)
    }

    pub fn get_break_points_list(&self) -> Vec<(u32, String, u32)> {
        self.breakpoints
            .borrow()
            .list()
            .map(|r| (r.id.0, r.file.clone(), r.line))
            .collect()
    }

    pub fn get_stack_frames(&self, thread_id: Option<u32>) -> Result<Vec<ResolvedFrame>> {
        let frames = self.thread(thread_id)?.get_stack_frames()?;
        Ok(frames
            .into_iter()
            .map(|mut f| {
                f.file = self.path_remap.apply(f.file);
                f
            })
            .collect())
    }

    pub fn set_focused_frame(&mut self, thread_id: Option<u32>, index: usize) -> Result<()> {
        self.thread_mut(thread_id)?.set_focused_frame(index)
    }

    pub fn list_variable(&self, thread_id: Option<u32>, group: Option<u32>) -> Result<Vec<VariableView>> {
        self.thread(thread_id)?.list_variable(group)
    }

    pub fn list_global_variable(&self, thread_id: Option<u32>, group: Option<u32>) -> Result<Vec<VariableView>> {
        self.thread(thread_id)?.list_global_variable(group)
    }

    pub async fn dump_variable(&self, thread_id: Option<u32>, expr: &str) -> Result<TypedValue> {
        self.thread(thread_id)?.dump_variable(expr).await
    }

    pub async fn step_over(&mut self, thread_id: Option<u32>) -> Result<()> {
        self.thread_mut(thread_id)?.step_over().await
    }

    pub async fn step_in(&mut self, thread_id: Option<u32>) -> Result<()> {
        self.thread_mut(thread_id)?.step_into().await
    }

    pub async fn step_out(&mut self, thread_id: Option<u32>) -> Result<()> {
        self.thread_mut(thread_id)?.step_out().await
    }

    pub async fn continue_(&mut self, thread_id: Option<u32>) -> Result<()> {
        self.thread_mut(thread_id)?.resume().await
    }

    /// `jumpToPage(url)` (spec §4, uniform interface): navigate the
    /// default target. The resulting `Page.loadEventFired` drives the
    /// thread-table reset in [`Self::handle_event`].
    pub async fn jump_to_page(&self, url: &str) -> Result<()> {
        self.cdp
            .call(None, "Page.navigate", serde_json::json!({"url": url}))
            .await?;
        Ok(())
    }
}
