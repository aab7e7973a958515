//! Thread (spec §4.4): one per CDP execution session (the main page plus
//! each attached worker). Owns the per-thread breakpoint mirror, the
//! Running/Paused state machine, and the last-known stack frame list.

use crate::debugger::address::CodeOffset;
use crate::debugger::breakpoint::{BreakpointId, BreakpointRegistry, ResolvedBreakpoint};
use crate::debugger::cdp::proxy::SessionProxy;
use crate::debugger::cdp::{CallFrame as CdpCallFrame, CdpEvent};
use crate::debugger::dwarf::{EvalStep, Variable};
use crate::debugger::error::{Error, Result};
use crate::debugger::memory::{MemoryEvaluator, MemoryReader};
use crate::debugger::registry::FileRegistry;
use crate::debugger::value::{build_frame_values, FrameValues, PropertyResolver, TypedValue};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

const HOP_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Running,
    Paused,
}

/// A resolved call frame as surfaced to the outer adapter (spec §4.4,
/// "Stack-frame construction on pause").
#[derive(Debug, Clone)]
pub struct ResolvedFrame {
    pub index: usize,
    pub function_name: String,
    pub file: String,
    pub line: u32,
    pub instruction: CodeOffset,
}

struct FrameSnapshot {
    raw: CdpCallFrame,
    resolved: ResolvedFrame,
    values: RefCell<Option<Rc<FrameValues>>>,
}

/// One per CDP execution session (spec §2 item 4).
pub struct Thread {
    pub id: u32,
    proxy: SessionProxy,
    registry: Rc<RefCell<FileRegistry>>,
    breakpoints: Rc<RefCell<BreakpointRegistry>>,
    mirror: HashMap<BreakpointId, ResolvedBreakpoint>,
    state: ThreadState,
    frames: Vec<FrameSnapshot>,
    focused_frame: usize,
    memory: Option<Rc<MemoryEvaluator>>,
    step_in_progress: Option<&'static str>,
    last_notified: Option<(String, u32)>,
    script_loading: Rc<RefCell<Option<Rc<tokio::sync::Notify>>>>,
}

impl Thread {
    pub fn new(
        id: u32,
        proxy: SessionProxy,
        registry: Rc<RefCell<FileRegistry>>,
        breakpoints: Rc<RefCell<BreakpointRegistry>>,
    ) -> Self {
        Self {
            id,
            proxy,
            registry,
            breakpoints,
            mirror: HashMap::new(),
            state: ThreadState::Running,
            frames: Vec::new(),
            focused_frame: 0,
            memory: None,
            step_in_progress: None,
            last_notified: None,
            script_loading: Rc::new(RefCell::new(None)),
        }
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    pub fn session_id(&self) -> &str {
        self.proxy.session_id()
    }

    /// Enable the Debugger/Runtime domains and the `beforeScriptExecution`
    /// instrumentation breakpoint (spec §4.5, thread activation).
    pub async fn activate(&self) -> Result<()> {
        self.proxy.call("Debugger.enable", json!({})).await?;
        self.proxy.call("Runtime.enable", json!({})).await?;
        self.proxy
            .call(
                "Debugger.setInstrumentationBreakpoint",
                json!({"instrumentation": "beforeScriptExecution"}),
            )
            .await?;
        self.proxy.call("Runtime.runIfWaitingForDebugger", json!({})).await?;
        Ok(())
    }

    /// Process one CDP event addressed to this thread (spec §4.4 state
    /// machine, §5 ordering guarantees). Returns whether a breakpoint was
    /// newly verified, so the caller can surface a `BreakpointChanged`
    /// event to the outer adapter.
    pub async fn handle_event(&mut self, event: CdpEvent) -> Result<bool> {
        match event {
            CdpEvent::ScriptParsed {
                script_id,
                url,
                script_language,
            } => self.on_script_parsed(script_id, url, script_language).await,
            CdpEvent::Paused { call_frames, reason } => {
                self.on_paused(call_frames, reason).await?;
                Ok(false)
            }
            CdpEvent::Resumed => {
                self.state = ThreadState::Running;
                self.frames.clear();
                self.memory = None;
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    async fn on_script_parsed(
        &mut self,
        script_id: String,
        url: String,
        script_language: Option<String>,
    ) -> Result<bool> {
        let notify = Rc::new(tokio::sync::Notify::new());
        *self.script_loading.borrow_mut() = Some(notify.clone());

        if script_language.as_deref() == Some("WebAssembly") {
            let source = self
                .proxy
                .call("Debugger.getScriptSource", json!({"scriptId": script_id}))
                .await?;
            let bytecode = source
                .get("bytecode")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::ProtocolViolation("missing bytecode in getScriptSource".into()))?;
            let bytes = base64_decode(bytecode)?;
            let parsed = crate::debugger::dwarf::DwarfContainer::parse(&bytes)
                .map_err(|_| Error::ModuleParse(url.clone()));
            if let Some(container) = crate::weak_error!(parsed) {
                self.registry.borrow_mut().load_wasm(script_id, url, container);
            }
        } else {
            self.registry.borrow_mut().load_non_wasm(script_id, url);
        }

        let changed = self.reconcile_breakpoints().await?;
        *self.script_loading.borrow_mut() = None;
        notify.notify_waiters();
        Ok(changed)
    }

    async fn on_paused(&mut self, call_frames: Vec<CdpCallFrame>, reason: String) -> Result<()> {
        if reason == "instrumentation" {
            // Await any in-flight scriptParsed processing so breakpoints
            // placed before the module loaded are attached before its
            // first instruction runs (spec §4.4, "Instrumentation pause").
            let notify = self.script_loading.borrow().clone();
            if let Some(notify) = notify {
                notify.notified().await;
            }
            self.proxy.call("Debugger.resume", json!({})).await?;
            return Ok(());
        }

        if reason == "Break on start" {
            self.proxy.call("Debugger.resume", json!({})).await?;
            return Ok(());
        }

        let resolved = self.resolve_frames(&call_frames)?;

        if let Some(method) = self.step_in_progress {
            if let Some(top) = resolved.first() {
                let same_place = self
                    .last_notified
                    .as_ref()
                    .map(|(f, l)| *f == top.file && *l == top.line)
                    .unwrap_or(false);
                if same_place {
                    // Chrome split one source line across several
                    // machine instructions; keep stepping transparently
                    // (spec §4.4, "Step de-duplication"). Re-issue the
                    // exact step that was in progress.
                    self.proxy.call(method, json!({})).await?;
                    return Ok(());
                }
            }
        }

        self.step_in_progress = None;
        if let Some(top) = resolved.first() {
            self.last_notified = Some((top.file.clone(), top.line));
        }

        self.frames = call_frames
            .into_iter()
            .zip(resolved)
            .map(|(raw, resolved)| FrameSnapshot {
                raw,
                resolved,
                values: RefCell::new(None),
            })
            .collect();
        self.focused_frame = 0;
        self.memory = Some(Rc::new(MemoryEvaluator::new()));
        self.state = ThreadState::Paused;
        Ok(())
    }

    fn resolve_frames(&self, frames: &[CdpCallFrame]) -> Result<Vec<ResolvedFrame>> {
        let registry = self.registry.borrow();
        frames
            .iter()
            .enumerate()
            .map(|(index, frame)| {
                let loc = registry.find_location(
                    &frame.location.script_id,
                    frame.location.line_number,
                    frame.location.column_number,
                )?;
                Ok(ResolvedFrame {
                    index,
                    function_name: frame.function_name.clone(),
                    file: loc.file,
                    line: loc.line,
                    instruction: CodeOffset(frame.location.column_number.unwrap_or(0)),
                })
            })
            .collect()
    }

    /// Reconciliation (spec §4.4, "Breakpoint reconciliation"). Edge
    /// triggered by registry changes or `scriptParsed`; idempotent.
    /// Returns whether any breakpoint was newly verified this pass.
    pub async fn reconcile_breakpoints(&mut self) -> Result<bool> {
        let mut changed = false;
        let requests: Vec<_> = self.breakpoints.borrow().list().cloned().collect();

        for req in &requests {
            self.mirror
                .entry(req.id)
                .or_insert_with(|| ResolvedBreakpoint::unresolved(req.clone()));
        }

        let stale: Vec<BreakpointId> = self
            .mirror
            .keys()
            .copied()
            .filter(|id| !self.breakpoints.borrow().contains(*id))
            .collect();
        for id in stale {
            if let Some(entry) = self.mirror.remove(&id) {
                if let Some(raw_id) = entry.raw_id() {
                    self.proxy
                        .call("Debugger.removeBreakpoint", json!({"breakpointId": raw_id}))
                        .await?;
                }
            }
        }

        let unresolved: Vec<BreakpointId> = self
            .mirror
            .iter()
            .filter(|(_, e)| !e.verified())
            .map(|(id, _)| *id)
            .collect();

        for id in unresolved {
            let (file, line) = {
                let entry = &self.mirror[&id];
                (entry.request.file.clone(), entry.request.line)
            };
            let Some((script_id, address)) = self.registry.borrow().find_address(&file, line) else {
                continue;
            };
            let result = self
                .proxy
                .call(
                    "Debugger.setBreakpoint",
                    json!({"location": {"scriptId": script_id, "lineNumber": 0, "columnNumber": address.0}}),
                )
                .await?;
            let raw_id = result
                .get("breakpointId")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::ProtocolViolation("setBreakpoint missing breakpointId".into()))?
                .to_owned();

            let canonical = self
                .registry
                .borrow()
                .file(&script_id)
                .and_then(|f| f.container.address_to_line(address));
            let (canon_file, canon_line) = canonical
                .map(|l| (l.file, l.line))
                .unwrap_or((file, line));

            self.mirror
                .get_mut(&id)
                .unwrap()
                .mark_verified(raw_id, canon_file, canon_line);
            changed = true;
        }
        Ok(changed)
    }

    pub fn get_stack_frames(&self) -> Result<Vec<ResolvedFrame>> {
        if self.state != ThreadState::Paused {
            return Err(Error::NotPaused);
        }
        Ok(self.frames.iter().map(|f| f.resolved.clone()).collect())
    }

    pub fn set_focused_frame(&mut self, index: usize) -> Result<()> {
        if index >= self.frames.len() {
            return Err(Error::FrameNotFound(index));
        }
        self.focused_frame = index;
        Ok(())
    }

    async fn resume_like(&mut self, method: &'static str, stepping: bool) -> Result<()> {
        if self.state != ThreadState::Paused {
            return Err(Error::NotPaused);
        }
        self.step_in_progress = stepping.then_some(method);
        self.proxy.call(method, json!({})).await?;
        self.state = ThreadState::Running;
        Ok(())
    }

    pub async fn step_over(&mut self) -> Result<()> {
        self.resume_like("Debugger.stepOver", true).await
    }

    pub async fn step_into(&mut self) -> Result<()> {
        self.resume_like("Debugger.stepInto", true).await
    }

    pub async fn step_out(&mut self) -> Result<()> {
        self.resume_like("Debugger.stepOut", true).await
    }

    pub async fn resume(&mut self) -> Result<()> {
        self.resume_like("Debugger.resume", false).await
    }

    fn focused(&self) -> Result<&FrameSnapshot> {
        if self.state != ThreadState::Paused {
            return Err(Error::NotPaused);
        }
        self.frames
            .get(self.focused_frame)
            .ok_or(Error::FrameNotFound(self.focused_frame))
    }

    pub fn list_variable(&self, group: Option<u32>) -> Result<Vec<VariableView>> {
        let frame = self.focused()?;
        let registry = self.registry.borrow();
        let file = registry
            .find_address(&frame.resolved.file, frame.resolved.line)
            .and_then(|(sid, _)| registry.file(&sid));
        let Some(file) = file else { return Ok(Vec::new()) };
        Ok(file
            .container
            .variables_at(frame.resolved.instruction, group)
            .into_iter()
            .map(|v| VariableView::new(v, file.container.type_table()))
            .collect())
    }

    pub fn list_global_variable(&self, group: Option<u32>) -> Result<Vec<VariableView>> {
        let registry = self.registry.borrow();
        // Globals live per-module; a focused frame is still required so
        // we know which module's globals are in play.
        let frame = self.focused()?;
        let file = registry
            .find_address(&frame.resolved.file, frame.resolved.line)
            .and_then(|(sid, _)| registry.file(&sid));
        let Some(file) = file else { return Ok(Vec::new()) };
        Ok(file
            .container
            .globals(group)
            .into_iter()
            .map(|v| VariableView::new(v, file.container.type_table()))
            .collect())
    }

    /// `dumpVariable` (spec §4.4): lazily build the focused frame's typed
    /// value store, then drive the evaluator through any memory hops.
    pub async fn dump_variable(&self, expr: &str) -> Result<TypedValue> {
        let frame = self.focused()?;
        let values = self.frame_values(frame).await?;

        let registry = self.registry.borrow();
        let file = registry
            .find_address(&frame.resolved.file, frame.resolved.line)
            .and_then(|(sid, _)| registry.file(&sid))
            .ok_or(Error::AddressUnresolved)?;

        let regs = crate::debugger::dwarf::expr::RegisterSnapshot {
            locals: &values.locals,
            globals: &values.globals,
            stack: &values.stack,
        };

        let mut step = file.container.begin_eval(frame.resolved.instruction, expr, &regs)?;
        let memory = self.memory.clone().ok_or(Error::NotPaused)?;
        let mut hops = 0u32;
        loop {
            match step {
                EvalStep::Done(v) => return Ok(v),
                EvalStep::NeedsMemory { address, byte_size, cursor } => {
                    hops += 1;
                    if hops > HOP_LIMIT {
                        return Err(Error::HopLimitExceeded(HOP_LIMIT));
                    }
                    let reader = CdpMemoryReader {
                        proxy: &self.proxy,
                        call_frame_id: &frame.raw.call_frame_id,
                    };
                    let bytes = memory.read(&reader, address, byte_size).await?;
                    step = file.container.continue_eval(cursor, &bytes)?;
                }
            }
        }
    }

    async fn frame_values(&self, frame: &FrameSnapshot) -> Result<Rc<FrameValues>> {
        if let Some(v) = frame.values.borrow().clone() {
            return Ok(v);
        }

        let resolver = CdpPropertyResolver(&self.proxy);
        let mut stack_props = Vec::new();
        let mut locals_props = Vec::new();
        let mut globals_props = Vec::new();

        for scope in &frame.raw.scope_chain {
            let object_id = scope
                .object
                .object_id
                .as_deref()
                .ok_or_else(|| Error::ProtocolViolation("scope object has no id".into()))?;
            let props = resolver.get_properties(object_id).await?;
            match scope.r#type.as_str() {
                "wasm-expression-stack" => stack_props = props,
                "local" => locals_props = props,
                "global" | "module" => globals_props = props,
                _ => {}
            }
        }

        let built = build_frame_values(stack_props, locals_props, globals_props, &resolver).await?;
        let built = Rc::new(built);
        *frame.values.borrow_mut() = Some(built.clone());
        Ok(built)
    }
}

/// What an outer adapter shows for one enumerated variable.
#[derive(Debug, Clone)]
pub struct VariableView {
    pub name: String,
    pub display_name: String,
    pub type_name: String,
    pub group_id: u32,
    pub child_group_id: Option<u32>,
}

impl VariableView {
    fn new(v: &Variable, types: &crate::debugger::dwarf::types::TypeTable) -> Self {
        let type_name = v
            .r#type
            .and_then(|t| types.get(t))
            .map(|t| t.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        Self {
            name: v.name.clone(),
            display_name: v.display_name.clone(),
            type_name,
            group_id: v.group_id,
            child_group_id: v.child_group_id,
        }
    }
}

struct CdpPropertyResolver<'a>(&'a SessionProxy);

#[async_trait(?Send)]
impl PropertyResolver for CdpPropertyResolver<'_> {
    async fn get_properties(&self, object_id: &str) -> Result<Vec<crate::debugger::cdp::PropertyDescriptor>> {
        let result = self
            .0
            .call("Runtime.getProperties", json!({"objectId": object_id, "ownProperties": true}))
            .await?;
        let descriptors = result
            .get("result")
            .cloned()
            .ok_or_else(|| Error::ProtocolViolation("getProperties missing result".into()))?;
        Ok(serde_json::from_value(descriptors)?)
    }
}

/// Reads the debuggee's WASM linear memory by evaluating an expression
/// scoped to the paused frame (spec §6.1): `memory`/`memories` are only
/// reachable through the paused call frame's scope, not the page's
/// global `Runtime.evaluate` context, so this goes through
/// `Debugger.evaluateOnCallFrame`.
struct CdpMemoryReader<'a> {
    proxy: &'a SessionProxy,
    call_frame_id: &'a str,
}

#[async_trait(?Send)]
impl MemoryReader for CdpMemoryReader<'_> {
    async fn read_memory(&self, address: u64, byte_size: u64) -> Result<Vec<u8>> {
        let end = address + byte_size;
        let expression =
            format!("Array.from(new Uint8Array(memories[0].buffer).subarray({address}, {end}))");
        let result = self
            .proxy
            .call(
                "Debugger.evaluateOnCallFrame",
                json!({
                    "callFrameId": self.call_frame_id,
                    "expression": expression,
                    "returnByValue": true,
                }),
            )
            .await?;
        let arr = result
            .get("result")
            .and_then(|r| r.get("value"))
            .and_then(Value::as_array)
            .ok_or_else(|| Error::ProtocolViolation("memory read missing value array".into()))?;
        Ok(arr.iter().filter_map(Value::as_u64).map(|b| b as u8).collect())
    }
}

fn base64_decode(s: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| Error::ProtocolViolation(format!("invalid base64 in script source: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::breakpoint::BreakpointRegistry;
    use crate::debugger::cdp::{CallFrame as FakeCallFrame, CdpEvent as FakeCdpEvent, CdpClient, CdpLocation};
    use tokio::sync::broadcast;

    struct FakeCdp {
        calls: RefCell<Vec<(Option<String>, String)>>,
    }

    impl FakeCdp {
        fn new() -> Rc<Self> {
            Rc::new(Self { calls: RefCell::new(Vec::new()) })
        }

        fn calls_named(&self, method: &str) -> usize {
            self.calls.borrow().iter().filter(|(_, m)| m == method).count()
        }
    }

    #[async_trait(?Send)]
    impl CdpClient for FakeCdp {
        async fn call(&self, session_id: Option<&str>, method: &str, _params: Value) -> Result<Value> {
            self.calls.borrow_mut().push((session_id.map(str::to_string), method.to_string()));
            Ok(json!({}))
        }

        fn subscribe(&self) -> broadcast::Receiver<(Option<String>, FakeCdpEvent)> {
            broadcast::channel(1).1
        }
    }

    fn paused_frame(script_id: &str, line_number: u32) -> FakeCallFrame {
        FakeCallFrame {
            call_frame_id: "cf0".into(),
            function_name: "foo".into(),
            location: CdpLocation {
                script_id: script_id.into(),
                line_number,
                column_number: None,
            },
            scope_chain: vec![],
        }
    }

    fn new_thread(cdp: Rc<FakeCdp>) -> Thread {
        let registry = Rc::new(RefCell::new(FileRegistry::new()));
        registry.borrow_mut().load_non_wasm("sid".into(), "app.js".into());
        let breakpoints = Rc::new(RefCell::new(BreakpointRegistry::new()));
        let proxy = SessionProxy::new(cdp, "");
        Thread::new(0, proxy, registry, breakpoints)
    }

    #[tokio::test]
    async fn pause_resolves_non_wasm_frame_and_enters_paused_state() {
        let mut thread = new_thread(FakeCdp::new());
        thread
            .handle_event(FakeCdpEvent::Paused {
                call_frames: vec![paused_frame("sid", 9)],
                reason: "other".into(),
            })
            .await
            .unwrap();

        assert_eq!(thread.state(), ThreadState::Paused);
        let frames = thread.get_stack_frames().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].file, "app.js");
        assert_eq!(frames[0].line, 10); // CDP is 0-based; displayed line is +1
    }

    #[tokio::test]
    async fn step_over_dedups_pauses_on_the_same_source_line() {
        let cdp = FakeCdp::new();
        let mut thread = new_thread(cdp.clone());
        thread
            .handle_event(FakeCdpEvent::Paused {
                call_frames: vec![paused_frame("sid", 9)],
                reason: "other".into(),
            })
            .await
            .unwrap();

        thread.step_over().await.unwrap();
        assert_eq!(thread.state(), ThreadState::Running);

        // Chrome reports a second pause on the very same source line
        // (the line spans several WASM instructions): the thread must
        // transparently keep stepping rather than surface it.
        thread
            .handle_event(FakeCdpEvent::Paused {
                call_frames: vec![paused_frame("sid", 9)],
                reason: "other".into(),
            })
            .await
            .unwrap();
        assert_eq!(thread.state(), ThreadState::Running);
        assert_eq!(cdp.calls_named("Debugger.stepOver"), 2);

        // A pause on a genuinely different line surfaces normally.
        thread
            .handle_event(FakeCdpEvent::Paused {
                call_frames: vec![paused_frame("sid", 12)],
                reason: "other".into(),
            })
            .await
            .unwrap();
        assert_eq!(thread.state(), ThreadState::Paused);
        assert_eq!(thread.get_stack_frames().unwrap()[0].line, 13);
    }

    #[tokio::test]
    async fn step_into_dedup_reissues_step_into_not_step_over() {
        let cdp = FakeCdp::new();
        let mut thread = new_thread(cdp.clone());
        thread
            .handle_event(FakeCdpEvent::Paused {
                call_frames: vec![paused_frame("sid", 9)],
                reason: "other".into(),
            })
            .await
            .unwrap();

        thread.step_into().await.unwrap();

        thread
            .handle_event(FakeCdpEvent::Paused {
                call_frames: vec![paused_frame("sid", 9)],
                reason: "other".into(),
            })
            .await
            .unwrap();
        assert_eq!(thread.state(), ThreadState::Running);
        assert_eq!(cdp.calls_named("Debugger.stepInto"), 2);
        assert_eq!(cdp.calls_named("Debugger.stepOver"), 0);
    }
}
