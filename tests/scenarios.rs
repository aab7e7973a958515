//! End-to-end scenarios driving `DebugSession` through a fake CDP peer,
//! exercising the six bootstrap/breakpoint/step/variable/navigation/
//! worker walkthroughs the bridge is built around.

mod support;

use serde_json::json;
use support::{build_fixture_module_base64, FakeCdpClient, LINE10_ADDR, LINE20_ADDR, LINE4_ADDR, LINE9_ADDR_A, LINE9_ADDR_B};
use wasm_dbg_bridge::debugger::cdp::{CallFrame, CdpEvent, CdpLocation, RemoteObject, Scope};
use wasm_dbg_bridge::debugger::session::{DebugSession, PathRemap, SessionEvent};
use wasm_dbg_bridge::debugger::thread::ThreadState;

fn wasm_frame(line_addr: u32, scope_chain: Vec<Scope>) -> CallFrame {
    CallFrame {
        call_frame_id: "cf0".into(),
        function_name: "main".into(),
        location: CdpLocation {
            script_id: "wasm-1".into(),
            line_number: 0,
            column_number: Some(line_addr),
        },
        scope_chain,
    }
}

async fn load_fixture_module(session: &mut DebugSession, cdp: &FakeCdpClient) -> Option<SessionEvent> {
    cdp.queue("Debugger.getScriptSource", json!({"bytecode": build_fixture_module_base64()}));
    session
        .handle_event(
            None,
            CdpEvent::ScriptParsed {
                script_id: "wasm-1".into(),
                url: "Main.cpp".into(),
                script_language: Some("WebAssembly".into()),
            },
        )
        .await
        .unwrap()
}

/// Scenario 1: a breakpoint set before the module loads stays
/// unresolved, then verifies (and fires `BreakpointChanged`) once the
/// module's DWARF becomes available.
#[tokio::test]
async fn scenario1_breakpoint_set_before_load_verifies_on_script_parsed() {
    let cdp = FakeCdpClient::new();
    let mut session = DebugSession::new(cdp.clone(), PathRemap::default());
    session.activate().await.unwrap();

    session.set_break_point("Main.cpp".into(), 4, None).await.unwrap();
    assert_eq!(cdp.calls_named("Debugger.setBreakpoint"), 0);

    let event = load_fixture_module(&mut session, &cdp).await;
    assert!(matches!(event, Some(SessionEvent::BreakpointChanged)));
    assert_eq!(cdp.calls_named("Debugger.setBreakpoint"), 1);
    let params = cdp.last_params("Debugger.setBreakpoint").unwrap();
    assert_eq!(params["location"]["columnNumber"], LINE4_ADDR);
}

/// Scenario 2: Chrome reports two pauses on the same source line while
/// stepping over it; the thread must keep stepping transparently and
/// only surface the pause once the line actually changes.
#[tokio::test]
async fn scenario2_step_over_dedups_same_line_pauses() {
    let cdp = FakeCdpClient::new();
    let mut session = DebugSession::new(cdp.clone(), PathRemap::default());
    session.activate().await.unwrap();
    load_fixture_module(&mut session, &cdp).await;

    session
        .handle_event(None, CdpEvent::Paused { call_frames: vec![wasm_frame(LINE9_ADDR_A, vec![])], reason: "other".into() })
        .await
        .unwrap();
    assert_eq!(session.get_stack_frames(None).unwrap()[0].line, 9);

    session.step_over(None).await.unwrap();

    session
        .handle_event(None, CdpEvent::Paused { call_frames: vec![wasm_frame(LINE9_ADDR_B, vec![])], reason: "other".into() })
        .await
        .unwrap();
    // same source line: the thread should have silently re-stepped and
    // still be running, not back in a paused state.
    assert_eq!(session.get_thread_list()[0].1, ThreadState::Running);
    assert_eq!(cdp.calls_named("Debugger.stepOver"), 2);

    session
        .handle_event(None, CdpEvent::Paused { call_frames: vec![wasm_frame(LINE10_ADDR, vec![])], reason: "other".into() })
        .await
        .unwrap();
    assert_eq!(session.get_thread_list()[0].1, ThreadState::Paused);
    assert_eq!(session.get_stack_frames(None).unwrap()[0].line, 10);
}

/// Scenario 3: an attached worker gets its own thread and its own
/// breakpoint mirror, and detaching removes it without disturbing the
/// main thread.
#[tokio::test]
async fn scenario3_worker_attach_gets_its_own_thread_and_breakpoints() {
    let cdp = FakeCdpClient::new();
    let mut session = DebugSession::new(cdp.clone(), PathRemap::default());
    session.activate().await.unwrap();

    session.set_break_point("Main.cpp".into(), 4, None).await.unwrap();

    let event = session
        .handle_event(None, CdpEvent::AttachedToTarget { session_id: "worker-1".into(), target_id: "t1".into() })
        .await
        .unwrap();
    assert!(matches!(event, Some(SessionEvent::ThreadStarted { thread_id: 1 })));
    assert_eq!(session.get_thread_list().len(), 2);

    // the worker's own attach-time reconciliation fires against an empty
    // registry (no module loaded on it yet), so no CDP breakpoint goes
    // out until that worker's module parses.
    assert_eq!(cdp.calls_named("Debugger.setBreakpoint"), 0);

    let event = session
        .handle_event(None, CdpEvent::DetachedFromTarget { session_id: "worker-1".into() })
        .await
        .unwrap();
    assert!(matches!(event, Some(SessionEvent::ThreadExited { thread_id: 1 })));
    assert_eq!(session.get_thread_list().len(), 1);
}

/// Scenario 4: dumping a pointer variable reads its WASM local via
/// `Runtime.getProperties` on the paused frame's "local" scope, then
/// dereferences the pointer through `Debugger.evaluateOnCallFrame`
/// scoped to that frame's call frame id.
#[tokio::test]
async fn scenario4_dump_pointer_variable_reads_local_then_dereferences_through_call_frame() {
    let cdp = FakeCdpClient::new();
    let mut session = DebugSession::new(cdp.clone(), PathRemap::default());
    session.activate().await.unwrap();
    load_fixture_module(&mut session, &cdp).await;

    let local_scope = Scope {
        r#type: "local".into(),
        object: RemoteObject {
            r#type: "object".into(),
            object_id: Some("locals-obj".into()),
            ..Default::default()
        },
    };
    cdp.queue(
        "Runtime.getProperties",
        json!({"result": [{"name": "0", "value": {"type": "number", "value": 0x1000}}]}),
    );
    cdp.queue(
        "Debugger.evaluateOnCallFrame",
        json!({"result": {"value": [42, 0, 0, 0]}}),
    );

    session
        .handle_event(None, CdpEvent::Paused { call_frames: vec![wasm_frame(LINE20_ADDR, vec![local_scope])], reason: "other".into() })
        .await
        .unwrap();

    let value = session.dump_variable(None, "*p").await.unwrap();
    assert_eq!(value.to_string(), "42");
    assert_eq!(cdp.calls_named("Debugger.evaluateOnCallFrame"), 1);
    let params = cdp.last_params("Debugger.evaluateOnCallFrame").unwrap();
    assert_eq!(params["callFrameId"], "cf0");
}

/// Scenario 5: a page reload tears down every thread but the session's
/// breakpoint intent survives, re-verifying against the freshly loaded
/// module.
#[tokio::test]
async fn scenario5_page_reload_preserves_breakpoint_intent_and_reverifies() {
    let cdp = FakeCdpClient::new();
    let mut session = DebugSession::new(cdp.clone(), PathRemap::default());
    session.activate().await.unwrap();

    let id = session.set_break_point("Main.cpp".into(), 4, None).await.unwrap();
    load_fixture_module(&mut session, &cdp).await;
    assert_eq!(cdp.calls_named("Debugger.setBreakpoint"), 1);

    session.handle_event(None, CdpEvent::PageLoadEventFired).await.unwrap();
    assert_eq!(session.get_thread_list().len(), 1);
    let breakpoints = session.get_break_points_list();
    assert_eq!(breakpoints.len(), 1);
    assert_eq!(breakpoints[0].0, id);

    load_fixture_module(&mut session, &cdp).await;
    assert_eq!(cdp.calls_named("Debugger.setBreakpoint"), 2);
}

/// Scenario 6: a pause on a non-WASM (JavaScript) frame still resolves
/// to a displayable file/line using CDP's 0-based line plus one, even
/// though no DWARF container backs it.
#[tokio::test]
async fn scenario6_non_wasm_frame_resolves_without_dwarf() {
    let cdp = FakeCdpClient::new();
    let mut session = DebugSession::new(cdp.clone(), PathRemap::default());
    session.activate().await.unwrap();

    session
        .handle_event(
            None,
            CdpEvent::ScriptParsed { script_id: "js-1".into(), url: "app.js".into(), script_language: None },
        )
        .await
        .unwrap();

    let frame = CallFrame {
        call_frame_id: "cf-js".into(),
        function_name: "onClick".into(),
        location: CdpLocation { script_id: "js-1".into(), line_number: 9, column_number: None },
        scope_chain: vec![],
    };
    session
        .handle_event(None, CdpEvent::Paused { call_frames: vec![frame], reason: "other".into() })
        .await
        .unwrap();

    let frames = session.get_stack_frames(None).unwrap();
    assert_eq!(frames[0].file, "app.js");
    assert_eq!(frames[0].line, 10);
}
