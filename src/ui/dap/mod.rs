//! Debug Adapter Protocol server (spec §6.2/§6.3): a stdio
//! `Content-Length`-framed JSON-RPC loop carrying the command/event
//! surface of the core. Framing itself is treated as ambient plumbing
//! (the spec scopes "DAP server framing" out of the core); this module
//! hand-rolls just enough of it — header parsing, sequence numbers,
//! request/response/event shapes — to drive `DebugSession` end to end,
//! the same stdio-transport role `bugstalker::ui::dap` plays over its
//! own (ptrace) core.

use crate::debugger::cdp::CdpClient;
use crate::debugger::session::{DebugSession, PathRemap, SessionEvent};
use serde_json::{json, Value};
use std::cell::Cell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

struct SeqCounter(Cell<i64>);

impl SeqCounter {
    fn next(&self) -> i64 {
        let n = self.0.get() + 1;
        self.0.set(n);
        n
    }
}

fn write_message(out: &mut impl Write, msg: &Value) -> io::Result<()> {
    let body = serde_json::to_vec(msg)?;
    write!(out, "Content-Length: {}\r\n\r\n", body.len())?;
    out.write_all(&body)?;
    out.flush()
}

fn read_message(input: &mut impl BufRead) -> io::Result<Option<Value>> {
    let mut content_length = None;
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some(v) = line.strip_prefix("Content-Length:") {
            content_length = v.trim().parse::<usize>().ok();
        }
    }
    let Some(len) = content_length else {
        return Ok(None);
    };
    let mut buf = vec![0u8; len];
    input.read_exact(&mut buf)?;
    Ok(serde_json::from_slice(&buf).ok())
}

pub async fn run(cdp: Rc<dyn CdpClient>, path_remap: PathRemap) -> anyhow::Result<()> {
    crate::log::init();

    let mut session = DebugSession::new(cdp.clone(), path_remap);
    session.activate().await?;

    let mut events = cdp.subscribe();
    let (req_tx, mut req_rx) = tokio::sync::mpsc::unbounded_channel::<Value>();
    let (resp_tx, resp_rx) = std::sync::mpsc::channel::<Value>();

    std::thread::spawn(move || {
        let mut input = io::BufReader::new(io::stdin());
        while let Ok(Some(msg)) = read_message(&mut input) {
            if req_tx.send(msg).is_err() {
                break;
            }
        }
    });

    std::thread::spawn(move || {
        let mut stdout = io::stdout();
        while let Ok(msg) = resp_rx.recv() {
            let _ = write_message(&mut stdout, &msg);
        }
    });

    let seq = SeqCounter(Cell::new(0));

    loop {
        tokio::select! {
            req = req_rx.recv() => {
                let Some(req) = req else { break };
                if !handle_request(&mut session, &req, &resp_tx, &seq).await {
                    break;
                }
            }
            event = events.recv() => {
                match event {
                    Ok((session_id, event)) => {
                        if let Some(ev) = session.handle_event(session_id, event).await? {
                            send_event_for(&ev, &resp_tx, &seq);
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}

fn send_event_for(event: &SessionEvent, out: &std::sync::mpsc::Sender<Value>, seq: &SeqCounter) {
    let (name, body) = match event {
        SessionEvent::ThreadStarted { thread_id } => ("thread", json!({"reason": "started", "threadId": thread_id})),
        SessionEvent::ThreadExited { thread_id } => ("thread", json!({"reason": "exited", "threadId": thread_id})),
        SessionEvent::BreakpointChanged => ("breakpoint", json!({"reason": "changed"})),
    };
    let _ = out.send(json!({"seq": seq.next(), "type": "event", "event": name, "body": body}));
}

async fn handle_request(
    session: &mut DebugSession,
    req: &Value,
    out: &std::sync::mpsc::Sender<Value>,
    seq: &SeqCounter,
) -> bool {
    let request_seq = req.get("seq").and_then(Value::as_i64).unwrap_or(0);
    let command = req.get("command").and_then(Value::as_str).unwrap_or_default();
    let args = req.get("arguments").cloned().unwrap_or(Value::Null);

    let result = dispatch(session, command, &args).await;
    let (success, body) = match result {
        Ok(body) => (true, body),
        Err(e) => (false, json!({"error": e.to_string()})),
    };

    let response = json!({
        "seq": seq.next(),
        "type": "response",
        "request_seq": request_seq,
        "command": command,
        "success": success,
        "body": body,
    });
    let _ = out.send(response);

    command != "disconnect"
}

async fn dispatch(
    session: &mut DebugSession,
    command: &str,
    args: &Value,
) -> crate::debugger::error::Result<Value> {
    match command {
        "initialize" => Ok(json!({"supportsConfigurationDoneRequest": true})),
        "setBreakpoints" => {
            let source_path = args
                .get("source")
                .and_then(|s| s.get("path"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            session.remove_all_break_points(&source_path).await?;
            let mut verified = Vec::new();
            for bp in args.get("breakpoints").and_then(Value::as_array).into_iter().flatten() {
                let line = bp.get("line").and_then(Value::as_u64).unwrap_or(0) as u32;
                let id = session.set_break_point(source_path.clone(), line, None).await?;
                verified.push(json!({"id": id, "verified": false, "line": line}));
            }
            Ok(json!({"breakpoints": verified}))
        }
        "continue" => {
            session.continue_(thread_id(args)).await?;
            Ok(json!({"allThreadsContinued": false}))
        }
        "next" => {
            session.step_over(thread_id(args)).await?;
            Ok(Value::Null)
        }
        "stepIn" => {
            session.step_in(thread_id(args)).await?;
            Ok(Value::Null)
        }
        "stepOut" => {
            session.step_out(thread_id(args)).await?;
            Ok(Value::Null)
        }
        "threads" => {
            let threads: Vec<_> = session
                .get_thread_list()
                .into_iter()
                .map(|(id, _)| json!({"id": id, "name": format!("thread-{id}")}))
                .collect();
            Ok(json!({"threads": threads}))
        }
        "stackTrace" => {
            let frames = session.get_stack_frames(thread_id(args))?;
            let dap_frames: Vec<_> = frames
                .into_iter()
                .map(|f| {
                    json!({
                        "id": f.index,
                        "name": f.function_name,
                        "source": {"path": f.file},
                        "line": f.line,
                        "column": 1,
                    })
                })
                .collect();
            Ok(json!({"stackFrames": dap_frames}))
        }
        "scopes" => {
            let frame_id = args.get("frameId").and_then(Value::as_u64).unwrap_or(0) as usize;
            session.set_focused_frame(thread_id(args), frame_id)?;
            Ok(json!({"scopes": [
                {"name": "Locals", "variablesReference": 1, "expensive": false},
                {"name": "Globals", "variablesReference": 2, "expensive": false},
            ]}))
        }
        "variables" => {
            let reference = args.get("variablesReference").and_then(Value::as_u64).unwrap_or(1);
            let vars = if reference == 2 {
                session.list_global_variable(thread_id(args), None)?
            } else {
                session.list_variable(thread_id(args), None)?
            };
            let dap_vars: Vec<_> = vars
                .into_iter()
                .map(|v| json!({"name": v.display_name, "value": v.type_name, "variablesReference": 0}))
                .collect();
            Ok(json!({"variables": dap_vars}))
        }
        "evaluate" => {
            let expr = args.get("expression").and_then(Value::as_str).unwrap_or_default();
            match session.dump_variable(thread_id(args), expr).await {
                Ok(v) => Ok(json!({"result": v.to_string(), "variablesReference": 0})),
                Err(e) => Ok(json!({"result": format!("<failure>: {e}"), "variablesReference": 0})),
            }
        }
        "disconnect" | "configurationDone" | "launch" | "attach" => Ok(Value::Null),
        other => Err(crate::debugger::error::Error::ProtocolViolation(format!(
            "unsupported DAP request {other}"
        ))),
    }
}

fn thread_id(args: &Value) -> Option<u32> {
    args.get("threadId").and_then(Value::as_u64).map(|v| v as u32)
}
