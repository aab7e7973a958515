//! Interactive line-oriented CLI (spec §6.4). A dedicated OS thread runs
//! the blocking `rustyline` editor and forwards completed lines over a
//! channel; the async core (which is `!Send`, per §5) stays on the
//! current-thread executor and processes both user commands and CDP
//! events from one `tokio::select!` loop — the same stdout-printer/
//! editor-thread split `bugstalker::ui::console` uses for native I/O.

use crate::debugger::cdp::CdpClient;
use crate::debugger::session::{DebugSession, PathRemap, SessionEvent};
use std::rc::Rc;

const WELCOME_TEXT: &str = "wasm-dbg-bridge console. Type `q` to quit.";
const PROMPT: &str = "(dbg) ";

pub async fn run(cdp: Rc<dyn CdpClient>, path_remap: PathRemap) -> anyhow::Result<()> {
    crate::log::init();
    println!("{WELCOME_TEXT}");

    let mut session = DebugSession::new(cdp.clone(), path_remap);
    session.activate().await?;

    let mut events = cdp.subscribe();
    let (cmd_tx, mut cmd_rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut editor = match rustyline::DefaultEditor::new() {
            Ok(e) => e,
            Err(_) => return,
        };
        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    if cmd_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => {
                    let _ = cmd_tx.send("q".to_string());
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(line) = cmd else { break };
                if !dispatch(&mut session, line.trim()).await {
                    break;
                }
            }
            event = events.recv() => {
                match event {
                    Ok((session_id, event)) => {
                        if let Some(ev) = session.handle_event(session_id, event).await? {
                            print_session_event(ev);
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

fn print_session_event(event: SessionEvent) {
    match event {
        SessionEvent::ThreadStarted { thread_id } => println!("thread {thread_id} started"),
        SessionEvent::ThreadExited { thread_id } => println!("thread {thread_id} exited"),
        SessionEvent::BreakpointChanged => println!("breakpoint verified"),
    }
}

/// Returns `false` when the session should end (the `q` command).
async fn dispatch(session: &mut DebugSession, line: &str) -> bool {
    let mut parts = line.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or_default();
    let arg = parts.next().unwrap_or_default().trim();

    let result = match cmd {
        "q" => return false,
        "r" => session.jump_to_page(arg).await,
        "b" => set_breakpoint(session, arg).await,
        "d" => delete_breakpoint(session, arg).await,
        "n" => session.step_over(None).await,
        "s" => session.step_in(None).await,
        "u" => session.step_out(None).await,
        "c" => session.continue_(None).await,
        "l" => show_line(session),
        "il" => list_variables(session, false),
        "ig" => list_variables(session, true),
        "p" => evaluate(session, arg).await,
        "" => Ok(()),
        other => {
            println!("unknown command: {other}");
            Ok(())
        }
    };

    if let Err(e) = result {
        println!("error: {e}");
    }
    true
}

async fn set_breakpoint(session: &mut DebugSession, arg: &str) -> crate::debugger::error::Result<()> {
    let Some((file, line)) = arg.rsplit_once(':') else {
        println!("usage: b <file>:<line>");
        return Ok(());
    };
    let Ok(line) = line.parse::<u32>() else {
        println!("bad line number: {line}");
        return Ok(());
    };
    let id = session.set_break_point(file.to_string(), line, None).await?;
    println!("breakpoint {id} set at {file}:{line}");
    Ok(())
}

async fn delete_breakpoint(session: &mut DebugSession, arg: &str) -> crate::debugger::error::Result<()> {
    let Ok(id) = arg.parse::<u32>() else {
        println!("usage: d <id>");
        return Ok(());
    };
    session.remove_break_point(id).await
}

fn show_line(session: &DebugSession) -> crate::debugger::error::Result<()> {
    let frames = session.get_stack_frames(None)?;
    let Some(top) = frames.first() else {
        println!("no frames");
        return Ok(());
    };
    let Ok(text) = std::fs::read_to_string(&top.file) else {
        println!("{}:{}  (source not available)", top.file, top.line);
        return Ok(());
    };
    let lines: Vec<&str> = text.lines().collect();
    let line = top.line as usize;
    let start = line.saturating_sub(10).max(1);
    let end = (line + 10).min(lines.len());
    for n in start..=end {
        let Some(text) = lines.get(n - 1) else { continue };
        let marker = if n == line { "->" } else { "  " };
        println!("{marker} {n:5} {}", text.replace('\t', "    "));
    }
    Ok(())
}

fn list_variables(session: &DebugSession, globals: bool) -> crate::debugger::error::Result<()> {
    let vars = if globals {
        session.list_global_variable(None, None)?
    } else {
        session.list_variable(None, None)?
    };
    for v in vars {
        println!("{}: {} (group {})", v.display_name, v.type_name, v.group_id);
    }
    Ok(())
}

async fn evaluate(session: &DebugSession, expr: &str) -> crate::debugger::error::Result<()> {
    match session.dump_variable(None, expr).await {
        Ok(v) => println!("{v}"),
        Err(e) => println!("<failure>: {e}"),
    }
    Ok(())
}
