//! The two thin front ends over [`crate::debugger::session::DebugSession`]
//! (spec §1): an interactive line-oriented CLI and a Debug Adapter
//! Protocol server.

pub mod console;
pub mod dap;
