use crate::debugger::breakpoint::BreakpointId;

/// Error taxonomy for the debugger core (see spec §7).
///
/// Most of these are recovered locally by the session/thread that raises
/// them (logged and the affected piece of state left unchanged); only
/// `CdpTransport` failures during lifecycle operations (connect, launch)
/// propagate out of the core to terminate the session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no symbols for {0}")]
    ModuleParse(String),

    #[error("dwarf file parsing error: {0}")]
    DwarfParsing(#[from] gimli::Error),

    #[error("object file parsing error: {0}")]
    ObjParsing(#[from] object::Error),

    #[error("no debug address found for requested source location")]
    AddressUnresolved,

    #[error("cdp transport error: {0}")]
    CdpTransport(String),

    #[error("could not evaluate expression: {0}")]
    EvaluationFailure(String),

    #[error("memory-hop limit ({0}) exceeded while dereferencing pointer chain")]
    HopLimitExceeded(u32),

    #[error("cdp returned a value whose shape violates the protocol: {0}")]
    ProtocolViolation(String),

    #[error("breakpoint {0} not found")]
    BreakpointNotFound(BreakpointId),

    #[error("no such thread {0}")]
    ThreadNotFound(u32),

    #[error("thread is not paused")]
    NotPaused,

    #[error("stack frame {0} not found")]
    FrameNotFound(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Log and discard an error, returning `None`.
///
/// Mirrors the teacher's `weak_error!` discipline for recoverable failures:
/// the site that calls this has already decided the error must not abort
/// the calling operation (§7 propagation policy).
#[macro_export]
macro_rules! weak_error {
    ($e:expr) => {
        match $e {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("{e}");
                None
            }
        }
    };
}
