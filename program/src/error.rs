//! Errors the supervisor surfaces to external callers.
//!
//! These are never exceptions internally — the reducer reports failures
//! as typed event payloads (`FoldersEnsured(Err(..))`, etc.) — but
//! `send_event` itself can fail in the two ways below.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SendError {
    /// The bounded event queue is at capacity (default 1000).
    #[error("event queue full")]
    EventQueueFull,

    /// The supervisor's event loop has already exited.
    #[error("program stopped")]
    ProgramStopped,
}
