//! Events accepted by the reducer.
//!
//! Two sources: user-initiated events injected through
//! [`crate::supervisor::Supervisor::send_event`], and result events
//! produced by the effect handler and re-enqueued onto the same queue.

/// A closed set of events the reducer understands. All other
/// `(state, event)` pairs not named in [`crate::reducer::reduce`] are
/// identity transitions.
#[derive(Debug, Clone)]
pub enum Event {
    UserStartRequested,
    UserStopRequested,
    UserRestartRequested,

    FoldersEnsured(Result<(), String>),
    BuildFinished(Result<String, String>),
    RuntimeStarted { container_id: String },
    StartFailed { reason: String },
    RuntimeExited,
    StopFinished(Result<(), String>),
}

impl Event {
    /// Short variant name, for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UserStartRequested => "user_start_requested",
            Self::UserStopRequested => "user_stop_requested",
            Self::UserRestartRequested => "user_restart_requested",
            Self::FoldersEnsured(_) => "folders_ensured",
            Self::BuildFinished(_) => "build_finished",
            Self::RuntimeStarted { .. } => "runtime_started",
            Self::StartFailed { .. } => "start_failed",
            Self::RuntimeExited => "runtime_exited",
            Self::StopFinished(_) => "stop_finished",
        }
    }
}
