//! The program lifecycle state machine.

use crate::id::{BuildId, ProgramId};

/// Lifecycle state of a managed program.
///
/// Linear, with two convergences: [`State::Stopped`] and [`State::Error`]
/// both accept `UserStartRequested` to re-enter [`State::Building`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Created,
    Building,
    Starting,
    Ready,
    Stopping,
    Stopped,
    Error,
}

impl State {
    /// Short machine-readable name, used in log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Building => "building",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

/// Snapshot of a program's full supervised state.
///
/// `imageId` is set on successful build; `containerId` on successful
/// runtime start; `errorMsg` is cleared on re-entry to `Building`;
/// `publishPort` is assigned by the caller at start time and must fall
/// in `[19001, 29999]`.
#[derive(Debug, Clone)]
pub struct ProgramState {
    pub id: ProgramId,
    pub state: State,
    pub build_id: Option<BuildId>,
    pub image_id: Option<String>,
    pub container_id: Option<String>,
    pub publish_port: Option<u16>,
    pub error_msg: Option<String>,
}

/// Valid range for a program's assigned publish port.
pub const PUBLISH_PORT_RANGE: std::ops::RangeInclusive<u16> = 19001..=29999;

impl ProgramState {
    /// A freshly created program, with no build attempted yet.
    #[must_use]
    pub fn new(id: ProgramId) -> Self {
        Self {
            id,
            state: State::Created,
            build_id: None,
            image_id: None,
            container_id: None,
            publish_port: None,
            error_msg: None,
        }
    }

    /// `true` iff the program is in a terminal-for-now state (`Stopped`
    /// or `Error`) from which only `UserStartRequested` moves it.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Stopped | State::Error)
    }
}
