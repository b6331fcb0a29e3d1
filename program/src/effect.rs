//! Effects emitted by the reducer and executed by an [`crate::handler::EffectHandler`].

/// A request for a side effect. Each variant is executed by exactly one
/// [`crate::handler::EffectHandler`] call and produces exactly one result
/// [`crate::event::Event`] — except [`Effect::FetchRuntimeStatus`], which
/// is reserved and currently never emitted by the reducer; polling is
/// done directly against [`crate::runtime::Runtime::status`] from the
/// supervisor's status accessor instead.
#[derive(Debug, Clone)]
pub enum Effect {
    EnsureProgramFolders {
        program_id: String,
    },
    BuildRuntime {
        program_id: String,
        build_id: String,
        src_path: String,
        dockerfile: String,
    },
    StartRuntime {
        program_id: String,
        image_id: String,
        state_path: String,
        publish_port: u16,
    },
    StopRuntime {
        container_id: String,
    },
    /// Reserved, never produced by the reducer today.
    FetchRuntimeStatus {
        container_id: String,
    },
}

impl Effect {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EnsureProgramFolders { .. } => "ensure_program_folders",
            Self::BuildRuntime { .. } => "build_runtime",
            Self::StartRuntime { .. } => "start_runtime",
            Self::StopRuntime { .. } => "stop_runtime",
            Self::FetchRuntimeStatus { .. } => "fetch_runtime_status",
        }
    }
}
