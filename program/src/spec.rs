//! Static per-program build/runtime parameters.
//!
//! These are not part of [`crate::state::ProgramState`] — they don't
//! change across the state machine's transitions — but the reducer still
//! needs them to fill in effect payloads (`BuildRuntime`'s `srcPath`, for
//! instance). Keeping them in a separate, caller-supplied value preserves
//! the reducer's purity: `reduce` is a function of `(state, event, spec)`,
//! never of ambient I/O.

use crate::id::BuildId;

/// Fixed parameters for building and running one program's container.
#[derive(Debug, Clone)]
pub struct ProgramSpec {
    /// Identifier of the build to produce on the next `BuildRuntime`.
    pub build_id: BuildId,
    /// Path to the program's source tree, bind-mounted into the builder.
    pub src_path: String,
    /// Dockerfile path relative to `src_path`.
    pub dockerfile: String,
    /// Host path bind-mounted read-write at `/state` in the container.
    pub state_path: String,
    /// Host port in `[19001, 29999]` published to the container's 8080.
    pub publish_port: u16,
}

impl ProgramSpec {
    /// Validate the publish port falls in the supervisor's assigned range.
    ///
    /// # Errors
    ///
    /// Returns an error message if `publish_port` is out of range.
    pub fn validate(&self) -> Result<(), String> {
        if !crate::state::PUBLISH_PORT_RANGE.contains(&self.publish_port) {
            return Err(format!(
                "publish_port {} outside [{}, {}]",
                self.publish_port,
                crate::state::PUBLISH_PORT_RANGE.start(),
                crate::state::PUBLISH_PORT_RANGE.end()
            ));
        }
        Ok(())
    }
}
