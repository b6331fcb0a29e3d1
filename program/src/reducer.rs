//! The pure reducer: `(state, event, spec) -> (state', effects)`.
//!
//! No I/O, no time, no randomness. Every transition in the table below is
//! a one-to-one translation of spec's transition table; everything else
//! is the identity (input state unchanged, no effects).

use crate::effect::Effect;
use crate::spec::ProgramSpec;
use crate::state::{ProgramState, State};
use crate::event::Event;

/// Apply one event to `state`, returning the next state and the effects
/// the supervisor must execute, in order, before dequeuing the next
/// event.
#[must_use]
pub fn reduce(state: &ProgramState, event: &Event, spec: &ProgramSpec) -> (ProgramState, Vec<Effect>) {
    let mut next = state.clone();

    let effects = match (state.state, event) {
        (State::Created, Event::UserStartRequested) => {
            next.state = State::Building;
            next.build_id = Some(spec.build_id.clone());
            vec![
                Effect::EnsureProgramFolders {
                    program_id: state.id.as_str().to_string(),
                },
                Effect::BuildRuntime {
                    program_id: state.id.as_str().to_string(),
                    build_id: spec.build_id.as_str().to_string(),
                    src_path: spec.src_path.clone(),
                    dockerfile: spec.dockerfile.clone(),
                },
            ]
        }

        (State::Building, Event::FoldersEnsured(Ok(()))) => {
            // Building -> Building: no-op, waiting on BuildFinished.
            Vec::new()
        }
        (State::Building, Event::FoldersEnsured(Err(reason))) => {
            next.state = State::Error;
            next.error_msg = Some(reason.clone());
            Vec::new()
        }
        (State::Building, Event::BuildFinished(Ok(image_id))) => {
            next.state = State::Starting;
            next.image_id = Some(image_id.clone());
            vec![Effect::StartRuntime {
                program_id: state.id.as_str().to_string(),
                image_id: image_id.clone(),
                state_path: spec.state_path.clone(),
                publish_port: spec.publish_port,
            }]
        }
        (State::Building, Event::BuildFinished(Err(reason))) => {
            next.state = State::Error;
            next.error_msg = Some(reason.clone());
            Vec::new()
        }
        (State::Building, Event::UserStopRequested) => {
            next.state = State::Stopped;
            Vec::new()
        }

        (State::Starting, Event::RuntimeStarted { container_id }) => {
            next.state = State::Ready;
            next.container_id = Some(container_id.clone());
            Vec::new()
        }
        (State::Starting, Event::StartFailed { reason }) => {
            next.state = State::Error;
            next.error_msg = Some(reason.clone());
            Vec::new()
        }
        (State::Starting, Event::UserStopRequested) => {
            next.state = State::Stopped;
            Vec::new()
        }

        (State::Ready, Event::UserStopRequested | Event::UserRestartRequested) => {
            next.state = State::Stopping;
            let container_id = state.container_id.clone().unwrap_or_default();
            vec![Effect::StopRuntime { container_id }]
        }
        (State::Ready, Event::RuntimeExited) => {
            next.state = State::Error;
            next.error_msg = Some("runtime exited unexpectedly".to_string());
            Vec::new()
        }

        (State::Stopping, Event::StopFinished(Ok(()))) => {
            next.state = State::Stopped;
            Vec::new()
        }
        (State::Stopping, Event::StopFinished(Err(reason))) => {
            next.state = State::Error;
            next.error_msg = Some(reason.clone());
            Vec::new()
        }

        (State::Stopped | State::Error, Event::UserStartRequested) => {
            next.state = State::Building;
            next.error_msg = None;
            next.build_id = Some(spec.build_id.clone());
            vec![
                Effect::EnsureProgramFolders {
                    program_id: state.id.as_str().to_string(),
                },
                Effect::BuildRuntime {
                    program_id: state.id.as_str().to_string(),
                    build_id: spec.build_id.as_str().to_string(),
                    src_path: spec.src_path.clone(),
                    dockerfile: spec.dockerfile.clone(),
                },
            ]
        }

        // All unlisted (state, event) pairs are identity transitions.
        _ => Vec::new(),
    };

    (next, effects)
}
