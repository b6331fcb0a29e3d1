//! Reactive supervisor for containerized program workloads.
//!
//! A pure reducer ([`reducer::reduce`]) decides state transitions and the
//! effects they require; a single [`supervisor::Supervisor`] per program
//! drains a bounded event queue, applies the reducer, and executes
//! effects serially through an [`handler::EffectHandler`]. This keeps the
//! state machine itself free of I/O, time, and randomness, while still
//! allowing the supervisor to run real builds and containers in
//! production and fakes in tests.

pub mod builder;
pub mod effect;
pub mod error;
pub mod event;
pub mod handler;
pub mod id;
pub mod reducer;
pub mod runtime;
pub mod spec;
pub mod state;
pub mod supervisor;

pub use effect::Effect;
pub use error::SendError;
pub use event::Event;
pub use id::{BuildId, ProgramId, UserId};
pub use spec::ProgramSpec;
pub use state::{ProgramState, State};
pub use supervisor::Supervisor;
