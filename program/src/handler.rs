//! The effect handler contract and the in-memory fake used in tests.

mod live;

pub use live::LiveEffectHandler;

use async_trait::async_trait;

use crate::effect::Effect;
use crate::event::Event;

/// Executes effects produced by the reducer and reports the result as an
/// event, never as a panic or exception.
///
/// Implementations are invoked serially by the single-consumer event
/// loop, so they need not be internally concurrent, but they must honour
/// cancellation of the supervisor's run context between effects, and for
/// long-running effects SHOULD poll it during execution.
#[async_trait]
pub trait EffectHandler: Send + Sync {
    /// Execute `effect`, returning the result event to enqueue, or `None`
    /// for the reserved no-op [`Effect::FetchRuntimeStatus`].
    async fn handle(&self, effect: Effect) -> Option<Event>;
}

#[cfg(any(test, feature = "testing"))]
pub use fake::{FailureSpec, FakeEffectHandler};

#[cfg(any(test, feature = "testing"))]
mod fake {
    use super::{Effect, Event};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::time::Duration;

    /// A scripted failure for one effect kind, by [`Effect::kind`].
    #[derive(Debug, Clone)]
    pub struct FailureSpec {
        pub reason: String,
    }

    /// Deterministic, injectable-failure effect handler for tests.
    ///
    /// Every effect completes after its configured delay (default zero)
    /// unless a [`FailureSpec`] is registered for that effect kind, in
    /// which case the corresponding failure result event is produced
    /// instead.
    #[derive(Default)]
    pub struct FakeEffectHandler {
        delays: Mutex<HashMap<&'static str, Duration>>,
        failures: Mutex<HashMap<&'static str, FailureSpec>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeEffectHandler {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure an artificial delay before the given effect kind
        /// completes.
        pub fn set_delay(&self, kind: &'static str, delay: Duration) {
            self.delays.lock().insert(kind, delay);
        }

        /// Configure the given effect kind to fail with `reason`.
        pub fn fail(&self, kind: &'static str, reason: impl Into<String>) {
            self.failures
                .lock()
                .insert(kind, FailureSpec { reason: reason.into() });
        }

        /// Remove a previously scripted failure, so the next call to that
        /// effect kind succeeds.
        pub fn clear_failure(&self, kind: &'static str) {
            self.failures.lock().remove(kind);
        }

        /// Effect kinds handled so far, in order.
        #[must_use]
        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().clone()
        }

        fn failure_for(&self, kind: &'static str) -> Option<FailureSpec> {
            self.failures.lock().get(kind).cloned()
        }

        async fn delay_for(&self, kind: &'static str) {
            let delay = self.delays.lock().get(kind).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl super::EffectHandler for FakeEffectHandler {
        async fn handle(&self, effect: Effect) -> Option<Event> {
            let kind = effect.kind();
            self.calls.lock().push(kind);
            self.delay_for(kind).await;
            let failure = self.failure_for(kind);

            match effect {
                Effect::EnsureProgramFolders { .. } => Some(Event::FoldersEnsured(
                    failure.map_or(Ok(()), |f| Err(f.reason)),
                )),
                Effect::BuildRuntime { .. } => Some(Event::BuildFinished(match failure {
                    Some(f) => Err(f.reason),
                    None => Ok("fake-image".to_string()),
                })),
                Effect::StartRuntime { .. } => Some(match failure {
                    Some(f) => Event::StartFailed { reason: f.reason },
                    None => Event::RuntimeStarted {
                        container_id: "fake-container".to_string(),
                    },
                }),
                Effect::StopRuntime { .. } => Some(Event::StopFinished(
                    failure.map_or(Ok(()), |f| Err(f.reason)),
                )),
                Effect::FetchRuntimeStatus { .. } => None,
            }
        }
    }
}
