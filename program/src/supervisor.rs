//! The single-consumer event loop that owns one program's queue and
//! state (spec.md §4.1).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::SendError;
use crate::event::Event;
use crate::handler::EffectHandler;
use crate::reducer::reduce;
use crate::spec::ProgramSpec;
use crate::state::ProgramState;

/// Default bounded capacity of a program's event queue (spec.md §5).
pub const DEFAULT_EVENT_QUEUE_SIZE: usize = 1000;

/// Owns one program's event queue, current state, and effect handler,
/// and runs the single-consumer reducer loop.
pub struct Supervisor<H: EffectHandler> {
    state: RwLock<ProgramState>,
    spec: ProgramSpec,
    handler: Arc<H>,
    sender: mpsc::Sender<Event>,
    receiver: parking_lot::Mutex<Option<mpsc::Receiver<Event>>>,
    stopped: AtomicBool,
}

impl<H: EffectHandler + 'static> Supervisor<H> {
    /// Construct a supervisor with the default queue capacity.
    #[must_use]
    pub fn new(initial: ProgramState, spec: ProgramSpec, handler: Arc<H>) -> Arc<Self> {
        Self::with_capacity(initial, spec, handler, DEFAULT_EVENT_QUEUE_SIZE)
    }

    /// Construct a supervisor with an explicit queue capacity.
    #[must_use]
    pub fn with_capacity(
        initial: ProgramState,
        spec: ProgramSpec,
        handler: Arc<H>,
        capacity: usize,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(capacity);
        Arc::new(Self {
            state: RwLock::new(initial),
            spec,
            handler,
            sender,
            receiver: parking_lot::Mutex::new(Some(receiver)),
            stopped: AtomicBool::new(false),
        })
    }

    /// Read the current state under a read lock. Safe to call
    /// concurrently with the running loop.
    #[must_use]
    pub fn get_state(&self) -> ProgramState {
        self.state.read().clone()
    }

    /// `true` once the event loop has exited and the queue is closed.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Non-blocking, thread-safe event submission.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::ProgramStopped`] if the loop has already
    /// exited, or [`SendError::EventQueueFull`] if the bounded queue is
    /// at capacity.
    pub fn send_event(&self, event: Event) -> Result<(), SendError> {
        if self.is_stopped() {
            return Err(SendError::ProgramStopped);
        }
        self.sender.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SendError::EventQueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ProgramStopped,
        })
    }

    /// Run the consumer loop until `cancel` fires or the queue closes.
    ///
    /// Each iteration: dequeue one event, call the reducer, commit the
    /// new state under a write lock, then execute each effect in order —
    /// checking `cancel` before every effect and before enqueuing its
    /// result event. On exit (for any reason) the queue is closed and
    /// the supervisor is marked stopped, exactly once.
    pub async fn start(self: &Arc<Self>, cancel: CancellationToken) {
        let mut receiver = self
            .receiver
            .lock()
            .take()
            .expect("start() called more than once on the same Supervisor");

        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = receiver.recv() => event,
            };

            let Some(event) = event else {
                break;
            };

            debug!(event = event.kind(), "dequeued event");

            let (next_state, effects) = {
                let current = self.state.read();
                reduce(&current, &event, &self.spec)
            };
            *self.state.write() = next_state;

            for effect in effects {
                if cancel.is_cancelled() {
                    break;
                }

                let kind = effect.kind();
                debug!(effect = kind, "executing effect");
                if let Some(result_event) = self.handler.handle(effect).await {
                    // A full queue here would block the only task that
                    // could ever drain it, so the send must observe
                    // cancellation exactly like `receiver.recv()` does,
                    // rather than blocking forever.
                    let sent = tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        result = self.sender.send(result_event) => result,
                    };
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }

        receiver.close();
        self.stopped.store(true, Ordering::Release);
        info!(state = self.get_state().state.as_str(), "supervisor stopped");
    }
}
