use std::sync::Arc;
use std::time::Duration;

use program::handler::FakeEffectHandler;
use program::{BuildId, Event, ProgramId, ProgramSpec, ProgramState, SendError, State, Supervisor};
use tokio_util::sync::CancellationToken;

fn spec() -> ProgramSpec {
    ProgramSpec {
        build_id: BuildId::new("build-abcdef012345"),
        src_path: "/src".to_string(),
        dockerfile: "Dockerfile".to_string(),
        state_path: "/state".to_string(),
        publish_port: 21000,
    }
}

async fn wait_for<H>(supervisor: &Arc<Supervisor<H>>, target: State)
where
    H: program::handler::EffectHandler + 'static,
{
    for _ in 0..200 {
        if supervisor.get_state().state == target {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "timed out waiting for {target:?}, last state was {:?}",
        supervisor.get_state().state
    );
}

#[tokio::test]
async fn get_state_reflects_created_before_any_event() {
    let handler = Arc::new(FakeEffectHandler::new());
    let initial = ProgramState::new(ProgramId::new("alice-build-abc123abc123-u1"));
    let supervisor = Supervisor::new(initial, spec(), handler);
    assert_eq!(supervisor.get_state().state, State::Created);
    assert!(!supervisor.is_stopped());
}

#[tokio::test]
async fn full_start_stop_restart_cycle() {
    let handler = Arc::new(FakeEffectHandler::new());
    let initial = ProgramState::new(ProgramId::new("alice-build-abc123abc123-u1"));
    let supervisor = Supervisor::new(initial, spec(), handler.clone());

    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    let run_supervisor = supervisor.clone();
    let handle = tokio::spawn(async move { run_supervisor.start(run_cancel).await });

    supervisor.send_event(Event::UserStartRequested).unwrap();
    wait_for(&supervisor, State::Ready).await;
    assert!(supervisor.get_state().container_id.is_some());

    supervisor.send_event(Event::UserRestartRequested).unwrap();
    wait_for(&supervisor, State::Stopped).await;

    supervisor.send_event(Event::UserStartRequested).unwrap();
    wait_for(&supervisor, State::Ready).await;

    assert_eq!(
        handler.calls(),
        vec![
            "ensure_program_folders",
            "build_runtime",
            "start_runtime",
            "stop_runtime",
            "ensure_program_folders",
            "build_runtime",
            "start_runtime",
        ]
    );

    cancel.cancel();
    handle.await.unwrap();
    assert!(supervisor.is_stopped());
}

#[tokio::test]
async fn send_event_reports_queue_full_without_blocking() {
    let handler = Arc::new(FakeEffectHandler::new());
    handler.set_delay("ensure_program_folders", Duration::from_secs(30));
    let initial = ProgramState::new(ProgramId::new("alice-build-abc123abc123-u1"));
    let supervisor = Supervisor::with_capacity(initial, spec(), handler, 1);

    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    let run_supervisor = supervisor.clone();
    let _handle = tokio::spawn(async move { run_supervisor.start(run_cancel).await });

    // Dequeued immediately into the slow EnsureProgramFolders call, so the
    // single queue slot is free again right after this call returns.
    supervisor.send_event(Event::UserStartRequested).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Now occupies the one free slot; the consumer won't drain it until
    // the 30s effect finishes.
    supervisor.send_event(Event::UserRestartRequested).unwrap();

    let started = std::time::Instant::now();
    let result = supervisor.send_event(Event::UserStopRequested);
    assert!(started.elapsed() < Duration::from_millis(50));
    assert_eq!(result, Err(SendError::EventQueueFull));

    cancel.cancel();
}

#[tokio::test]
async fn send_event_after_cancellation_returns_program_stopped() {
    let handler = Arc::new(FakeEffectHandler::new());
    let initial = ProgramState::new(ProgramId::new("alice-build-abc123abc123-u1"));
    let supervisor = Supervisor::new(initial, spec(), handler);

    let cancel = CancellationToken::new();
    cancel.cancel();
    supervisor.start(cancel).await;

    assert!(supervisor.is_stopped());
    assert_eq!(
        supervisor.send_event(Event::UserStartRequested),
        Err(SendError::ProgramStopped)
    );
}

#[tokio::test]
async fn build_failure_enters_error_and_restart_recovers() {
    let handler = Arc::new(FakeEffectHandler::new());
    handler.fail("build_runtime", "Dockerfile syntax error on line 4");
    let initial = ProgramState::new(ProgramId::new("alice-build-abc123abc123-u1"));
    let supervisor = Supervisor::new(initial, spec(), handler.clone());

    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    let run_supervisor = supervisor.clone();
    let _handle = tokio::spawn(async move { run_supervisor.start(run_cancel).await });

    supervisor.send_event(Event::UserStartRequested).unwrap();
    wait_for(&supervisor, State::Error).await;
    assert_eq!(
        supervisor.get_state().error_msg.as_deref(),
        Some("Dockerfile syntax error on line 4")
    );

    handler.clear_failure("build_runtime");
    supervisor.send_event(Event::UserStartRequested).unwrap();
    wait_for(&supervisor, State::Ready).await;
    assert!(supervisor.get_state().error_msg.is_none());

    cancel.cancel();
}

mod live_handler_fakes {
    use async_trait::async_trait;
    use program::builder::{BuildRequest, Builder};
    use program::runtime::{LogOptions, Runtime, RuntimeStatus, StartRequest};

    pub struct AlwaysBuilds;

    #[async_trait]
    impl Builder for AlwaysBuilds {
        async fn build(&self, _request: &BuildRequest) -> Result<String, String> {
            Ok("img-live".to_string())
        }

        async fn remove(&self, _image_id: &str) -> Result<(), String> {
            Ok(())
        }
    }

    pub struct AlwaysStarts;

    #[async_trait]
    impl Runtime for AlwaysStarts {
        async fn start(&self, request: &StartRequest) -> Result<String, String> {
            Ok(request.container_id.clone())
        }

        async fn stop(&self, _container_id: &str) -> Result<(), String> {
            Ok(())
        }

        async fn status(&self, _container_id: &str) -> Result<RuntimeStatus, String> {
            Ok(RuntimeStatus::Running)
        }

        async fn logs(
            &self,
            _container_id: &str,
            _options: &LogOptions,
        ) -> Result<Vec<String>, String> {
            Ok(Vec::new())
        }
    }
}

#[tokio::test]
async fn out_of_range_port_is_rejected_by_security_policy_before_starting_runtime() {
    use live_handler_fakes::{AlwaysBuilds, AlwaysStarts};
    use program::handler::LiveEffectHandler;

    let handler = Arc::new(LiveEffectHandler::new(
        Arc::new(AlwaysBuilds),
        Arc::new(AlwaysStarts),
        true,
    ));
    let mut bad_spec = spec();
    bad_spec.publish_port = 80;
    assert!(bad_spec.validate().is_err());

    let initial = ProgramState::new(ProgramId::new("alice-build-abc123abc123-u1"));
    let supervisor = Supervisor::new(initial, bad_spec, handler);

    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    let run_supervisor = supervisor.clone();
    let _handle = tokio::spawn(async move { run_supervisor.start(run_cancel).await });

    supervisor.send_event(Event::UserStartRequested).unwrap();
    wait_for(&supervisor, State::Error).await;
    assert!(supervisor
        .get_state()
        .error_msg
        .unwrap()
        .contains("publish port"));

    cancel.cancel();
}
