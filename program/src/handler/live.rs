//! The real effect handler, composing [`crate::builder::Builder`] and
//! [`crate::runtime::Runtime`] into the [`crate::handler::EffectHandler`]
//! contract.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::builder::{BuildRequest, Builder};
use crate::effect::Effect;
use crate::event::Event;
use crate::handler::EffectHandler;
use crate::runtime::{
    Resources, Runtime, SecurityPolicy, StartRequest, PROGRAM_ID_ENV_VAR, PRODUCTION_RUNTIME,
};

/// Host directory under which each program gets a `{base_dir}/{program_id}`
/// folder (with a `state` subdirectory bind-mounted at `/state`).
const DEFAULT_PROGRAMS_BASE_DIR: &str = "/srv/programs";

/// Composes a [`Builder`] and a [`Runtime`] into a single effect handler.
///
/// `test_mode` is forwarded into the [`SecurityPolicy`] validated before
/// every `StartRuntime`; it must be `false` in production deployments.
pub struct LiveEffectHandler<B, R> {
    builder: Arc<B>,
    runtime: Arc<R>,
    test_mode: bool,
    programs_base_dir: PathBuf,
}

impl<B, R> LiveEffectHandler<B, R>
where
    B: Builder,
    R: Runtime,
{
    pub fn new(builder: Arc<B>, runtime: Arc<R>, test_mode: bool) -> Self {
        Self::with_base_dir(builder, runtime, test_mode, DEFAULT_PROGRAMS_BASE_DIR)
    }

    /// Like [`Self::new`] but with an explicit programs base directory,
    /// for tests that need an isolated temp directory.
    pub fn with_base_dir(
        builder: Arc<B>,
        runtime: Arc<R>,
        test_mode: bool,
        programs_base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            builder,
            runtime,
            test_mode,
            programs_base_dir: programs_base_dir.into(),
        }
    }

    /// `{programs_base_dir}/{program_id}` and its `state` subdirectory
    /// (the host side of the `/state` bind mount).
    fn program_dirs(&self, program_id: &str) -> (PathBuf, PathBuf) {
        let root = self.programs_base_dir.join(program_id);
        let state = root.join("state");
        (root, state)
    }

    fn security_policy(&self, program_id: &str, publish_port: u16) -> SecurityPolicy {
        let mut environment = HashMap::new();
        environment.insert(PROGRAM_ID_ENV_VAR.to_string(), program_id.to_string());
        SecurityPolicy {
            publish_port,
            runtime_name: if self.test_mode {
                "runc".to_string()
            } else {
                PRODUCTION_RUNTIME.to_string()
            },
            test_mode: self.test_mode,
            read_only_root_fs: true,
            bind_mounts: vec!["/state".to_string()],
            environment,
            no_new_privileges: true,
        }
    }
}

#[async_trait]
impl<B, R> EffectHandler for LiveEffectHandler<B, R>
where
    B: Builder,
    R: Runtime,
{
    async fn handle(&self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::EnsureProgramFolders { program_id } => {
                info!(program_id, "ensuring program folders");
                let (root, state_dir) = self.program_dirs(&program_id);
                Some(Event::FoldersEnsured(
                    create_program_dirs(&root, &state_dir).await,
                ))
            }

            Effect::BuildRuntime {
                program_id,
                build_id,
                src_path,
                dockerfile,
            } => {
                info!(program_id, build_id, "building runtime image");
                let request = BuildRequest {
                    dockerfile_path: dockerfile,
                    context_path: src_path,
                    image_name: format!("{program_id}:{build_id}"),
                    tags: vec![build_id.clone()],
                };
                let result = self.builder.build(&request).await;
                Some(Event::BuildFinished(result))
            }

            Effect::StartRuntime {
                program_id,
                image_id,
                state_path,
                publish_port,
            } => {
                let policy = self.security_policy(&program_id, publish_port);
                if let Err(reason) = policy.validate(&program_id) {
                    warn!(program_id, reason, "refusing to start: security policy violated");
                    return Some(Event::StartFailed { reason });
                }

                let mut environment = HashMap::new();
                environment.insert(PROGRAM_ID_ENV_VAR.to_string(), program_id.clone());

                let request = StartRequest {
                    image_id,
                    container_id: format!("{program_id}-container"),
                    port: publish_port,
                    resources: Resources::default(),
                    environment,
                };
                let _ = state_path; // bind-mounted by the Runtime implementation at /state.
                match self.runtime.start(&request).await {
                    Ok(container_id) => Some(Event::RuntimeStarted { container_id }),
                    Err(reason) => Some(Event::StartFailed { reason }),
                }
            }

            Effect::StopRuntime { container_id } => {
                info!(container_id, "stopping runtime");
                let result = self.runtime.stop(&container_id).await;
                Some(Event::StopFinished(result))
            }

            Effect::FetchRuntimeStatus { .. } => None,
        }
    }
}

/// Create a program's root directory and its `/state` bind-mount source,
/// reporting any filesystem error as a string for `FoldersEnsured(Err(_))`.
async fn create_program_dirs(root: &Path, state_dir: &Path) -> Result<(), String> {
    tokio::fs::create_dir_all(root)
        .await
        .map_err(|err| format!("creating program directory {}: {err}", root.display()))?;
    tokio::fs::create_dir_all(state_dir)
        .await
        .map_err(|err| format!("creating state directory {}: {err}", state_dir.display()))?;
    Ok(())
}
