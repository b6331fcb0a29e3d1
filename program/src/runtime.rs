//! Container runtime contract and launch security policy (spec.md §6).

use async_trait::async_trait;
use std::collections::HashMap;

use crate::state::PUBLISH_PORT_RANGE;

/// Resource limits applied to a started container.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub cpu_millis: Option<u32>,
    pub memory_bytes: Option<u64>,
}

/// Parameters for starting a container from a built image.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub image_id: String,
    pub container_id: String,
    pub port: u16,
    pub resources: Resources,
    pub environment: HashMap<String, String>,
}

/// Tail/follow options for log retrieval.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub tail: Option<u32>,
    pub follow: bool,
}

/// Point-in-time runtime status of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeStatus {
    Running,
    Exited { code: i32 },
    NotFound,
}

/// Starts, stops, and inspects containers.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Start a container from `request`, returning its container id.
    async fn start(&self, request: &StartRequest) -> Result<String, String>;

    /// Stop a running container.
    async fn stop(&self, container_id: &str) -> Result<(), String>;

    /// Query the current status of a container.
    async fn status(&self, container_id: &str) -> Result<RuntimeStatus, String>;

    /// Retrieve (a window of) a container's logs.
    async fn logs(&self, container_id: &str, options: &LogOptions) -> Result<Vec<String>, String>;
}

/// Name of the gVisor-backed runtime, required in production.
pub const PRODUCTION_RUNTIME: &str = "runsc";

/// Name of the non-sandboxed runtime, permitted only in test mode.
pub const TEST_ONLY_RUNTIME: &str = "runc";

/// The environment variable every launched container must carry.
pub const PROGRAM_ID_ENV_VAR: &str = "HERSH_PROGRAM_ID";

/// Security contract validated before issuing `StartRuntime` (spec.md §6):
/// a single `127.0.0.1:{publishPort}:8080` port mapping with
/// `publishPort` in `[19001, 29999]`, `runsc` in production (`runc`
/// permitted only in test mode), read-only root filesystem with a single
/// `/state` read-write bind mount, `HERSH_PROGRAM_ID` injected, and
/// `no-new-privileges:true`.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    pub publish_port: u16,
    pub runtime_name: String,
    pub test_mode: bool,
    pub read_only_root_fs: bool,
    pub bind_mounts: Vec<String>,
    pub environment: HashMap<String, String>,
    pub no_new_privileges: bool,
}

impl SecurityPolicy {
    /// Validate the policy against the launch-security contract.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason for the first violation found.
    pub fn validate(&self, program_id: &str) -> Result<(), String> {
        if !PUBLISH_PORT_RANGE.contains(&self.publish_port) {
            return Err(format!(
                "publish port {} outside [{}, {}]",
                self.publish_port,
                PUBLISH_PORT_RANGE.start(),
                PUBLISH_PORT_RANGE.end()
            ));
        }

        match self.runtime_name.as_str() {
            PRODUCTION_RUNTIME => {}
            TEST_ONLY_RUNTIME if self.test_mode => {}
            TEST_ONLY_RUNTIME => {
                return Err("runc is only permitted in test mode".to_string())
            }
            other => return Err(format!("unsupported runtime {other}")),
        }

        if !self.read_only_root_fs {
            return Err("root filesystem must be read-only".to_string());
        }

        if self.bind_mounts != ["/state".to_string()] {
            return Err(format!(
                "expected exactly one read-write bind mount at /state, got {:?}",
                self.bind_mounts
            ));
        }

        match self.environment.get(PROGRAM_ID_ENV_VAR) {
            Some(value) if value == program_id => {}
            Some(other) => {
                return Err(format!(
                    "{PROGRAM_ID_ENV_VAR} set to {other}, expected {program_id}"
                ))
            }
            None => return Err(format!("{PROGRAM_ID_ENV_VAR} not set")),
        }

        if !self.no_new_privileges {
            return Err("security_opt no-new-privileges:true is required".to_string());
        }

        Ok(())
    }
}
