//! Image builder contract (spec.md §6).
//!
//! The Docker/gVisor backend itself is out of scope; only the capability
//! contract the supervisor relies on is specified here.

use async_trait::async_trait;

/// Parameters for building a container image.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub dockerfile_path: String,
    pub context_path: String,
    pub image_name: String,
    pub tags: Vec<String>,
}

/// Builds and removes container images.
#[async_trait]
pub trait Builder: Send + Sync {
    /// Build an image from `request`, returning its image id.
    ///
    /// # Errors
    ///
    /// Returns an error if the build fails (bad Dockerfile, missing
    /// context, daemon unreachable, etc). The caller maps this into a
    /// `BuildFinished(Err(..))` event; it never panics.
    async fn build(&self, request: &BuildRequest) -> Result<String, String>;

    /// Remove a previously built image.
    async fn remove(&self, image_id: &str) -> Result<(), String>;
}
