//! Client boundary to the pool-manager control plane and to the pod's own
//! control port. The trait seam exists so workflows can be exercised
//! against a scripted control plane.

mod client;
mod error;

pub use client::HttpPoolControl;
pub use error::{PoolControlError, UPSTREAM_BODY_PREVIEW_CHARS};

use async_trait::async_trait;
use podbay_schema::{CreatePoolRequest, PodDescriptor, PodRepository, PoolDescriptor};

#[async_trait]
pub trait PoolControl: Send + Sync {
    /// Ask the control plane to create (or re-create) the named pool.
    async fn create_pool(
        &self,
        request: &CreatePoolRequest,
        api_key: &str,
    ) -> Result<PoolDescriptor, PoolControlError>;

    /// Mint a fresh API key for the named pool.
    async fn provision_api_key(&self, pool_name: &str) -> Result<String, PoolControlError>;

    /// Fetch the live pod backing the pool's workspace.
    async fn get_workspace_from_pool(
        &self,
        pool_name: &str,
        api_key: &str,
    ) -> Result<PodDescriptor, PoolControlError>;

    /// Release the pod back to the pool.
    async fn drop_pod(
        &self,
        pool_name: &str,
        pod_id: &str,
        api_key: &str,
    ) -> Result<(), PoolControlError>;

    /// Reset the pod's checked-out repository set via its control port.
    async fn update_pod_repositories(
        &self,
        control_url: &str,
        password: &str,
        repositories: &[PodRepository],
    ) -> Result<(), PoolControlError>;
}
