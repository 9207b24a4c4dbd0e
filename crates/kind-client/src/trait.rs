//! KindClient trait for mocking
//!
//! This trait abstracts the kind binary so the reconciler can be unit tested
//! without a container runtime. The concrete `KindClient` implements it and
//! tests use `MockKindClient`.

use crate::error::KindError;
use crate::models::{CreateClusterRequest, RuntimeProvider};
use std::path::Path;

/// Trait for cluster-engine operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait KindClientTrait: Send + Sync {
    /// Names of the clusters the provider currently hosts
    async fn list_clusters(&self, provider: RuntimeProvider) -> Result<Vec<String>, KindError>;

    /// Create a cluster. Returns once the engine has started the nodes.
    async fn create_cluster(&self, request: &CreateClusterRequest) -> Result<(), KindError>;

    /// Delete a cluster. Deleting an unknown cluster succeeds.
    ///
    /// `kubeconfig_path` is the file kind should prune the cluster's entries
    /// from; `None` means kind's default store.
    async fn delete_cluster(
        &self,
        name: &str,
        provider: RuntimeProvider,
        kubeconfig_path: Option<&Path>,
    ) -> Result<(), KindError>;

    /// Write the cluster's admin kubeconfig to `path`
    async fn export_kubeconfig(
        &self,
        name: &str,
        path: &Path,
        provider: RuntimeProvider,
    ) -> Result<(), KindError>;

    /// True when every node of the cluster reports `Ready=True`
    async fn is_ready(&self, name: &str, provider: RuntimeProvider) -> Result<bool, KindError>;
}
