//! Update reconciler

use super::Reconciler;
use crate::error::ControllerError;
use crate::resource::{same_file, ClusterResourceConfig, ClusterResourceState};
use chrono::Utc;
use kind_config::ClusterSpec;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Why a change cannot be applied to the running cluster, if it cannot
pub(crate) fn replacement_reason(
    prior: &ClusterResourceState,
    desired: &ClusterResourceConfig,
    desired_spec: &ClusterSpec,
) -> Option<&'static str> {
    if prior.name != desired.name {
        Some("name changed")
    } else if prior.node_image != desired.node_image {
        Some("node image changed")
    } else if prior.runtime != desired.runtime {
        Some("runtime changed")
    } else if !prior.effective_spec().topology_eq(desired_spec) {
        Some("kind_config changed")
    } else {
        None
    }
}

impl Reconciler {
    /// Converges a running cluster on a new declaration.
    ///
    /// kind cannot reconfigure a running cluster, so any change to topology,
    /// networking, image or runtime replaces it (delete, then create).
    /// Label-only changes and `wait_for_ready` are recorded without touching
    /// the engine; a new `kubeconfig_path` re-exports credentials.
    pub async fn update_cluster(
        &self,
        prior: &ClusterResourceState,
        desired: &ClusterResourceConfig,
        cancel: &CancellationToken,
    ) -> Result<ClusterResourceState, ControllerError> {
        let provider = desired.provider()?;
        let spec = desired.cluster_spec(&self.mapper_options)?;
        let effective = spec.clone().unwrap_or_default();

        if let Some(reason) = replacement_reason(prior, desired, &effective) {
            info!("Replacing cluster {} ({})", prior.name, reason);
            self.delete_cluster(prior).await?;
            return self.create_cluster(desired, cancel).await;
        }

        let kubeconfig_path = desired.effective_kubeconfig_path();
        let mut endpoint = prior.endpoint.clone();
        if !same_file(&kubeconfig_path, &prior.kubeconfig_path) {
            info!(
                "Moving kubeconfig for cluster {} from {} to {}",
                desired.name,
                prior.kubeconfig_path.display(),
                kubeconfig_path.display()
            );
            endpoint = self
                .materialize_credentials(&desired.name, provider, &kubeconfig_path)
                .await?;
            self.remove_kubeconfig_file(&desired.name, &prior.kubeconfig_path)?;
        } else {
            info!("Cluster {} needs no engine changes", desired.name);
        }

        Ok(ClusterResourceState {
            name: desired.name.clone(),
            node_image: desired.node_image.clone(),
            wait_for_ready: desired.wait_for_ready,
            kubeconfig_path,
            runtime: desired.runtime.clone(),
            kind_config: spec,
            kind: effective.kind,
            api_version: effective.api_version,
            endpoint,
            last_reconciled: Some(Utc::now()),
        })
    }
}
