//! Create reconciler

use super::Reconciler;
use crate::error::ControllerError;
use crate::resource::{ClusterResourceConfig, ClusterResourceState};
use chrono::Utc;
use kind_client::CreateClusterRequest;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

impl Reconciler {
    /// Brings a declared cluster into existence.
    ///
    /// A cluster that the engine already lists under the same name is adopted
    /// rather than created a second time. A readiness timeout or cancellation
    /// leaves the cluster in place for the caller to retry or destroy.
    pub async fn create_cluster(
        &self,
        config: &ClusterResourceConfig,
        cancel: &CancellationToken,
    ) -> Result<ClusterResourceState, ControllerError> {
        let name = config.name.as_str();
        let provider = config.provider()?;
        let spec = config.cluster_spec(&self.mapper_options)?;
        let effective = spec.clone().unwrap_or_default();
        let kubeconfig_path = config.effective_kubeconfig_path();

        info!("Creating cluster {}", name);

        if self.cluster_exists(name, provider).await? {
            info!("Cluster {} already exists, adopting it", name);
        } else {
            let request = CreateClusterRequest {
                name: name.to_string(),
                config: effective.clone(),
                node_image: config.node_image.clone(),
                provider,
                kubeconfig_path: Some(kubeconfig_path.clone()),
            };
            if let Err(e) = self.kind_client.create_cluster(&request).await {
                error!("Failed to create cluster {}: {}", name, e);
                return Err(ControllerError::Engine {
                    cluster: name.to_string(),
                    operation: "create",
                    source: e,
                });
            }
        }

        if config.wait_for_ready {
            self.wait_for_ready(name, provider, cancel).await?;
        }

        let endpoint = self
            .materialize_credentials(name, provider, &kubeconfig_path)
            .await?;

        info!("Cluster {} created (kubeconfig: {})", name, kubeconfig_path.display());
        Ok(ClusterResourceState {
            name: name.to_string(),
            node_image: config.node_image.clone(),
            wait_for_ready: config.wait_for_ready,
            kubeconfig_path,
            runtime: config.runtime.clone(),
            kind_config: spec,
            kind: effective.kind,
            api_version: effective.api_version,
            endpoint,
            last_reconciled: Some(Utc::now()),
        })
    }
}
