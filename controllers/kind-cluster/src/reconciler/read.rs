//! Read reconciler

use super::Reconciler;
use crate::error::ControllerError;
use crate::resource::ClusterResourceState;
use kind_client::{context_key, KubeconfigExt};
use tracing::{debug, warn};

/// Result of refreshing a cluster against the engine
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// The engine still lists the cluster
    Present(ClusterResourceState),
    /// The cluster was removed outside the controller
    Gone,
}

impl Reconciler {
    /// Checks a recorded cluster against the engine's listing.
    ///
    /// A name missing from the listing is drift, not an error.
    pub async fn read_cluster(
        &self,
        state: &ClusterResourceState,
    ) -> Result<ReadOutcome, ControllerError> {
        let provider = state.provider()?;

        if !self.cluster_exists(&state.name, provider).await? {
            warn!(
                "Cluster {} no longer exists, it was deleted outside the controller",
                state.name
            );
            return Ok(ReadOutcome::Gone);
        }

        let key = context_key(&state.name);
        match self.load_store(&state.name).await {
            Ok(config) if !config.has_context(&key) => {
                warn!(
                    "Cluster {} is running but context {} is missing from {}",
                    state.name,
                    key,
                    self.kubeconfig_store.path().display()
                );
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read kubeconfig store for cluster {}: {}", state.name, e),
        }

        debug!("Cluster {} is present", state.name);
        Ok(ReadOutcome::Present(state.clone()))
    }
}
