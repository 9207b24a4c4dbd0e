//! Delete reconciler

use super::Reconciler;
use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::resource::ClusterResourceState;
use kind_client::{context_key, KubeconfigExt};
use kube::config::Kubeconfig;
use tracing::{info, warn};

impl Reconciler {
    /// Destroys a cluster and removes its `kind-<name>` credentials.
    ///
    /// Teardown counts as complete only when the engine no longer lists the
    /// cluster and the shared store no longer has its context. Residue is
    /// retried with Fibonacci backoff up to `teardown_attempts` times.
    /// Deleting a cluster that is already gone succeeds.
    pub async fn delete_cluster(&self, state: &ClusterResourceState) -> Result<(), ControllerError> {
        let name = state.name.as_str();
        let provider = state.provider()?;
        let key = context_key(name);
        let attempts = self.settings.teardown_attempts.max(1);
        let mut backoff = FibonacciBackoff::new(
            self.settings.teardown_backoff_min_secs,
            self.settings.teardown_backoff_max_secs,
        );

        info!("Deleting cluster {}", name);

        let mut residue = Vec::new();
        for attempt in 1..=attempts {
            self.kind_client
                .delete_cluster(name, provider, Some(&state.kubeconfig_path))
                .await
                .map_err(ControllerError::engine(name, "delete"))?;

            let remove_key = key.clone();
            self.modify_store(name, move |config: &mut Kubeconfig| {
                config.remove_cluster_entries(&remove_key);
            })
            .await?;

            residue.clear();
            if self.cluster_exists(name, provider).await? {
                residue.push(format!("cluster {} is still listed", name));
            }
            let stored = self.load_store(name).await?;
            if stored.has_context(&key) {
                residue.push(format!(
                    "context {} is still in {}",
                    key,
                    self.kubeconfig_store.path().display()
                ));
            }

            if residue.is_empty() {
                break;
            }
            if attempt < attempts {
                let delay = backoff.next_backoff();
                warn!(
                    "Teardown of cluster {} incomplete ({}), retrying in {:?} (attempt {}/{})",
                    name,
                    residue.join(", "),
                    delay,
                    attempt,
                    attempts
                );
                tokio::time::sleep(delay).await;
            }
        }

        if !residue.is_empty() {
            return Err(ControllerError::IncompleteTeardown {
                cluster: name.to_string(),
                attempts,
                residue: residue.join(", "),
            });
        }

        self.remove_kubeconfig_file(name, &state.kubeconfig_path)?;
        info!("Cluster {} deleted", name);
        Ok(())
    }
}
