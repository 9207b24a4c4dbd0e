//! Lifecycle reconciliation for kind clusters.
//!
//! One cluster per resource: `Absent -> Creating -> Ready -> (Updating -> Ready)* -> Deleting -> Absent`.
//!
//! - `create`: provider guard, idempotent create, readiness wait, credentials
//! - `read`: drift detection against the engine's cluster list
//! - `update`: in-place credential moves, or replace for topology changes
//! - `delete`: destroy, credential cleanup and verified teardown

pub mod create;
pub mod delete;
#[cfg(test)]
mod delete_test;
pub mod read;
#[cfg(test)]
mod read_test;
pub mod update;

use crate::error::ControllerError;
use kind_client::{
    context_key, read_kubeconfig, KindClientTrait, KindError, KubeconfigExt,
    KubeconfigStoreTrait, RuntimeProvider,
};
use kind_config::MapperOptions;
use kube::config::Kubeconfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use read::ReadOutcome;

/// Timing and retry bounds for lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Upper bound for the readiness wait
    pub readiness_timeout: Duration,
    /// Delay between readiness polls
    pub poll_interval: Duration,
    /// Delete-and-verify attempts before `IncompleteTeardown`
    pub teardown_attempts: u32,
    /// Fibonacci backoff floor between teardown attempts, in seconds
    pub teardown_backoff_min_secs: u64,
    /// Fibonacci backoff cap between teardown attempts, in seconds
    pub teardown_backoff_max_secs: u64,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            readiness_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
            teardown_attempts: 3,
            teardown_backoff_min_secs: 1,
            teardown_backoff_max_secs: 8,
        }
    }
}

/// Reconciles kind clusters against the engine and the credential store.
pub struct Reconciler {
    pub(crate) kind_client: Box<dyn KindClientTrait + Send + Sync>,
    pub(crate) kubeconfig_store: Arc<dyn KubeconfigStoreTrait>,
    pub(crate) settings: ReconcilerSettings,
    pub(crate) mapper_options: MapperOptions,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("kubeconfig_store", &self.kubeconfig_store.path())
            .field("settings", &self.settings)
            .field("mapper_options", &self.mapper_options)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        kind_client: impl KindClientTrait + Send + Sync + 'static,
        kubeconfig_store: impl KubeconfigStoreTrait + 'static,
        settings: ReconcilerSettings,
        mapper_options: MapperOptions,
    ) -> Self {
        Self {
            kind_client: Box::new(kind_client),
            kubeconfig_store: Arc::new(kubeconfig_store),
            settings,
            mapper_options,
        }
    }

    /// Whether the engine lists `name`
    pub(crate) async fn cluster_exists(
        &self,
        name: &str,
        provider: RuntimeProvider,
    ) -> Result<bool, ControllerError> {
        let clusters = self
            .kind_client
            .list_clusters(provider)
            .await
            .map_err(ControllerError::engine(name, "list"))?;
        Ok(clusters.iter().any(|c| c == name))
    }

    /// Polls readiness until every node is ready, the timeout elapses or
    /// `cancel` fires. Never tears anything down.
    pub(crate) async fn wait_for_ready(
        &self,
        name: &str,
        provider: RuntimeProvider,
        cancel: &CancellationToken,
    ) -> Result<(), ControllerError> {
        let timeout = self.settings.readiness_timeout;
        let deadline = Instant::now() + timeout;
        info!("Waiting up to {:?} for cluster {} to become ready", timeout, name);

        loop {
            if cancel.is_cancelled() {
                return Err(ControllerError::Cancelled {
                    cluster: name.to_string(),
                });
            }

            // A single poll may hang on a slow API server; bound it by the
            // same deadline and let cancellation interrupt it
            let polled = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(ControllerError::Cancelled {
                        cluster: name.to_string(),
                    });
                }
                polled = tokio::time::timeout_at(
                    deadline,
                    self.kind_client.is_ready(name, provider),
                ) => polled,
            };
            let Ok(ready) = polled else {
                return Err(ControllerError::ReadinessTimeout {
                    cluster: name.to_string(),
                    timeout,
                });
            };
            let ready = ready.map_err(ControllerError::engine(name, "check readiness of"))?;
            if ready {
                info!("Cluster {} is ready", name);
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ControllerError::ReadinessTimeout {
                    cluster: name.to_string(),
                    timeout,
                });
            }

            let pause = self.settings.poll_interval.min(deadline - now);
            debug!("Cluster {} not ready yet, polling again in {:?}", name, pause);
            tokio::select! {
                () = cancel.cancelled() => {
                    return Err(ControllerError::Cancelled {
                        cluster: name.to_string(),
                    });
                }
                () = tokio::time::sleep(pause) => {}
            }
        }
    }

    /// Exports the cluster's kubeconfig to `path` and registers its
    /// `kind-<name>` entries in the shared store.
    ///
    /// Returns the API server endpoint from the exported kubeconfig.
    pub(crate) async fn materialize_credentials(
        &self,
        name: &str,
        provider: RuntimeProvider,
        path: &Path,
    ) -> Result<Option<String>, ControllerError> {
        self.kind_client
            .export_kubeconfig(name, path, provider)
            .await
            .map_err(ControllerError::engine(name, "export kubeconfig of"))?;

        let exported = read_kubeconfig(path).map_err(ControllerError::credentials(name))?;
        let key = context_key(name);
        if !exported.has_context(&key) {
            return Err(ControllerError::CredentialStore {
                cluster: name.to_string(),
                source: KindError::Kubeconfig(format!(
                    "exported kubeconfig {} has no context {}",
                    path.display(),
                    key
                )),
            });
        }

        let endpoint = exported
            .clusters
            .iter()
            .find(|c| c.name == key)
            .and_then(|c| c.cluster.as_ref())
            .and_then(|c| c.server.clone());

        let merge_key = key.clone();
        self.modify_store(name, move |config: &mut Kubeconfig| {
            config.merge_entries_from(&exported, &merge_key);
        })
        .await?;

        debug!(
            "Registered context {} in {}",
            key,
            self.kubeconfig_store.path().display()
        );
        Ok(endpoint)
    }

    /// Runs a load-mutate-save cycle on the shared store off the async workers.
    ///
    /// The store blocks on its file lock while another process holds it.
    pub(crate) async fn modify_store<F>(&self, name: &str, mut f: F) -> Result<Kubeconfig, ControllerError>
    where
        F: FnMut(&mut Kubeconfig) + Send + 'static,
    {
        let store = Arc::clone(&self.kubeconfig_store);
        tokio::task::spawn_blocking(move || store.modify(&mut f))
            .await
            .map_err(|e| store_task_failed(name, &e))?
            .map_err(ControllerError::credentials(name))
    }

    /// Reads the shared store off the async workers
    pub(crate) async fn load_store(&self, name: &str) -> Result<Kubeconfig, ControllerError> {
        let store = Arc::clone(&self.kubeconfig_store);
        tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| store_task_failed(name, &e))?
            .map_err(ControllerError::credentials(name))
    }

    /// Removes a per-cluster kubeconfig file unless it is the shared store.
    /// A missing file is fine.
    pub(crate) fn remove_kubeconfig_file(&self, name: &str, path: &Path) -> Result<(), ControllerError> {
        if crate::resource::same_file(path, self.kubeconfig_store.path()) {
            return Ok(());
        }
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed kubeconfig {} for cluster {}", path.display(), name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ControllerError::CredentialStore {
                cluster: name.to_string(),
                source: e.into(),
            }),
        }
    }
}

fn store_task_failed(name: &str, e: &tokio::task::JoinError) -> ControllerError {
    ControllerError::CredentialStore {
        cluster: name.to_string(),
        source: KindError::Kubeconfig(format!("credential store task failed: {}", e)),
    }
}
