//! Controller shell
//!
//! Wires resource and state files to the reconciler: `apply` creates or
//! converges a cluster, `refresh` detects drift, `destroy` tears down.
//! State is kept as pretty-printed JSON next to wherever the caller wants it.

use crate::error::ControllerError;
use crate::reconciler::{ReadOutcome, Reconciler};
use crate::resource::{ClusterResourceConfig, ClusterResourceState};
use kind_config::DynamicValue;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Drives one cluster resource through its lifecycle
#[derive(Debug)]
pub struct Controller {
    reconciler: Reconciler,
}

impl Controller {
    /// Creates a controller around a reconciler
    pub fn new(reconciler: Reconciler) -> Self {
        Self { reconciler }
    }

    /// Creates the cluster declared in `resource`, or converges the one
    /// recorded in `state` on it. Writes the resulting state.
    pub async fn apply(
        &self,
        resource: &Path,
        state: &Path,
        cancel: &CancellationToken,
    ) -> Result<ClusterResourceState, ControllerError> {
        let desired = load_resource(resource)?;
        info!("Applying cluster resource {} ({})", desired.name, resource.display());

        let next = match load_state(state)? {
            None => self.reconciler.create_cluster(&desired, cancel).await?,
            Some(prior) => match self.reconciler.read_cluster(&prior).await? {
                ReadOutcome::Gone => {
                    info!("Recreating cluster {} after out-of-band deletion", prior.name);
                    self.reconciler.create_cluster(&desired, cancel).await?
                }
                ReadOutcome::Present(prior) => {
                    self.reconciler.update_cluster(&prior, &desired, cancel).await?
                }
            },
        };

        save_state(state, &next)?;
        Ok(next)
    }

    /// Re-reads the recorded cluster. Forgets the state when the cluster is gone.
    pub async fn refresh(&self, state: &Path) -> Result<Option<ClusterResourceState>, ControllerError> {
        let Some(prior) = load_state(state)? else {
            info!("No state at {}, nothing to refresh", state.display());
            return Ok(None);
        };

        match self.reconciler.read_cluster(&prior).await? {
            ReadOutcome::Present(current) => {
                save_state(state, &current)?;
                Ok(Some(current))
            }
            ReadOutcome::Gone => {
                remove_state(state)?;
                Ok(None)
            }
        }
    }

    /// Tears down the recorded cluster and removes the state file
    pub async fn destroy(&self, state: &Path) -> Result<(), ControllerError> {
        let Some(prior) = load_state(state)? else {
            info!("No state at {}, nothing to destroy", state.display());
            return Ok(());
        };

        self.reconciler.delete_cluster(&prior).await?;
        remove_state(state)
    }
}

/// Reads a YAML or JSON resource file into a resource config
pub fn load_resource(path: &Path) -> Result<ClusterResourceConfig, ControllerError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ControllerError::State(format!("cannot read {}: {}", path.display(), e)))?;
    // YAML is a superset of JSON, one parser covers both
    let value: serde_json::Value = serde_yaml::from_str(&text)
        .map_err(|e| ControllerError::State(format!("cannot parse {}: {}", path.display(), e)))?;
    ClusterResourceConfig::from_dynamic(&DynamicValue::from(value))
}

/// Reads a state file; a missing file is no state
pub fn load_state(path: &Path) -> Result<Option<ClusterResourceState>, ControllerError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ControllerError::State(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )));
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| ControllerError::State(format!("cannot parse {}: {}", path.display(), e)))
}

/// Writes a state file as pretty JSON
pub fn save_state(path: &Path, state: &ClusterResourceState) -> Result<(), ControllerError> {
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| ControllerError::State(format!("cannot serialize state: {}", e)))?;
    std::fs::write(path, json)
        .map_err(|e| ControllerError::State(format!("cannot write {}: {}", path.display(), e)))
}

fn remove_state(path: &Path) -> Result<(), ControllerError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ControllerError::State(format!(
            "cannot remove {}: {}",
            path.display(),
            e
        ))),
    }
}
