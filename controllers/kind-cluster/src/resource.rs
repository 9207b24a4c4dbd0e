//! Cluster resource model.
//!
//! `ClusterResourceConfig` is the desired state read from the declarative
//! configuration tree; `ClusterResourceState` is what the reconciler persists
//! after a successful operation and reads back on refresh.

use crate::error::ControllerError;
use chrono::{DateTime, Utc};
use kind_client::RuntimeProvider;
use kind_config::{
    get_block, get_bool, get_string, map_cluster_spec_with, object_to_map, ClusterSpec,
    DynamicValue, GenericMap, MapperOptions,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Desired cluster as declared by the user
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResourceConfig {
    /// Cluster name; also the `kind-<name>` credential key
    pub name: String,
    /// Node image override for every node
    pub node_image: Option<String>,
    /// Block until all nodes report ready
    pub wait_for_ready: bool,
    /// Where the cluster's kubeconfig is written; derived from the name when unset
    pub kubeconfig_path: Option<PathBuf>,
    /// Runtime provider name; empty selects auto-detection
    pub runtime: String,
    /// Canonical `kind_config` block
    pub kind_config: Option<GenericMap>,
}

impl ClusterResourceConfig {
    /// Reads the resource attributes from a canonical tree.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] when `name` is missing.
    pub fn from_canonical(canonical: &GenericMap) -> Result<Self, ControllerError> {
        let name = get_string(canonical, "name");
        if name.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "cluster resource is missing 'name'".to_string(),
            ));
        }

        Ok(Self {
            name,
            node_image: non_empty(get_string(canonical, "node_image")),
            wait_for_ready: get_bool(canonical, "wait_for_ready"),
            kubeconfig_path: non_empty(get_string(canonical, "kubeconfig_path")).map(PathBuf::from),
            runtime: get_string(canonical, "runtime"),
            kind_config: get_block(canonical, "kind_config").cloned(),
        })
    }

    /// Reads the resource attributes from a dynamic value.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] when the value is not an
    /// object or `name` is missing.
    pub fn from_dynamic(value: &DynamicValue) -> Result<Self, ControllerError> {
        let canonical = object_to_map(value).ok_or_else(|| {
            ControllerError::InvalidConfig("cluster resource must be an object".to_string())
        })?;
        Self::from_canonical(&canonical)
    }

    /// Validates the runtime against the provider allow-list
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::UnsupportedProvider`] for anything but
    /// `""`, `docker`, `podman` and `nerdctl`.
    pub fn provider(&self) -> Result<RuntimeProvider, ControllerError> {
        parse_provider(&self.name, &self.runtime)
    }

    /// Maps `kind_config`; `None` when the block is absent
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Mapping`] naming the cluster.
    pub fn cluster_spec(
        &self,
        options: &MapperOptions,
    ) -> Result<Option<ClusterSpec>, ControllerError> {
        self.kind_config
            .as_ref()
            .map(|canonical| {
                map_cluster_spec_with(canonical, options).map_err(|source| ControllerError::Mapping {
                    cluster: self.name.clone(),
                    source,
                })
            })
            .transpose()
    }

    /// Configured kubeconfig path, or `<cwd>/<name>-config`
    #[must_use]
    pub fn effective_kubeconfig_path(&self) -> PathBuf {
        self.kubeconfig_path
            .clone()
            .unwrap_or_else(|| default_kubeconfig_path(&self.name))
    }
}

/// Persisted view of a managed cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResourceState {
    /// Cluster name
    pub name: String,
    /// Node image override the cluster was created with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_image: Option<String>,
    /// Whether apply waited for readiness
    #[serde(default)]
    pub wait_for_ready: bool,
    /// Resolved location of the cluster's kubeconfig
    pub kubeconfig_path: PathBuf,
    /// Runtime provider name; empty for auto-detection
    #[serde(default)]
    pub runtime: String,
    /// Mapped configuration; `None` when the resource had no `kind_config`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind_config: Option<ClusterSpec>,
    /// Effective document kind after defaulting
    pub kind: String,
    /// Effective API version after defaulting
    pub api_version: String,
    /// API server URL from the exported kubeconfig
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// When the cluster was last created or updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<DateTime<Utc>>,
}

impl ClusterResourceState {
    /// Validates the recorded runtime against the provider allow-list
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::UnsupportedProvider`].
    pub fn provider(&self) -> Result<RuntimeProvider, ControllerError> {
        parse_provider(&self.name, &self.runtime)
    }

    /// The configuration the engine was given
    #[must_use]
    pub fn effective_spec(&self) -> ClusterSpec {
        self.kind_config.clone().unwrap_or_default()
    }
}

/// `<cwd>/<name>-config`
#[must_use]
pub fn default_kubeconfig_path(name: &str) -> PathBuf {
    std::env::current_dir()
        .unwrap_or_default()
        .join(format!("{}-config", name))
}

/// True when `a` and `b` name the same file
pub(crate) fn same_file(a: &Path, b: &Path) -> bool {
    let absolute = |p: &Path| std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf());
    absolute(a) == absolute(b)
}

fn parse_provider(cluster: &str, runtime: &str) -> Result<RuntimeProvider, ControllerError> {
    runtime
        .parse()
        .map_err(|_| ControllerError::UnsupportedProvider {
            cluster: cluster.to_string(),
            provider: runtime.to_string(),
        })
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
