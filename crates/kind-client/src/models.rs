//! Request models for the kind client

use crate::error::KindError;
use kind_config::ClusterSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Docker runtime provider name
pub const PROVIDER_DOCKER: &str = "docker";
/// Podman runtime provider name
pub const PROVIDER_PODMAN: &str = "podman";
/// nerdctl runtime provider name
pub const PROVIDER_NERDCTL: &str = "nerdctl";

/// Environment variable kind reads to pick its node provider
pub const PROVIDER_ENV_VAR: &str = "KIND_EXPERIMENTAL_PROVIDER";

/// Container runtime that hosts the cluster nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeProvider {
    /// Let kind detect the runtime
    #[default]
    Auto,
    /// Docker
    Docker,
    /// Podman
    Podman,
    /// nerdctl (containerd)
    Nerdctl,
}

impl RuntimeProvider {
    /// Value for `KIND_EXPERIMENTAL_PROVIDER`; `None` leaves detection to kind
    #[must_use]
    pub fn env_value(self) -> Option<&'static str> {
        match self {
            RuntimeProvider::Auto => None,
            RuntimeProvider::Docker => Some(PROVIDER_DOCKER),
            RuntimeProvider::Podman => Some(PROVIDER_PODMAN),
            RuntimeProvider::Nerdctl => Some(PROVIDER_NERDCTL),
        }
    }
}

impl fmt::Display for RuntimeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_value().unwrap_or(""))
    }
}

impl FromStr for RuntimeProvider {
    type Err = KindError;

    /// Accepts the empty string (auto-detect) and the three supported runtimes.
    /// Matching is exact.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(RuntimeProvider::Auto),
            PROVIDER_DOCKER => Ok(RuntimeProvider::Docker),
            PROVIDER_PODMAN => Ok(RuntimeProvider::Podman),
            PROVIDER_NERDCTL => Ok(RuntimeProvider::Nerdctl),
            other => Err(KindError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Request for creating a cluster
#[derive(Debug, Clone)]
pub struct CreateClusterRequest {
    /// Cluster name
    pub name: String,
    /// Cluster configuration document
    pub config: ClusterSpec,
    /// Overrides every node's image when set
    pub node_image: Option<String>,
    /// Runtime hosting the nodes
    pub provider: RuntimeProvider,
    /// Where kind writes the admin kubeconfig; kind's default store when unset
    pub kubeconfig_path: Option<PathBuf>,
}

impl CreateClusterRequest {
    /// Creates a request with the default provider and no overrides
    pub fn new(name: impl Into<String>, config: ClusterSpec) -> Self {
        Self {
            name: name.into(),
            config,
            node_image: None,
            provider: RuntimeProvider::Auto,
            kubeconfig_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_allow_list() {
        assert_eq!("".parse::<RuntimeProvider>().ok(), Some(RuntimeProvider::Auto));
        assert_eq!("docker".parse::<RuntimeProvider>().ok(), Some(RuntimeProvider::Docker));
        assert_eq!("podman".parse::<RuntimeProvider>().ok(), Some(RuntimeProvider::Podman));
        assert_eq!("nerdctl".parse::<RuntimeProvider>().ok(), Some(RuntimeProvider::Nerdctl));
    }

    #[test]
    fn test_unsupported_provider() {
        for bad in ["containerd", "Docker", " docker"] {
            match bad.parse::<RuntimeProvider>() {
                Err(KindError::UnsupportedProvider(p)) => assert_eq!(p, bad),
                other => panic!("expected unsupported provider for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_auto_sets_no_env() {
        assert_eq!(RuntimeProvider::Auto.env_value(), None);
        assert_eq!(RuntimeProvider::Podman.env_value(), Some("podman"));
        assert_eq!(RuntimeProvider::Auto.to_string(), "");
    }
}
