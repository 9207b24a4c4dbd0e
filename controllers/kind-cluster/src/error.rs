//! Controller-specific error types.
//!
//! Every variant that comes out of a lifecycle operation names the cluster it
//! was working on, so a surfaced error is actionable without the log.

use kind_client::KindError;
use kind_config::MappingError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the kind cluster controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Runtime provider outside the allow-list; raised before any engine call
    #[error("Unsupported provider '{provider}' for cluster {cluster}")]
    UnsupportedProvider {
        /// Cluster being reconciled
        cluster: String,
        /// Rejected provider name
        provider: String,
    },

    /// `kind_config` could not be mapped to a cluster specification
    #[error("Invalid kind_config for cluster {cluster}: {source}")]
    Mapping {
        /// Cluster being reconciled
        cluster: String,
        /// Mapper diagnostic
        #[source]
        source: MappingError,
    },

    /// The kind engine failed
    #[error("Failed to {operation} cluster {cluster}: {source}")]
    Engine {
        /// Cluster being reconciled
        cluster: String,
        /// Verb for the failed step (`create`, `delete`, ...)
        operation: &'static str,
        /// Engine error
        #[source]
        source: KindError,
    },

    /// Nodes did not report ready in time. The cluster is left in place.
    #[error("Cluster {cluster} was not ready after {timeout:?}")]
    ReadinessTimeout {
        /// Cluster being reconciled
        cluster: String,
        /// Configured bound on the wait
        timeout: Duration,
    },

    /// The readiness wait was cancelled. The cluster is left in place.
    #[error("Waiting for cluster {cluster} was cancelled")]
    Cancelled {
        /// Cluster being reconciled
        cluster: String,
    },

    /// Delete left the cluster listed or its credentials behind
    #[error("Teardown of cluster {cluster} incomplete after {attempts} attempt(s): {residue}")]
    IncompleteTeardown {
        /// Cluster being deleted
        cluster: String,
        /// Delete-and-verify rounds made
        attempts: u32,
        /// What was still left after the last round
        residue: String,
    },

    /// Reading or writing kubeconfig files failed
    #[error("Failed to update credentials for cluster {cluster}: {source}")]
    CredentialStore {
        /// Cluster being reconciled
        cluster: String,
        /// Store or file error
        #[source]
        source: KindError,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource or state file could not be read or written
    #[error("State error: {0}")]
    State(String),
}

impl ControllerError {
    pub(crate) fn engine(cluster: &str, operation: &'static str) -> impl FnOnce(KindError) -> Self {
        let cluster = cluster.to_string();
        move |source| ControllerError::Engine {
            cluster,
            operation,
            source,
        }
    }

    pub(crate) fn credentials(cluster: &str) -> impl FnOnce(KindError) -> Self {
        let cluster = cluster.to_string();
        move |source| ControllerError::CredentialStore { cluster, source }
    }
}
