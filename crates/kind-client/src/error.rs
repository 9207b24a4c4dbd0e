//! kind client errors

use thiserror::Error;

/// Errors that can occur when driving the kind binary or the kubeconfig store
#[derive(Debug, Error)]
pub enum KindError {
    /// Spawning the binary or touching a file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The kind binary ran but exited non-zero
    #[error("Command '{command}' failed: {stderr}")]
    CommandFailed {
        /// Command line that was run
        command: String,
        /// Captured standard error
        stderr: String,
    },

    /// Talking to the cluster API server failed
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// A kubeconfig could not be read, parsed or turned into a client config
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(String),

    /// Rendering the cluster configuration document failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    /// Runtime provider outside the supported set
    #[error("Unsupported provider '{0}'")]
    UnsupportedProvider(String),
}

impl From<kube::config::KubeconfigError> for KindError {
    fn from(e: kube::config::KubeconfigError) -> Self {
        KindError::Kubeconfig(e.to_string())
    }
}
