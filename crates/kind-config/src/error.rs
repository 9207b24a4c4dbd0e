//! Mapping errors

use crate::containerd::ContainerdPatchError;
use thiserror::Error;

/// Errors raised while mapping a canonical configuration tree into a `ClusterSpec`.
///
/// Invalid enum literals always reject the whole configuration; they are never
/// replaced by a default.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Node role is neither `control-plane` nor `worker`
    #[error("invalid node role {0:?}: expected \"control-plane\" or \"worker\"")]
    InvalidRole(String),

    /// Port mapping protocol is not one of TCP, UDP, SCTP
    #[error("invalid port mapping protocol {0:?}: expected \"TCP\", \"UDP\" or \"SCTP\"")]
    InvalidProtocol(String),

    /// Mount propagation is not one of None, HostToContainer, Bidirectional
    #[error(
        "invalid mount propagation {0:?}: expected \"None\", \"HostToContainer\" or \"Bidirectional\""
    )]
    InvalidPropagation(String),

    /// IP family is not one of ipv4, ipv6, dual
    #[error("invalid ip family {0:?}: expected \"ipv4\", \"ipv6\" or \"dual\"")]
    InvalidIpFamily(String),

    /// A required field inside a block is missing or empty
    #[error("{block}: missing required field {field:?}")]
    MissingField {
        /// Block the field belongs to
        block: &'static str,
        /// Field name
        field: &'static str,
    },

    /// Containerd patch rejected under the strict patch policy
    #[error(transparent)]
    InvalidContainerdPatch(#[from] ContainerdPatchError),
}
