//! Typed kind cluster specification.
//!
//! Field names serialize in the engine's camelCase configuration format
//! (`kind.x-k8s.io/v1alpha4`), so a `ClusterSpec` can be handed to the
//! engine as-is through [`ClusterSpec::to_yaml`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default `kind` of a cluster configuration document
pub const DEFAULT_KIND: &str = "Cluster";

/// Default `apiVersion` of a cluster configuration document
pub const DEFAULT_API_VERSION: &str = "kind.x-k8s.io/v1alpha4";

/// Node image used when a node does not name one
pub const DEFAULT_NODE_IMAGE: &str = "kindest/node:v1.33.1";

/// Cluster configuration handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Document kind (`Cluster`)
    pub kind: String,

    /// Document API version
    pub api_version: String,

    /// Ordered node list; never empty after mapping
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,

    /// Cluster networking
    #[serde(default)]
    pub networking: NetworkingSpec,

    /// Normalized containerd TOML patches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containerd_config_patches: Vec<String>,

    /// Cluster-wide kubeadm patches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubeadm_config_patches: Vec<String>,

    /// API server runtime config (`api/alpha` style keys)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub runtime_config: BTreeMap<String, String>,

    /// Kubernetes feature gates
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,
}

impl Default for ClusterSpec {
    fn default() -> Self {
        Self {
            kind: DEFAULT_KIND.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            nodes: vec![NodeSpec::default()],
            networking: NetworkingSpec::default(),
            containerd_config_patches: Vec::new(),
            kubeadm_config_patches: Vec::new(),
            runtime_config: BTreeMap::new(),
            feature_gates: BTreeMap::new(),
        }
    }
}

impl ClusterSpec {
    /// Renders the spec as the engine's YAML configuration document.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; the spec contains only plain data so this
    /// does not happen in practice.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Compares two specs ignoring cosmetic fields.
    ///
    /// Node labels can be changed without recreating a cluster; everything
    /// else (topology, networking, patches, runtime config, feature gates)
    /// cannot.
    #[must_use]
    pub fn topology_eq(&self, other: &Self) -> bool {
        let strip = |spec: &Self| {
            let mut spec = spec.clone();
            for node in &mut spec.nodes {
                node.labels.clear();
            }
            spec
        };
        strip(self) == strip(other)
    }
}

/// Role of a node in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    /// Runs the Kubernetes control plane
    #[default]
    ControlPlane,
    /// Runs workloads only
    Worker,
}

/// A single cluster node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    /// Node role
    pub role: NodeRole,

    /// Node container image
    pub image: String,

    /// Kubernetes node labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Host directories mounted into the node
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_mounts: Vec<Mount>,

    /// Host ports forwarded to the node
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_port_mappings: Vec<PortMapping>,

    /// Node-level kubeadm patches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubeadm_config_patches: Vec<String>,
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self {
            role: NodeRole::ControlPlane,
            image: DEFAULT_NODE_IMAGE.to_string(),
            labels: BTreeMap::new(),
            extra_mounts: Vec::new(),
            extra_port_mappings: Vec::new(),
            kubeadm_config_patches: Vec::new(),
        }
    }
}

/// Mount propagation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountPropagation {
    /// No propagation
    None,
    /// Host mounts propagate into the container
    HostToContainer,
    /// Mounts propagate both ways
    Bidirectional,
}

/// A host path mounted into a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    /// Path on the host
    pub host_path: String,

    /// Path inside the node container
    pub container_path: String,

    /// Mount read-only
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,

    /// Relabel for SELinux
    #[serde(default, rename = "selinuxRelabel", skip_serializing_if = "std::ops::Not::not")]
    pub selinux_relabel: bool,

    /// Propagation mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagation: Option<MountPropagation>,
}

/// Port mapping protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortProtocol {
    /// TCP
    Tcp,
    /// UDP
    Udp,
    /// SCTP
    Sctp,
}

/// A host port forwarded to a node port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Port inside the node
    pub container_port: i32,

    /// Port on the host
    pub host_port: i32,

    /// Host address to bind
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub listen_address: String,

    /// Protocol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<PortProtocol>,
}

/// Cluster IP family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    /// IPv4 only
    Ipv4,
    /// IPv6 only
    Ipv6,
    /// Dual stack
    Dual,
}

/// kube-proxy mode.
///
/// Unrecognized modes are kept verbatim in `Other` so engine-defined
/// extensions keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KubeProxyMode {
    /// iptables proxier
    Iptables,
    /// IPVS proxier
    Ipvs,
    /// kube-proxy disabled
    None,
    /// Any other engine-supported mode
    Other(String),
}

impl KubeProxyMode {
    /// Engine literal for the mode
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Iptables => "iptables",
            Self::Ipvs => "ipvs",
            Self::None => "none",
            Self::Other(mode) => mode,
        }
    }
}

impl From<String> for KubeProxyMode {
    fn from(mode: String) -> Self {
        match mode.as_str() {
            "iptables" => Self::Iptables,
            "ipvs" => Self::Ipvs,
            "none" => Self::None,
            _ => Self::Other(mode),
        }
    }
}

impl From<KubeProxyMode> for String {
    fn from(mode: KubeProxyMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Cluster networking
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkingSpec {
    /// API server listen address on the host
    #[serde(default, rename = "apiServerAddress", skip_serializing_if = "String::is_empty")]
    pub api_server_address: String,

    /// API server port on the host (0 picks a random port)
    #[serde(default, rename = "apiServerPort", skip_serializing_if = "is_zero")]
    pub api_server_port: i32,

    /// IP family
    #[serde(default, rename = "ipFamily", skip_serializing_if = "Option::is_none")]
    pub ip_family: Option<IpFamily>,

    /// kube-proxy mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_proxy_mode: Option<KubeProxyMode>,

    /// Pod CIDR
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod_subnet: String,

    /// Service CIDR
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_subnet: String,

    /// Skip installing the default CNI
    #[serde(default, rename = "disableDefaultCNI", skip_serializing_if = "std::ops::Not::not")]
    pub disable_default_cni: bool,

    /// DNS search domains.
    ///
    /// `None` keeps the platform default, `Some(vec![])` explicitly clears them.
    #[serde(default, rename = "dnsSearch", skip_serializing_if = "Option::is_none")]
    pub dns_search: Option<Vec<String>>,
}

#[allow(clippy::trivially_copy_pass_by_ref, reason = "serde skip_serializing_if takes a reference")]
fn is_zero(value: &i32) -> bool {
    *value == 0
}
