//! Canonical configuration tree to `ClusterSpec`.
//!
//! The mapper is pure: it reads the canonical tree through the best-effort
//! accessors, canonicalizes enum literals and fills in defaults. Invalid enum
//! literals (role, protocol, propagation, IP family) are hard errors. Two
//! fields deliberately fail open instead: unparseable feature-gate values
//! become `false`, and malformed containerd patches follow the caller's
//! [`ContainerdPatchPolicy`].

use crate::accessors::{
    get_block, get_bool, get_int, get_map_slice, get_string, get_string_map, get_string_slice,
};
use crate::containerd::normalize_toml;
use crate::error::MappingError;
use crate::spec::{
    ClusterSpec, IpFamily, KubeProxyMode, Mount, MountPropagation, NetworkingSpec, NodeRole,
    NodeSpec, PortMapping, PortProtocol, DEFAULT_API_VERSION, DEFAULT_KIND, DEFAULT_NODE_IMAGE,
};
use crate::value::GenericMap;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What to do with a containerd patch that is not valid TOML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerdPatchPolicy {
    /// Log a warning and keep the original text
    #[default]
    PassThrough,
    /// Fail the whole mapping
    Reject,
}

/// Mapper options
#[derive(Debug, Clone, Copy, Default)]
pub struct MapperOptions {
    /// Handling of malformed containerd patches
    pub containerd_patch_policy: ContainerdPatchPolicy,
}

/// Maps a canonical `kind_config` tree into a `ClusterSpec` with default options.
///
/// # Errors
///
/// Returns [`MappingError`] for invalid enum literals and missing mount paths.
pub fn map_cluster_spec(canonical: &GenericMap) -> Result<ClusterSpec, MappingError> {
    map_cluster_spec_with(canonical, &MapperOptions::default())
}

/// Maps a canonical `kind_config` tree into a `ClusterSpec`.
///
/// # Errors
///
/// Returns [`MappingError`] for invalid enum literals, missing mount paths and,
/// under [`ContainerdPatchPolicy::Reject`], malformed containerd patches.
pub fn map_cluster_spec_with(
    canonical: &GenericMap,
    options: &MapperOptions,
) -> Result<ClusterSpec, MappingError> {
    let kind = non_empty_or(get_string(canonical, "kind"), DEFAULT_KIND);
    let api_version = non_empty_or(get_string(canonical, "api_version"), DEFAULT_API_VERSION);

    let mut nodes = get_map_slice(canonical, "node")
        .unwrap_or_default()
        .into_iter()
        .map(map_node)
        .collect::<Result<Vec<_>, _>>()?;
    if nodes.is_empty() {
        nodes.push(NodeSpec::default());
    }

    let networking = get_block(canonical, "networking")
        .map(map_networking)
        .transpose()?
        .unwrap_or_default();

    let containerd_config_patches = get_string_slice(canonical, "containerd_config_patches")
        .unwrap_or_default()
        .iter()
        .map(|patch| map_containerd_patch(patch, options.containerd_patch_policy))
        .collect::<Result<Vec<_>, _>>()?;

    let spec = ClusterSpec {
        kind,
        api_version,
        nodes,
        networking,
        containerd_config_patches,
        kubeadm_config_patches: get_string_slice(canonical, "kubeadm_config_patches")
            .unwrap_or_default(),
        runtime_config: map_runtime_config(canonical),
        feature_gates: map_feature_gates(canonical),
    };

    debug!(
        "Mapped cluster spec: {} node(s), {} containerd patch(es)",
        spec.nodes.len(),
        spec.containerd_config_patches.len()
    );
    Ok(spec)
}

/// Maps one `node` block.
///
/// # Errors
///
/// Returns [`MappingError`] for an invalid role or an invalid mount/port block.
pub fn map_node(node: &GenericMap) -> Result<NodeSpec, MappingError> {
    let role = match get_string(node, "role").as_str() {
        "" | "control-plane" => NodeRole::ControlPlane,
        "worker" => NodeRole::Worker,
        other => return Err(MappingError::InvalidRole(other.to_string())),
    };

    let extra_mounts = get_map_slice(node, "extra_mounts")
        .unwrap_or_default()
        .into_iter()
        .map(map_mount)
        .collect::<Result<Vec<_>, _>>()?;

    let extra_port_mappings = get_map_slice(node, "extra_port_mappings")
        .unwrap_or_default()
        .into_iter()
        .map(map_port_mapping)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NodeSpec {
        role,
        image: non_empty_or(get_string(node, "image"), DEFAULT_NODE_IMAGE),
        labels: get_string_map(node, "labels").unwrap_or_default(),
        extra_mounts,
        extra_port_mappings,
        kubeadm_config_patches: get_string_slice(node, "kubeadm_config_patches")
            .unwrap_or_default(),
    })
}

/// Maps one `extra_mounts` block.
///
/// # Errors
///
/// Returns [`MappingError`] when a path is missing or the propagation mode is unknown.
pub fn map_mount(mount: &GenericMap) -> Result<Mount, MappingError> {
    let host_path = required(mount, "extra_mounts", "host_path")?;
    let container_path = required(mount, "extra_mounts", "container_path")?;

    let propagation = match get_string(mount, "propagation").as_str() {
        "" => None,
        "None" => Some(MountPropagation::None),
        "HostToContainer" => Some(MountPropagation::HostToContainer),
        "Bidirectional" => Some(MountPropagation::Bidirectional),
        other => return Err(MappingError::InvalidPropagation(other.to_string())),
    };

    Ok(Mount {
        host_path,
        container_path,
        read_only: get_bool(mount, "read_only"),
        selinux_relabel: get_bool(mount, "selinux_relabel"),
        propagation,
    })
}

/// Maps one `extra_port_mappings` block.
///
/// # Errors
///
/// Returns [`MappingError::InvalidProtocol`] for anything but `TCP`, `UDP`, `SCTP`.
pub fn map_port_mapping(mapping: &GenericMap) -> Result<PortMapping, MappingError> {
    let protocol = match get_string(mapping, "protocol").as_str() {
        "" => None,
        "TCP" => Some(PortProtocol::Tcp),
        "UDP" => Some(PortProtocol::Udp),
        "SCTP" => Some(PortProtocol::Sctp),
        other => return Err(MappingError::InvalidProtocol(other.to_string())),
    };

    Ok(PortMapping {
        container_port: port(get_int(mapping, "container_port")),
        host_port: port(get_int(mapping, "host_port")),
        listen_address: get_string(mapping, "listen_address"),
        protocol,
    })
}

/// Maps the `networking` block.
///
/// # Errors
///
/// Returns [`MappingError::InvalidIpFamily`] for an unknown IP family.
pub fn map_networking(networking: &GenericMap) -> Result<NetworkingSpec, MappingError> {
    let ip_family = match get_string(networking, "ip_family").as_str() {
        "" => None,
        "ipv4" => Some(IpFamily::Ipv4),
        "ipv6" => Some(IpFamily::Ipv6),
        "dual" => Some(IpFamily::Dual),
        other => return Err(MappingError::InvalidIpFamily(other.to_string())),
    };

    let kube_proxy_mode = Some(get_string(networking, "kube_proxy_mode"))
        .filter(|mode| !mode.is_empty())
        .map(KubeProxyMode::from);

    Ok(NetworkingSpec {
        api_server_address: get_string(networking, "api_server_address"),
        api_server_port: port(get_int(networking, "api_server_port")),
        ip_family,
        kube_proxy_mode,
        pod_subnet: get_string(networking, "pod_subnet"),
        service_subnet: get_string(networking, "service_subnet"),
        disable_default_cni: get_bool(networking, "disable_default_cni"),
        dns_search: get_string_slice(networking, "dns_search"),
    })
}

/// Rewrites runtime-config keys to the engine convention.
///
/// Only the first `_` becomes `/` (`api_alpha` to `api/alpha`). Scalar values
/// are rendered as strings; nested values are skipped.
#[must_use]
pub fn map_runtime_config(canonical: &GenericMap) -> BTreeMap<String, String> {
    let Some(entries) = canonical.get("runtime_config").and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    entries
        .iter()
        .filter_map(|(key, value)| {
            scalar_to_string(value).map(|v| (key.replacen('_', "/", 1), v))
        })
        .collect()
}

/// Parses feature gates.
///
/// A value is enabled only when it reads `true` case-insensitively; anything
/// else, including typos, is `false`.
#[must_use]
pub fn map_feature_gates(canonical: &GenericMap) -> BTreeMap<String, bool> {
    let Some(entries) = canonical.get("feature_gates").and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    entries
        .iter()
        .map(|(gate, value)| {
            let enabled = scalar_to_string(value)
                .is_some_and(|v| v.to_lowercase() == "true");
            (gate.clone(), enabled)
        })
        .collect()
}

fn map_containerd_patch(
    patch: &str,
    policy: ContainerdPatchPolicy,
) -> Result<String, MappingError> {
    match normalize_toml(patch) {
        Ok(normalized) => Ok(normalized),
        Err(e) => match policy {
            ContainerdPatchPolicy::PassThrough => {
                warn!("Passing containerd config patch through unnormalized: {}", e);
                Ok(e.original)
            }
            ContainerdPatchPolicy::Reject => Err(MappingError::InvalidContainerdPatch(e)),
        },
    }
}

fn required(
    block: &GenericMap,
    block_name: &'static str,
    field: &'static str,
) -> Result<String, MappingError> {
    let value = get_string(block, field);
    if value.is_empty() {
        return Err(MappingError::MissingField {
            block: block_name,
            field,
        });
    }
    Ok(value)
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Ports outside the i32 range cannot be valid; treat them like any other bad value.
fn port(value: i64) -> i32 {
    i32::try_from(value).unwrap_or_default()
}
