//! Unit tests for the configuration mapper

#[cfg(test)]
mod tests {
    use crate::mapper::*;
    use crate::spec::*;
    use crate::value::GenericMap;
    use crate::MappingError;
    use serde_json::{json, Value};

    const TEST_CLUSTER_KIND: &str = "Cluster";
    const TEST_API_VERSION: &str = "kind.x-k8s.io/v1alpha4";
    const TEST_NODE_IMAGE: &str = "kindest/node:v1.29.0";
    const TEST_HOST_PATH: &str = "/host/path";
    const TEST_CONTAINER_PATH: &str = "/container/path";

    fn map(value: Value) -> GenericMap {
        value.as_object().cloned().unwrap_or_default()
    }

    fn spec(value: Value) -> ClusterSpec {
        match map_cluster_spec(&map(value)) {
            Ok(spec) => spec,
            Err(e) => panic!("mapping should succeed: {}", e),
        }
    }

    #[test]
    fn test_basic_cluster_config_keeps_literals() {
        let result = spec(json!({
            "kind": TEST_CLUSTER_KIND,
            "api_version": TEST_API_VERSION,
        }));
        assert_eq!(result.kind, TEST_CLUSTER_KIND);
        assert_eq!(result.api_version, TEST_API_VERSION);
    }

    #[test]
    fn test_empty_config_gets_defaults() {
        let result = spec(json!({}));
        assert_eq!(result.kind, DEFAULT_KIND);
        assert_eq!(result.api_version, DEFAULT_API_VERSION);
        assert_eq!(result.nodes.len(), 1, "should default to a single node");
        assert_eq!(result.nodes[0].role, NodeRole::ControlPlane);
        assert_eq!(result.networking, NetworkingSpec::default());
    }

    #[test]
    fn test_nodes_keep_order() {
        let result = spec(json!({
            "node": [{"role": "control-plane"}, {"role": "worker"}],
        }));
        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.nodes[0].role, NodeRole::ControlPlane);
        assert_eq!(result.nodes[1].role, NodeRole::Worker);
    }

    #[test]
    fn test_invalid_role_is_rejected() {
        let result = map_cluster_spec(&map(json!({"node": [{"role": "master"}]})));
        assert!(
            matches!(result, Err(MappingError::InvalidRole(ref role)) if role == "master"),
            "unknown role must fail the mapping"
        );
    }

    #[test]
    fn test_role_match_is_exact() {
        let result = map_node(&map(json!({"role": "Worker"})));
        assert!(matches!(result, Err(MappingError::InvalidRole(_))));
    }

    #[test]
    fn test_node_image_and_labels() {
        let node = map_node(&map(json!({
            "role": "worker",
            "image": TEST_NODE_IMAGE,
            "labels": {"app": "test", "tier": "backend", "bad": 1},
        })));
        let node = node.unwrap_or_default();
        assert_eq!(node.image, TEST_NODE_IMAGE);
        assert_eq!(node.labels.len(), 2, "non-string labels are dropped");
        assert_eq!(node.labels["tier"], "backend");
    }

    #[test]
    fn test_node_image_defaults() {
        let node = map_node(&map(json!({"role": "worker"}))).unwrap_or_default();
        assert_eq!(node.image, DEFAULT_NODE_IMAGE);
    }

    #[test]
    fn test_node_kubeadm_patches_keep_order() {
        let node = map_node(&map(json!({
            "kubeadm_config_patches": ["patch1", "patch2"],
        })))
        .unwrap_or_default();
        assert_eq!(node.kubeadm_config_patches, vec!["patch1", "patch2"]);
    }

    #[test]
    fn test_mount_mapping() {
        let mount = map_mount(&map(json!({
            "host_path": TEST_HOST_PATH,
            "container_path": TEST_CONTAINER_PATH,
            "read_only": true,
            "selinux_relabel": true,
            "propagation": "HostToContainer",
        })));
        match mount {
            Ok(mount) => {
                assert_eq!(mount.host_path, TEST_HOST_PATH);
                assert_eq!(mount.container_path, TEST_CONTAINER_PATH);
                assert!(mount.read_only);
                assert!(mount.selinux_relabel);
                assert_eq!(mount.propagation, Some(MountPropagation::HostToContainer));
            }
            Err(e) => panic!("mount should map: {}", e),
        }
    }

    #[test]
    fn test_mount_propagation_values() {
        for (literal, expected) in [
            ("None", MountPropagation::None),
            ("HostToContainer", MountPropagation::HostToContainer),
            ("Bidirectional", MountPropagation::Bidirectional),
        ] {
            let mount = map_mount(&map(json!({
                "host_path": TEST_HOST_PATH,
                "container_path": TEST_CONTAINER_PATH,
                "propagation": literal,
            })));
            assert_eq!(mount.ok().and_then(|m| m.propagation), Some(expected));
        }

        let bad = map_mount(&map(json!({
            "host_path": TEST_HOST_PATH,
            "container_path": TEST_CONTAINER_PATH,
            "propagation": "bidirectional",
        })));
        assert!(matches!(bad, Err(MappingError::InvalidPropagation(_))));
    }

    #[test]
    fn test_mount_requires_paths() {
        let result = map_mount(&map(json!({"container_path": TEST_CONTAINER_PATH})));
        assert!(matches!(
            result,
            Err(MappingError::MissingField { field: "host_path", .. })
        ));
    }

    #[test]
    fn test_port_mapping() {
        let mapping = map_port_mapping(&map(json!({
            "container_port": 80,
            "host_port": 8080,
            "listen_address": "0.0.0.0",
            "protocol": "UDP",
        })));
        match mapping {
            Ok(mapping) => {
                assert_eq!(mapping.container_port, 80);
                assert_eq!(mapping.host_port, 8080);
                assert_eq!(mapping.listen_address, "0.0.0.0");
                assert_eq!(mapping.protocol, Some(PortProtocol::Udp));
            }
            Err(e) => panic!("port mapping should map: {}", e),
        }
    }

    #[test]
    fn test_port_protocol_is_case_sensitive() {
        let result = map_port_mapping(&map(json!({"protocol": "tcp"})));
        assert!(matches!(result, Err(MappingError::InvalidProtocol(ref p)) if p == "tcp"));

        let sctp = map_port_mapping(&map(json!({"protocol": "SCTP"})));
        assert_eq!(sctp.ok().and_then(|m| m.protocol), Some(PortProtocol::Sctp));
    }

    #[test]
    fn test_invalid_node_block_rejects_whole_config() {
        let result = map_cluster_spec(&map(json!({
            "node": [
                {"role": "control-plane"},
                {"role": "worker", "extra_port_mappings": [{"protocol": "ICMP"}]},
            ],
        })));
        assert!(matches!(result, Err(MappingError::InvalidProtocol(_))));
    }

    #[test]
    fn test_networking_from_block_list() {
        let result = spec(json!({
            "networking": [{
                "api_server_address": "127.0.0.1",
                "api_server_port": 6443,
                "pod_subnet": "10.244.0.0/16",
                "service_subnet": "10.96.0.0/12",
                "disable_default_cni": true,
            }],
        }));
        assert_eq!(result.networking.api_server_address, "127.0.0.1");
        assert_eq!(result.networking.api_server_port, 6443);
        assert_eq!(result.networking.pod_subnet, "10.244.0.0/16");
        assert_eq!(result.networking.service_subnet, "10.96.0.0/12");
        assert!(result.networking.disable_default_cni);
    }

    #[test]
    fn test_ip_family() {
        for (literal, expected) in [
            ("ipv4", IpFamily::Ipv4),
            ("ipv6", IpFamily::Ipv6),
            ("dual", IpFamily::Dual),
        ] {
            let networking = map_networking(&map(json!({"ip_family": literal})));
            assert_eq!(networking.ok().and_then(|n| n.ip_family), Some(expected));
        }

        let bad = map_networking(&map(json!({"ip_family": "IPv4"})));
        assert!(matches!(bad, Err(MappingError::InvalidIpFamily(_))));
    }

    #[test]
    fn test_kube_proxy_mode() {
        let iptables = map_networking(&map(json!({"kube_proxy_mode": "iptables"})));
        assert_eq!(
            iptables.ok().and_then(|n| n.kube_proxy_mode),
            Some(KubeProxyMode::Iptables)
        );

        let none = map_networking(&map(json!({"kube_proxy_mode": "none"})));
        assert_eq!(none.ok().and_then(|n| n.kube_proxy_mode), Some(KubeProxyMode::None));

        let custom = map_networking(&map(json!({"kube_proxy_mode": "nftables"})));
        assert_eq!(
            custom.ok().and_then(|n| n.kube_proxy_mode),
            Some(KubeProxyMode::Other("nftables".to_string())),
            "unknown modes pass through"
        );

        let unset = map_networking(&map(json!({})));
        assert_eq!(unset.ok().and_then(|n| n.kube_proxy_mode), None);
    }

    #[test]
    fn test_dns_search_presence_is_preserved() {
        let absent = map_networking(&map(json!({}))).unwrap_or_default();
        assert_eq!(absent.dns_search, None);

        let empty = map_networking(&map(json!({"dns_search": []}))).unwrap_or_default();
        assert_eq!(empty.dns_search, Some(vec![]));

        let set = map_networking(&map(json!({"dns_search": ["example.com", "test.local"]})))
            .unwrap_or_default();
        assert_eq!(
            set.dns_search,
            Some(vec!["example.com".to_string(), "test.local".to_string()])
        );
    }

    #[test]
    fn test_containerd_patches_are_normalized() {
        let result = spec(json!({
            "containerd_config_patches": [
                "[plugins.cri]\n  sandbox_image = \"test\"",
                "[plugins.cri.registry]\n  config_path = \"/etc/containerd/certs.d\"",
            ],
        }));
        assert_eq!(result.containerd_config_patches.len(), 2);
        assert!(result.containerd_config_patches[0].contains("sandbox_image"));
        assert!(result.containerd_config_patches[1].contains("config_path"));
    }

    #[test]
    fn test_invalid_containerd_patch_passes_through_by_default() {
        let result = spec(json!({"containerd_config_patches": ["invalid [[["]}));
        assert_eq!(result.containerd_config_patches, vec!["invalid [[["]);
    }

    #[test]
    fn test_invalid_containerd_patch_rejected_when_strict() {
        let options = MapperOptions {
            containerd_patch_policy: ContainerdPatchPolicy::Reject,
        };
        let result = map_cluster_spec_with(
            &map(json!({"containerd_config_patches": ["invalid [[["]})),
            &options,
        );
        match result {
            Err(MappingError::InvalidContainerdPatch(e)) => assert_eq!(e.original, "invalid [[["),
            other => panic!("expected containerd patch error, got {:?}", other),
        }
    }

    #[test]
    fn test_runtime_config_key_rewrite() {
        let result = spec(json!({
            "runtime_config": {"api_alpha": "false", "api_beta": "true", "api_all_v1": true},
        }));
        assert_eq!(result.runtime_config.len(), 3);
        assert_eq!(result.runtime_config["api/alpha"], "false");
        assert_eq!(result.runtime_config["api/beta"], "true");
        assert_eq!(
            result.runtime_config["api/all_v1"], "true",
            "only the first underscore is rewritten"
        );
    }

    #[test]
    fn test_feature_gates() {
        let result = spec(json!({
            "feature_gates": {
                "FeatureA": "true",
                "FeatureB": "false",
                "FeatureC": "True",
                "FeatureD": "yes please",
                "FeatureE": true,
            },
        }));
        assert_eq!(result.feature_gates.len(), 5);
        assert!(result.feature_gates["FeatureA"]);
        assert!(!result.feature_gates["FeatureB"]);
        assert!(result.feature_gates["FeatureC"]);
        assert!(!result.feature_gates["FeatureD"], "unparseable values are false");
        assert!(result.feature_gates["FeatureE"]);
    }

    #[test]
    fn test_cluster_kubeadm_patches() {
        let result = spec(json!({"kubeadm_config_patches": ["kind: ClusterConfiguration"]}));
        assert_eq!(result.kubeadm_config_patches, vec!["kind: ClusterConfiguration"]);
    }
}
