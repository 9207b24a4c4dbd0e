//! Unit tests for the controller shell

#[cfg(test)]
mod tests {
    use crate::controller::{load_resource, load_state, Controller};
    use crate::error::ControllerError;
    use crate::test_utils::*;
    use kind_client::{KubeconfigExt, MockKindClient, MockKubeconfigStore};
    use kind_config::MapperOptions;
    use std::path::{Path, PathBuf};
    use tokio_util::sync::CancellationToken;

    fn write_resource(dir: &Path, name: &str, control_label: &str) -> PathBuf {
        let path = dir.join("cluster.yaml");
        let yaml = format!(
            "name: {name}
wait_for_ready: true
kubeconfig_path: {kubeconfig}
kind_config:
  - node:
      - role: control-plane
        labels:
          tier: {control_label}
      - role: worker
    networking:
      - api_server_port: 6443
",
            kubeconfig = dir.join(format!("{}-config", name)).display(),
        );
        std::fs::write(&path, yaml).unwrap();
        path
    }

    fn setup() -> (tempfile::TempDir, MockKindClient, Controller, MockKubeconfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let controller = Controller::new(create_test_reconciler(&client, &store));
        (dir, client, controller, store)
    }

    #[test]
    fn test_load_resource_reads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let resource = load_resource(&write_resource(dir.path(), "dev", "control")).unwrap();

        assert_eq!(resource.name, "dev");
        assert!(resource.wait_for_ready);
        let spec = resource.cluster_spec(&MapperOptions::default()).unwrap().unwrap();
        assert_eq!(spec.nodes.len(), 2);
        assert_eq!(spec.nodes[0].labels["tier"], "control");
        assert_eq!(spec.networking.api_server_port, 6443);
    }

    #[test]
    fn test_load_resource_without_name_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.yaml");
        std::fs::write(&path, "runtime: docker\n").unwrap();

        assert!(matches!(load_resource(&path), Err(ControllerError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_state_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_state(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_creates_cluster_and_writes_state() {
        let (dir, client, controller, store) = setup();
        let resource = write_resource(dir.path(), "dev", "control");
        let state_path = dir.path().join("state.json");

        let state = controller
            .apply(&resource, &state_path, &CancellationToken::new())
            .await
            .unwrap();

        assert!(client.has_cluster("dev"));
        assert!(store.config().has_context("kind-dev"));
        let saved = load_state(&state_path).unwrap().unwrap();
        assert_eq!(saved.name, state.name);
        assert_eq!(saved.kubeconfig_path, state.kubeconfig_path);
        assert_eq!(saved.endpoint.as_deref(), Some("https://127.0.0.1:6443"));
    }

    #[tokio::test]
    async fn test_reapply_with_label_change_leaves_cluster_alone() {
        let (dir, client, controller, _store) = setup();
        let state_path = dir.path().join("state.json");
        let cancel = CancellationToken::new();

        let resource = write_resource(dir.path(), "dev", "control");
        controller.apply(&resource, &state_path, &cancel).await.unwrap();

        let resource = write_resource(dir.path(), "dev", "edge");
        let state = controller.apply(&resource, &state_path, &cancel).await.unwrap();

        assert_eq!(client.create_calls(), 1);
        assert_eq!(client.delete_calls(), 0);
        let labels = &state.effective_spec().nodes[0].labels;
        assert_eq!(labels["tier"], "edge", "state records the new labels");
    }

    #[tokio::test]
    async fn test_apply_recreates_cluster_deleted_out_of_band() {
        let (dir, client, controller, _store) = setup();
        let resource = write_resource(dir.path(), "dev", "control");
        let state_path = dir.path().join("state.json");
        let cancel = CancellationToken::new();

        controller.apply(&resource, &state_path, &cancel).await.unwrap();
        client.remove_cluster("dev");
        controller.apply(&resource, &state_path, &cancel).await.unwrap();

        assert_eq!(client.create_calls(), 2);
        assert!(client.has_cluster("dev"));
    }

    #[tokio::test]
    async fn test_refresh_forgets_deleted_cluster() {
        let (dir, client, controller, _store) = setup();
        let resource = write_resource(dir.path(), "dev", "control");
        let state_path = dir.path().join("state.json");

        controller
            .apply(&resource, &state_path, &CancellationToken::new())
            .await
            .unwrap();
        assert!(controller.refresh(&state_path).await.unwrap().is_some());

        client.remove_cluster("dev");
        assert!(controller.refresh(&state_path).await.unwrap().is_none());
        assert!(!state_path.exists());
    }

    #[tokio::test]
    async fn test_destroy_twice_succeeds() {
        let (dir, client, controller, store) = setup();
        let resource = write_resource(dir.path(), "dev", "control");
        let state_path = dir.path().join("state.json");

        controller
            .apply(&resource, &state_path, &CancellationToken::new())
            .await
            .unwrap();
        controller.destroy(&state_path).await.unwrap();
        controller.destroy(&state_path).await.unwrap();

        assert!(!client.has_cluster("dev"));
        assert!(!store.config().has_any_entry("kind-dev"));
        assert!(!state_path.exists());
        assert_eq!(client.delete_calls(), 1, "second destroy has no state to act on");
    }
}
