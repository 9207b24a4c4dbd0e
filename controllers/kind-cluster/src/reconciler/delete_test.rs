//! Unit tests for the delete reconciler

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::test_utils::*;
    use kind_client::{kubeconfig_fixture, KubeconfigExt, MockKindClient, MockOperation};
    use kube::config::Kubeconfig;
    use tokio_util::sync::CancellationToken;

    fn exported(name: &str) -> Kubeconfig {
        Kubeconfig::from_yaml(&kubeconfig_fixture(name)).unwrap()
    }

    #[tokio::test]
    async fn test_delete_removes_cluster_and_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);
        let state = reconciler
            .create_cluster(&create_test_config("dev", dir.path()), &CancellationToken::new())
            .await
            .unwrap();

        reconciler.delete_cluster(&state).await.unwrap();

        assert!(!client.has_cluster("dev"));
        assert!(!store.config().has_any_entry("kind-dev"));
        assert_eq!(store.config().current_context, None);
        assert!(!state.kubeconfig_path.exists(), "per-cluster kubeconfig is removed");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);
        let state = reconciler
            .create_cluster(&create_test_config("dev", dir.path()), &CancellationToken::new())
            .await
            .unwrap();

        reconciler.delete_cluster(&state).await.unwrap();
        reconciler.delete_cluster(&state).await.unwrap();

        assert_eq!(client.delete_calls(), 2);
        assert!(!client.has_cluster("dev"));
        assert!(!store.config().has_any_entry("kind-dev"));
    }

    #[tokio::test]
    async fn test_delete_keeps_other_clusters_entries() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);
        let cancel = CancellationToken::new();
        let dev = reconciler
            .create_cluster(&create_test_config("dev", dir.path()), &cancel)
            .await
            .unwrap();
        reconciler
            .create_cluster(&create_test_config("prod", dir.path()), &cancel)
            .await
            .unwrap();

        reconciler.delete_cluster(&dev).await.unwrap();

        assert!(client.has_cluster("prod"));
        assert!(store.config().has_context("kind-prod"));
        assert!(!store.config().has_any_entry("kind-dev"));
    }

    #[tokio::test]
    async fn test_lingering_cluster_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);
        let state = reconciler
            .create_cluster(&create_test_config("dev", dir.path()), &CancellationToken::new())
            .await
            .unwrap();

        client.set_sticky_deletes(1);
        reconciler.delete_cluster(&state).await.unwrap();

        assert_eq!(client.delete_calls(), 2);
        assert!(!client.has_cluster("dev"));
    }

    #[tokio::test]
    async fn test_persistent_cluster_residue_is_incomplete_teardown() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);
        let state = reconciler
            .create_cluster(&create_test_config("dev", dir.path()), &CancellationToken::new())
            .await
            .unwrap();

        client.set_sticky_deletes(10);
        let result = reconciler.delete_cluster(&state).await;

        match result {
            Err(ControllerError::IncompleteTeardown {
                cluster,
                attempts,
                residue,
            }) => {
                assert_eq!(cluster, "dev");
                assert_eq!(attempts, test_settings().teardown_attempts);
                assert!(residue.contains("still listed"), "residue: {}", residue);
            }
            other => panic!("expected incomplete teardown, got {:?}", other),
        }
        assert_eq!(client.delete_calls(), 3);
        assert!(state.kubeconfig_path.exists(), "partial teardown stays inspectable");
    }

    #[tokio::test]
    async fn test_persistent_credential_residue_is_incomplete_teardown() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);
        let state = reconciler
            .create_cluster(&create_test_config("dev", dir.path()), &CancellationToken::new())
            .await
            .unwrap();

        store.pin_entries(exported("dev"));
        let result = reconciler.delete_cluster(&state).await;

        match result {
            Err(ControllerError::IncompleteTeardown { residue, .. }) => {
                assert!(residue.contains("kind-dev"), "residue: {}", residue);
            }
            other => panic!("expected incomplete teardown, got {:?}", other),
        }
        assert!(!client.has_cluster("dev"));
    }

    #[tokio::test]
    async fn test_engine_failure_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);
        let state = reconciler
            .create_cluster(&create_test_config("dev", dir.path()), &CancellationToken::new())
            .await
            .unwrap();

        client.fail_on(MockOperation::Delete, "permission denied");
        let result = reconciler.delete_cluster(&state).await;

        assert!(matches!(result, Err(ControllerError::Engine { operation: "delete", .. })));
        assert_eq!(client.delete_calls(), 1);
        assert!(store.config().has_context("kind-dev"), "credentials stay until the cluster is gone");

        client.clear_failure(MockOperation::Delete);
        reconciler.delete_cluster(&state).await.unwrap();
        assert!(!client.has_cluster("dev"));
        assert!(!store.config().has_any_entry("kind-dev"));
    }

    #[tokio::test]
    async fn test_shared_store_file_is_never_removed() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);

        let mut config = create_test_config("dev", dir.path());
        config.kubeconfig_path = Some(dir.path().join("shared-kubeconfig"));
        let state = reconciler
            .create_cluster(&config, &CancellationToken::new())
            .await
            .unwrap();

        reconciler.delete_cluster(&state).await.unwrap();
        assert!(state.kubeconfig_path.exists());
    }
}
