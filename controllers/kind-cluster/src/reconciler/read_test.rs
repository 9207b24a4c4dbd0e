//! Unit tests for the read reconciler

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconciler::ReadOutcome;
    use crate::test_utils::*;
    use kind_client::{MockKindClient, MockOperation};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_read_present_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);
        let state = reconciler
            .create_cluster(&create_test_config("dev", dir.path()), &CancellationToken::new())
            .await
            .unwrap();

        let outcome = reconciler.read_cluster(&state).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Present(state));
    }

    #[tokio::test]
    async fn test_out_of_band_deletion_is_drift() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);
        let state = reconciler
            .create_cluster(&create_test_config("dev", dir.path()), &CancellationToken::new())
            .await
            .unwrap();

        client.remove_cluster("dev");

        let outcome = reconciler.read_cluster(&state).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Gone);
    }

    #[tokio::test]
    async fn test_read_surfaces_list_failures() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);
        let state = reconciler
            .create_cluster(&create_test_config("dev", dir.path()), &CancellationToken::new())
            .await
            .unwrap();

        client.fail_on(MockOperation::List, "cannot connect to the docker daemon");

        let result = reconciler.read_cluster(&state).await;
        assert!(matches!(result, Err(ControllerError::Engine { operation: "list", .. })));
    }

    #[tokio::test]
    async fn test_read_rejects_unsupported_recorded_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockKindClient::new();
        let store = create_test_store(dir.path());
        let reconciler = create_test_reconciler(&client, &store);
        let mut state = reconciler
            .create_cluster(&create_test_config("dev", dir.path()), &CancellationToken::new())
            .await
            .unwrap();
        let calls = client.total_calls();

        state.runtime = "lxc".to_string();
        let result = reconciler.read_cluster(&state).await;

        assert!(matches!(result, Err(ControllerError::UnsupportedProvider { .. })));
        assert_eq!(client.total_calls(), calls);
    }
}
