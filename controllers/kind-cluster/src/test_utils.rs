//! Test utilities for unit testing reconcilers
//!
//! Builds reconcilers over the in-memory kind client and kubeconfig store,
//! with timings short enough for unit tests.

use crate::reconciler::{Reconciler, ReconcilerSettings};
use crate::resource::ClusterResourceConfig;
use kind_client::{MockKindClient, MockKubeconfigStore};
use kind_config::{GenericMap, MapperOptions};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

/// Settings with millisecond waits and no teardown backoff
pub fn test_settings() -> ReconcilerSettings {
    ReconcilerSettings {
        readiness_timeout: Duration::from_millis(200),
        poll_interval: Duration::from_millis(5),
        teardown_attempts: 3,
        teardown_backoff_min_secs: 0,
        teardown_backoff_max_secs: 0,
    }
}

/// Reconciler sharing state with the given mocks
pub fn create_test_reconciler(client: &MockKindClient, store: &MockKubeconfigStore) -> Reconciler {
    Reconciler::new(
        client.clone(),
        store.clone(),
        test_settings(),
        MapperOptions::default(),
    )
}

/// Store whose path lives in `dir`
pub fn create_test_store(dir: &Path) -> MockKubeconfigStore {
    MockKubeconfigStore::new(dir.join("shared-kubeconfig"))
}

/// Canonical map from a JSON literal
pub fn canonical(value: Value) -> GenericMap {
    value.as_object().cloned().unwrap_or_default()
}

/// Two-node `kind_config` block
pub fn two_node_kind_config() -> GenericMap {
    canonical(json!({
        "node": [
            {"role": "control-plane", "labels": {"tier": "control"}},
            {"role": "worker"},
        ],
        "networking": [{"api_server_port": 6443}],
    }))
}

/// Resource config whose kubeconfig is written into `dir`
pub fn create_test_config(name: &str, dir: &Path) -> ClusterResourceConfig {
    ClusterResourceConfig {
        name: name.to_string(),
        node_image: None,
        wait_for_ready: true,
        kubeconfig_path: Some(dir.join(format!("{}-config", name))),
        runtime: String::new(),
        kind_config: Some(two_node_kind_config()),
    }
}
