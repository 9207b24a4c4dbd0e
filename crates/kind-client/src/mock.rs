//! Mock kind client and kubeconfig store for unit testing
//!
//! `MockKindClient` keeps the cluster list in memory and can be configured to
//! fail, to become ready only after a number of polls, or to leave residue
//! behind on delete. `MockKubeconfigStore` keeps the kubeconfig in memory.

use crate::error::KindError;
use crate::kind_trait::KindClientTrait;
use crate::kubeconfig::{context_key, KubeconfigStoreTrait};
use crate::models::{CreateClusterRequest, RuntimeProvider};
use kube::config::Kubeconfig;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// kubeconfig document kind would export for `name`
pub fn kubeconfig_fixture(name: &str) -> String {
    let key = context_key(name);
    format!(
        "apiVersion: v1
kind: Config
clusters:
- name: {key}
  cluster:
    server: https://127.0.0.1:6443
users:
- name: {key}
  user:
    token: mock-token
contexts:
- name: {key}
  context:
    cluster: {key}
    user: {key}
current-context: {key}
"
    )
}

/// Engine operations a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// `list_clusters`
    List,
    /// `create_cluster`
    Create,
    /// `delete_cluster`
    Delete,
    /// `export_kubeconfig`
    Export,
    /// `is_ready`
    Ready,
}

/// Mock kind client for testing
#[derive(Clone)]
pub struct MockKindClient {
    clusters: Arc<Mutex<BTreeSet<String>>>,
    create_requests: Arc<Mutex<Vec<CreateClusterRequest>>>,
    delete_calls: Arc<Mutex<Vec<String>>>,
    exports: Arc<Mutex<Vec<(String, PathBuf)>>>,
    polls: Arc<Mutex<HashMap<String, u32>>>,
    // None: never ready
    ready_after: Arc<Mutex<Option<u32>>>,
    // How long each readiness poll takes to answer
    ready_delay: Arc<Mutex<Duration>>,
    // Deletes that report success but leave the cluster listed
    sticky_deletes: Arc<Mutex<u32>>,
    failures: Arc<Mutex<HashMap<MockOperation, String>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockKindClient {
    /// Create a new mock client whose clusters are ready on the first poll
    pub fn new() -> Self {
        Self {
            clusters: Arc::new(Mutex::new(BTreeSet::new())),
            create_requests: Arc::new(Mutex::new(Vec::new())),
            delete_calls: Arc::new(Mutex::new(Vec::new())),
            exports: Arc::new(Mutex::new(Vec::new())),
            polls: Arc::new(Mutex::new(HashMap::new())),
            ready_after: Arc::new(Mutex::new(Some(0))),
            ready_delay: Arc::new(Mutex::new(Duration::ZERO)),
            sticky_deletes: Arc::new(Mutex::new(0)),
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Add an existing cluster (for test setup)
    pub fn add_cluster(&self, name: &str) {
        self.clusters.lock().unwrap().insert(name.to_string());
    }

    /// Drop a cluster behind the reconciler's back (simulates out-of-band deletion)
    pub fn remove_cluster(&self, name: &str) {
        self.clusters.lock().unwrap().remove(name);
    }

    /// Whether the mock currently hosts `name`
    pub fn has_cluster(&self, name: &str) -> bool {
        self.clusters.lock().unwrap().contains(name)
    }

    /// Report ready only after `polls` unsuccessful readiness polls
    pub fn set_ready_after(&self, polls: u32) {
        *self.ready_after.lock().unwrap() = Some(polls);
    }

    /// Never report ready
    pub fn set_never_ready(&self) {
        *self.ready_after.lock().unwrap() = None;
    }

    /// Make every readiness poll take `delay` before answering
    pub fn set_ready_delay(&self, delay: Duration) {
        *self.ready_delay.lock().unwrap() = delay;
    }

    /// Make the next `count` deletes succeed without removing the cluster
    pub fn set_sticky_deletes(&self, count: u32) {
        *self.sticky_deletes.lock().unwrap() = count;
    }

    /// Make `operation` fail with a command error until cleared
    pub fn fail_on(&self, operation: MockOperation, message: impl Into<String>) {
        self.failures.lock().unwrap().insert(operation, message.into());
    }

    /// Clear an injected failure
    pub fn clear_failure(&self, operation: MockOperation) {
        self.failures.lock().unwrap().remove(&operation);
    }

    /// Requests passed to `create_cluster`, in call order
    pub fn create_requests(&self) -> Vec<CreateClusterRequest> {
        self.create_requests.lock().unwrap().clone()
    }

    /// Number of `create_cluster` calls
    pub fn create_calls(&self) -> usize {
        self.create_requests.lock().unwrap().len()
    }

    /// Number of `delete_cluster` calls
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.lock().unwrap().len()
    }

    /// `(cluster, path)` pairs passed to `export_kubeconfig`
    pub fn exports(&self) -> Vec<(String, PathBuf)> {
        self.exports.lock().unwrap().clone()
    }

    /// Readiness polls seen for `name`
    pub fn polls(&self, name: &str) -> u32 {
        self.polls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// Number of engine calls of any kind
    pub fn total_calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn check_failure(&self, operation: MockOperation) -> Result<(), KindError> {
        *self.calls.lock().unwrap() += 1;
        match self.failures.lock().unwrap().get(&operation) {
            Some(message) => Err(KindError::CommandFailed {
                command: format!("kind {:?}", operation).to_lowercase(),
                stderr: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl KindClientTrait for MockKindClient {
    async fn list_clusters(&self, _provider: RuntimeProvider) -> Result<Vec<String>, KindError> {
        self.check_failure(MockOperation::List)?;
        Ok(self.clusters.lock().unwrap().iter().cloned().collect())
    }

    async fn create_cluster(&self, request: &CreateClusterRequest) -> Result<(), KindError> {
        self.create_requests.lock().unwrap().push(request.clone());
        self.check_failure(MockOperation::Create)?;

        let mut clusters = self.clusters.lock().unwrap();
        if !clusters.insert(request.name.clone()) {
            return Err(KindError::CommandFailed {
                command: "kind create cluster".to_string(),
                stderr: format!(
                    "node(s) already exist for a cluster with the name \"{}\"",
                    request.name
                ),
            });
        }
        self.polls.lock().unwrap().remove(&request.name);
        Ok(())
    }

    async fn delete_cluster(
        &self,
        name: &str,
        _provider: RuntimeProvider,
        _kubeconfig_path: Option<&Path>,
    ) -> Result<(), KindError> {
        self.delete_calls.lock().unwrap().push(name.to_string());
        self.check_failure(MockOperation::Delete)?;

        let mut sticky = self.sticky_deletes.lock().unwrap();
        if *sticky > 0 {
            *sticky -= 1;
            return Ok(());
        }
        self.clusters.lock().unwrap().remove(name);
        Ok(())
    }

    async fn export_kubeconfig(
        &self,
        name: &str,
        path: &Path,
        _provider: RuntimeProvider,
    ) -> Result<(), KindError> {
        self.check_failure(MockOperation::Export)?;
        if !self.has_cluster(name) {
            return Err(KindError::CommandFailed {
                command: "kind export kubeconfig".to_string(),
                stderr: format!("could not locate any control plane nodes for cluster named '{}'", name),
            });
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, kubeconfig_fixture(name))?;
        self.exports
            .lock()
            .unwrap()
            .push((name.to_string(), path.to_path_buf()));
        Ok(())
    }

    async fn is_ready(&self, name: &str, _provider: RuntimeProvider) -> Result<bool, KindError> {
        self.check_failure(MockOperation::Ready)?;
        let delay = *self.ready_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !self.has_cluster(name) {
            return Ok(false);
        }

        let mut polls = self.polls.lock().unwrap();
        let seen = polls.entry(name.to_string()).or_insert(0);
        let ready = match *self.ready_after.lock().unwrap() {
            Some(after) => *seen >= after,
            None => false,
        };
        *seen += 1;
        Ok(ready)
    }
}

/// Mock kubeconfig store for testing
#[derive(Clone)]
pub struct MockKubeconfigStore {
    path: PathBuf,
    config: Arc<Mutex<Kubeconfig>>,
    saves: Arc<Mutex<usize>>,
    // Entries that survive removal (simulates a store another writer keeps re-adding)
    pinned: Arc<Mutex<Option<Kubeconfig>>>,
}

impl MockKubeconfigStore {
    /// Create an empty store reporting `path` as its location
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(Mutex::new(Kubeconfig::default())),
            saves: Arc::new(Mutex::new(0)),
            pinned: Arc::new(Mutex::new(None)),
        }
    }

    /// Snapshot of the stored config
    pub fn config(&self) -> Kubeconfig {
        self.config.lock().unwrap().clone()
    }

    /// Number of writes
    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    /// Keep `config`'s entries present after every write
    pub fn pin_entries(&self, config: Kubeconfig) {
        *self.pinned.lock().unwrap() = Some(config);
    }

    fn store(&self, mut config: Kubeconfig) -> Kubeconfig {
        if let Some(pinned) = self.pinned.lock().unwrap().as_ref() {
            for context in &pinned.contexts {
                if !config.contexts.iter().any(|c| c.name == context.name) {
                    config.contexts.push(context.clone());
                }
            }
        }
        *self.saves.lock().unwrap() += 1;
        *self.config.lock().unwrap() = config.clone();
        config
    }
}

impl KubeconfigStoreTrait for MockKubeconfigStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Kubeconfig, KindError> {
        Ok(self.config())
    }

    fn save(&self, config: &Kubeconfig) -> Result<(), KindError> {
        self.store(config.clone());
        Ok(())
    }

    fn modify(&self, f: &mut dyn FnMut(&mut Kubeconfig)) -> Result<Kubeconfig, KindError> {
        let mut config = self.config();
        f(&mut config);
        Ok(self.store(config))
    }
}

impl Default for MockKindClient {
    fn default() -> Self {
        Self::new()
    }
}
