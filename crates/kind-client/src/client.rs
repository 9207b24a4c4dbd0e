//! kind CLI client
//!
//! Drives the `kind` binary through `tokio::process`. The cluster
//! configuration document is rendered from `ClusterSpec` and fed on stdin,
//! and the runtime provider travels in `KIND_EXPERIMENTAL_PROVIDER`.

use crate::error::KindError;
use crate::kind_trait::KindClientTrait;
use crate::models::{CreateClusterRequest, RuntimeProvider, PROVIDER_ENV_VAR};
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Default binary name, resolved through `PATH`
pub const DEFAULT_KIND_BINARY: &str = "kind";

const CONDITION_READY: &str = "Ready";
const STATUS_TRUE: &str = "True";

// Printed by kind when there is nothing to list or delete
const NO_CLUSTERS_FOUND: &str = "No kind clusters found.";
const BENIGN_DELETE_MESSAGES: &[&str] = &["unknown cluster", "no nodes found"];

/// kind CLI client
#[derive(Debug, Clone)]
pub struct KindClient {
    binary: PathBuf,
}

impl Default for KindClient {
    fn default() -> Self {
        Self::new(DEFAULT_KIND_BINARY)
    }
}

impl KindClient {
    /// Create a new kind client
    ///
    /// # Arguments
    /// * `binary` - path to the kind binary, or a bare name looked up in `PATH`
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Path of the binary this client runs
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, provider: RuntimeProvider, args: &[&str]) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(value) = provider.env_value() {
            command.env(PROVIDER_ENV_VAR, value);
        }
        command
    }

    async fn run(
        &self,
        provider: RuntimeProvider,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<Output, KindError> {
        let shown = format!("kind {}", args.join(" "));
        debug!("Running '{}' (provider: '{}')", shown, provider);

        let mut command = self.command(provider, args);
        if stdin.is_some() {
            command.stdin(Stdio::piped());
        }
        let mut child = command.spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
            // Dropping the handle closes stdin so kind stops reading
            drop(pipe);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(KindError::CommandFailed {
                command: shown,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Build an API client for the cluster from `kind get kubeconfig`
    async fn cluster_client(&self, name: &str, provider: RuntimeProvider) -> Result<Client, KindError> {
        let output = self
            .run(provider, &["get", "kubeconfig", "--name", name], None)
            .await?;
        let kubeconfig = Kubeconfig::from_yaml(&String::from_utf8_lossy(&output.stdout))?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        Ok(Client::try_from(config)?)
    }
}

/// Parses `kind get clusters` output
fn parse_cluster_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != NO_CLUSTERS_FOUND)
        .map(str::to_string)
        .collect()
}

fn node_is_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == CONDITION_READY && c.status == STATUS_TRUE)
        })
}

#[async_trait::async_trait]
impl KindClientTrait for KindClient {
    async fn list_clusters(&self, provider: RuntimeProvider) -> Result<Vec<String>, KindError> {
        let output = self.run(provider, &["get", "clusters"], None).await?;
        Ok(parse_cluster_list(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn create_cluster(&self, request: &CreateClusterRequest) -> Result<(), KindError> {
        let document = request.config.to_yaml()?;
        let kubeconfig = request
            .kubeconfig_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        let mut args = vec!["create", "cluster", "--name", request.name.as_str(), "--config", "-"];
        if let Some(image) = request.node_image.as_deref() {
            args.extend(["--image", image]);
        }
        if let Some(path) = kubeconfig.as_deref() {
            args.extend(["--kubeconfig", path]);
        }

        info!(
            "Creating kind cluster {} ({} node(s), provider: '{}')",
            request.name,
            request.config.nodes.len(),
            request.provider
        );
        self.run(request.provider, &args, Some(&document)).await?;
        info!("Created kind cluster {}", request.name);
        Ok(())
    }

    async fn delete_cluster(
        &self,
        name: &str,
        provider: RuntimeProvider,
        kubeconfig_path: Option<&Path>,
    ) -> Result<(), KindError> {
        let kubeconfig = kubeconfig_path.map(|p| p.to_string_lossy().into_owned());
        let mut args = vec!["delete", "cluster", "--name", name];
        if let Some(path) = kubeconfig.as_deref() {
            args.extend(["--kubeconfig", path]);
        }

        info!("Deleting kind cluster {}", name);
        match self.run(provider, &args, None).await {
            Ok(_) => Ok(()),
            Err(KindError::CommandFailed { stderr, .. })
                if BENIGN_DELETE_MESSAGES
                    .iter()
                    .any(|m| stderr.to_lowercase().contains(m)) =>
            {
                debug!("Cluster {} was already gone: {}", name, stderr);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn export_kubeconfig(
        &self,
        name: &str,
        path: &Path,
        provider: RuntimeProvider,
    ) -> Result<(), KindError> {
        let target = path.to_string_lossy().into_owned();
        self.run(
            provider,
            &["export", "kubeconfig", "--name", name, "--kubeconfig", target.as_str()],
            None,
        )
        .await?;
        debug!("Exported kubeconfig for {} to {}", name, target);
        Ok(())
    }

    async fn is_ready(&self, name: &str, provider: RuntimeProvider) -> Result<bool, KindError> {
        let client = match self.cluster_client(name, provider).await {
            Ok(client) => client,
            // No kubeconfig yet, or the API endpoint is not reachable: not ready
            Err(KindError::CommandFailed { stderr, .. }) => {
                debug!("Cluster {} has no kubeconfig yet: {}", name, stderr);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let nodes: Api<Node> = Api::all(client);
        match nodes.list(&ListParams::default()).await {
            Ok(list) => {
                let ready = list.items.iter().filter(|n| node_is_ready(n)).count();
                debug!("Cluster {}: {}/{} node(s) ready", name, ready, list.items.len());
                Ok(!list.items.is_empty() && ready == list.items.len())
            }
            Err(e) => {
                debug!("Cluster {} API not answering yet: {}", name, e);
                Ok(false)
            }
        }
    }
}
