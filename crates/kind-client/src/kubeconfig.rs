//! Kubeconfig credential store
//!
//! The shared kubeconfig is process-wide mutable state: every cluster this
//! process reconciles keeps its context, user and cluster entries in the same
//! file. All read-modify-write cycles go through [`KubeconfigStoreTrait::modify`],
//! which holds an in-process mutex scoped to the file path plus an exclusive
//! advisory lock on a `<path>.flock` sidecar for other processes.
//!
//! kind itself guards the file with a short-lived `<path>.lock` that it
//! creates exclusively and removes; the sidecar name must not collide with it.
//!
//! Only this cluster's entries (keyed `kind-<name>`) are ever touched.

use crate::error::KindError;
use fs2::FileExt;
use kube::config::Kubeconfig;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::debug;

/// Prefix kind puts in front of every entry it writes
pub const CONTEXT_PREFIX: &str = "kind-";

/// Environment variable holding the kubeconfig search path
pub const KUBECONFIG_ENV_VAR: &str = "KUBECONFIG";

/// Context, user and cluster entry name for a cluster
#[must_use]
pub fn context_key(cluster_name: &str) -> String {
    format!("{}{}", CONTEXT_PREFIX, cluster_name)
}

/// Trait for credential-store access
///
/// Implementations must serialize `modify` against every other access to the
/// same store so concurrent reconciles never lose each other's updates.
pub trait KubeconfigStoreTrait: Send + Sync {
    /// Location of the store
    fn path(&self) -> &Path;

    /// Read the whole config. A missing store is an empty config.
    fn load(&self) -> Result<Kubeconfig, KindError>;

    /// Replace the whole config
    fn save(&self, config: &Kubeconfig) -> Result<(), KindError>;

    /// Load, mutate and save under the store's lock; returns the saved config
    fn modify(&self, f: &mut dyn FnMut(&mut Kubeconfig)) -> Result<Kubeconfig, KindError>;
}

/// Cluster-scoped edits on a kubeconfig
pub trait KubeconfigExt {
    /// True when a context named `key` exists
    fn has_context(&self, key: &str) -> bool;

    /// True when any of the context, user or cluster entries named `key` exists
    fn has_any_entry(&self, key: &str) -> bool;

    /// Remove the context, user and cluster entries named `key`.
    ///
    /// Clears `current-context` when it pointed at `key`. Returns whether
    /// anything was removed; missing entries are not an error.
    fn remove_cluster_entries(&mut self, key: &str) -> bool;

    /// Replace the entries named `key` with the ones from `exported` and make
    /// `key` the current context.
    ///
    /// Returns false (and changes nothing) when `exported` has no context
    /// named `key`.
    fn merge_entries_from(&mut self, exported: &Kubeconfig, key: &str) -> bool;
}

impl KubeconfigExt for Kubeconfig {
    fn has_context(&self, key: &str) -> bool {
        self.contexts.iter().any(|c| c.name == key)
    }

    fn has_any_entry(&self, key: &str) -> bool {
        self.has_context(key)
            || self.auth_infos.iter().any(|a| a.name == key)
            || self.clusters.iter().any(|c| c.name == key)
    }

    fn remove_cluster_entries(&mut self, key: &str) -> bool {
        let before = self.contexts.len() + self.auth_infos.len() + self.clusters.len();
        self.contexts.retain(|c| c.name != key);
        self.auth_infos.retain(|a| a.name != key);
        self.clusters.retain(|c| c.name != key);
        if self.current_context.as_deref() == Some(key) {
            self.current_context = None;
        }
        before != self.contexts.len() + self.auth_infos.len() + self.clusters.len()
    }

    fn merge_entries_from(&mut self, exported: &Kubeconfig, key: &str) -> bool {
        if !exported.has_context(key) {
            return false;
        }

        self.remove_cluster_entries(key);
        self.contexts
            .extend(exported.contexts.iter().filter(|c| c.name == key).cloned());
        self.auth_infos
            .extend(exported.auth_infos.iter().filter(|a| a.name == key).cloned());
        self.clusters
            .extend(exported.clusters.iter().filter(|c| c.name == key).cloned());
        self.current_context = Some(key.to_string());

        if self.kind.is_none() {
            self.kind = Some("Config".to_string());
        }
        if self.api_version.is_none() {
            self.api_version = Some("v1".to_string());
        }
        true
    }
}

/// Parse a kubeconfig file. Missing or blank files are an empty config.
pub fn read_kubeconfig(path: &Path) -> Result<Kubeconfig, KindError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Kubeconfig::default()),
        Err(e) => return Err(e.into()),
    };
    if contents.trim().is_empty() {
        return Ok(Kubeconfig::default());
    }
    Ok(Kubeconfig::from_yaml(&contents)?)
}

/// Kubeconfig store backed by a file
#[derive(Debug, Clone)]
pub struct FileKubeconfigStore {
    path: PathBuf,
    guard: Arc<Mutex<()>>,
}

impl FileKubeconfigStore {
    /// Store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let guard = path_guard(&path);
        Self { path, guard }
    }

    /// Store at `explicit`, else the first `$KUBECONFIG` entry, else `~/.kube/config`
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self, KindError> {
        let path = match explicit {
            Some(path) => path,
            None => default_kubeconfig_path()?,
        };
        debug!("Using kubeconfig store {}", path.display());
        Ok(Self::new(path))
    }

    fn with_lock<T>(
        &self,
        f: impl FnOnce() -> Result<T, KindError>,
    ) -> Result<T, KindError> {
        let _in_process = self.guard.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(sidecar(&self.path, "flock"))?;
        FileExt::lock_exclusive(&lock_file)?;

        let result = f();
        // Closing the handle releases the advisory lock as well
        drop(lock_file);
        result
    }

    fn write(&self, config: &Kubeconfig) -> Result<(), KindError> {
        let yaml = serde_yaml::to_string(config)?;
        let staging = sidecar(&self.path, "tmp");
        {
            let mut file = File::create(&staging)?;
            restrict_permissions(&file)?;
            file.write_all(yaml.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl KubeconfigStoreTrait for FileKubeconfigStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Kubeconfig, KindError> {
        self.with_lock(|| read_kubeconfig(&self.path))
    }

    fn save(&self, config: &Kubeconfig) -> Result<(), KindError> {
        self.with_lock(|| self.write(config))
    }

    fn modify(&self, f: &mut dyn FnMut(&mut Kubeconfig)) -> Result<Kubeconfig, KindError> {
        self.with_lock(|| {
            let mut config = read_kubeconfig(&self.path)?;
            f(&mut config);
            self.write(&config)?;
            Ok(config)
        })
    }
}

/// `$KUBECONFIG` (first entry) or `~/.kube/config`
pub fn default_kubeconfig_path() -> Result<PathBuf, KindError> {
    if let Some(paths) = std::env::var_os(KUBECONFIG_ENV_VAR) {
        if let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
            return Ok(first);
        }
    }
    home::home_dir()
        .map(|home| home.join(".kube").join("config"))
        .ok_or_else(|| KindError::Kubeconfig("cannot determine home directory".to_string()))
}

// One mutex per store path, shared by every store instance in the process
fn path_guard(path: &Path) -> Arc<Mutex<()>> {
    static GUARDS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut guards = GUARDS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    guards.entry(key).or_default().clone()
}

fn sidecar(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File) -> std::io::Result<()> {
    Ok(())
}
