//! Controller configuration from environment variables.

use crate::error::ControllerError;
use crate::reconciler::ReconcilerSettings;
use kind_client::client::DEFAULT_KIND_BINARY;
use kind_config::{ContainerdPatchPolicy, MapperOptions};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Path or name of the kind binary
pub const ENV_KIND_BINARY: &str = "KIND_BINARY";
/// Shared kubeconfig the controller registers contexts in
pub const ENV_KUBECONFIG_STORE: &str = "KIND_KUBECONFIG_STORE";
/// Readiness wait bound in seconds
pub const ENV_READINESS_TIMEOUT: &str = "KIND_READINESS_TIMEOUT_SECS";
/// Readiness poll interval in seconds
pub const ENV_POLL_INTERVAL: &str = "KIND_POLL_INTERVAL_SECS";
/// Delete-and-verify attempts before giving up
pub const ENV_TEARDOWN_ATTEMPTS: &str = "KIND_TEARDOWN_ATTEMPTS";
/// Reject malformed containerd patches instead of passing them through
pub const ENV_STRICT_CONTAINERD_PATCHES: &str = "KIND_STRICT_CONTAINERD_PATCHES";

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub kind_binary: PathBuf,
    /// `None` resolves `$KUBECONFIG` or `~/.kube/config`
    pub kubeconfig_store: Option<PathBuf>,
    pub settings: ReconcilerSettings,
    pub mapper_options: MapperOptions,
}

impl ControllerConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] for malformed values.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] for malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let defaults = ReconcilerSettings::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let readiness_timeout = match get(ENV_READINESS_TIMEOUT) {
            Some(v) => Duration::from_secs(parse_positive(ENV_READINESS_TIMEOUT, &v)?),
            None => defaults.readiness_timeout,
        };
        let poll_interval = match get(ENV_POLL_INTERVAL) {
            Some(v) => Duration::from_secs(parse_positive(ENV_POLL_INTERVAL, &v)?),
            None => defaults.poll_interval,
        };
        let teardown_attempts = match get(ENV_TEARDOWN_ATTEMPTS) {
            Some(v) => u32::try_from(parse_positive(ENV_TEARDOWN_ATTEMPTS, &v)?).map_err(|_| {
                ControllerError::InvalidConfig(format!("{} is out of range: {}", ENV_TEARDOWN_ATTEMPTS, v))
            })?,
            None => defaults.teardown_attempts,
        };
        let strict = match get(ENV_STRICT_CONTAINERD_PATCHES) {
            Some(v) => parse_bool(ENV_STRICT_CONTAINERD_PATCHES, &v)?,
            None => false,
        };

        Ok(Self {
            kind_binary: get(ENV_KIND_BINARY)
                .map_or_else(|| PathBuf::from(DEFAULT_KIND_BINARY), PathBuf::from),
            kubeconfig_store: get(ENV_KUBECONFIG_STORE).map(PathBuf::from),
            settings: ReconcilerSettings {
                readiness_timeout,
                poll_interval,
                teardown_attempts,
                ..defaults
            },
            mapper_options: MapperOptions {
                containerd_patch_policy: if strict {
                    ContainerdPatchPolicy::Reject
                } else {
                    ContainerdPatchPolicy::PassThrough
                },
            },
        })
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64, ControllerError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ControllerError::InvalidConfig(format!(
            "{} must be a positive integer, got '{}'",
            key, value
        ))),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ControllerError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ControllerError::InvalidConfig(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}
