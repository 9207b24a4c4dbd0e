//! Containerd config patch normalization.
//!
//! Patches are TOML fragments merged into each node's containerd
//! configuration. Valid patches are re-serialized so that formatting-only
//! differences (key order, quoting, whitespace) never show up as drift.

use thiserror::Error;

/// A containerd patch that is not valid TOML.
///
/// Carries the original text unchanged so the caller can decide between
/// rejecting the apply and passing the patch through as-is.
#[derive(Debug, Error)]
#[error("containerd config patch is not valid TOML: {source}")]
pub struct ContainerdPatchError {
    /// The patch exactly as supplied
    pub original: String,
    /// Parser diagnostic
    #[source]
    pub source: toml::de::Error,
}

/// Validates a containerd patch and normalizes its formatting.
///
/// An empty patch stays empty.
///
/// # Errors
///
/// Returns [`ContainerdPatchError`] holding the unmodified input when it does
/// not parse as TOML.
pub fn normalize_toml(raw: &str) -> Result<String, ContainerdPatchError> {
    if raw.is_empty() {
        return Ok(String::new());
    }

    let document: toml::Table = raw.parse().map_err(|source| ContainerdPatchError {
        original: raw.to_string(),
        source,
    })?;

    // Serializing a parsed table cannot fail: every value came from TOML.
    Ok(toml::to_string(&document).unwrap_or_else(|_| raw.to_string()))
}
