//! Kind Cluster Configuration
//!
//! Turns the loosely-typed configuration tree handed over by a declarative
//! controller into a strongly-typed kind cluster specification.
//!
//! # Example
//!
//! ```
//! use kind_config::{map_cluster_spec, to_generic, DynamicValue, NodeRole};
//!
//! let value = DynamicValue::from(serde_json::json!({
//!     "node": [{ "role": "control-plane" }, { "role": "worker" }],
//!     "runtime_config": { "api_alpha": "false" },
//! }));
//!
//! let generic = to_generic(&value).unwrap_or_default();
//! let canonical = generic.as_object().cloned().unwrap_or_default();
//! let spec = map_cluster_spec(&canonical).unwrap();
//!
//! assert_eq!(spec.nodes[1].role, NodeRole::Worker);
//! assert_eq!(spec.runtime_config["api/alpha"], "false");
//! ```
//!
//! # Layers
//!
//! - **Dynamic values** (`value`): the tagged union accepted at the boundary and
//!   its total conversion into `serde_json::Value`
//! - **Accessors** (`accessors`): best-effort typed reads that degrade to zero values
//! - **Mapper** (`mapper`): canonical tree to `ClusterSpec`, enum canonicalization
//!   and defaulting
//! - **Containerd patches** (`containerd`): TOML validation and normalization

pub mod accessors;
pub mod containerd;
pub mod error;
pub mod mapper;
#[cfg(test)]
mod mapper_test;
pub mod spec;
pub mod value;

pub use accessors::*;
pub use containerd::{normalize_toml, ContainerdPatchError};
pub use error::MappingError;
pub use mapper::{map_cluster_spec, map_cluster_spec_with, ContainerdPatchPolicy, MapperOptions};
pub use spec::*;
pub use value::{list_to_vec, object_to_map, to_generic, DynamicValue, GenericMap, GenericValue};
