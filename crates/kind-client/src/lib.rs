//! kind Client
//!
//! Drives the `kind` CLI to create, list, inspect and delete local
//! Kubernetes clusters, and manages the kubeconfig entries those clusters
//! leave behind.
//!
//! # Example
//!
//! ```no_run
//! use kind_client::{CreateClusterRequest, KindClient, KindClientTrait, RuntimeProvider};
//! use kind_config::ClusterSpec;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KindClient::new("kind");
//!
//! let mut request = CreateClusterRequest::new("dev", ClusterSpec::default());
//! request.provider = "podman".parse::<RuntimeProvider>()?;
//! client.create_cluster(&request).await?;
//!
//! let ready = client.is_ready("dev", request.provider).await?;
//! println!("dev ready: {}", ready);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Engine operations**: list, create (config document on stdin), delete, export kubeconfig
//! - **Readiness**: node `Ready` conditions read through the cluster's own API server
//! - **Credential store**: locked read-modify-write of the shared kubeconfig
//! - **Mocks**: in-memory engine and store behind the `test-util` feature

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod kind_trait;
pub mod kubeconfig;
pub mod models;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KindClient;
pub use error::KindError;
pub use kind_trait::KindClientTrait;
pub use kubeconfig::{
    context_key, default_kubeconfig_path, read_kubeconfig, FileKubeconfigStore, KubeconfigExt,
    KubeconfigStoreTrait,
};
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::{kubeconfig_fixture, MockKindClient, MockKubeconfigStore, MockOperation};
