//! kind Cluster Controller
//!
//! Declarative lifecycle management for local kind clusters:
//! - apply: create a cluster from a resource file, or converge the recorded one
//! - refresh: detect clusters deleted outside the controller
//! - destroy: delete a cluster and every credential it left behind
//!
//! Configuration comes from `KIND_*` environment variables (see `config`).

mod backoff;
mod config;
mod controller;
#[cfg(test)]
mod controller_test;
mod error;
mod reconciler;
mod resource;
#[cfg(test)]
mod test_utils;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::ControllerConfig;
use controller::Controller;
use kind_client::{FileKubeconfigStore, KindClient};
use reconciler::Reconciler;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Manage the lifecycle of a kind cluster declared in a resource file
#[derive(Parser, Debug)]
#[command(name = "kind-cluster", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the declared cluster or converge the recorded one on it
    Apply {
        /// Resource file (YAML or JSON)
        #[arg(short = 'f', long = "file")]
        file: PathBuf,

        /// State file written after a successful apply
        #[arg(long, env = "KIND_CLUSTER_STATE", default_value = "kind-cluster.state.json")]
        state: PathBuf,
    },

    /// Check the recorded cluster still exists
    Refresh {
        /// State file to refresh
        #[arg(long, env = "KIND_CLUSTER_STATE", default_value = "kind-cluster.state.json")]
        state: PathBuf,
    },

    /// Delete the recorded cluster and its credentials
    Destroy {
        /// State file of the cluster to destroy
        #[arg(long, env = "KIND_CLUSTER_STATE", default_value = "kind-cluster.state.json")]
        state: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube talks TLS to the cluster API servers during readiness checks
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    let cli = Cli::parse();
    let config = ControllerConfig::from_env()?;

    info!("Starting kind cluster controller");
    info!("Configuration:");
    info!("  kind binary: {}", config.kind_binary.display());
    info!("  readiness timeout: {:?}", config.settings.readiness_timeout);

    let store = FileKubeconfigStore::resolve(config.kubeconfig_store.clone())
        .context("failed to locate the kubeconfig store")?;
    info!("  kubeconfig store: {}", kind_client::KubeconfigStoreTrait::path(&store).display());

    let reconciler = Reconciler::new(
        KindClient::new(config.kind_binary.clone()),
        store,
        config.settings.clone(),
        config.mapper_options,
    );
    let controller = Controller::new(reconciler);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Apply { file, state } => {
            let result = controller
                .apply(&file, &state, &cancel)
                .await
                .with_context(|| format!("apply of {} failed", file.display()))?;
            info!("Cluster {} is up, state written to {}", result.name, state.display());
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Refresh { state } => {
            match controller
                .refresh(&state)
                .await
                .context("refresh failed")?
            {
                Some(current) => println!("{}", serde_json::to_string_pretty(&current)?),
                None => info!("No cluster recorded in {}", state.display()),
            }
        }
        Commands::Destroy { state } => {
            controller.destroy(&state).await.context("destroy failed")?;
            info!("Destroyed cluster recorded in {}", state.display());
        }
    }

    Ok(())
}
