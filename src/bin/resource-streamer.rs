// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Streamer Service
//!
//! Brings up the stream cluster connection and holds it until shutdown:
//! - Wait for the Valkey cluster resource → read credential → connect
//!
//! Run with: cargo run --bin resource-streamer
//!
//! Prerequisites:
//! 1. Kubernetes credentials (in-cluster or kubeconfig)
//! 2. STREAMING_NAMESPACE set to the namespace of the Valkey cluster

use anyhow::{Context, Result};
use cim_resource_streams::{
    resources::KubeResourceReader, ClusterConnectionManager, ClusterReadyGate,
    ClusterSecretProvider, StartupSequenceController, StreamingConfig,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting resource streamer");

    let config = Arc::new(StreamingConfig::from_env().context("Invalid streaming configuration")?);
    info!(
        namespace = %config.namespace,
        service = %config.service_name,
        cluster = config.cluster_enabled,
        "Loaded configuration"
    );

    let reader = Arc::new(
        KubeResourceReader::try_default()
            .await
            .context("Failed to create Kubernetes client")?,
    );

    let controller = StartupSequenceController::new(
        Arc::new(ClusterReadyGate::new(reader.clone(), &config)),
        Arc::new(ClusterSecretProvider::new(reader, &config)),
        Arc::new(ClusterConnectionManager::with_redis(config.clone())),
        config.clone(),
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    match controller.initialize(&cancel).await {
        Ok(()) => {}
        Err(e) if cancel.is_cancelled() => {
            warn!(error = %e, "Interrupted during startup");
            return Ok(());
        }
        Err(e) => return Err(e).context("Streaming startup failed"),
    }

    info!("Streaming ready, press Ctrl+C to stop");
    cancel.cancelled().await;

    info!("Shutting down");
    if let Err(e) = controller.shutdown().await {
        error!(error = %e, "Error closing stream connection");
    }

    info!("Resource streamer stopped");
    Ok(())
}
