// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stream Cluster Connection Management
//!
//! Owns the single shared [`StreamClient`] handle. A handle is published
//! only after a successful ping, and a handle that fails its ping is closed
//! before the error is returned.
//!
//! # Locking
//!
//! State transitions take the write lock. The health check pings outside
//! any lock and takes the write lock afterwards to record the result, so
//! the cached flag may briefly lag the value the check returned.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::client::{resolve_address, RedisClientFactory, StreamClient, StreamClientFactory};
use crate::config::StreamingConfig;
use crate::errors::{StreamingError, StreamingResult};

/// Deadline of a single health check
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of the shared stream client
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// Connect through a seed node; a no-op when already connected
    async fn initialize_cluster(&self, seed_address: &str, credential: &str)
        -> StreamingResult<()>;

    /// Whether a client handle is present and marked connected
    async fn is_connected(&self) -> bool;

    /// Current client handle, if any
    async fn get_client(&self) -> Option<Arc<dyn StreamClient>>;

    /// Ping the cluster now and report the fresh result
    async fn is_cluster_healthy(&self) -> bool;

    /// Close the client and clear all state; safe to repeat
    async fn close(&self) -> StreamingResult<()>;
}

#[derive(Default)]
struct ConnectionState {
    client: Option<Arc<dyn StreamClient>>,
    connected: bool,
    cluster_healthy: bool,
}

/// [`ConnectionManager`] over a [`StreamClientFactory`]
pub struct ClusterConnectionManager {
    config: Arc<StreamingConfig>,
    factory: Arc<dyn StreamClientFactory>,
    state: RwLock<ConnectionState>,
}

impl ClusterConnectionManager {
    /// Create a manager building clients through `factory`
    pub fn new(config: Arc<StreamingConfig>, factory: Arc<dyn StreamClientFactory>) -> Self {
        Self {
            config,
            factory,
            state: RwLock::new(ConnectionState::default()),
        }
    }

    /// Create a manager connecting to Valkey/Redis
    pub fn with_redis(config: Arc<StreamingConfig>) -> Self {
        Self::new(config, Arc::new(RedisClientFactory))
    }

    /// Last recorded health, without probing
    pub async fn cached_health(&self) -> bool {
        self.state.read().await.cluster_healthy
    }

    async fn discover_topology(&self, client: &dyn StreamClient) {
        match client.topology().await {
            Ok(nodes) => {
                let node_count = nodes.lines().filter(|line| !line.trim().is_empty()).count();
                info!(node_count, "Discovered stream cluster topology");
                debug!(topology = %nodes, "Stream cluster nodes");
            }
            Err(e) => {
                warn!(error = %e, "Failed to discover cluster topology, continuing with seed node");
            }
        }
    }
}

#[async_trait]
impl ConnectionManager for ClusterConnectionManager {
    #[instrument(skip(self, credential))]
    async fn initialize_cluster(
        &self,
        seed_address: &str,
        credential: &str,
    ) -> StreamingResult<()> {
        let mut state = self.state.write().await;
        if state.connected && state.client.is_some() {
            debug!("Stream cluster connection already initialized");
            return Ok(());
        }

        let address = resolve_address(seed_address, self.config.port);
        info!(address = %address, "Initializing stream cluster connection");

        let client = self
            .factory
            .create(&address, credential, &self.config)
            .await?;

        if let Err(e) = client.ping().await {
            if let Err(close_err) = client.close().await {
                warn!(error = %close_err, "Failed to close client after ping failure");
            }
            return Err(StreamingError::Connection(format!(
                "failed to ping stream cluster at {}: {}",
                address, e
            )));
        }

        if self.config.cluster_enabled {
            self.discover_topology(client.as_ref()).await;
        }

        state.client = Some(client);
        state.connected = true;
        state.cluster_healthy = true;

        info!(address = %address, "Stream cluster connection established");
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        let state = self.state.read().await;
        state.connected && state.client.is_some()
    }

    async fn get_client(&self) -> Option<Arc<dyn StreamClient>> {
        self.state.read().await.client.clone()
    }

    async fn is_cluster_healthy(&self) -> bool {
        let Some(client) = self.get_client().await else {
            return false;
        };

        let healthy = match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, client.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Stream cluster health check failed");
                false
            }
            Err(_) => {
                warn!(timeout = ?HEALTH_CHECK_TIMEOUT, "Stream cluster health check timed out");
                false
            }
        };

        self.state.write().await.cluster_healthy = healthy;
        healthy
    }

    async fn close(&self) -> StreamingResult<()> {
        let mut state = self.state.write().await;
        let client = state.client.take();
        state.connected = false;
        state.cluster_healthy = false;

        match client {
            Some(client) => {
                info!("Closing stream cluster connection");
                client.close().await
            }
            None => Ok(()),
        }
    }
}
