// Copyright (c) 2025 - Cowboy AI, Inc.
//! Valkey/Redis stream client
//!
//! Cluster mode uses the async cluster client, which discovers the full
//! topology from the seed node. Standalone mode uses a multiplexed
//! connection. Both connection kinds are cheap to clone, so each command
//! runs on its own clone and the shared handle is only locked briefly.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use redis::{AsyncConnectionConfig, Cmd, FromRedisValue, RedisResult};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::{validate_append, StreamClient, StreamClientFactory, StreamFields};
use crate::config::StreamingConfig;
use crate::errors::{StreamingError, StreamingResult};

#[derive(Clone)]
enum RedisConnection {
    Cluster(ClusterConnection),
    Standalone(MultiplexedConnection),
}

/// [`StreamClient`] backed by a Valkey/Redis deployment
pub struct RedisStreamClient {
    connection: Mutex<Option<RedisConnection>>,
    cluster: bool,
}

impl RedisStreamClient {
    /// Connect to `address` (`host:port`) with the given credential
    pub async fn connect(
        address: &str,
        credential: &str,
        config: &StreamingConfig,
    ) -> StreamingResult<Self> {
        let connection = if config.cluster_enabled {
            let client = ClusterClientBuilder::new(vec![format!("redis://{}", address)])
                .password(credential.to_string())
                .connection_timeout(config.connection_timeout)
                .response_timeout(config.request_timeout)
                .retries(config.retry_attempts)
                .build()
                .map_err(|e| {
                    StreamingError::Connection(format!("invalid cluster client settings: {}", e))
                })?;
            let conn = client.get_async_connection().await.map_err(|e| {
                StreamingError::Connection(format!("failed to connect to {}: {}", address, e))
            })?;
            RedisConnection::Cluster(conn)
        } else {
            let url = format!("redis://:{}@{}", urlencoding::encode(credential), address);
            let client = redis::Client::open(url).map_err(|e| {
                StreamingError::Connection(format!("invalid address {}: {}", address, e))
            })?;
            let settings = AsyncConnectionConfig::new()
                .set_connection_timeout(config.connection_timeout)
                .set_response_timeout(config.request_timeout);
            let conn = client
                .get_multiplexed_async_connection_with_config(&settings)
                .await
                .map_err(|e| {
                    StreamingError::Connection(format!("failed to connect to {}: {}", address, e))
                })?;
            RedisConnection::Standalone(conn)
        };

        info!(address = %address, cluster = config.cluster_enabled, "Created stream client");

        Ok(Self {
            connection: Mutex::new(Some(connection)),
            cluster: config.cluster_enabled,
        })
    }

    fn connection(&self) -> StreamingResult<RedisConnection> {
        self.connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| StreamingError::StreamClient("client is closed".to_string()))
    }

    async fn query<T: FromRedisValue + Send>(&self, cmd: &Cmd) -> StreamingResult<T> {
        let result: RedisResult<T> = match self.connection()? {
            RedisConnection::Cluster(mut conn) => cmd.query_async(&mut conn).await,
            RedisConnection::Standalone(mut conn) => cmd.query_async(&mut conn).await,
        };
        result.map_err(StreamingError::from)
    }
}

#[async_trait]
impl StreamClient for RedisStreamClient {
    async fn append(&self, stream: &str, fields: &StreamFields) -> StreamingResult<String> {
        validate_append(stream, fields)?;

        let mut cmd = redis::cmd("XADD");
        cmd.arg(stream).arg("*");
        for (field, value) in fields {
            cmd.arg(field).arg(value.to_string());
        }

        let entry_id: String = self.query(&cmd).await?;
        debug!(stream = %stream, entry_id = %entry_id, "Appended stream entry");
        Ok(entry_id)
    }

    async fn ping(&self) -> StreamingResult<()> {
        let _pong: String = self.query(&redis::cmd("PING")).await?;
        Ok(())
    }

    async fn topology(&self) -> StreamingResult<String> {
        if !self.cluster {
            return Err(StreamingError::StreamClient(
                "cluster topology is unavailable in standalone mode".to_string(),
            ));
        }
        let mut cmd = redis::cmd("CLUSTER");
        cmd.arg("NODES");
        self.query(&cmd).await
    }

    async fn close(&self) -> StreamingResult<()> {
        // Connections close when the last clone is dropped
        self.connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        Ok(())
    }
}

/// Factory producing [`RedisStreamClient`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisClientFactory;

#[async_trait]
impl StreamClientFactory for RedisClientFactory {
    async fn create(
        &self,
        address: &str,
        credential: &str,
        config: &StreamingConfig,
    ) -> StreamingResult<Arc<dyn StreamClient>> {
        let client = RedisStreamClient::connect(address, credential, config).await?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_standalone_connect_failure_is_connection_error() {
        let config = StreamingConfig::new("kibaship").with_cluster_enabled(false);

        let err = match RedisStreamClient::connect("127.0.0.1:1", "pw", &config).await {
            Ok(_) => panic!("nothing should listen on port 1"),
            Err(e) => e,
        };

        assert!(matches!(err, StreamingError::Connection(_)));
        assert!(err.to_string().contains("127.0.0.1:1"));
    }
}
