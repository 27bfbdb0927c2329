// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cluster Readiness Gate
//!
//! Blocks startup until the custom resource describing the stream cluster
//! reports `status.ready == true`, or a bounded wait elapses.
//!
//! # Algorithm
//!
//! ```text
//! check now ──ready──► Ok
//!     │
//!  not ready
//!     ▼
//! every interval: check ──ready──► Ok
//!     │                 racing
//!     ├── max wait elapsed ──► ReadinessTimeout
//!     └── caller cancelled ──► Cancelled
//! ```
//!
//! A failed check is never an error: a missing resource, an API failure or
//! a resource without `status.ready` all count as "not ready yet".

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::StreamingConfig;
use crate::errors::{StreamingError, StreamingResult};
use crate::resources::{ObjectKey, ResourceKind, ResourceReader};

/// Waits for the stream cluster to become ready
#[async_trait]
pub trait ReadyGate: Send + Sync {
    /// Block until ready, the gate's maximum wait elapses, or `cancel` fires
    async fn wait_for_ready(&self, cancel: &CancellationToken) -> StreamingResult<()>;
}

/// Polling [`ReadyGate`] over a cluster custom resource
pub struct ClusterReadyGate {
    reader: Arc<dyn ResourceReader>,
    kind: ResourceKind,
    key: ObjectKey,
    check_interval: Duration,
    max_wait: Duration,
}

impl ClusterReadyGate {
    /// Gate on the `Valkey` resource named after the configured service
    ///
    /// Uses the configured startup timeout as maximum wait and the configured
    /// check interval between polls.
    pub fn new(reader: Arc<dyn ResourceReader>, config: &StreamingConfig) -> Self {
        Self {
            reader,
            kind: ResourceKind::valkey(),
            key: ObjectKey::new(&config.namespace, &config.service_name),
            check_interval: config.readiness_check_interval,
            max_wait: config.startup_timeout,
        }
    }

    /// Gate on a different resource kind
    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Perform a single readiness check
    pub async fn check_ready(&self) -> bool {
        match self.reader.get(&self.kind, &self.key).await {
            Ok(object) => {
                let ready = status_ready(&object);
                debug!(resource = %self.key, ready, "Stream cluster resource status");
                ready
            }
            Err(e) if e.is_not_found() => {
                debug!(resource = %self.key, "Stream cluster resource not found");
                false
            }
            Err(e) => {
                warn!(resource = %self.key, error = %e, "Error getting stream cluster resource");
                false
            }
        }
    }

    async fn poll_until_ready(&self, checks: &AtomicU64) {
        let started = Instant::now();
        let mut ticker =
            tokio::time::interval_at(started + self.check_interval, self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let check = checks.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(check, "Checking stream cluster readiness");

            if self.check_ready().await {
                info!(
                    checks = check,
                    elapsed = ?started.elapsed(),
                    "Stream cluster became ready"
                );
                return;
            }

            info!(
                check,
                next_check = ?self.check_interval,
                elapsed = ?started.elapsed(),
                remaining = ?self.max_wait.saturating_sub(started.elapsed()),
                "Stream cluster not ready yet"
            );
        }
    }
}

#[async_trait]
impl ReadyGate for ClusterReadyGate {
    #[instrument(skip_all, fields(resource = %self.key))]
    async fn wait_for_ready(&self, cancel: &CancellationToken) -> StreamingResult<()> {
        info!(
            check_interval = ?self.check_interval,
            max_wait = ?self.max_wait,
            "Starting stream cluster readiness check"
        );

        let checks = AtomicU64::new(0);
        let wait = async {
            if self.check_ready().await {
                info!("Stream cluster is already ready");
                return;
            }
            info!("Stream cluster not ready yet, starting polling loop");
            self.poll_until_ready(&checks).await;
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Cancelled while waiting for stream cluster readiness");
                Err(StreamingError::Cancelled(format!(
                    "waiting for stream cluster '{}'",
                    self.key.name
                )))
            }
            result = tokio::time::timeout(self.max_wait, wait) => match result {
                Ok(()) => Ok(()),
                Err(_) => {
                    let checks = checks.load(Ordering::SeqCst);
                    error!(
                        timeout = ?self.max_wait,
                        checks,
                        "Timeout waiting for stream cluster to become ready"
                    );
                    Err(StreamingError::ReadinessTimeout {
                        resource: self.key.name.clone(),
                        waited: self.max_wait,
                        checks,
                    })
                }
            },
        }
    }
}

/// Whether a resource reports `status.ready == true`
///
/// A missing status block, a missing field or a non-boolean value is "not
/// ready".
pub fn status_ready(object: &Value) -> bool {
    object
        .get("status")
        .and_then(Value::as_object)
        .and_then(|status| status.get("ready"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{InMemoryResourceReader, ReadError};
    use serde_json::json;

    fn config() -> StreamingConfig {
        StreamingConfig::new("kibaship").with_service_name("valkey")
    }

    fn gate_with(reader: Arc<InMemoryResourceReader>) -> ClusterReadyGate {
        ClusterReadyGate::new(reader, &config())
    }

    #[test]
    fn test_status_ready() {
        assert!(status_ready(&json!({"status": {"ready": true}})));
        assert!(!status_ready(&json!({"status": {"ready": false}})));
        assert!(!status_ready(&json!({"status": {}})));
        assert!(!status_ready(&json!({"status": {"ready": "true"}})));
        assert!(!status_ready(&json!({"spec": {}})));
    }

    #[tokio::test]
    async fn test_check_ready_swallows_api_errors() {
        let reader = Arc::new(InMemoryResourceReader::new());
        let key = ObjectKey::new("kibaship", "valkey");
        reader.script(
            ResourceKind::valkey(),
            key.clone(),
            vec![Err(ReadError::api(&ResourceKind::valkey(), &key, "forbidden"))],
        );

        assert!(!gate_with(reader).check_ready().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_first_check_returns_immediately() {
        let reader = Arc::new(InMemoryResourceReader::new());
        reader.insert(
            ResourceKind::valkey(),
            ObjectKey::new("kibaship", "valkey"),
            json!({"status": {"ready": true}}),
        );
        let gate = gate_with(reader.clone());
        let started = Instant::now();

        gate.wait_for_ready(&CancellationToken::new()).await.unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(
            reader.get_count(&ResourceKind::valkey(), &ObjectKey::new("kibaship", "valkey")),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_wait() {
        let reader = Arc::new(InMemoryResourceReader::new());
        let gate = gate_with(reader);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = gate.wait_for_ready(&cancel).await.unwrap_err();

        assert!(matches!(err, StreamingError::Cancelled(_)));
        assert!(started.elapsed() < Duration::from_secs(40));
    }
}
