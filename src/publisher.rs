// Copyright (c) 2025 - Cowboy AI, Inc.
//! Project Stream Publisher
//!
//! Writes [`ResourceEvent`]s to per-project streams.
//!
//! # Publish Path
//!
//! ```text
//! validate ─► connected? ─► enrich (timestamp, sequence) ─► stream name ─► XADD
//! ```
//!
//! Enrichment and stream-name derivation happen under one lock on the
//! per-project sequence table. Sequence numbers are strictly increasing per
//! project regardless of caller interleaving, and each event is routed by
//! its own sequence number.
//!
//! # Batches
//!
//! Batches are best effort. Events are grouped by project, groups run
//! concurrently (bounded by the configured batch size) and events inside a
//! group run in order. A failed event does not stop the rest; the last
//! error is returned after every event was attempted.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::client::{FieldValue, StreamFields};
use crate::clock::{Clock, SystemClock};
use crate::config::StreamingConfig;
use crate::connection::ConnectionManager;
use crate::errors::{StreamingError, StreamingResult};
use crate::events::ResourceEvent;
use crate::streams::StreamRouting;

/// Publishes resource events to the stream store
#[async_trait]
pub trait StreamPublisher: Send + Sync {
    /// Enrich and append one event
    ///
    /// The event is enriched in place, so the caller sees the assigned
    /// sequence number and timestamp.
    async fn publish_event(&self, event: &mut ResourceEvent) -> StreamingResult<()>;

    /// Publish many events, best effort
    ///
    /// Events without a project are skipped. Returns the last error seen.
    async fn publish_batch(&self, events: &mut [ResourceEvent]) -> StreamingResult<()>;
}

/// [`StreamPublisher`] routing events to per-project streams
pub struct ProjectStreamPublisher {
    connection: Arc<dyn ConnectionManager>,
    clock: Arc<dyn Clock>,
    config: Arc<StreamingConfig>,
    routing: StreamRouting,
    sequences: Mutex<HashMap<String, i64>>,
}

impl ProjectStreamPublisher {
    /// Create a publisher writing through `connection`
    pub fn new(
        connection: Arc<dyn ConnectionManager>,
        clock: Arc<dyn Clock>,
        config: Arc<StreamingConfig>,
    ) -> Self {
        let routing = StreamRouting::new(
            config.stream_sharding_enabled,
            config.stream_shards_per_project,
            config.high_traffic_threshold,
        );
        Self {
            connection,
            clock,
            config,
            routing,
            sequences: Mutex::new(HashMap::new()),
        }
    }

    /// Create a publisher timestamping with the system clock
    pub fn with_system_clock(
        connection: Arc<dyn ConnectionManager>,
        config: Arc<StreamingConfig>,
    ) -> Self {
        Self::new(connection, Arc::new(SystemClock), config)
    }

    fn sequences(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.sequences.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Assign the next sequence number and a timestamp if none is set
    ///
    /// A caller-supplied timestamp is never replaced.
    pub fn enrich_event(&self, event: &mut ResourceEvent) {
        let mut sequences = self.sequences();
        self.assign_sequence(&mut sequences, event);
    }

    fn assign_sequence(&self, sequences: &mut HashMap<String, i64>, event: &mut ResourceEvent) {
        if event.timestamp.is_none() {
            event.timestamp = Some(self.clock.now());
        }

        let sequence = sequences.entry(event.project_uuid.clone()).or_insert(0);
        *sequence += 1;
        event.metadata.sequence_number = *sequence;
    }

    /// Enrich the event and name its stream from its own sequence number
    ///
    /// Both happen under one lock, so a concurrent publish to the same
    /// project cannot move the event to another stream in between.
    fn enrich_and_route(&self, event: &mut ResourceEvent) -> String {
        let mut sequences = self.sequences();
        self.assign_sequence(&mut sequences, event);
        self.routing
            .stream_for(&event.project_uuid, event.metadata.sequence_number)
    }

    /// Stream the project's next event is written to
    ///
    /// Depends only on the project's current sequence count and the
    /// sharding settings.
    pub fn generate_stream_name(&self, project_uuid: &str) -> String {
        let sequences = self.sequences();
        let count = sequences.get(project_uuid).copied().unwrap_or(0);
        self.routing.stream_for(project_uuid, count)
    }

    /// Current sequence count of a project
    pub fn sequence_count(&self, project_uuid: &str) -> i64 {
        self.sequences().get(project_uuid).copied().unwrap_or(0)
    }

    async fn publish_group(
        &self,
        project_uuid: String,
        events: Vec<&mut ResourceEvent>,
    ) -> StreamingResult<()> {
        let total = events.len();
        let mut published = 0usize;
        let mut last_error = None;

        for event in events {
            let event_id = event.event_id.clone();
            match tokio::time::timeout(self.config.batch_timeout, self.publish_event(event)).await
            {
                Ok(Ok(())) => published += 1,
                Ok(Err(e)) => {
                    warn!(project = %project_uuid, event_id = %event_id, error = %e, "Failed to publish event in batch");
                    last_error = Some(e);
                }
                Err(_) => {
                    warn!(project = %project_uuid, event_id = %event_id, timeout = ?self.config.batch_timeout, "Event publish timed out in batch");
                    last_error = Some(StreamingError::Timeout(format!(
                        "publishing event {} exceeded {:?}",
                        event_id, self.config.batch_timeout
                    )));
                }
            }
        }

        debug!(project = %project_uuid, published, total, "Published project group");
        last_error.map_or(Ok(()), Err)
    }
}

/// Flatten an enriched event into stream entry fields
///
/// `event_data` carries the whole event as JSON. Optional identity fields
/// are omitted when empty.
pub fn stream_fields(event: &ResourceEvent) -> StreamingResult<StreamFields> {
    let event_data = serde_json::to_string(event)
        .map_err(|e| StreamingError::Serialization(format!("failed to marshal event: {}", e)))?;

    let mut fields = StreamFields::new();
    fields.insert("event_id".to_string(), FieldValue::from(event.event_id.as_str()));
    fields.insert(
        "timestamp".to_string(),
        FieldValue::from(event.timestamp.map(|t| t.timestamp()).unwrap_or_default()),
    );
    fields.insert("project_uuid".to_string(), FieldValue::from(event.project_uuid.as_str()));
    fields.insert("resource_type".to_string(), FieldValue::from(event.resource_type.as_str()));
    fields.insert("resource_uuid".to_string(), FieldValue::from(event.resource_uuid.as_str()));
    fields.insert("operation".to_string(), FieldValue::from(event.operation.as_str()));
    fields.insert(
        "sequence".to_string(),
        FieldValue::from(event.metadata.sequence_number),
    );
    fields.insert("event_data".to_string(), FieldValue::from(event_data));

    let optional = [
        ("workspace_uuid", &event.workspace_uuid),
        ("resource_slug", &event.resource_slug),
        ("namespace", &event.namespace),
        ("parent_resource_uuid", &event.metadata.parent_resource_uuid),
    ];
    for (name, value) in optional {
        if !value.is_empty() {
            fields.insert(name.to_string(), FieldValue::from(value.as_str()));
        }
    }

    Ok(fields)
}

#[async_trait]
impl StreamPublisher for ProjectStreamPublisher {
    #[instrument(skip_all, fields(project = %event.project_uuid, event_id = %event.event_id))]
    async fn publish_event(&self, event: &mut ResourceEvent) -> StreamingResult<()> {
        event.validate()?;

        if !self.connection.is_connected().await {
            return Err(StreamingError::NotConnected);
        }
        let client = self
            .connection
            .get_client()
            .await
            .ok_or(StreamingError::ClientUnavailable)?;

        let stream = self.enrich_and_route(event);
        let fields = stream_fields(event)?;

        let entry_id = client
            .append(&stream, &fields)
            .await
            .map_err(|e| StreamingError::Publish {
                stream: stream.clone(),
                message: e.to_string(),
            })?;

        debug!(
            stream = %stream,
            entry_id = %entry_id,
            sequence = event.metadata.sequence_number,
            resource_type = %event.resource_type,
            operation = %event.operation,
            "Published event to stream"
        );
        Ok(())
    }

    #[instrument(skip_all, fields(events = events.len()))]
    async fn publish_batch(&self, events: &mut [ResourceEvent]) -> StreamingResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let total = events.len();
        let mut groups: Vec<(String, Vec<&mut ResourceEvent>)> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut skipped = 0usize;

        for event in events.iter_mut() {
            if event.project_uuid.is_empty() {
                skipped += 1;
                continue;
            }
            match group_index.get(&event.project_uuid) {
                Some(&index) => groups[index].1.push(event),
                None => {
                    let project_uuid = event.project_uuid.clone();
                    group_index.insert(project_uuid.clone(), groups.len());
                    groups.push((project_uuid, vec![event]));
                }
            }
        }

        let group_count = groups.len();
        let mut pending = Vec::with_capacity(group_count);
        for (project_uuid, group) in groups {
            pending.push(self.publish_group(project_uuid, group));
        }
        let results: Vec<StreamingResult<()>> = stream::iter(pending)
            .buffered(self.config.batch_size.max(1))
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(
            total,
            skipped,
            projects = group_count,
            failed_projects = failed,
            "Published event batch"
        );

        results.into_iter().filter_map(Result::err).last().map_or(Ok(()), Err)
    }
}
