// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-resource-streams
//!
//! Deterministic events and pre-wired components for integration tests.
//! All UUIDs and timestamps are fixed constants so runs are reproducible.
//!
//! # Design Principles
//! - No `Uuid::now_v7()` or `Utc::now()` in fixture data
//! - Fixtures are the only place that constructs events
//! - Collaborators are in-memory fixed-response doubles

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use cim_resource_streams::client::{InMemoryClientFactory, InMemoryStreamClient};
use cim_resource_streams::resources::InMemoryResourceReader;
use cim_resource_streams::{
    ClusterConnectionManager, ConnectionManager, EventMetadata, ManualClock, ObjectKey,
    Operation, ProjectStreamPublisher, ResourceEvent, ResourceKind, ResourceType,
    StreamingConfig,
};

pub const NAMESPACE: &str = "kibaship";
pub const SERVICE_NAME: &str = "valkey";
pub const SECRET_NAME: &str = "valkey-auth";

pub const PROJECT_ID_1: &str = "01934f4a-2000-7000-8000-000000002000";
pub const PROJECT_ID_2: &str = "01934f4a-2001-7000-8000-000000002001";
pub const WORKSPACE_ID_1: &str = "01934f4a-3000-7000-8000-000000003000";
pub const RESOURCE_ID_1: &str = "01934f4a-1000-7000-8000-000000001000";

pub const EVENT_ID_1: &str = "01934f4a-0001-7000-8000-000000000001";
pub const EVENT_ID_2: &str = "01934f4a-0002-7000-8000-000000000002";
pub const EVENT_ID_3: &str = "01934f4a-0003-7000-8000-000000000003";

// base64("s3cr3t")
pub const ENCODED_PASSWORD: &str = "czNjcjN0";
pub const PASSWORD: &str = "s3cr3t";

// Fixed test timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

/// Parse the fixed timestamp
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

/// Configuration pointing at the fixture cluster
pub fn test_config() -> StreamingConfig {
    StreamingConfig::new(NAMESPACE)
        .with_service_name(SERVICE_NAME)
        .with_secret_name(SECRET_NAME)
}

/// Untimestamped, unsequenced application event
pub fn application_event(event_id: &str, project_uuid: &str) -> ResourceEvent {
    ResourceEvent {
        event_id: event_id.to_string(),
        timestamp: None,
        project_uuid: project_uuid.to_string(),
        workspace_uuid: WORKSPACE_ID_1.to_string(),
        resource_type: ResourceType::Application,
        resource_uuid: RESOURCE_ID_1.to_string(),
        resource_slug: "storefront".to_string(),
        operation: Operation::Create,
        namespace: NAMESPACE.to_string(),
        payload: Map::new(),
        metadata: EventMetadata::default(),
    }
}

/// Cluster resource with the given readiness
pub fn valkey_status(ready: bool) -> Value {
    json!({
        "apiVersion": "hyperspike.io/v1",
        "kind": "Valkey",
        "metadata": {"name": SERVICE_NAME, "namespace": NAMESPACE},
        "status": {"ready": ready},
    })
}

/// Single-field credential secret
pub fn credential_secret() -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {"name": SECRET_NAME, "namespace": NAMESPACE},
        "data": {"password": ENCODED_PASSWORD},
    })
}

pub fn valkey_key() -> ObjectKey {
    ObjectKey::new(NAMESPACE, SERVICE_NAME)
}

pub fn secret_key() -> ObjectKey {
    ObjectKey::new(NAMESPACE, SECRET_NAME)
}

/// Reader holding a ready cluster and a valid secret
pub fn healthy_cluster_reader() -> Arc<InMemoryResourceReader> {
    let reader = Arc::new(InMemoryResourceReader::new());
    reader.insert(ResourceKind::valkey(), valkey_key(), valkey_status(true));
    reader.insert(ResourceKind::secret(), secret_key(), credential_secret());
    reader
}

/// Publisher wired to a connected in-memory stream client
pub struct PublisherHarness {
    pub publisher: ProjectStreamPublisher,
    pub client: Arc<InMemoryStreamClient>,
    pub connection: Arc<ClusterConnectionManager>,
}

/// Build a publisher over `client`, connected
pub async fn connected_publisher(
    config: StreamingConfig,
    client: InMemoryStreamClient,
) -> PublisherHarness {
    let config = Arc::new(config);
    let client = Arc::new(client);
    let factory = Arc::new(InMemoryClientFactory::new(client.clone()));
    let connection = Arc::new(ClusterConnectionManager::new(config.clone(), factory));
    connection
        .initialize_cluster(&config.seed_address(), PASSWORD)
        .await
        .expect("in-memory connection should succeed");

    let publisher = ProjectStreamPublisher::new(
        connection.clone(),
        Arc::new(ManualClock::new(fixed_timestamp())),
        config,
    );

    PublisherHarness {
        publisher,
        client,
        connection,
    }
}
