// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Event Enrichment
//!
//! Sequence numbers must be strictly increasing per project and start at 1,
//! whatever the interleaving of projects. Timestamps supplied by callers
//! must survive enrichment.

use chrono::{TimeZone, Utc};
use cim_resource_streams::client::{InMemoryClientFactory, InMemoryStreamClient};
use cim_resource_streams::{
    ClusterConnectionManager, EventMetadata, ManualClock, Operation, ProjectStreamPublisher,
    ResourceEvent, ResourceType, StreamingConfig,
};
use proptest::prelude::*;
use serde_json::Map;
use std::collections::HashMap;
use std::sync::Arc;

const PROJECTS: [&str; 4] = ["project-a", "project-b", "project-c", "project-d"];

fn publisher(config: StreamingConfig) -> ProjectStreamPublisher {
    let config = Arc::new(config);
    let factory = Arc::new(InMemoryClientFactory::new(Arc::new(InMemoryStreamClient::new())));
    let connection = Arc::new(ClusterConnectionManager::new(config.clone(), factory));
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 19, 12, 0, 0).unwrap()));
    ProjectStreamPublisher::new(connection, clock, config)
}

fn event(project: &str) -> ResourceEvent {
    ResourceEvent {
        event_id: "01934f4a-0001-7000-8000-000000000001".to_string(),
        timestamp: None,
        project_uuid: project.to_string(),
        workspace_uuid: String::new(),
        resource_type: ResourceType::Deployment,
        resource_uuid: "deployment-1".to_string(),
        resource_slug: String::new(),
        operation: Operation::Update,
        namespace: String::new(),
        payload: Map::new(),
        metadata: EventMetadata::default(),
    }
}

proptest! {
    /// Property: each project's sequence runs 1, 2, 3, ... under any interleaving
    #[test]
    fn prop_sequences_strictly_increase_per_project(
        order in prop::collection::vec(0usize..PROJECTS.len(), 1..200)
    ) {
        let publisher = publisher(StreamingConfig::new("ns"));
        let mut seen: HashMap<&str, Vec<i64>> = HashMap::new();

        for index in order {
            let project = PROJECTS[index];
            let mut e = event(project);
            publisher.enrich_event(&mut e);
            seen.entry(project).or_default().push(e.metadata.sequence_number);
        }

        for (project, sequences) in seen {
            let expected: Vec<i64> = (1..=sequences.len() as i64).collect();
            prop_assert_eq!(&sequences, &expected, "project {}", project);
            prop_assert_eq!(publisher.sequence_count(project), sequences.len() as i64);
        }
    }

    /// Property: a caller-supplied timestamp is never replaced
    #[test]
    fn prop_enrichment_keeps_supplied_timestamp(secs in 0i64..4_000_000_000) {
        let publisher = publisher(StreamingConfig::new("ns"));
        let supplied = Utc.timestamp_opt(secs, 0).unwrap();
        let mut e = event("project-a").with_timestamp(Some(supplied));

        publisher.enrich_event(&mut e);

        prop_assert_eq!(e.timestamp, Some(supplied));
    }

    /// Property: deriving the stream name has no effect on the next derivation
    #[test]
    fn prop_stream_name_is_pure(
        published in 0usize..50,
        threshold in 0i64..50,
        shards in 1u32..8,
    ) {
        let publisher = publisher(StreamingConfig::new("ns").with_sharding(true, shards, threshold));
        for _ in 0..published {
            publisher.enrich_event(&mut event("project-a"));
        }

        let first = publisher.generate_stream_name("project-a");
        let second = publisher.generate_stream_name("project-a");

        prop_assert_eq!(first, second);
        prop_assert_eq!(publisher.sequence_count("project-a"), published as i64);
    }

    /// Property: once a project routes to a shard it never returns to the base stream
    #[test]
    fn prop_sharded_project_stays_sharded(
        threshold in 0i64..30,
        events in 1usize..80,
        shards in 1u32..8,
    ) {
        let publisher = publisher(StreamingConfig::new("ns").with_sharding(true, shards, threshold));
        let base = cim_resource_streams::streams::base_stream_name("project-a");
        let mut sharded_stream: Option<String> = None;

        for _ in 0..events {
            publisher.enrich_event(&mut event("project-a"));
            let stream = publisher.generate_stream_name("project-a");

            if let Some(shard) = &sharded_stream {
                prop_assert_eq!(&stream, shard);
            } else if stream != base {
                sharded_stream = Some(stream);
            }
        }

        prop_assert_eq!(sharded_stream.is_some(), events as i64 > threshold);
    }
}
