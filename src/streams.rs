// Copyright (c) 2025 - Cowboy AI, Inc.

//! Stream naming for project event streams
//!
//! # Stream Pattern
//!
//! Every project writes to a base stream keyed by a cluster hash tag:
//!
//! ```text
//! {project:<project_uuid>}:events
//! ```
//!
//! The `{...}` hash tag pins every key of a project to the same cluster slot,
//! so a project's stream and its shards live on one node and ordering stays
//! simple for consumers.
//!
//! Projects whose sequence counter has passed the high-traffic threshold are
//! spread over 1-indexed shard streams:
//!
//! ```text
//! {project:<project_uuid>}:events:<shard>
//! ```
//!
//! # Examples
//!
//! ```rust
//! use cim_resource_streams::streams::{base_stream_name, StreamRouting};
//!
//! assert_eq!(base_stream_name("p1"), "{project:p1}:events");
//!
//! let routing = StreamRouting::new(true, 4, 1000);
//! assert_eq!(routing.stream_for("p1", 10), "{project:p1}:events");
//! assert!(routing.stream_for("p1", 1001).starts_with("{project:p1}:events:"));
//! ```

/// Base stream of a project
pub fn base_stream_name(project_uuid: &str) -> String {
    format!("{{project:{}}}:events", project_uuid)
}

/// Shard stream of a project
pub fn shard_stream_name(project_uuid: &str, shard: u32) -> String {
    format!("{{project:{}}}:events:{}", project_uuid, shard)
}

/// 1-indexed shard for a project
///
/// Polynomial rolling hash (`h = h * 31 + c` over the UUID's characters)
/// with wrapping 64-bit arithmetic, reduced with a non-negative modulo so
/// the result is always in `1..=shards`. Stable for a given UUID and shard
/// count.
///
/// # Panics
///
/// Panics if `shards` is zero; configuration validation rules that out.
pub fn shard_index(project_uuid: &str, shards: u32) -> u32 {
    assert!(shards > 0, "shard count must be positive");

    let hash = project_uuid
        .chars()
        .fold(0i64, |hash, c| hash.wrapping_mul(31).wrapping_add(c as i64));

    hash.rem_euclid(i64::from(shards)) as u32 + 1
}

/// Sharding policy applied when deriving stream names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRouting {
    /// Whether sharding is enabled at all
    pub sharding_enabled: bool,
    /// Shard streams per high-traffic project
    pub shards_per_project: u32,
    /// Sequence count above which a project is high traffic
    pub high_traffic_threshold: i64,
}

impl StreamRouting {
    /// Create a routing policy
    pub fn new(sharding_enabled: bool, shards_per_project: u32, high_traffic_threshold: i64) -> Self {
        Self {
            sharding_enabled,
            shards_per_project,
            high_traffic_threshold,
        }
    }

    /// Whether a project with this sequence count is high traffic
    pub fn is_high_traffic(&self, sequence_count: i64) -> bool {
        sequence_count > self.high_traffic_threshold
    }

    /// Stream a project's next event goes to
    ///
    /// Pure function of the project, its current sequence count and the
    /// policy.
    pub fn stream_for(&self, project_uuid: &str, sequence_count: i64) -> String {
        if self.sharding_enabled
            && self.shards_per_project > 0
            && self.is_high_traffic(sequence_count)
        {
            shard_stream_name(project_uuid, shard_index(project_uuid, self.shards_per_project))
        } else {
            base_stream_name(project_uuid)
        }
    }
}
