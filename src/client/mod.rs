// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stream Client Abstraction
//!
//! The minimal operation set the streaming core needs from a clustered
//! stream store: append an entry, ping, read the cluster topology and close.
//!
//! # Implementations
//!
//! - [`RedisStreamClient`]: Valkey/Redis, cluster or standalone
//! - [`InMemoryStreamClient`]: records appends, with fixed failure responses
//!
//! Clients are created through a [`StreamClientFactory`] so the connection
//! manager never names a concrete client type.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::StreamingConfig;
use crate::errors::{StreamingError, StreamingResult};

pub mod memory;
pub mod redis;

pub use self::redis::{RedisClientFactory, RedisStreamClient};
pub use memory::{InMemoryClientFactory, InMemoryStreamClient, StreamEntry};

/// Value of a single stream entry field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// UTF-8 text
    Text(String),
    /// Signed integer
    Integer(i64),
}

impl FieldValue {
    /// Text content, if this is a text field
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Integer(_) => None,
        }
    }

    /// Integer content, if this is an integer field
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(n) => write!(f, "{}", n),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

/// Field set of one stream entry, ordered by field name
pub type StreamFields = BTreeMap<String, FieldValue>;

/// Operations on a clustered stream store
#[async_trait]
pub trait StreamClient: Send + Sync {
    /// Append an entry to a stream, returning the entry ID
    ///
    /// Must reject an empty stream name or empty field set before any I/O.
    async fn append(&self, stream: &str, fields: &StreamFields) -> StreamingResult<String>;

    /// Check the store is reachable
    async fn ping(&self) -> StreamingResult<()>;

    /// Raw cluster topology (`CLUSTER NODES` output)
    async fn topology(&self) -> StreamingResult<String>;

    /// Release the connection
    async fn close(&self) -> StreamingResult<()>;
}

/// Creates stream clients for a seed address and credential
#[async_trait]
pub trait StreamClientFactory: Send + Sync {
    /// Build a client; the caller verifies liveness
    async fn create(
        &self,
        address: &str,
        credential: &str,
        config: &StreamingConfig,
    ) -> StreamingResult<Arc<dyn StreamClient>>;
}

/// Reject appends that cannot be sent
pub fn validate_append(stream: &str, fields: &StreamFields) -> StreamingResult<()> {
    if stream.is_empty() {
        return Err(StreamingError::StreamClient(
            "stream name cannot be empty".to_string(),
        ));
    }
    if fields.is_empty() {
        return Err(StreamingError::StreamClient(
            "values cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Append the configured port to a bare host
///
/// `valkey.ns.svc.cluster.local` becomes `valkey.ns.svc.cluster.local:6379`;
/// addresses that already carry a port are returned unchanged.
pub fn resolve_address(address: &str, default_port: u16) -> String {
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, default_port)
    }
}
