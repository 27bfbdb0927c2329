// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cluster Resource Access
//!
//! The streaming core reads exactly two kinds of cluster objects: the custom
//! resource describing the stream cluster (for readiness) and the secret
//! holding its credential. Both go through the [`ResourceReader`] capability
//! so production (`kube`) and in-memory readers are interchangeable.
//!
//! Objects are returned as raw JSON so callers can inspect nested fields
//! without depending on generated types for foreign CRDs.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub mod kube;
pub mod memory;

pub use self::kube::KubeResourceReader;
pub use memory::InMemoryResourceReader;

/// Namespaced object name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Object namespace
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl ObjectKey {
    /// Create a new object key
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// API group, version, kind and plural of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKind {
    /// API group (empty for the core group)
    pub group: String,
    /// API version
    pub version: String,
    /// Kind name
    pub kind: String,
    /// Plural resource name used in URLs
    pub plural: String,
}

impl ResourceKind {
    /// Create a resource kind
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            plural: plural.into(),
        }
    }

    /// Core `v1/Secret`
    pub fn secret() -> Self {
        Self::new("", "v1", "Secret", "secrets")
    }

    /// `hyperspike.io/v1/Valkey`, the custom resource backing the stream cluster
    pub fn valkey() -> Self {
        Self::new("hyperspike.io", "v1", "Valkey", "valkeys")
    }

    /// `apiVersion` string for this kind
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.kind)
    }
}

/// Errors returned by a [`ResourceReader`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The object does not exist
    #[error("{kind} {key} not found")]
    NotFound { kind: String, key: String },

    /// The API call failed
    #[error("failed to get {kind} {key}: {message}")]
    Api {
        kind: String,
        key: String,
        message: String,
    },

    /// The object could not be decoded
    #[error("failed to decode {kind} {key}: {message}")]
    Decode {
        kind: String,
        key: String,
        message: String,
    },
}

impl ReadError {
    /// Build a not-found error for an object
    pub fn not_found(kind: &ResourceKind, key: &ObjectKey) -> Self {
        ReadError::NotFound {
            kind: kind.to_string(),
            key: key.to_string(),
        }
    }

    /// Build an API error for an object
    pub fn api(kind: &ResourceKind, key: &ObjectKey, message: impl Into<String>) -> Self {
        ReadError::Api {
            kind: kind.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Whether the object simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReadError::NotFound { .. })
    }
}

/// Result type for resource reads
pub type ReadResult<T> = Result<T, ReadError>;

/// Read access to cluster objects
#[async_trait]
pub trait ResourceReader: Send + Sync {
    /// Fetch a single object as JSON
    ///
    /// Must return [`ReadError::NotFound`] when the object does not exist.
    async fn get(&self, kind: &ResourceKind, key: &ObjectKey) -> ReadResult<Value>;
}
