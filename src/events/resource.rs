// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Event Model
//!
//! Closed enums for resource types and operations, the event body and the
//! publisher-assigned metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::errors::{StreamingError, StreamingResult};

/// Kind of managed resource an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    /// A project (top of the lineage)
    Project,
    /// An application within a project
    Application,
    /// A deployment of an application
    Deployment,
    /// A domain routed to an application
    ApplicationDomain,
}

impl ResourceType {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Application => "Application",
            Self::Deployment => "Deployment",
            Self::ApplicationDomain => "ApplicationDomain",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation performed on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Resource was created
    Create,
    /// Resource was updated
    Update,
    /// Resource was deleted
    Delete,
    /// Resource reconciliation failed
    Failed,
    /// Resource became ready
    Ready,
}

impl Operation {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Failed => "Failed",
            Self::Ready => "Ready",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance and ordering metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Reconciliation run that produced the event
    #[serde(default)]
    pub reconciliation_id: String,

    /// Version of the controller that produced the event
    #[serde(default)]
    pub controller_version: String,

    /// Per-project sequence number, assigned by the publisher (starts at 1)
    #[serde(default)]
    pub sequence_number: i64,

    /// Parent resource in the lineage, if any
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_resource_uuid: String,
}

/// A lifecycle event of a managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEvent {
    /// Globally unique event identifier
    pub event_id: String,

    /// When the event happened; set once and never overwritten
    pub timestamp: Option<DateTime<Utc>>,

    /// Owning project (required)
    pub project_uuid: String,

    /// Owning workspace, if any
    #[serde(default)]
    pub workspace_uuid: String,

    /// Kind of resource
    pub resource_type: ResourceType,

    /// Resource identifier
    #[serde(default)]
    pub resource_uuid: String,

    /// Human-readable resource slug
    #[serde(default)]
    pub resource_slug: String,

    /// What happened
    pub operation: Operation,

    /// Kubernetes namespace of the resource
    #[serde(default)]
    pub namespace: String,

    /// Snapshot of the originating resource
    #[serde(default)]
    pub payload: Map<String, Value>,

    /// Ordering and provenance metadata
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl ResourceEvent {
    /// Create a new event with a fresh ID, the current time and an empty payload
    pub fn new(
        project_uuid: impl Into<String>,
        workspace_uuid: impl Into<String>,
        resource_type: ResourceType,
        resource_uuid: impl Into<String>,
        resource_slug: impl Into<String>,
        namespace: impl Into<String>,
        operation: Operation,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7().to_string(),
            timestamp: Some(Utc::now()),
            project_uuid: project_uuid.into(),
            workspace_uuid: workspace_uuid.into(),
            resource_type,
            resource_uuid: resource_uuid.into(),
            resource_slug: resource_slug.into(),
            operation,
            namespace: namespace.into(),
            payload: Map::new(),
            metadata: EventMetadata::default(),
        }
    }

    /// Create a new event carrying a serialized snapshot of `resource`
    ///
    /// The snapshot is stored under `payload["resource"]`. Fails if the
    /// resource does not serialize to a JSON object.
    #[allow(clippy::too_many_arguments)]
    pub fn from_resource<R: Serialize>(
        project_uuid: impl Into<String>,
        workspace_uuid: impl Into<String>,
        resource_type: ResourceType,
        resource_uuid: impl Into<String>,
        resource_slug: impl Into<String>,
        namespace: impl Into<String>,
        operation: Operation,
        resource: &R,
    ) -> StreamingResult<Self> {
        let snapshot = serde_json::to_value(resource).map_err(|e| {
            StreamingError::Serialization(format!("failed to serialize resource: {}", e))
        })?;
        if !snapshot.is_object() {
            return Err(StreamingError::Serialization(
                "resource snapshot must serialize to a JSON object".to_string(),
            ));
        }

        let event = Self::new(
            project_uuid,
            workspace_uuid,
            resource_type,
            resource_uuid,
            resource_slug,
            namespace,
            operation,
        );
        Ok(event.with_payload("resource", snapshot))
    }

    /// Add a payload entry
    pub fn with_payload(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Set the parent resource
    pub fn with_parent(mut self, parent_resource_uuid: impl Into<String>) -> Self {
        self.metadata.parent_resource_uuid = parent_resource_uuid.into();
        self
    }

    /// Set reconciliation provenance
    pub fn with_reconciliation(
        mut self,
        reconciliation_id: impl Into<String>,
        controller_version: impl Into<String>,
    ) -> Self {
        self.metadata.reconciliation_id = reconciliation_id.into();
        self.metadata.controller_version = controller_version.into();
        self
    }

    /// Set or clear the caller-supplied timestamp
    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Check that the event can be published
    ///
    /// Resource type and operation are closed enums, so only the string
    /// identity fields need checking.
    pub fn validate(&self) -> StreamingResult<()> {
        if self.event_id.is_empty() {
            return Err(StreamingError::InvalidEvent(
                "event ID is required".to_string(),
            ));
        }
        if self.project_uuid.is_empty() {
            return Err(StreamingError::InvalidEvent(
                "project UUID is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_event() -> ResourceEvent {
        ResourceEvent::new(
            "project-1",
            "workspace-1",
            ResourceType::Application,
            "app-1",
            "my-app",
            "project-ns",
            Operation::Create,
        )
    }

    #[test]
    fn test_new_event_has_identity() {
        let event = sample_event();

        assert!(!event.event_id.is_empty());
        assert!(Uuid::parse_str(&event.event_id).is_ok());
        assert!(event.timestamp.is_some());
        assert!(event.payload.is_empty());
        assert_eq!(event.metadata.sequence_number, 0);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_event_id() {
        let mut event = sample_event();
        event.event_id.clear();

        let err = event.validate().unwrap_err();
        assert!(err.to_string().contains("event ID is required"));
    }

    #[test]
    fn test_validate_requires_project() {
        let mut event = sample_event();
        event.project_uuid.clear();

        let err = event.validate().unwrap_err();
        assert!(err.to_string().contains("project UUID is required"));
    }

    #[test]
    fn test_from_resource_stores_snapshot() {
        let resource = json!({
            "apiVersion": "platform.operator.kibaship.com/v1alpha1",
            "kind": "Application",
            "metadata": {"name": "my-app"}
        });

        let event = ResourceEvent::from_resource(
            "project-1",
            "",
            ResourceType::Application,
            "app-1",
            "my-app",
            "project-ns",
            Operation::Update,
            &resource,
        )
        .unwrap();

        assert_eq!(event.payload.get("resource"), Some(&resource));
    }

    #[test]
    fn test_from_resource_rejects_scalar_snapshot() {
        let result = ResourceEvent::from_resource(
            "project-1",
            "",
            ResourceType::Project,
            "p",
            "p",
            "ns",
            Operation::Update,
            &"just a string",
        );

        assert!(matches!(result, Err(StreamingError::Serialization(_))));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_value(ResourceType::ApplicationDomain).unwrap(),
            json!("ApplicationDomain")
        );
        assert_eq!(serde_json::to_value(Operation::Ready).unwrap(), json!("Ready"));
        assert_eq!(ResourceType::Deployment.to_string(), "Deployment");
        assert_eq!(Operation::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_parent_omitted_when_empty() {
        let event = sample_event();
        let value = serde_json::to_value(&event).unwrap();
        assert!(value["metadata"].get("parent_resource_uuid").is_none());

        let event = sample_event().with_parent("parent-1");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["metadata"]["parent_resource_uuid"], json!("parent-1"));
    }
}
