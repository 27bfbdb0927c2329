// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Lifecycle Events
//!
//! This module defines the unit of propagation for the streaming core: a
//! [`ResourceEvent`] describing a state change of a managed resource
//! (project, application, deployment or application domain).
//!
//! # Event Lifecycle
//!
//! ```text
//! Reconciler → ResourceEvent::new → Publisher (enrich: sequence + timestamp)
//!     → flatten + serialize → StreamClient::append
//! ```
//!
//! 1. **Constructed** by a caller, usually a reconciliation loop
//! 2. **Enriched** exactly once by the publisher at publish time
//! 3. **Written** to the project's stream as a flattened field set plus
//!    the full event as JSON under `event_data`
//!
//! # Lineage
//!
//! Every event carries the project it belongs to. Sequence numbers are
//! monotonic per project, never across projects.

pub mod resource;

pub use resource::{EventMetadata, Operation, ResourceEvent, ResourceType};
