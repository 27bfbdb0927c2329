// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource lifecycle event streaming
//!
//! Publishes lifecycle events of managed resources (projects, applications,
//! deployments, domains) to per-project streams in a Valkey/Redis cluster.
//!
//! # Components
//!
//! - [`readiness`]: waits for the stream cluster resource to report ready
//! - [`secret`]: reads the stream store credential
//! - [`connection`]: owns the shared stream client, with health probing
//! - [`startup`]: runs readiness, authentication and connection in order
//! - [`publisher`]: enriches events and appends them to project streams
//!
//! Cluster objects are read through [`resources::ResourceReader`] and the
//! stream store is reached through [`client::StreamClient`]; both ship with
//! in-memory implementations for tests.

pub mod client;
pub mod clock;
pub mod config;
pub mod connection;
pub mod errors;
pub mod events;
pub mod publisher;
pub mod readiness;
pub mod resources;
pub mod secret;
pub mod startup;
pub mod state_machine;
pub mod streams;

// Re-export commonly used types
pub use client::{StreamClient, StreamClientFactory, StreamFields};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StreamingConfig;
pub use connection::{ClusterConnectionManager, ConnectionManager};
pub use errors::{StartupStage, StreamingError, StreamingResult};
pub use events::{EventMetadata, Operation, ResourceEvent, ResourceType};
pub use publisher::{ProjectStreamPublisher, StreamPublisher};
pub use readiness::{ClusterReadyGate, ReadyGate};
pub use resources::{ObjectKey, ResourceKind, ResourceReader};
pub use secret::{ClusterSecretProvider, SecretProvider};
pub use startup::StartupSequenceController;
pub use state_machine::StartupPhase;
