// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Per-project sequencing of the publisher and the shard routing of
//! project streams.

mod sequencing;
mod sharding;
