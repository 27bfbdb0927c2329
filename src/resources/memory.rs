// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory resource reader
//!
//! Serves fixed responses per object. A scripted object returns its
//! responses in order and then keeps repeating the last one, which is enough
//! to model "not ready, then ready" sequences deterministically.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ObjectKey, ReadError, ReadResult, ResourceKind, ResourceReader};

#[derive(Debug, Default)]
struct Entry {
    responses: Vec<ReadResult<Value>>,
    served: usize,
}

/// [`ResourceReader`] answering from a fixed table
#[derive(Debug, Default)]
pub struct InMemoryResourceReader {
    entries: Mutex<HashMap<(ResourceKind, ObjectKey), Entry>>,
}

impl InMemoryResourceReader {
    /// Create an empty reader; every get is not-found
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object that is returned on every get
    pub fn insert(&self, kind: ResourceKind, key: ObjectKey, object: Value) {
        self.script(kind, key, vec![Ok(object)]);
    }

    /// Store a sequence of responses; the last one repeats
    pub fn script(&self, kind: ResourceKind, key: ObjectKey, responses: Vec<ReadResult<Value>>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            (kind, key),
            Entry {
                responses,
                served: 0,
            },
        );
    }

    /// Number of gets served for an object
    pub fn get_count(&self, kind: &ResourceKind, key: &ObjectKey) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&(kind.clone(), key.clone()))
            .map(|entry| entry.served)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ResourceReader for InMemoryResourceReader {
    async fn get(&self, kind: &ResourceKind, key: &ObjectKey) -> ReadResult<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry((kind.clone(), key.clone())).or_default();

        let index = entry.served.min(entry.responses.len().saturating_sub(1));
        entry.served += 1;

        match entry.responses.get(index) {
            Some(response) => response.clone(),
            None => Err(ReadError::not_found(kind, key)),
        }
    }
}
