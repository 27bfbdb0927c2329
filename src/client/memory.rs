// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory stream client
//!
//! Keeps appended entries in a vector and answers pings and topology queries
//! with fixed responses. Failures are configured up front, so a test reads
//! as "given a store that rejects the second append" rather than as a list
//! of expectations.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{validate_append, StreamClient, StreamClientFactory, StreamFields};
use crate::config::StreamingConfig;
use crate::errors::{StreamingError, StreamingResult};

/// An appended stream entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Entry ID assigned by the store
    pub id: String,
    /// Stream the entry was appended to
    pub stream: String,
    /// Entry fields
    pub fields: StreamFields,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: Vec<StreamEntry>,
    append_attempts: usize,
    pings: usize,
    topology_queries: usize,
    closes: usize,
    closed: bool,
}

/// [`StreamClient`] storing entries in memory
#[derive(Debug)]
pub struct InMemoryStreamClient {
    state: Mutex<MemoryState>,
    ping_failure: Option<String>,
    topology: Result<String, String>,
    failing_appends: HashSet<usize>,
}

impl Default for InMemoryStreamClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStreamClient {
    /// Create a healthy client reporting a three-node topology
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            ping_failure: None,
            topology: Ok(concat!(
                "node-1 10.0.0.1:6379@16379 myself,master - 0 0 1 connected 0-5460\n",
                "node-2 10.0.0.2:6379@16379 master - 0 0 2 connected 5461-10922\n",
                "node-3 10.0.0.3:6379@16379 master - 0 0 3 connected 10923-16383\n",
            )
            .to_string()),
            failing_appends: HashSet::new(),
        }
    }

    /// Every ping fails with `message`
    pub fn with_ping_failure(mut self, message: impl Into<String>) -> Self {
        self.ping_failure = Some(message.into());
        self
    }

    /// Every topology query fails with `message`
    pub fn with_topology_failure(mut self, message: impl Into<String>) -> Self {
        self.topology = Err(message.into());
        self
    }

    /// The `attempt`-th append (1-based) fails
    pub fn with_failing_append(mut self, attempt: usize) -> Self {
        self.failing_appends.insert(attempt);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All stored entries in append order
    pub fn entries(&self) -> Vec<StreamEntry> {
        self.state().entries.clone()
    }

    /// Stored entries for one stream
    pub fn entries_for(&self, stream: &str) -> Vec<StreamEntry> {
        self.state()
            .entries
            .iter()
            .filter(|entry| entry.stream == stream)
            .cloned()
            .collect()
    }

    /// Appends attempted, including rejected ones
    pub fn append_attempts(&self) -> usize {
        self.state().append_attempts
    }

    /// Pings received
    pub fn ping_count(&self) -> usize {
        self.state().pings
    }

    /// Topology queries received
    pub fn topology_count(&self) -> usize {
        self.state().topology_queries
    }

    /// Close calls received
    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    /// Whether the client has been closed
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl StreamClient for InMemoryStreamClient {
    async fn append(&self, stream: &str, fields: &StreamFields) -> StreamingResult<String> {
        let mut state = self.state();
        if state.closed {
            return Err(StreamingError::StreamClient("client is closed".to_string()));
        }
        validate_append(stream, fields)?;

        state.append_attempts += 1;
        if self.failing_appends.contains(&state.append_attempts) {
            return Err(StreamingError::StreamClient(format!(
                "append {} rejected",
                state.append_attempts
            )));
        }

        let id = format!("{}-0", state.entries.len() + 1);
        state.entries.push(StreamEntry {
            id: id.clone(),
            stream: stream.to_string(),
            fields: fields.clone(),
        });
        Ok(id)
    }

    async fn ping(&self) -> StreamingResult<()> {
        let mut state = self.state();
        state.pings += 1;
        if state.closed {
            return Err(StreamingError::StreamClient("client is closed".to_string()));
        }
        match &self.ping_failure {
            Some(message) => Err(StreamingError::StreamClient(message.clone())),
            None => Ok(()),
        }
    }

    async fn topology(&self) -> StreamingResult<String> {
        self.state().topology_queries += 1;
        self.topology
            .clone()
            .map_err(StreamingError::StreamClient)
    }

    async fn close(&self) -> StreamingResult<()> {
        let mut state = self.state();
        state.closes += 1;
        state.closed = true;
        Ok(())
    }
}

/// Factory handing out one shared [`InMemoryStreamClient`] and counting calls
#[derive(Debug)]
pub struct InMemoryClientFactory {
    client: Arc<InMemoryStreamClient>,
    creations: AtomicUsize,
    last_address: Mutex<Option<String>>,
    failure: Option<String>,
}

impl InMemoryClientFactory {
    /// Factory returning `client` on every call
    pub fn new(client: Arc<InMemoryStreamClient>) -> Self {
        Self {
            client,
            creations: AtomicUsize::new(0),
            last_address: Mutex::new(None),
            failure: None,
        }
    }

    /// Every creation fails with `message`
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of create calls
    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    /// Address passed to the most recent create call
    pub fn last_address(&self) -> Option<String> {
        self.last_address
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The shared client
    pub fn client(&self) -> Arc<InMemoryStreamClient> {
        Arc::clone(&self.client)
    }
}

#[async_trait]
impl StreamClientFactory for InMemoryClientFactory {
    async fn create(
        &self,
        address: &str,
        _credential: &str,
        _config: &StreamingConfig,
    ) -> StreamingResult<Arc<dyn StreamClient>> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        *self.last_address.lock().unwrap_or_else(|e| e.into_inner()) = Some(address.to_string());

        if let Some(message) = &self.failure {
            return Err(StreamingError::Connection(message.clone()));
        }
        Ok(self.client.clone() as Arc<dyn StreamClient>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FieldValue;

    fn fields() -> StreamFields {
        let mut fields = StreamFields::new();
        fields.insert("event_id".to_string(), FieldValue::from("e1"));
        fields
    }

    #[tokio::test]
    async fn test_append_records_entry() {
        let client = InMemoryStreamClient::new();

        let id = client.append("stream-a", &fields()).await.unwrap();

        assert_eq!(id, "1-0");
        assert_eq!(client.entries_for("stream-a").len(), 1);
        assert_eq!(client.append_attempts(), 1);
    }

    #[tokio::test]
    async fn test_failing_append_is_counted_but_not_stored() {
        let client = InMemoryStreamClient::new().with_failing_append(1);

        assert!(client.append("stream-a", &fields()).await.is_err());
        assert!(client.append("stream-a", &fields()).await.is_ok());

        assert_eq!(client.append_attempts(), 2);
        assert_eq!(client.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_client_rejects_appends() {
        let client = InMemoryStreamClient::new();
        client.close().await.unwrap();

        assert!(client.is_closed());
        assert!(client.append("stream-a", &fields()).await.is_err());
        assert!(client.ping().await.is_err());
    }
}
