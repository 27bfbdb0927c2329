//! Error types for resource event streaming

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::state_machine::TransitionError;

/// Step of the startup sequence that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStage {
    /// Waiting for the stream cluster resource to report ready
    ClusterReadiness,
    /// Fetching the stream store credential
    Authentication,
    /// Establishing the stream client connection
    Connection,
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupStage::ClusterReadiness => write!(f, "stream cluster failed to become ready"),
            StartupStage::Authentication => {
                write!(f, "authentication secret not found or empty")
            }
            StartupStage::Connection => write!(f, "failed to establish stream connection"),
        }
    }
}

/// Errors that can occur while starting up or publishing to the stream store
#[derive(Debug, Error)]
pub enum StreamingError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Event rejected before publish
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Cluster resource never reported ready
    #[error("timeout: stream cluster '{resource}' not ready after {waited:?} ({checks} checks)")]
    ReadinessTimeout {
        resource: String,
        waited: Duration,
        checks: u64,
    },

    /// Caller cancelled a blocking operation
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Credential secret missing or malformed
    #[error("Secret error: {0}")]
    Secret(String),

    /// Failed to create or verify a stream client
    #[error("Connection error: {0}")]
    Connection(String),

    /// Publish attempted without an established connection
    #[error("not connected to stream cluster")]
    NotConnected,

    /// Connection reported as established but no client handle is present
    #[error("stream client is not available")]
    ClientUnavailable,

    /// Stream client operation error
    #[error("Stream client error: {0}")]
    StreamClient(String),

    /// Append to a stream failed
    #[error("failed to publish event to stream {stream}: {message}")]
    Publish { stream: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A startup step failed
    #[error("{stage}: {source}")]
    Startup {
        stage: StartupStage,
        #[source]
        source: Box<StreamingError>,
    },

    /// Startup lifecycle transition rejected
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// Result type for streaming operations
pub type StreamingResult<T> = Result<T, StreamingError>;

impl StreamingError {
    /// Wrap an error as the failure of a startup step
    pub fn startup(stage: StartupStage, source: StreamingError) -> Self {
        StreamingError::Startup {
            stage,
            source: Box::new(source),
        }
    }

    /// Whether re-running the failed operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamingError::ReadinessTimeout { .. }
            | StreamingError::Connection(_)
            | StreamingError::NotConnected
            | StreamingError::ClientUnavailable
            | StreamingError::StreamClient(_)
            | StreamingError::Publish { .. }
            | StreamingError::Timeout(_) => true,
            StreamingError::Startup { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for StreamingError {
    fn from(err: serde_json::Error) -> Self {
        StreamingError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for StreamingError {
    fn from(err: redis::RedisError) -> Self {
        StreamingError::StreamClient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_error_wraps_stage_and_source() {
        let err = StreamingError::startup(
            StartupStage::Authentication,
            StreamingError::Secret("secret data is empty".to_string()),
        );

        assert_eq!(
            err.to_string(),
            "authentication secret not found or empty: Secret error: secret data is empty"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_readiness_timeout_names_resource() {
        let err = StreamingError::ReadinessTimeout {
            resource: "valkey".to_string(),
            waited: Duration::from_secs(300),
            checks: 15,
        };

        let msg = err.to_string();
        assert!(msg.contains("'valkey'"));
        assert!(msg.contains("15 checks"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_publish_error_names_stream() {
        let err = StreamingError::Publish {
            stream: "{project:p1}:events".to_string(),
            message: "connection reset".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "failed to publish event to stream {project:p1}:events: connection reset"
        );
    }
}
