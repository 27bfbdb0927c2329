// Copyright (c) 2025 - Cowboy AI, Inc.

//! Streaming configuration
//!
//! A single immutable [`StreamingConfig`] is built once at startup and handed
//! to every component constructor, usually behind an `Arc`.

use std::time::Duration;

use crate::errors::{StreamingError, StreamingResult};

/// Default name of the stream cluster service and of its custom resource
pub const DEFAULT_SERVICE_NAME: &str = "kibaship-valkey-cluster-kibaship-com";

/// Default name of the secret holding the stream store credential
pub const DEFAULT_SECRET_NAME: &str = "kibaship-valkey-cluster-kibaship-com";

/// Configuration for the stream store connection and publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingConfig {
    /// Stream cluster service name (also the readiness resource name)
    pub service_name: String,
    /// Secret containing the stream store credential
    pub secret_name: String,
    /// Stream store port
    pub port: u16,
    /// Namespace the cluster, its resource and its secret live in
    pub namespace: String,
    /// Maximum time to wait for the cluster to become ready
    pub startup_timeout: Duration,
    /// Interval between readiness checks
    pub readiness_check_interval: Duration,
    /// Maximum number of project groups a batch publishes concurrently
    pub batch_size: usize,
    /// Deadline for each append issued by a batch
    pub batch_timeout: Duration,
    /// Retries handed to the cluster client
    pub retry_attempts: u32,
    /// Whether the store runs in cluster mode
    pub cluster_enabled: bool,
    /// Dial timeout
    pub connection_timeout: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Whether high-traffic projects are spread over shard streams
    pub stream_sharding_enabled: bool,
    /// Number of shard streams per high-traffic project
    pub stream_shards_per_project: u32,
    /// Sequence number above which a project counts as high traffic
    pub high_traffic_threshold: i64,
}

impl StreamingConfig {
    /// Create a configuration with production defaults for a namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            secret_name: DEFAULT_SECRET_NAME.to_string(),
            port: 6379,
            namespace: namespace.into(),
            startup_timeout: Duration::from_secs(5 * 60),
            readiness_check_interval: Duration::from_secs(20),
            batch_size: 100,
            batch_timeout: Duration::from_secs(5),
            retry_attempts: 3,
            cluster_enabled: true,
            connection_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            stream_sharding_enabled: true,
            stream_shards_per_project: 4,
            high_traffic_threshold: 1000,
        }
    }

    /// Set the service name
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Set the secret name
    pub fn with_secret_name(mut self, secret_name: impl Into<String>) -> Self {
        self.secret_name = secret_name.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the startup timeout
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Set the readiness check interval
    pub fn with_readiness_check_interval(mut self, interval: Duration) -> Self {
        self.readiness_check_interval = interval;
        self
    }

    /// Enable or disable cluster mode
    pub fn with_cluster_enabled(mut self, enabled: bool) -> Self {
        self.cluster_enabled = enabled;
        self
    }

    /// Configure stream sharding
    pub fn with_sharding(mut self, enabled: bool, shards_per_project: u32, threshold: i64) -> Self {
        self.stream_sharding_enabled = enabled;
        self.stream_shards_per_project = shards_per_project;
        self.high_traffic_threshold = threshold;
        self
    }

    /// Set batch concurrency and per-append deadline
    pub fn with_batching(mut self, batch_size: usize, batch_timeout: Duration) -> Self {
        self.batch_size = batch_size;
        self.batch_timeout = batch_timeout;
        self
    }

    /// Seed address used for cluster discovery
    ///
    /// Returns: `{service}.{namespace}.svc.cluster.local`
    pub fn seed_address(&self) -> String {
        format!("{}.{}.svc.cluster.local", self.service_name, self.namespace)
    }

    /// Validate the configuration
    pub fn validate(&self) -> StreamingResult<()> {
        if self.namespace.is_empty() {
            return Err(StreamingError::Configuration(
                "namespace is required".to_string(),
            ));
        }
        if self.service_name.is_empty() {
            return Err(StreamingError::Configuration(
                "stream service name is required".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(StreamingError::Configuration(
                "valid stream store port is required".to_string(),
            ));
        }
        if self.startup_timeout.is_zero() {
            return Err(StreamingError::Configuration(
                "startup timeout must be positive".to_string(),
            ));
        }
        if self.readiness_check_interval.is_zero() {
            return Err(StreamingError::Configuration(
                "readiness check interval must be positive".to_string(),
            ));
        }
        if self.stream_sharding_enabled && self.stream_shards_per_project == 0 {
            return Err(StreamingError::Configuration(
                "shards per project must be positive when sharding is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from `STREAMING_*` environment variables
    ///
    /// `STREAMING_NAMESPACE` is required; everything else falls back to the
    /// defaults of [`StreamingConfig::new`]. The result is validated.
    pub fn from_env() -> StreamingResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> StreamingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let namespace = lookup("STREAMING_NAMESPACE").ok_or_else(|| {
            StreamingError::Configuration("STREAMING_NAMESPACE is not set".to_string())
        })?;
        let mut config = Self::new(namespace);

        if let Some(name) = lookup("STREAMING_SERVICE_NAME") {
            config.service_name = name;
        }
        if let Some(name) = lookup("STREAMING_SECRET_NAME") {
            config.secret_name = name;
        }
        if let Some(port) = parse_var(&lookup, "STREAMING_PORT")? {
            config.port = port;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "STREAMING_STARTUP_TIMEOUT_SECS")? {
            config.startup_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "STREAMING_CHECK_INTERVAL_SECS")? {
            config.readiness_check_interval = Duration::from_secs(secs);
        }
        if let Some(enabled) = parse_var(&lookup, "STREAMING_CLUSTER_ENABLED")? {
            config.cluster_enabled = enabled;
        }
        if let Some(enabled) = parse_var(&lookup, "STREAMING_SHARDING_ENABLED")? {
            config.stream_sharding_enabled = enabled;
        }
        if let Some(shards) = parse_var(&lookup, "STREAMING_SHARDS_PER_PROJECT")? {
            config.stream_shards_per_project = shards;
        }
        if let Some(threshold) = parse_var(&lookup, "STREAMING_HIGH_TRAFFIC_THRESHOLD")? {
            config.high_traffic_threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> StreamingResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            StreamingError::Configuration(format!("invalid value '{}' for {}: {}", raw, key, e))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use test_case::test_case;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = StreamingConfig::new("kibaship");

        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(config.port, 6379);
        assert_eq!(config.startup_timeout, Duration::from_secs(300));
        assert_eq!(config.readiness_check_interval, Duration::from_secs(20));
        assert_eq!(config.stream_shards_per_project, 4);
        assert_eq!(config.high_traffic_threshold, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_seed_address() {
        let config = StreamingConfig::new("kibaship").with_service_name("valkey");
        assert_eq!(config.seed_address(), "valkey.kibaship.svc.cluster.local");
    }

    #[test_case(StreamingConfig::new(""), "namespace is required" ; "missing namespace")]
    #[test_case(StreamingConfig::new("ns").with_service_name(""), "service name is required" ; "missing service")]
    #[test_case(StreamingConfig::new("ns").with_port(0), "port is required" ; "zero port")]
    #[test_case(StreamingConfig::new("ns").with_startup_timeout(Duration::ZERO), "startup timeout must be positive" ; "zero timeout")]
    #[test_case(StreamingConfig::new("ns").with_readiness_check_interval(Duration::ZERO), "check interval must be positive" ; "zero interval")]
    #[test_case(StreamingConfig::new("ns").with_sharding(true, 0, 10), "shards per project" ; "zero shards")]
    fn test_validation_rejects(config: StreamingConfig, expected: &str) {
        let err = config.validate().unwrap_err();
        assert!(
            err.to_string().contains(expected),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn test_zero_shards_allowed_when_sharding_disabled() {
        let config = StreamingConfig::new("ns").with_sharding(false, 0, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = StreamingConfig::from_lookup(lookup_from(&[
            ("STREAMING_NAMESPACE", "platform"),
            ("STREAMING_SERVICE_NAME", "events"),
            ("STREAMING_PORT", "7000"),
            ("STREAMING_STARTUP_TIMEOUT_SECS", "60"),
            ("STREAMING_CLUSTER_ENABLED", "false"),
            ("STREAMING_SHARDS_PER_PROJECT", "8"),
        ]))
        .unwrap();

        assert_eq!(config.namespace, "platform");
        assert_eq!(config.service_name, "events");
        assert_eq!(config.port, 7000);
        assert_eq!(config.startup_timeout, Duration::from_secs(60));
        assert!(!config.cluster_enabled);
        assert_eq!(config.stream_shards_per_project, 8);
        assert_eq!(config.secret_name, DEFAULT_SECRET_NAME);
    }

    #[test]
    fn test_from_lookup_requires_namespace() {
        let err = StreamingConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("STREAMING_NAMESPACE"));
    }

    #[test]
    fn test_from_lookup_rejects_unparseable_port() {
        let err = StreamingConfig::from_lookup(lookup_from(&[
            ("STREAMING_NAMESPACE", "platform"),
            ("STREAMING_PORT", "not-a-port"),
        ]))
        .unwrap_err();

        assert!(matches!(err, StreamingError::Configuration(_)));
        assert!(err.to_string().contains("STREAMING_PORT"));
    }

    #[test]
    fn test_from_lookup_validates_result() {
        let err = StreamingConfig::from_lookup(lookup_from(&[
            ("STREAMING_NAMESPACE", "platform"),
            ("STREAMING_STARTUP_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("startup timeout"));
    }
}
