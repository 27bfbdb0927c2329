// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stream store credential lookup
//!
//! The credential lives in a secret that must hold exactly one field. The
//! field name carries no meaning; only its value is used. Anything else
//! (no data, several fields, an empty value) is rejected instead of guessed.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::StreamingConfig;
use crate::errors::{StreamingError, StreamingResult};
use crate::resources::{ObjectKey, ResourceKind, ResourceReader};

/// Supplies the stream store credential
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Fetch the credential
    async fn get_credential(&self) -> StreamingResult<String>;
}

/// [`SecretProvider`] reading a single-field cluster secret
pub struct ClusterSecretProvider {
    reader: Arc<dyn ResourceReader>,
    key: ObjectKey,
}

impl ClusterSecretProvider {
    /// Read the configured secret from the configured namespace
    pub fn new(reader: Arc<dyn ResourceReader>, config: &StreamingConfig) -> Self {
        Self {
            reader,
            key: ObjectKey::new(&config.namespace, &config.secret_name),
        }
    }
}

#[async_trait]
impl SecretProvider for ClusterSecretProvider {
    #[instrument(skip_all, fields(secret = %self.key))]
    async fn get_credential(&self) -> StreamingResult<String> {
        let object = self
            .reader
            .get(&ResourceKind::secret(), &self.key)
            .await
            .map_err(|e| StreamingError::Secret(e.to_string()))?;
        let secret: Secret = serde_json::from_value(object).map_err(|e| {
            StreamingError::Secret(format!("failed to decode secret {}: {}", self.key, e))
        })?;

        let credential = single_value(secret)?;
        debug!("Fetched stream store credential");
        Ok(credential)
    }
}

fn single_value(secret: Secret) -> StreamingResult<String> {
    let data = secret
        .data
        .ok_or_else(|| StreamingError::Secret("secret data is nil".to_string()))?;

    if data.is_empty() {
        return Err(StreamingError::Secret("secret data is empty".to_string()));
    }
    if data.len() != 1 {
        return Err(StreamingError::Secret(format!(
            "expected exactly one field in secret, got {} fields",
            data.len()
        )));
    }

    let Some((_, value)) = data.into_iter().next() else {
        return Err(StreamingError::Secret("secret data is empty".to_string()));
    };
    if value.0.is_empty() {
        return Err(StreamingError::Secret(
            "secret contains empty password".to_string(),
        ));
    }

    String::from_utf8(value.0)
        .map_err(|_| StreamingError::Secret("secret value is not valid UTF-8".to_string()))
}
