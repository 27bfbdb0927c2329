// Copyright (c) 2025 - Cowboy AI, Inc.
//! Kubernetes-backed resource reader

use async_trait::async_trait;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use serde_json::Value;
use tracing::debug;

use super::{ObjectKey, ReadError, ReadResult, ResourceKind, ResourceReader};

/// [`ResourceReader`] over the Kubernetes API using dynamic objects
#[derive(Clone)]
pub struct KubeResourceReader {
    client: Client,
}

impl KubeResourceReader {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the in-cluster or kubeconfig environment
    pub async fn try_default() -> Result<Self, kube::Error> {
        Ok(Self::new(Client::try_default().await?))
    }

    fn api_for(&self, kind: &ResourceKind, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(&kind.group, &kind.version, &kind.kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, &kind.plural);
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }
}

#[async_trait]
impl ResourceReader for KubeResourceReader {
    async fn get(&self, kind: &ResourceKind, key: &ObjectKey) -> ReadResult<Value> {
        debug!(kind = %kind, key = %key, "Fetching cluster object");

        let object = match self.api_for(kind, &key.namespace).get(&key.name).await {
            Ok(object) => object,
            Err(kube::Error::Api(response)) if response.code == 404 => {
                return Err(ReadError::not_found(kind, key));
            }
            Err(e) => return Err(ReadError::api(kind, key, e.to_string())),
        };

        serde_json::to_value(object).map_err(|e| ReadError::Decode {
            kind: kind.to_string(),
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}
