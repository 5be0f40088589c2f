//! Durable credential stores for the fallback bearer token

use std::collections::HashMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Api;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::registry::{ClientHandle, ClientTarget};

/// Key under which the fallback credential is stored
pub const FALLBACK_TOKEN_KEY: &str = "service-account-token";

/// Name of the Secret backing [`SecretCredentialStore`]
pub const CREDENTIAL_SECRET_NAME: &str = "karmada-dashboard";

/// Key-value store holding credentials
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Credential store backed by one Kubernetes Secret
///
/// Each data key of the Secret is a store key.
pub struct SecretCredentialStore {
    handle: ClientHandle,
    namespace: String,
}

impl SecretCredentialStore {
    /// Store reading the credential Secret in `namespace` through `handle`
    pub fn new(handle: ClientHandle, namespace: impl Into<String>) -> Self {
        Self {
            handle,
            namespace: namespace.into(),
        }
    }

    /// Target the Secret is read from
    pub fn target(&self) -> &ClientTarget {
        self.handle.target()
    }
}

#[async_trait]
impl CredentialStore for SecretCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let api: Api<Secret> = Api::namespaced(self.handle.client(), &self.namespace);
        let Some(secret) = api.get_opt(CREDENTIAL_SECRET_NAME).await? else {
            debug!(namespace = %self.namespace, name = CREDENTIAL_SECRET_NAME, "credential secret not found");
            return Ok(None);
        };
        Ok(secret_value(&secret, key))
    }
}

/// Value of `key` in a Secret's data, falling back to stringData
pub(crate) fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    if let Some(bytes) = secret.data.as_ref().and_then(|d| d.get(key)) {
        return String::from_utf8(bytes.0.clone()).ok();
    }
    secret
        .string_data
        .as_ref()
        .and_then(|d| d.get(key))
        .cloned()
}

/// In-process credential store for development and tests
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`
    pub async fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().await.insert(key.into(), value.into());
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }
}
