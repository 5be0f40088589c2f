//! Cached API clients per target
//!
//! Clients are built lazily from the [`ConfigStore`] and cached for the life
//! of the process. Construction is a pure function of the target, so two
//! requests racing on the first build may both construct a client; the first
//! insert wins and every caller gets the cached winner.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashboard_common::metrics::record_client_construction;
use dashboard_common::MGMT_CLUSTER_NAME;
use kube::Client;
use tracing::{debug, info};

use crate::config::ConfigStore;
use crate::current_user;
use crate::error::{Error, Result};
use crate::identity::AuthIdentity;
use crate::store::SecretCredentialStore;

/// Cache key of a client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientTarget {
    /// Karmada control plane
    ControlPlane,
    /// Host cluster API server, reached directly
    ApiServer,
    /// Member cluster reached through the control-plane proxy
    Member(String),
}

impl ClientTarget {
    fn metric_label(&self) -> &'static str {
        match self {
            Self::ControlPlane => "control_plane",
            Self::ApiServer => "api_server",
            Self::Member(_) => "member",
        }
    }
}

impl fmt::Display for ClientTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControlPlane => f.write_str("control-plane"),
            Self::ApiServer => f.write_str("api-server"),
            Self::Member(name) => write!(f, "member:{}", name),
        }
    }
}

struct HandleInner {
    target: ClientTarget,
    host: String,
    client: Client,
}

/// Shared handle to a cached client
#[derive(Clone)]
pub struct ClientHandle(Arc<HandleInner>);

impl ClientHandle {
    fn new(target: ClientTarget, host: String, client: Client) -> Self {
        Self(Arc::new(HandleInner {
            target,
            host,
            client,
        }))
    }

    /// Underlying client (cheap to clone)
    pub fn client(&self) -> Client {
        self.0.client.clone()
    }

    /// Target this handle is bound to
    pub fn target(&self) -> &ClientTarget {
        &self.0.target
    }

    /// Host the client talks to
    pub fn host(&self) -> &str {
        &self.0.host
    }

    /// Whether both handles share the same cached client
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("target", &self.0.target)
            .field("host", &self.0.host)
            .finish()
    }
}

/// Builds and caches clients for every target
pub struct ClientRegistry {
    config: Arc<ConfigStore>,
    cache: DashMap<ClientTarget, ClientHandle>,
}

impl ClientRegistry {
    /// Registry over a bootstrapped configuration store
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self {
            config,
            cache: DashMap::new(),
        }
    }

    /// Configuration the registry builds from
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Client for the Karmada control plane
    pub fn control_plane_client(&self) -> Result<ClientHandle> {
        self.get_or_build(ClientTarget::ControlPlane)
    }

    /// Client for the host cluster API server
    pub fn api_server_client(&self) -> Result<ClientHandle> {
        self.get_or_build(ClientTarget::ApiServer)
    }

    /// Client for a member cluster
    ///
    /// `mgmt-cluster` addresses the host cluster directly and returns the
    /// API server client.
    pub fn member_cluster_client(&self, name: &str) -> Result<ClientHandle> {
        if name == MGMT_CLUSTER_NAME {
            return self.api_server_client();
        }
        validate_cluster_name(name)?;
        self.get_or_build(ClientTarget::Member(name.to_string()))
    }

    /// Uncached control-plane client acting as the request's identity
    pub fn client_for_identity(&self, identity: &AuthIdentity) -> Result<Client> {
        let config = self.config.control_plane()?.with_identity(identity)?;
        let client = config.build_client()?;
        record_client_construction("identity");
        Ok(client)
    }

    /// Drop the cached client for a target; returns whether one was cached
    pub fn invalidate(&self, target: &ClientTarget) -> bool {
        let removed = self.cache.remove(target).is_some();
        if removed {
            debug!(target = %target, "invalidated cached client");
        }
        removed
    }

    /// Drop the cached client for a member cluster
    pub fn invalidate_member(&self, name: &str) -> bool {
        self.invalidate(&ClientTarget::Member(name.to_string()))
    }

    /// Drop every cached client
    pub fn invalidate_all(&self) {
        self.cache.clear();
        debug!("invalidated all cached clients");
    }

    /// Drop cached member clients whose cluster is no longer registered
    ///
    /// Returns the evicted member names.
    pub fn retain_members<'a>(&self, registered: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let registered: HashSet<&str> = registered.into_iter().collect();
        let mut evicted = Vec::new();
        self.cache.retain(|target, _| match target {
            ClientTarget::Member(name) if !registered.contains(name.as_str()) => {
                evicted.push(name.clone());
                false
            }
            _ => true,
        });
        if !evicted.is_empty() {
            info!(clusters = ?evicted, "evicted clients of deregistered clusters");
        }
        evicted
    }

    /// Fallback credential store, read through the host API server
    pub fn credential_store(&self, namespace: impl Into<String>) -> Result<SecretCredentialStore> {
        Ok(SecretCredentialStore::new(self.api_server_client()?, namespace))
    }

    /// Targets that currently have a cached client
    pub fn cached_targets(&self) -> Vec<ClientTarget> {
        self.cache.iter().map(|e| e.key().clone()).collect()
    }

    fn get_or_build(&self, target: ClientTarget) -> Result<ClientHandle> {
        if let Some(handle) = self.cache.get(&target) {
            return Ok(handle.clone());
        }

        // Built outside the shard lock; a concurrent builder may win the insert
        let built = self.build(&target)?;
        let handle = self
            .cache
            .entry(target)
            .or_insert_with(|| built)
            .clone();
        Ok(handle)
    }

    fn build(&self, target: &ClientTarget) -> Result<ClientHandle> {
        let config = match target {
            ClientTarget::ControlPlane => self.config.control_plane()?.clone(),
            ClientTarget::ApiServer => self.config.api_server()?.clone(),
            ClientTarget::Member(name) => self.config.member_template()?.member_proxy(name)?,
        };

        let host = config.host();
        let client = config.build_client()?;
        record_client_construction(target.metric_label());
        debug!(
            target = %target,
            host = %host,
            current_user = current_user::get().as_deref().unwrap_or(""),
            "built api client"
        );
        Ok(ClientHandle::new(target.clone(), host, client))
    }
}

/// Reject names that cannot appear in a proxy path
pub fn validate_cluster_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 253
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
                && !label.starts_with('-')
                && !label.ends_with('-')
        });
    if valid {
        Ok(())
    } else {
        Err(Error::Construction(format!(
            "invalid member cluster name {:?}",
            name
        )))
    }
}
