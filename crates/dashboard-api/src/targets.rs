//! Resolution of request targets to listers

use std::sync::Arc;

use dashboard_client::{AuthIdentity, ClientRegistry, Result};
use dashboard_resource::overview::{ControllerManagerSource, ExecSource};
use dashboard_resource::ResourceLister;

/// Where handlers read from
pub trait Targets: Send + Sync {
    /// Control plane, acting as the caller
    fn control_plane(&self, identity: &AuthIdentity) -> Result<Arc<dyn ResourceLister>>;

    /// A member cluster through the control plane's proxy
    fn member(&self, cluster: &str) -> Result<Arc<dyn ResourceLister>>;

    /// The management cluster hosting the control plane
    fn management(&self) -> Result<Arc<dyn ResourceLister>>;

    /// The controller manager running on the management cluster
    fn controller_manager(&self) -> Result<Arc<dyn ControllerManagerSource>>;

    /// Whether every target is configured
    fn ready(&self) -> bool;

    /// Drop cached member clients for clusters not in `registered`
    fn retain_members(&self, registered: &[String]);
}

/// [`Targets`] backed by a [`ClientRegistry`]
pub struct RegistryTargets {
    registry: Arc<ClientRegistry>,
}

impl RegistryTargets {
    /// Targets resolved through `registry`
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }
}

impl Targets for RegistryTargets {
    fn control_plane(&self, identity: &AuthIdentity) -> Result<Arc<dyn ResourceLister>> {
        Ok(Arc::new(self.registry.client_for_identity(identity)?))
    }

    fn member(&self, cluster: &str) -> Result<Arc<dyn ResourceLister>> {
        Ok(Arc::new(self.registry.member_cluster_client(cluster)?.client()))
    }

    fn management(&self) -> Result<Arc<dyn ResourceLister>> {
        Ok(Arc::new(self.registry.api_server_client()?.client()))
    }

    fn controller_manager(&self) -> Result<Arc<dyn ControllerManagerSource>> {
        Ok(Arc::new(ExecSource::new(
            self.registry.api_server_client()?.client(),
        )))
    }

    fn ready(&self) -> bool {
        let config = self.registry.config();
        config.control_plane().is_ok() && config.api_server().is_ok()
    }

    fn retain_members(&self, registered: &[String]) {
        self.registry
            .retain_members(registered.iter().map(String::as_str));
    }
}
