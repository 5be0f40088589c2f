//! Connection parameters for every API target
//!
//! A [`ConnectionConfig`] wraps a `kube::Config` with the client-side
//! settings the dashboard applies on top (TLS verification override, rate
//! limits, user agent). The [`ConfigStore`] holds the three process-lifetime
//! configurations and is filled exactly once at bootstrap.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue, USER_AGENT};
use http::Uri;
use kube::config::{AuthInfo, KubeConfigOptions, Kubeconfig};
use kube::Client;
use tower::limit::{ConcurrencyLimitLayer, RateLimitLayer};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identity::{AuthIdentity, IMPERSONATE_EXTRA_PREFIX};

/// Default sustained request rate per client
pub const DEFAULT_QPS: u64 = 50;

/// Default in-flight request cap per client
pub const DEFAULT_BURST: usize = 100;

/// Default user agent prefix
pub const DEFAULT_USER_AGENT: &str = "karmada-dashboard";

/// Default connect timeout for API clients
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read timeout for API clients
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Group/version path of the cluster aggregation proxy
const CLUSTER_PROXY_PREFIX: &str = "/apis/cluster.karmada.io/v1alpha1/clusters";

/// Client-side rate limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests per second
    pub qps: u64,
    /// Maximum concurrent in-flight requests
    pub burst: usize,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            qps: DEFAULT_QPS,
            burst: DEFAULT_BURST,
        }
    }
}

/// Connection parameters for one logical target
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    base: kube::Config,
    insecure: bool,
    rate_limit: RateLimit,
    user_agent: String,
}

impl ConnectionConfig {
    /// Wrap an existing kube configuration with default client settings
    pub fn new(mut base: kube::Config) -> Self {
        if base.connect_timeout.is_none() {
            base.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
        }
        if base.read_timeout.is_none() {
            base.read_timeout = Some(DEFAULT_READ_TIMEOUT);
        }
        Self {
            base,
            insecure: false,
            rate_limit: RateLimit::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Configuration for the pod's own API server
    pub fn in_cluster() -> Result<Self> {
        let base = kube::Config::incluster()
            .map_err(|e| Error::Config(format!("in-cluster configuration unavailable: {}", e)))?;
        Ok(Self::new(base))
    }

    /// Configuration read from a kubeconfig file, optionally pinned to a context
    pub async fn from_kubeconfig(path: &Path, context: Option<&str>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
            Error::Config(format!(
                "failed to read kubeconfig {}: {}",
                path.display(),
                e
            ))
        })?;
        let options = KubeConfigOptions {
            context: context.map(String::from),
            ..Default::default()
        };
        let base = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| Error::Config(format!("failed to load kubeconfig: {}", e)))?;
        Ok(Self::new(base))
    }

    /// Skip TLS certificate verification
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Replace the client-side rate limit
    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Replace the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Target host, as configured
    pub fn host(&self) -> String {
        self.base.cluster_url.to_string()
    }

    /// Whether TLS verification is skipped
    pub fn insecure(&self) -> bool {
        self.insecure
    }

    /// Client-side rate limit
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
    }

    /// User agent sent with every request
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Derive the configuration for a member cluster reached through the
    /// control plane's cluster proxy
    pub fn member_proxy(&self, cluster: &str) -> Result<Self> {
        let url = member_proxy_url(&self.host(), cluster);
        let uri: Uri = url
            .parse()
            .map_err(|e| Error::Construction(format!("invalid proxy url {}: {}", url, e)))?;
        let mut derived = self.clone();
        derived.base.cluster_url = uri;
        Ok(derived)
    }

    /// Derive a configuration acting as the given identity
    ///
    /// The original credentials are replaced by the identity's token and its
    /// impersonation settings; TLS, rate limits and user agent are kept.
    pub fn with_identity(&self, identity: &AuthIdentity) -> Result<Self> {
        let mut derived = self.clone();
        let mut auth_info = AuthInfo {
            token: Some(identity.token().to_string().into()),
            ..Default::default()
        };

        if let Some(imp) = identity.impersonation() {
            auth_info.impersonate = Some(imp.user.clone());
            if !imp.groups.is_empty() {
                auth_info.impersonate_groups = Some(imp.groups.clone());
            }
            for (key, values) in &imp.extra {
                let header = format!("{}{}", IMPERSONATE_EXTRA_PREFIX, key);
                let name = HeaderName::from_bytes(header.as_bytes()).map_err(|e| {
                    Error::Construction(format!("invalid extra header {}: {}", header, e))
                })?;
                for value in values {
                    let value = HeaderValue::from_str(value).map_err(|e| {
                        Error::Construction(format!("invalid extra header value for {}: {}", key, e))
                    })?;
                    derived.base.headers.push((name.clone(), value));
                }
            }
        }

        derived.base.auth_info = auth_info;
        Ok(derived)
    }

    /// Effective kube configuration with overrides applied
    pub fn to_kube_config(&self) -> Result<kube::Config> {
        let mut config = self.base.clone();
        if self.insecure {
            config.accept_invalid_certs = true;
        }
        let agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| Error::Construction(format!("invalid user agent: {}", e)))?;
        config.headers.retain(|(name, _)| *name != USER_AGENT);
        config.headers.push((USER_AGENT, agent));
        Ok(config)
    }

    /// Build a rate-limited client from this configuration
    pub fn build_client(&self) -> Result<Client> {
        let config = self.to_kube_config()?;
        let limit = self.rate_limit;
        let client = kube::client::ClientBuilder::try_from(config)
            .map_err(|e| Error::Construction(e.to_string()))?
            .with_layer(&ConcurrencyLimitLayer::new(limit.burst.max(1)))
            .with_layer(&RateLimitLayer::new(limit.qps.max(1), Duration::from_secs(1)))
            .build();
        Ok(client)
    }
}

/// Proxy URL for a member cluster relative to the control-plane host
pub fn member_proxy_url(host: &str, cluster: &str) -> String {
    format!(
        "{}{}/{}/proxy/",
        host.trim_end_matches('/'),
        CLUSTER_PROXY_PREFIX,
        cluster
    )
}

/// Inputs for one-shot bootstrap
#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    /// Kubeconfig for the host API server, used when not running in-cluster
    pub kubeconfig: Option<PathBuf>,
    /// Context within `kubeconfig`
    pub context: Option<String>,
    /// Kubeconfig for the Karmada control plane
    pub karmada_kubeconfig: Option<PathBuf>,
    /// Context within `karmada_kubeconfig`
    pub karmada_context: Option<String>,
    /// Skip TLS verification on every target
    pub insecure: bool,
    /// Client-side rate limit for every target
    pub rate_limit: RateLimit,
    /// Component suffix appended to the user agent
    pub component: Option<String>,
}

impl BootstrapOptions {
    fn user_agent(&self) -> String {
        match &self.component {
            Some(component) if !component.is_empty() => {
                format!("{}/{}", DEFAULT_USER_AGENT, component)
            }
            _ => DEFAULT_USER_AGENT.to_string(),
        }
    }

    fn apply(&self, config: ConnectionConfig) -> ConnectionConfig {
        config
            .with_insecure(self.insecure)
            .with_rate_limit(self.rate_limit)
            .with_user_agent(self.user_agent())
    }
}

/// Process-lifetime connection configurations, set once at bootstrap
#[derive(Debug, Default)]
pub struct ConfigStore {
    api_server: OnceLock<ConnectionConfig>,
    control_plane: OnceLock<ConnectionConfig>,
    member_template: OnceLock<ConnectionConfig>,
}

impl ConfigStore {
    /// Empty store; every getter fails with `NotInitialized` until set
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every configuration
    ///
    /// The API server prefers in-cluster configuration and falls back to the
    /// given kubeconfig. The control plane always needs an explicit kubeconfig.
    pub async fn bootstrap(options: &BootstrapOptions) -> Result<Self> {
        let store = Self::new();

        let api_server = match ConnectionConfig::in_cluster() {
            Ok(config) => {
                info!("using in-cluster configuration for the api server");
                config
            }
            Err(in_cluster_err) => {
                let path = options.kubeconfig.as_deref().ok_or_else(|| {
                    Error::Config(format!(
                        "no kubeconfig given and {}",
                        in_cluster_err
                    ))
                })?;
                info!(path = %path.display(), "using kubeconfig for the api server");
                ConnectionConfig::from_kubeconfig(path, options.context.as_deref()).await?
            }
        };
        store.set_api_server(options.apply(api_server))?;

        let karmada_path = options
            .karmada_kubeconfig
            .as_deref()
            .ok_or_else(|| Error::Config("karmada kubeconfig is required".to_string()))?;
        let control_plane =
            ConnectionConfig::from_kubeconfig(karmada_path, options.karmada_context.as_deref())
                .await?;
        let control_plane = options.apply(control_plane);
        info!(host = %control_plane.host(), "loaded control-plane configuration");
        store.set_control_plane(control_plane)?;

        Ok(store)
    }

    /// Set the API server configuration
    pub fn set_api_server(&self, config: ConnectionConfig) -> Result<()> {
        self.api_server
            .set(config)
            .map_err(|_| Error::Config("api-server configuration already set".to_string()))
    }

    /// Set the control-plane configuration; also seeds the member template
    pub fn set_control_plane(&self, config: ConnectionConfig) -> Result<()> {
        debug!(host = %config.host(), "seeding member proxy template");
        self.member_template
            .set(config.clone())
            .map_err(|_| Error::Config("member template already set".to_string()))?;
        self.control_plane
            .set(config)
            .map_err(|_| Error::Config("control-plane configuration already set".to_string()))
    }

    /// API server configuration
    pub fn api_server(&self) -> Result<&ConnectionConfig> {
        self.api_server.get().ok_or(Error::NotInitialized("api-server"))
    }

    /// Control-plane configuration
    pub fn control_plane(&self) -> Result<&ConnectionConfig> {
        self.control_plane
            .get()
            .ok_or(Error::NotInitialized("control-plane"))
    }

    /// Template from which member proxy configurations are derived
    pub fn member_template(&self) -> Result<&ConnectionConfig> {
        self.member_template
            .get()
            .ok_or(Error::NotInitialized("member-template"))
    }
}

#[cfg(test)]
pub(crate) fn test_config(url: &str) -> ConnectionConfig {
    ConnectionConfig::new(kube::Config::new(url.parse().unwrap()))
}
