//! Per-request authentication
//!
//! Resolution order:
//! 1. `Authorization: Bearer <token>` plus any impersonation headers
//! 2. the fallback credential from the durable store, bounded by a timeout
//! 3. otherwise `Unauthorized`

use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identity::{identity_from_headers, AuthIdentity};
use crate::store::{CredentialStore, FALLBACK_TOKEN_KEY};
use crate::token_review::UsernameResolver;

/// Default bound on the fallback store lookup
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Derives an [`AuthIdentity`] from inbound request headers
pub struct RequestAuthenticator {
    store: Option<Arc<dyn CredentialStore>>,
    resolver: Option<Arc<dyn UsernameResolver>>,
    lookup_timeout: Duration,
}

impl RequestAuthenticator {
    /// Authenticator with no fallback store and no username resolution
    pub fn new() -> Self {
        Self {
            store: None,
            resolver: None,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Read the fallback credential from `store`
    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Resolve usernames of non-impersonating tokens with `resolver`
    pub fn with_resolver(mut self, resolver: Arc<dyn UsernameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Bound on the fallback store lookup
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Authenticate one request
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthIdentity> {
        let identity = match identity_from_headers(headers) {
            Some(identity) => identity,
            None => match self.fallback_token().await {
                Some(token) => {
                    debug!("using fallback credential");
                    AuthIdentity::from_token(token)
                }
                None => return Err(Error::Unauthorized("no credential presented".into())),
            },
        };

        if identity.username().is_some() {
            return Ok(identity);
        }
        self.resolve_username(identity).await
    }

    async fn fallback_token(&self) -> Option<String> {
        let store = self.store.as_ref()?;
        match tokio::time::timeout(self.lookup_timeout, store.get(FALLBACK_TOKEN_KEY)).await {
            Ok(Ok(token)) => token.filter(|t| !t.is_empty()),
            Ok(Err(e)) => {
                warn!(error = %e, "fallback credential lookup failed");
                None
            }
            Err(_) => {
                let e = Error::Timeout(format!(
                    "fallback credential lookup exceeded {:?}",
                    self.lookup_timeout
                ));
                warn!(error = %e, "fallback credential lookup failed");
                None
            }
        }
    }

    async fn resolve_username(&self, identity: AuthIdentity) -> Result<AuthIdentity> {
        let Some(resolver) = &self.resolver else {
            return Ok(identity);
        };
        match resolver.resolve(identity.token()).await {
            Ok(username) => Ok(identity.with_username(username)),
            Err(Error::Unauthorized(msg)) => Err(Error::Unauthorized(msg)),
            Err(e) => {
                warn!(error = %e, "username resolution failed, continuing without username");
                Ok(identity)
            }
        }
    }
}

impl Default for RequestAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}
