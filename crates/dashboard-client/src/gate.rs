//! Per-cluster authorization gate
//!
//! The gate consults an external [`AccessPolicy`] on every call; decisions are
//! never cached so that revocation takes effect immediately. Every check is
//! bounded by the gate timeout and the request scope, whichever ends first.
//!
//! Callers that aggregate over clusters use [`AuthorizationGate::filter_accessible`],
//! where a failed check only drops the affected cluster. Single-cluster routes
//! use [`AuthorizationGate::require`], where a failed check is `Forbidden`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashboard_common::metrics::{record_authz_decision, AuthzDecision};
use dashboard_common::MGMT_CLUSTER_NAME;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::scope::RequestScope;

/// Default bound on one policy round trip
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Failure of a policy check
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The check did not complete in time
    #[error("policy check timed out after {0:?}")]
    Timeout(Duration),

    /// The request scope was cancelled during the check
    #[error("policy check cancelled")]
    Cancelled,

    /// The policy could not be evaluated
    #[error("policy evaluation failed: {0}")]
    Evaluation(String),

    /// The policy service could not be reached
    #[error("policy service unavailable: {0}")]
    Unavailable(String),
}

/// External capability deciding cluster access
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Whether `user` may act on `cluster`
    async fn has_access(&self, user: &str, cluster: &str) -> std::result::Result<bool, PolicyError>;
}

/// Outcome of a completed check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access granted
    Allow,
    /// Access refused by policy
    Deny,
}

/// Gate deciding whether an identity may act on a cluster
#[derive(Clone)]
pub struct AuthorizationGate {
    policy: Option<Arc<dyn AccessPolicy>>,
    timeout: Duration,
}

impl AuthorizationGate {
    /// Gate backed by `policy`
    pub fn new(policy: Arc<dyn AccessPolicy>) -> Self {
        Self {
            policy: Some(policy),
            timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    /// Gate with no policy configured; every check is allowed
    pub fn allow_all() -> Self {
        Self {
            policy: None,
            timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    /// Bound on one policy round trip
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a policy is configured
    pub fn is_enforcing(&self) -> bool {
        self.policy.is_some()
    }

    /// Check one cluster
    ///
    /// No username, or no configured policy, is an explicit allow.
    #[instrument(skip(self, scope))]
    pub async fn check(
        &self,
        username: Option<&str>,
        cluster: &str,
        scope: &RequestScope,
    ) -> std::result::Result<AccessDecision, PolicyError> {
        let (Some(user), Some(policy)) = (username.filter(|u| !u.is_empty()), &self.policy) else {
            record_authz_decision(AuthzDecision::Bypass);
            return Ok(AccessDecision::Allow);
        };

        let bound = self.timeout.min(scope.remaining());
        let outcome = tokio::select! {
            biased;
            _ = scope.cancelled() => Err(PolicyError::Cancelled),
            result = tokio::time::timeout(bound, policy.has_access(user, cluster)) => {
                result.unwrap_or(Err(PolicyError::Timeout(bound)))
            }
        };

        match outcome {
            Ok(true) => {
                record_authz_decision(AuthzDecision::Allow);
                debug!("cluster access allowed");
                Ok(AccessDecision::Allow)
            }
            Ok(false) => {
                record_authz_decision(AuthzDecision::Deny);
                debug!("cluster access denied");
                Ok(AccessDecision::Deny)
            }
            Err(e) => {
                record_authz_decision(AuthzDecision::Error);
                Err(e)
            }
        }
    }

    /// Require access to one cluster; denial and check failure are `Forbidden`
    pub async fn require(
        &self,
        username: Option<&str>,
        cluster: &str,
        scope: &RequestScope,
    ) -> Result<()> {
        match self.check(username, cluster, scope).await {
            Ok(AccessDecision::Allow) => Ok(()),
            Ok(AccessDecision::Deny) => Err(Error::Forbidden(format!(
                "user {} may not access cluster {}",
                username.unwrap_or_default(),
                cluster
            ))),
            Err(e) => Err(Error::Forbidden(format!(
                "access check for cluster {} failed: {}",
                cluster, e
            ))),
        }
    }

    /// Require administrative access to the management cluster
    ///
    /// Unlike [`Self::require`], an anonymous request or a gate without a
    /// policy is refused: admin rights must be granted explicitly.
    pub async fn require_admin(&self, username: Option<&str>, scope: &RequestScope) -> Result<()> {
        if !self.is_enforcing() {
            return Err(Error::Forbidden(
                "management routes require an access policy".into(),
            ));
        }
        if username.map_or(true, str::is_empty) {
            return Err(Error::Forbidden(
                "management routes require an impersonated user".into(),
            ));
        }
        self.require(username, MGMT_CLUSTER_NAME, scope).await
    }

    /// Keep only the items whose cluster the user may access
    ///
    /// All checks run concurrently. Input order is preserved. Items whose
    /// check fails are dropped rather than failing the whole call.
    pub async fn filter_accessible<T, F>(
        &self,
        username: Option<&str>,
        items: Vec<T>,
        name_of: F,
        scope: &RequestScope,
    ) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        let decisions = join_all(
            items
                .iter()
                .map(|item| self.check(username, name_of(item), scope)),
        )
        .await;

        items
            .into_iter()
            .zip(decisions)
            .filter_map(|(item, decision)| match decision {
                Ok(AccessDecision::Allow) => Some(item),
                Ok(AccessDecision::Deny) => None,
                Err(e) => {
                    warn!(cluster = %name_of(&item), error = %e, "skipping cluster after failed access check");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn scope() -> RequestScope {
        RequestScope::new(Duration::from_secs(30))
    }

    fn policy_from(outcomes: HashMap<&'static str, std::result::Result<bool, PolicyError>>) -> MockAccessPolicy {
        let mut policy = MockAccessPolicy::new();
        policy
            .expect_has_access()
            .returning(move |_, cluster| outcomes[cluster].clone());
        policy
    }

    #[tokio::test]
    async fn test_no_username_bypasses_policy() {
        let mut policy = MockAccessPolicy::new();
        policy.expect_has_access().never();
        let gate = AuthorizationGate::new(Arc::new(policy));

        assert_eq!(
            gate.check(None, "member1", &scope()).await,
            Ok(AccessDecision::Allow)
        );
        assert_eq!(
            gate.check(Some(""), "member1", &scope()).await,
            Ok(AccessDecision::Allow)
        );
    }

    #[tokio::test]
    async fn test_no_policy_allows() {
        let gate = AuthorizationGate::allow_all();
        assert!(!gate.is_enforcing());
        assert_eq!(
            gate.check(Some("alice"), "member1", &scope()).await,
            Ok(AccessDecision::Allow)
        );
    }

    #[tokio::test]
    async fn test_filter_includes_iff_allowed() {
        let outcomes = HashMap::from([
            ("allowed-a", Ok(true)),
            ("denied", Ok(false)),
            ("errored", Err(PolicyError::Unavailable("down".into()))),
            ("allowed-b", Ok(true)),
        ]);
        let gate = AuthorizationGate::new(Arc::new(policy_from(outcomes)));

        let orders = [
            vec!["allowed-a", "denied", "errored", "allowed-b"],
            vec!["errored", "allowed-b", "denied", "allowed-a"],
            vec!["denied", "errored", "allowed-a", "allowed-b"],
        ];
        for order in orders {
            let expected: Vec<&str> = order
                .iter()
                .copied()
                .filter(|c| c.starts_with("allowed"))
                .collect();
            let kept = gate
                .filter_accessible(Some("alice"), order.clone(), |c| *c, &scope())
                .await;
            assert_eq!(kept, expected);
        }
    }

    #[tokio::test]
    async fn test_require_maps_deny_and_error_to_forbidden() {
        let outcomes = HashMap::from([
            ("ok", Ok(true)),
            ("no", Ok(false)),
            ("broken", Err(PolicyError::Evaluation("bad policy".into()))),
        ]);
        let gate = AuthorizationGate::new(Arc::new(policy_from(outcomes)));

        assert!(gate.require(Some("alice"), "ok", &scope()).await.is_ok());
        assert!(matches!(
            gate.require(Some("alice"), "no", &scope()).await,
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            gate.require(Some("alice"), "broken", &scope()).await,
            Err(Error::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_require_admin_needs_policy_and_user() {
        let open = AuthorizationGate::allow_all();
        assert!(matches!(
            open.require_admin(Some("alice"), &scope()).await,
            Err(Error::Forbidden(_))
        ));

        let gate = AuthorizationGate::new(Arc::new(policy_from(HashMap::from([(
            MGMT_CLUSTER_NAME,
            Ok(true),
        )]))));
        assert!(gate.require_admin(Some("alice"), &scope()).await.is_ok());
        assert!(matches!(
            gate.require_admin(None, &scope()).await,
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            gate.require_admin(Some(""), &scope()).await,
            Err(Error::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_require_admin_denied() {
        let gate = AuthorizationGate::new(Arc::new(policy_from(HashMap::from([(
            MGMT_CLUSTER_NAME,
            Ok(false),
        )]))));
        assert!(matches!(
            gate.require_admin(Some("bob"), &scope()).await,
            Err(Error::Forbidden(_))
        ));
    }

    struct HangingPolicy;

    #[async_trait]
    impl AccessPolicy for HangingPolicy {
        async fn has_access(&self, _: &str, _: &str) -> std::result::Result<bool, PolicyError> {
            futures::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_bounded_by_timeout() {
        let gate =
            AuthorizationGate::new(Arc::new(HangingPolicy)).with_timeout(Duration::from_secs(2));
        assert_eq!(
            gate.check(Some("alice"), "member1", &scope()).await,
            Err(PolicyError::Timeout(Duration::from_secs(2)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_observes_cancellation() {
        let gate = AuthorizationGate::new(Arc::new(HangingPolicy));
        let scope = scope();
        scope.cancel();
        assert_eq!(
            gate.check(Some("alice"), "member1", &scope).await,
            Err(PolicyError::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_policy_drops_cluster() {
        let gate =
            AuthorizationGate::new(Arc::new(HangingPolicy)).with_timeout(Duration::from_secs(1));
        let kept = gate
            .filter_accessible(Some("alice"), vec!["member1", "member2"], |c| *c, &scope())
            .await;
        assert!(kept.is_empty());
    }
}
