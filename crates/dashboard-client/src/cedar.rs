//! Cedar-backed cluster access policy
//!
//! Requests are evaluated as
//! `Dashboard::User::"<user>"` performing `Dashboard::Action::"AccessCluster"`
//! on `Dashboard::Cluster::"<cluster>"`. With no policies loaded Cedar's
//! default-deny applies.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cedar_policy::{
    Authorizer, Context, Decision, Entities, Entity, EntityId, EntityTypeName, EntityUid,
    PolicySet, Request,
};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gate::{AccessPolicy, PolicyError};

/// Cedar schema namespace
const NAMESPACE: &str = "Dashboard";

/// Action evaluated for every cluster check
const ACCESS_ACTION: &str = "AccessCluster";

/// Cluster access policy evaluated with Cedar
pub struct CedarAccessPolicy {
    authorizer: Authorizer,
    policy_set: RwLock<PolicySet>,
    source: Option<PathBuf>,
}

impl CedarAccessPolicy {
    /// Policy from Cedar source text
    pub fn with_policies(policy_text: &str) -> Result<Self> {
        Ok(Self {
            authorizer: Authorizer::new(),
            policy_set: RwLock::new(parse_policies(policy_text)?),
            source: None,
        })
    }

    /// Policy loaded from a file, reloadable with [`reload`](Self::reload)
    pub async fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let policy_set = load_file(&path).await?;
        info!(path = %path.display(), count = policy_set.policies().count(), "loaded Cedar policies");
        Ok(Self {
            authorizer: Authorizer::new(),
            policy_set: RwLock::new(policy_set),
            source: Some(path),
        })
    }

    /// Re-read the policy file; the old policies stay in place on failure
    pub async fn reload(&self) -> Result<()> {
        let path = self
            .source
            .as_deref()
            .ok_or_else(|| Error::Config("policy was not loaded from a file".into()))?;
        let new_set = load_file(path).await?;
        *self.policy_set.write().await = new_set;
        info!(path = %path.display(), "reloaded Cedar policies");
        Ok(())
    }

    /// Reload once per trigger until every sender is gone
    ///
    /// A failed reload is logged and the previous policies stay active.
    pub async fn reload_on(&self, mut triggers: mpsc::Receiver<()>) {
        while triggers.recv().await.is_some() {
            if let Err(e) = self.reload().await {
                warn!(error = %e, "policy reload failed, keeping previous policies");
            }
        }
        debug!("policy reload triggers closed");
    }

    /// Replace the policies with new source text
    pub async fn replace(&self, policy_text: &str) -> Result<()> {
        let new_set = parse_policies(policy_text)?;
        *self.policy_set.write().await = new_set;
        Ok(())
    }

    fn evaluate(
        &self,
        user: &str,
        cluster: &str,
        policy_set: &PolicySet,
    ) -> std::result::Result<bool, PolicyError> {
        let principal = build_entity_uid("User", user)?;
        let action = build_entity_uid("Action", ACCESS_ACTION)?;
        let resource = build_entity_uid("Cluster", cluster)?;
        let entities = build_entities(&[principal.clone(), resource.clone()])?;

        let request = Request::new(
            principal.clone(),
            action.clone(),
            resource.clone(),
            Context::empty(),
            None,
        )
        .map_err(|e| PolicyError::Evaluation(format!("failed to build Cedar request: {}", e)))?;

        let response = self.authorizer.is_authorized(&request, policy_set, &entities);
        debug!(
            principal = %principal,
            action = %action,
            resource = %resource,
            decision = ?response.decision(),
            "Cedar authorization result"
        );
        Ok(response.decision() == Decision::Allow)
    }
}

#[async_trait]
impl AccessPolicy for CedarAccessPolicy {
    async fn has_access(&self, user: &str, cluster: &str) -> std::result::Result<bool, PolicyError> {
        let policy_set = self.policy_set.read().await;
        self.evaluate(user, cluster, &policy_set)
    }
}

fn parse_policies(policy_text: &str) -> Result<PolicySet> {
    policy_text
        .parse()
        .map_err(|e: cedar_policy::ParseErrors| Error::Config(format!("invalid Cedar policy: {}", e)))
}

async fn load_file(path: &Path) -> Result<PolicySet> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
    parse_policies(&text)
}

fn build_entity_uid(type_name: &str, id: &str) -> std::result::Result<EntityUid, PolicyError> {
    let full_type_name = format!("{}::{}", NAMESPACE, type_name);
    let entity_type: EntityTypeName =
        full_type_name
            .parse()
            .map_err(|e: cedar_policy::ParseErrors| {
                PolicyError::Evaluation(format!(
                    "invalid Cedar entity type name '{}': {}",
                    full_type_name, e
                ))
            })?;
    Ok(EntityUid::from_type_name_and_id(
        entity_type,
        EntityId::new(id),
    ))
}

fn build_entities(uids: &[EntityUid]) -> std::result::Result<Entities, PolicyError> {
    let entities = uids
        .iter()
        .map(|uid| {
            Entity::new(uid.clone(), HashMap::new(), HashSet::new())
                .map_err(|e| PolicyError::Evaluation(format!("failed to create entity: {}", e)))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Entities::from_entities(entities, None)
        .map_err(|e| PolicyError::Evaluation(format!("failed to build entities: {}", e)))
}
