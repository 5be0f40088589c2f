//! Listing objects of one kind from one target

use async_trait::async_trait;
use dashboard_common::UpstreamError;
use kube::api::{DynamicObject, ListParams};
use kube::{Api, Client, ResourceExt};

use crate::kind::ResourceKind;

/// Namespaces a list call is scoped to
///
/// Empty means all namespaces. A single namespace is queried directly; several
/// namespaces are listed cluster-wide and filtered locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceQuery {
    namespaces: Vec<String>,
}

impl NamespaceQuery {
    /// Every namespace
    pub fn all() -> Self {
        Self::default()
    }

    /// Exactly the given namespaces
    pub fn new(namespaces: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            namespaces: namespaces
                .into_iter()
                .map(Into::into)
                .filter(|n: &String| !n.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated namespace list from a path segment
    pub fn parse(raw: Option<&str>) -> Self {
        Self::new(raw.unwrap_or_default().split(','))
    }

    /// The namespace to query directly, if exactly one was requested
    pub fn single(&self) -> Option<&str> {
        match self.namespaces.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// Whether an object in `namespace` falls inside this query
    pub fn matches(&self, namespace: Option<&str>) -> bool {
        self.namespaces.is_empty()
            || namespace.is_some_and(|ns| self.namespaces.iter().any(|n| n == ns))
    }
}

/// Issues list and get calls for arbitrary kinds
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceLister: Send + Sync {
    /// Every object of `kind` inside `namespaces`
    async fn list(
        &self,
        kind: ResourceKind,
        namespaces: &NamespaceQuery,
    ) -> Result<Vec<DynamicObject>, UpstreamError>;

    /// One object of `kind` by name
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<String>,
        name: String,
    ) -> Result<DynamicObject, UpstreamError>;
}

#[async_trait]
impl ResourceLister for Client {
    async fn list(
        &self,
        kind: ResourceKind,
        namespaces: &NamespaceQuery,
    ) -> Result<Vec<DynamicObject>, UpstreamError> {
        let ar = kind.api_resource();
        let api: Api<DynamicObject> = match (kind.is_namespaced(), namespaces.single()) {
            (true, Some(ns)) => Api::namespaced_with(self.clone(), ns, &ar),
            _ => Api::all_with(self.clone(), &ar),
        };
        let list = api.list(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .filter(|obj| !kind.is_namespaced() || namespaces.matches(obj.namespace().as_deref()))
            .collect())
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<String>,
        name: String,
    ) -> Result<DynamicObject, UpstreamError> {
        let ar = kind.api_resource();
        let api: Api<DynamicObject> = match namespace.as_deref() {
            Some(ns) if kind.is_namespaced() => Api::namespaced_with(self.clone(), ns, &ar),
            _ => Api::all_with(self.clone(), &ar),
        };
        Ok(api.get(&name).await?)
    }
}
