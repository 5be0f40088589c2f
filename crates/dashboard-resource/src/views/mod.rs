//! List and detail views over fetched resources
//!
//! Every list view is one aggregate call followed by one selection. The
//! reported `listMeta.totalItems` is the count after filtering so that the UI
//! can render pagination controls; `total` is the count before filtering.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashboard_client::RequestScope;
use dashboard_common::UpstreamError;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::channels::ResourceChannelAggregator;
use crate::dataselect::{select, Cell, ComparableValue, DataSelectQuery, PropertyName, SelectionResult};
use crate::error::{Error, Result};
use crate::kind::ResourceKind;
use crate::lister::{NamespaceQuery, ResourceLister};

pub mod configmap;
pub mod cronjob;
pub mod deployment;
pub mod namespace;
pub mod pod;
pub mod replicaset;
pub mod secret;

/// Object metadata as shown by the UI
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetaView {
    /// Name
    pub name: String,
    /// Namespace, empty for cluster-scoped objects
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Labels
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Creation time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// UID
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,
}

impl From<ObjectMeta> for ObjectMetaView {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            name: meta.name.unwrap_or_default(),
            namespace: meta.namespace.unwrap_or_default(),
            labels: meta.labels.unwrap_or_default(),
            annotations: meta.annotations.unwrap_or_default(),
            creation_timestamp: meta.creation_timestamp.map(|t| t.0),
            uid: meta.uid.unwrap_or_default(),
        }
    }
}

impl ObjectMetaView {
    /// Common metadata properties shared by every view
    pub fn property(&self, name: &PropertyName) -> Option<ComparableValue> {
        match name {
            PropertyName::Name => Some(self.name.as_str().into()),
            PropertyName::Namespace => Some(self.namespace.as_str().into()),
            PropertyName::CreationTimestamp => self.creation_timestamp.map(Into::into),
            PropertyName::Label(key) => self.labels.get(key).map(|v| v.as_str().into()),
            _ => None,
        }
    }
}

/// Kind marker attached to every view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeMetaView {
    /// Lowercase kind name
    pub kind: &'static str,
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Items after filtering
    pub total_items: usize,
}

/// Status counts over every listed object, before filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceStatus {
    /// Running
    pub running: usize,
    /// Pending
    pub pending: usize,
    /// Failed
    pub failed: usize,
    /// Succeeded
    pub succeeded: usize,
    /// Terminating
    pub terminating: usize,
}

/// A selected page of views plus non-critical errors
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceList<T> {
    /// Key the items are serialized under (`secrets`, `pods`, ...)
    pub items_key: &'static str,
    /// Pagination metadata
    pub list_meta: ListMeta,
    /// Items before filtering
    pub total: usize,
    /// Items on the requested page
    pub items: Vec<T>,
    /// Status counts, for kinds that report them
    pub status: Option<ResourceStatus>,
    /// Non-critical errors hit while fetching
    pub errors: Vec<UpstreamError>,
}

impl<T> ResourceList<T> {
    /// Wrap a selection result
    pub fn from_selection(
        items_key: &'static str,
        selection: SelectionResult<T>,
        errors: Vec<UpstreamError>,
    ) -> Self {
        Self {
            items_key,
            list_meta: ListMeta {
                total_items: selection.filtered_total,
            },
            total: selection.total,
            items: selection.items,
            status: None,
            errors,
        }
    }

    /// Attach status counts
    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl<T: Serialize> Serialize for ResourceList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = if self.status.is_some() { 5 } else { 4 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("listMeta", &self.list_meta)?;
        map.serialize_entry("total", &self.total)?;
        map.serialize_entry(self.items_key, &self.items)?;
        if let Some(status) = &self.status {
            map.serialize_entry("status", status)?;
        }
        map.serialize_entry("errors", &self.errors)?;
        map.end()
    }
}

/// Pods backing a workload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodInfo {
    /// Replicas reported by the workload status
    pub current: i32,
    /// Replicas requested by the workload spec
    pub desired: Option<i32>,
    /// Owned pods that are running
    pub running: usize,
    /// Owned pods that are pending
    pub pending: usize,
    /// Owned pods that failed
    pub failed: usize,
    /// Owned pods that succeeded
    pub succeeded: usize,
}

impl PodInfo {
    pub(crate) fn new<'a>(
        current: i32,
        desired: Option<i32>,
        pods: impl IntoIterator<Item = &'a Pod>,
    ) -> Self {
        let mut info = Self {
            current,
            desired,
            ..Default::default()
        };
        for pod in pods {
            match pod.status.as_ref().and_then(|s| s.phase.as_deref()) {
                Some("Running") => info.running += 1,
                Some("Pending") => info.pending += 1,
                Some("Failed") => info.failed += 1,
                Some("Succeeded") => info.succeeded += 1,
                _ => {}
            }
        }
        info
    }
}

/// Whether `meta` names the object with `uid` as its controller
pub(crate) fn controlled_by(meta: &ObjectMeta, uid: Option<&str>) -> bool {
    let Some(uid) = uid else {
        return false;
    };
    meta.owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|owner| owner.controller == Some(true) && owner.uid == uid)
}

/// Everything a list view needs besides its own conversion
#[derive(Clone)]
pub struct ListRequest {
    /// Target to list from
    pub lister: Arc<dyn ResourceLister>,
    /// Namespace scope
    pub namespaces: NamespaceQuery,
    /// Selection to apply
    pub query: DataSelectQuery,
    /// Request cancellation and deadline
    pub scope: RequestScope,
    /// Cap on the page size
    pub max_page_size: usize,
}

/// Decode a dynamic object into its typed form
pub(crate) fn decode<K: DeserializeOwned>(kind: ResourceKind, obj: DynamicObject) -> Result<K> {
    let value = serde_json::to_value(obj).map_err(|e| Error::Decode {
        kind: kind.as_str(),
        message: e.to_string(),
    })?;
    serde_json::from_value(value).map_err(|e| Error::Decode {
        kind: kind.as_str(),
        message: e.to_string(),
    })
}

/// Decode every object of one kind
pub(crate) fn decode_all<K: DeserializeOwned>(
    kind: ResourceKind,
    objects: Vec<DynamicObject>,
) -> Result<Vec<K>> {
    objects.into_iter().map(|obj| decode(kind, obj)).collect()
}

/// Fetch one kind and convert every object, before selection
pub(crate) async fn fetch_views<K, V, F>(
    req: &ListRequest,
    kind: ResourceKind,
    to_view: F,
) -> Result<(Vec<V>, Vec<UpstreamError>)>
where
    K: DeserializeOwned,
    F: Fn(K) -> V,
{
    let set = ResourceChannelAggregator::new(Arc::clone(&req.lister)).spawn(
        &[kind],
        &req.namespaces,
        &req.scope,
    );
    let mut lists = set.drain().await?;

    let views = decode_all::<K>(kind, lists.take(kind))?
        .into_iter()
        .map(to_view)
        .collect();
    Ok((views, lists.take_warnings()))
}

/// Get one object by name within the request deadline
pub(crate) async fn fetch_one<K: DeserializeOwned>(
    lister: &dyn ResourceLister,
    kind: ResourceKind,
    namespace: &str,
    name: &str,
    scope: &RequestScope,
) -> Result<K> {
    let obj = tokio::select! {
        biased;
        _ = scope.cancelled() => Err(UpstreamError::timeout(format!("get {} {}/{} cancelled", kind, namespace, name))),
        result = tokio::time::timeout_at(
            scope.deadline(),
            lister.get(kind, Some(namespace.to_string()), name.to_string()),
        ) => result.unwrap_or_else(|_| {
            Err(UpstreamError::timeout(format!("get {} {}/{} exceeded request deadline", kind, namespace, name)))
        }),
    }?;
    decode(kind, obj)
}

/// Fetch one kind, convert every object, and select
pub(crate) async fn list_view<K, V, F>(
    req: &ListRequest,
    kind: ResourceKind,
    items_key: &'static str,
    to_view: F,
) -> Result<ResourceList<V>>
where
    K: DeserializeOwned,
    V: Cell,
    F: Fn(K) -> V,
{
    let (views, warnings) = fetch_views(req, kind, to_view).await?;
    Ok(ResourceList::from_selection(
        items_key,
        select(views, &req.query, req.max_page_size),
        warnings,
    ))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::lister::MockResourceLister;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Lister returning fixed JSON objects per kind
    pub fn lister(
        objects: HashMap<ResourceKind, Vec<serde_json::Value>>,
    ) -> Arc<dyn ResourceLister> {
        let mut lister = MockResourceLister::new();
        lister.expect_list().returning(move |kind, _| {
            Ok(objects
                .get(&kind)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|v| serde_json::from_value(v).unwrap())
                .collect())
        });
        Arc::new(lister)
    }

    /// List request selecting everything from `lister`
    pub fn request(lister: Arc<dyn ResourceLister>) -> ListRequest {
        ListRequest {
            lister,
            namespaces: NamespaceQuery::all(),
            query: DataSelectQuery::everything(),
            scope: RequestScope::new(Duration::from_secs(30)),
            max_page_size: 100,
        }
    }
}
