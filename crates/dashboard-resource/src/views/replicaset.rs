//! ReplicaSet list and detail views

use std::sync::Arc;

use dashboard_client::RequestScope;
use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;

use super::{controlled_by, decode_all, fetch_one, ListRequest, ObjectMetaView, PodInfo, ResourceList, TypeMetaView};
use crate::channels::ResourceChannelAggregator;
use crate::dataselect::{select, Cell, ComparableValue, PropertyName};
use crate::error::Result;
use crate::kind::ResourceKind;
use crate::lister::{NamespaceQuery, ResourceLister};

/// A replica set with its pods
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaSetView {
    /// Metadata
    pub object_meta: ObjectMetaView,
    /// Kind marker
    pub type_meta: TypeMetaView,
    /// Pods behind the replica set
    pub pods: PodInfo,
    /// Container images of the pod template
    pub container_images: Vec<String>,
}

impl ReplicaSetView {
    fn new(rs: ReplicaSet, pods: &[Pod]) -> Self {
        let owned = pods
            .iter()
            .filter(|pod| controlled_by(&pod.metadata, rs.metadata.uid.as_deref()));
        let pod_info = PodInfo::new(
            rs.status.as_ref().map_or(0, |s| s.replicas),
            rs.spec.as_ref().and_then(|s| s.replicas),
            owned,
        );
        let container_images = rs
            .spec
            .and_then(|s| s.template)
            .and_then(|t| t.spec)
            .map(|pod| pod.containers.into_iter().filter_map(|c| c.image).collect())
            .unwrap_or_default();

        Self {
            object_meta: rs.metadata.into(),
            type_meta: TypeMetaView { kind: "replicaset" },
            pods: pod_info,
            container_images,
        }
    }
}

impl Cell for ReplicaSetView {
    fn property(&self, name: &PropertyName) -> Option<ComparableValue> {
        match name {
            PropertyName::Kind => Some(self.type_meta.kind.into()),
            PropertyName::Other(p) if p == "replicas" => Some(i64::from(self.pods.current).into()),
            other => self.object_meta.property(other),
        }
    }
}

/// List replica sets
pub async fn list(req: &ListRequest) -> Result<ResourceList<ReplicaSetView>> {
    let set = ResourceChannelAggregator::new(Arc::clone(&req.lister)).spawn(
        &[ResourceKind::ReplicaSet, ResourceKind::Pod],
        &req.namespaces,
        &req.scope,
    );
    let mut lists = set.drain().await?;

    let replica_sets: Vec<ReplicaSet> = decode_all(ResourceKind::ReplicaSet, lists.take(ResourceKind::ReplicaSet))?;
    let pods: Vec<Pod> = decode_all(ResourceKind::Pod, lists.take(ResourceKind::Pod))?;
    let views = replica_sets
        .into_iter()
        .map(|rs| ReplicaSetView::new(rs, &pods))
        .collect();

    Ok(ResourceList::from_selection(
        "replicaSets",
        select(views, &req.query, req.max_page_size),
        lists.take_warnings(),
    ))
}

/// One replica set with the pods it controls
pub async fn detail(
    lister: Arc<dyn ResourceLister>,
    namespace: &str,
    name: &str,
    scope: &RequestScope,
) -> Result<ReplicaSetView> {
    let rs: ReplicaSet = fetch_one(lister.as_ref(), ResourceKind::ReplicaSet, namespace, name, scope).await?;
    let set = ResourceChannelAggregator::new(lister).spawn(
        &[ResourceKind::Pod],
        &NamespaceQuery::parse(Some(namespace)),
        scope,
    );
    let mut lists = set.drain().await?;
    let pods: Vec<Pod> = decode_all(ResourceKind::Pod, lists.take(ResourceKind::Pod))?;
    Ok(ReplicaSetView::new(rs, &pods))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::lister::MockResourceLister;
    use crate::views::test_support::{lister, request};
    use dashboard_common::{UpstreamError, UpstreamErrorKind};
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn replica_set(name: &str, uid: &str, replicas: i32) -> serde_json::Value {
        json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": {"name": name, "namespace": "karmada-system", "uid": uid},
            "spec": {
                "replicas": replicas,
                "selector": {"matchLabels": {"app": name}},
                "template": {"spec": {"containers": [{"name": "main", "image": format!("{}:v1", name)}]}}
            },
            "status": {"replicas": replicas}
        })
    }

    #[tokio::test]
    async fn test_list_replicasets_sorted_by_replicas() {
        let pod = json!({
            "apiVersion": "v1", "kind": "Pod",
            "metadata": {
                "name": "scheduler-1", "namespace": "karmada-system",
                "ownerReferences": [{"apiVersion": "apps/v1", "kind": "ReplicaSet", "name": "scheduler", "uid": "rs-s", "controller": true}]
            },
            "status": {"phase": "Running"}
        });
        let lister = lister(HashMap::from([
            (
                ResourceKind::ReplicaSet,
                vec![replica_set("scheduler", "rs-s", 1), replica_set("apiserver", "rs-a", 3)],
            ),
            (ResourceKind::Pod, vec![pod]),
        ]));
        let mut req = request(lister);
        req.query = req.query.with_sort(PropertyName::Other("replicas".to_string()), false);

        let list = list(&req).await.unwrap();
        assert_eq!(list.items[0].object_meta.name, "apiserver");
        assert_eq!(list.items[1].pods.running, 1);
        assert_eq!(list.items[1].container_images, vec!["scheduler:v1".to_string()]);

        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["replicaSets"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_detail_counts_owned_pods() {
        let owned = json!({
            "apiVersion": "v1", "kind": "Pod",
            "metadata": {
                "name": "web-1", "namespace": "karmada-system",
                "ownerReferences": [{"apiVersion": "apps/v1", "kind": "ReplicaSet", "name": "web", "uid": "rs-w", "controller": true}]
            },
            "status": {"phase": "Pending"}
        });
        let stray = json!({
            "apiVersion": "v1", "kind": "Pod",
            "metadata": {"name": "other", "namespace": "karmada-system"},
            "status": {"phase": "Running"}
        });
        let mut lister = MockResourceLister::new();
        lister
            .expect_get()
            .withf(|kind, ns, name| {
                *kind == ResourceKind::ReplicaSet && ns.as_deref() == Some("karmada-system") && name == "web"
            })
            .returning(|_, _, _| Ok(serde_json::from_value(replica_set("web", "rs-w", 2)).unwrap()));
        lister
            .expect_list()
            .withf(|kind, ns| *kind == ResourceKind::Pod && ns.single() == Some("karmada-system"))
            .returning(move |_, _| {
                Ok(vec![
                    serde_json::from_value(owned.clone()).unwrap(),
                    serde_json::from_value(stray.clone()).unwrap(),
                ])
            });

        let scope = RequestScope::new(Duration::from_secs(5));
        let view = detail(Arc::new(lister), "karmada-system", "web", &scope).await.unwrap();
        assert_eq!(view.object_meta.name, "web");
        assert_eq!(view.pods.desired, Some(2));
        assert_eq!((view.pods.pending, view.pods.running), (1, 0));
    }

    #[tokio::test]
    async fn test_detail_missing_replicaset() {
        let mut lister = MockResourceLister::new();
        lister.expect_get().returning(|_, _, _| {
            Err(UpstreamError::new(UpstreamErrorKind::NotFound, "replicasets \"gone\" not found"))
        });
        lister.expect_list().never();

        let scope = RequestScope::new(Duration::from_secs(5));
        let err = detail(Arc::new(lister), "default", "gone", &scope).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(e) if e.kind == UpstreamErrorKind::NotFound));
    }
}
