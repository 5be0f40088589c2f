//! Pod list and detail views

use dashboard_client::RequestScope;
use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;
use tracing::debug;

use super::{fetch_one, fetch_views, ListRequest, ObjectMetaView, ResourceList, ResourceStatus, TypeMetaView};
use crate::dataselect::{select, Cell, ComparableValue, PropertyName};
use crate::error::Result;
use crate::kind::ResourceKind;
use crate::lister::ResourceLister;

/// A pod summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodView {
    /// Metadata
    pub object_meta: ObjectMetaView,
    /// Kind marker
    pub type_meta: TypeMetaView,
    /// Phase, or `Terminating` once deletion started
    pub status: String,
    /// Sum of container restart counts
    pub restart_count: i64,
    /// Node the pod is scheduled on
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_name: String,
    /// Container images
    pub container_images: Vec<String>,
}

impl From<Pod> for PodView {
    fn from(pod: Pod) -> Self {
        let terminating = pod.metadata.deletion_timestamp.is_some();
        let spec = pod.spec.unwrap_or_default();
        let status = pod.status.unwrap_or_default();

        let phase = if terminating {
            "Terminating".to_string()
        } else {
            status.phase.unwrap_or_else(|| "Unknown".to_string())
        };
        let restart_count = status
            .container_statuses
            .unwrap_or_default()
            .iter()
            .map(|c| i64::from(c.restart_count))
            .sum();

        Self {
            object_meta: pod.metadata.into(),
            type_meta: TypeMetaView { kind: "pod" },
            status: phase,
            restart_count,
            node_name: spec.node_name.unwrap_or_default(),
            container_images: spec.containers.into_iter().filter_map(|c| c.image).collect(),
        }
    }
}

impl Cell for PodView {
    fn property(&self, name: &PropertyName) -> Option<ComparableValue> {
        match name {
            PropertyName::Status => Some(self.status.as_str().into()),
            PropertyName::Kind => Some(self.type_meta.kind.into()),
            PropertyName::Other(p) if p == "restarts" => Some(self.restart_count.into()),
            PropertyName::Other(p) if p == "node" => Some(self.node_name.as_str().into()),
            other => self.object_meta.property(other),
        }
    }
}

pub(crate) fn status_of(views: &[PodView]) -> ResourceStatus {
    views.iter().fold(ResourceStatus::default(), |mut acc, v| {
        match v.status.as_str() {
            "Running" => acc.running += 1,
            "Pending" => acc.pending += 1,
            "Failed" => acc.failed += 1,
            "Succeeded" => acc.succeeded += 1,
            "Terminating" => acc.terminating += 1,
            _ => {}
        }
        acc
    })
}

/// List pods
pub async fn list(req: &ListRequest) -> Result<ResourceList<PodView>> {
    let (views, warnings) = fetch_views::<Pod, _, _>(req, ResourceKind::Pod, PodView::from).await?;
    let status = status_of(&views);
    Ok(ResourceList::from_selection("pods", select(views, &req.query, req.max_page_size), warnings)
        .with_status(status))
}

/// Fetch one pod in full
pub async fn detail(
    lister: &dyn ResourceLister,
    namespace: &str,
    name: &str,
    scope: &RequestScope,
) -> Result<Pod> {
    debug!(namespace, name, "fetching pod");
    fetch_one(lister, ResourceKind::Pod, namespace, name, scope).await
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

    fn pod(name: &str, phase: &str, restarts: i32) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": name, "namespace": "default"},
            "spec": {"nodeName": "node-1", "containers": [{"name": "app", "image": "nginx:1.27"}]},
            "status": {
                "phase": phase,
                "containerStatuses": [{
                    "name": "app", "image": "nginx:1.27", "imageID": "",
                    "ready": true, "restartCount": restarts
                }]
            }
        })
    }

    #[tokio::test]
    async fn test_list_pods_sorted_by_restarts() {
        let lister = lister(HashMap::from([(
            ResourceKind::Pod,
            vec![pod("a", "Running", 10), pod("b", "Pending", 9), pod("c", "Failed", 2)],
        )]));
        let mut req = request(lister);
        req.query = req
            .query
            .with_sort(PropertyName::Other("restarts".to_string()), false);

        let list = list(&req).await.unwrap();
        let names: Vec<_> = list.items.iter().map(|p| p.object_meta.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(list.items[0].node_name, "node-1");

        let status = list.status.unwrap();
        assert_eq!((status.running, status.pending, status.failed), (1, 1, 1));
    }

    #[test]
    fn test_terminating_pod_status() {
        let mut value = pod("a", "Running", 0);
        value["metadata"]["deletionTimestamp"] = json!("2024-03-01T12:00:00Z");
        let view = PodView::from(serde_json::from_value::<Pod>(value).unwrap());
        assert_eq!(view.status, "Terminating");
        assert_eq!(status_of(&[view]).terminating, 1);
    }

    #[tokio::test]
    async fn test_detail_returns_full_pod() {
        let mut lister = MockResourceLister::new();
        lister
            .expect_get()
            .withf(|kind, ns, name| {
                *kind == ResourceKind::Pod && ns.as_deref() == Some("default") && name == "web-0"
            })
            .returning(|_, _, _| Ok(serde_json::from_value(pod("web-0", "Running", 1)).unwrap()));

        let scope = RequestScope::new(Duration::from_secs(5));
        let pod = detail(&lister, "default", "web-0", &scope).await.unwrap();
        assert_eq!(pod.metadata.name.as_deref(), Some("web-0"));
        assert_eq!(pod.status.and_then(|s| s.phase).as_deref(), Some("Running"));
    }

    #[tokio::test]
    async fn test_detail_not_found() {
        let mut lister = MockResourceLister::new();
        lister
            .expect_get()
            .returning(|_, _, _| Err(UpstreamError::new(UpstreamErrorKind::NotFound, "pods \"x\" not found")));

        let scope = RequestScope::new(Duration::from_secs(5));
        let err = detail(&lister, "default", "x", &scope).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(e) if e.kind == UpstreamErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_detail_cancelled() {
        let mut lister = MockResourceLister::new();
        lister.expect_get().returning(|_, _, _| Ok(serde_json::from_value(pod("x", "Running", 0)).unwrap()));

        let scope = RequestScope::new(Duration::from_secs(5));
        scope.cancel();
        let err = detail(&lister, "default", "x", &scope).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(e) if e.kind == UpstreamErrorKind::Timeout));
    }
}
