//! Deployment list view
//!
//! A deployment's pods are found through the replica sets it controls, so one
//! aggregate call fetches deployments, replica sets and pods together.

use std::sync::Arc;

use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;

use super::{controlled_by, decode_all, ListRequest, ObjectMetaView, PodInfo, ResourceList, ResourceStatus, TypeMetaView};
use crate::channels::ResourceChannelAggregator;
use crate::dataselect::{select, Cell, ComparableValue, PropertyName};
use crate::error::Result;
use crate::kind::ResourceKind;

/// A deployment with its rollout state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentView {
    /// Metadata
    pub object_meta: ObjectMetaView,
    /// Kind marker
    pub type_meta: TypeMetaView,
    /// Pods behind the deployment
    pub pods: PodInfo,
    /// Replicas available to serve
    pub available_replicas: i32,
    /// Container images of the pod template
    pub container_images: Vec<String>,
}

impl DeploymentView {
    fn new(deployment: Deployment, replica_sets: &[ReplicaSet], pods: &[Pod]) -> Self {
        let uid = deployment.metadata.uid.clone();
        let owned_sets: Vec<Option<&str>> = replica_sets
            .iter()
            .filter(|rs| controlled_by(&rs.metadata, uid.as_deref()))
            .map(|rs| rs.metadata.uid.as_deref())
            .collect();
        let owned_pods = pods
            .iter()
            .filter(|pod| owned_sets.iter().any(|rs| controlled_by(&pod.metadata, *rs)));

        let spec = deployment.spec.unwrap_or_default();
        let status = deployment.status.unwrap_or_default();
        let desired = Some(spec.replicas.unwrap_or(1));

        Self {
            object_meta: deployment.metadata.into(),
            type_meta: TypeMetaView { kind: "deployment" },
            pods: PodInfo::new(status.replicas.unwrap_or(0), desired, owned_pods),
            available_replicas: status.available_replicas.unwrap_or(0),
            container_images: spec
                .template
                .spec
                .map(|pod| pod.containers.into_iter().filter_map(|c| c.image).collect())
                .unwrap_or_default(),
        }
    }

    fn is_available(&self) -> bool {
        self.available_replicas == self.pods.current
    }
}

impl Cell for DeploymentView {
    fn property(&self, name: &PropertyName) -> Option<ComparableValue> {
        match name {
            PropertyName::Kind => Some(self.type_meta.kind.into()),
            PropertyName::Status => Some(if self.is_available() { "Running" } else { "Pending" }.into()),
            other => self.object_meta.property(other),
        }
    }
}

fn status_of(views: &[DeploymentView]) -> ResourceStatus {
    let running = views.iter().filter(|v| v.is_available()).count();
    ResourceStatus {
        running,
        pending: views.len() - running,
        ..Default::default()
    }
}

/// List deployments
pub async fn list(req: &ListRequest) -> Result<ResourceList<DeploymentView>> {
    let set = ResourceChannelAggregator::new(Arc::clone(&req.lister)).spawn(
        &[ResourceKind::Deployment, ResourceKind::ReplicaSet, ResourceKind::Pod],
        &req.namespaces,
        &req.scope,
    );
    let mut lists = set.drain().await?;

    let deployments: Vec<Deployment> = decode_all(ResourceKind::Deployment, lists.take(ResourceKind::Deployment))?;
    let replica_sets: Vec<ReplicaSet> = decode_all(ResourceKind::ReplicaSet, lists.take(ResourceKind::ReplicaSet))?;
    let pods: Vec<Pod> = decode_all(ResourceKind::Pod, lists.take(ResourceKind::Pod))?;

    let views: Vec<_> = deployments
        .into_iter()
        .map(|d| DeploymentView::new(d, &replica_sets, &pods))
        .collect();
    let status = status_of(&views);

    Ok(ResourceList::from_selection(
        "deployments",
        select(views, &req.query, req.max_page_size),
        lists.take_warnings(),
    )
    .with_status(status))
}
