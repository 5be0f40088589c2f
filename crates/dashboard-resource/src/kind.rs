//! Resource kinds the aggregator can list

use std::fmt;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Event, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod, Secret,
    Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ApiResource;
use serde::Serialize;

/// A listable resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// core/v1 Namespace
    Namespace,
    /// core/v1 Node
    Node,
    /// core/v1 Pod
    Pod,
    /// apps/v1 Deployment
    Deployment,
    /// apps/v1 ReplicaSet
    ReplicaSet,
    /// apps/v1 StatefulSet
    StatefulSet,
    /// apps/v1 DaemonSet
    DaemonSet,
    /// batch/v1 Job
    Job,
    /// batch/v1 CronJob
    CronJob,
    /// core/v1 Service
    Service,
    /// networking.k8s.io/v1 Ingress
    Ingress,
    /// core/v1 ConfigMap
    ConfigMap,
    /// core/v1 Secret
    Secret,
    /// core/v1 PersistentVolumeClaim
    PersistentVolumeClaim,
    /// core/v1 PersistentVolume
    PersistentVolume,
    /// core/v1 Event
    Event,
    /// cluster.karmada.io/v1alpha1 Cluster
    Cluster,
    /// policy.karmada.io/v1alpha1 PropagationPolicy
    PropagationPolicy,
    /// policy.karmada.io/v1alpha1 ClusterPropagationPolicy
    ClusterPropagationPolicy,
    /// policy.karmada.io/v1alpha1 OverridePolicy
    OverridePolicy,
    /// policy.karmada.io/v1alpha1 ClusterOverridePolicy
    ClusterOverridePolicy,
    /// argoproj.io/v1alpha1 Application
    ArgoApplication,
    /// argoproj.io/v1alpha1 AppProject
    ArgoProject,
}

impl ResourceKind {
    /// Every supported kind
    pub const ALL: [ResourceKind; 23] = [
        Self::Namespace,
        Self::Node,
        Self::Pod,
        Self::Deployment,
        Self::ReplicaSet,
        Self::StatefulSet,
        Self::DaemonSet,
        Self::Job,
        Self::CronJob,
        Self::Service,
        Self::Ingress,
        Self::ConfigMap,
        Self::Secret,
        Self::PersistentVolumeClaim,
        Self::PersistentVolume,
        Self::Event,
        Self::Cluster,
        Self::PropagationPolicy,
        Self::ClusterPropagationPolicy,
        Self::OverridePolicy,
        Self::ClusterOverridePolicy,
        Self::ArgoApplication,
        Self::ArgoProject,
    ];

    /// Kind name as used by the API server
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Namespace => "Namespace",
            Self::Node => "Node",
            Self::Pod => "Pod",
            Self::Deployment => "Deployment",
            Self::ReplicaSet => "ReplicaSet",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::Job => "Job",
            Self::CronJob => "CronJob",
            Self::Service => "Service",
            Self::Ingress => "Ingress",
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::PersistentVolume => "PersistentVolume",
            Self::Event => "Event",
            Self::Cluster => "Cluster",
            Self::PropagationPolicy => "PropagationPolicy",
            Self::ClusterPropagationPolicy => "ClusterPropagationPolicy",
            Self::OverridePolicy => "OverridePolicy",
            Self::ClusterOverridePolicy => "ClusterOverridePolicy",
            Self::ArgoApplication => "Application",
            Self::ArgoProject => "AppProject",
        }
    }

    /// Whether objects of this kind live in a namespace
    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            Self::Namespace
                | Self::Node
                | Self::PersistentVolume
                | Self::Cluster
                | Self::ClusterPropagationPolicy
                | Self::ClusterOverridePolicy
        )
    }

    /// Discovery information for dynamic API access
    pub fn api_resource(&self) -> ApiResource {
        match self {
            Self::Namespace => ApiResource::erase::<Namespace>(&()),
            Self::Node => ApiResource::erase::<Node>(&()),
            Self::Pod => ApiResource::erase::<Pod>(&()),
            Self::Deployment => ApiResource::erase::<Deployment>(&()),
            Self::ReplicaSet => ApiResource::erase::<ReplicaSet>(&()),
            Self::StatefulSet => ApiResource::erase::<StatefulSet>(&()),
            Self::DaemonSet => ApiResource::erase::<DaemonSet>(&()),
            Self::Job => ApiResource::erase::<Job>(&()),
            Self::CronJob => ApiResource::erase::<CronJob>(&()),
            Self::Service => ApiResource::erase::<Service>(&()),
            Self::Ingress => ApiResource::erase::<Ingress>(&()),
            Self::ConfigMap => ApiResource::erase::<ConfigMap>(&()),
            Self::Secret => ApiResource::erase::<Secret>(&()),
            Self::PersistentVolumeClaim => ApiResource::erase::<PersistentVolumeClaim>(&()),
            Self::PersistentVolume => ApiResource::erase::<PersistentVolume>(&()),
            Self::Event => ApiResource::erase::<Event>(&()),
            Self::Cluster => crd_resource("cluster.karmada.io", "Cluster", "clusters"),
            Self::PropagationPolicy => {
                crd_resource("policy.karmada.io", "PropagationPolicy", "propagationpolicies")
            }
            Self::ClusterPropagationPolicy => crd_resource(
                "policy.karmada.io",
                "ClusterPropagationPolicy",
                "clusterpropagationpolicies",
            ),
            Self::OverridePolicy => {
                crd_resource("policy.karmada.io", "OverridePolicy", "overridepolicies")
            }
            Self::ClusterOverridePolicy => crd_resource(
                "policy.karmada.io",
                "ClusterOverridePolicy",
                "clusteroverridepolicies",
            ),
            Self::ArgoApplication => crd_resource("argoproj.io", "Application", "applications"),
            Self::ArgoProject => crd_resource("argoproj.io", "AppProject", "appprojects"),
        }
    }
}

fn crd_resource(group: &str, kind: &str, plural: &str) -> ApiResource {
    ApiResource {
        group: group.to_string(),
        version: "v1alpha1".to_string(),
        api_version: format!("{}/v1alpha1", group),
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_resources() {
        let pod = ResourceKind::Pod.api_resource();
        assert_eq!(pod.api_version, "v1");
        assert_eq!(pod.plural, "pods");

        let deploy = ResourceKind::Deployment.api_resource();
        assert_eq!(deploy.group, "apps");
        assert_eq!(deploy.plural, "deployments");

        let cluster = ResourceKind::Cluster.api_resource();
        assert_eq!(cluster.api_version, "cluster.karmada.io/v1alpha1");
        assert_eq!(cluster.plural, "clusters");
    }

    #[test]
    fn test_kind_names_match_api_resources() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.api_resource().kind, kind.as_str());
        }
    }

    #[test]
    fn test_scope() {
        assert!(ResourceKind::Secret.is_namespaced());
        assert!(!ResourceKind::Namespace.is_namespaced());
        assert!(!ResourceKind::Cluster.is_namespaced());
        assert!(ResourceKind::PropagationPolicy.is_namespaced());
        assert!(!ResourceKind::ClusterOverridePolicy.is_namespaced());
    }

    #[test]
    fn test_policy_resources() {
        let pp = ResourceKind::PropagationPolicy.api_resource();
        assert_eq!(pp.api_version, "policy.karmada.io/v1alpha1");
        assert_eq!(pp.plural, "propagationpolicies");
    }

    #[test]
    fn test_argo_resources() {
        let apps = ResourceKind::ArgoApplication.api_resource();
        assert_eq!(apps.api_version, "argoproj.io/v1alpha1");
        assert_eq!(apps.plural, "applications");
        assert_eq!(ResourceKind::ArgoProject.api_resource().plural, "appprojects");
        assert!(ResourceKind::ArgoProject.is_namespaced());
    }
}
