//! Control-plane overview
//!
//! Independent summaries make up the overview page: capacity summed over the
//! member clusters the caller may access, object counts on the control plane,
//! the controller manager's version and health, and Argo CD object counts
//! over the ready member clusters.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashboard_client::{AuthorizationGate, RequestScope};
use dashboard_common::{UpstreamError, UpstreamErrorKind, KARMADA_SYSTEM_NAMESPACE};
use futures::future::join_all;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{AttachParams, ListParams};
use kube::{Api, Client, ResourceExt};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument, warn};

use crate::channels::ResourceChannelAggregator;
use crate::error::Result;
use crate::kind::ResourceKind;
use crate::lister::{NamespaceQuery, ResourceLister};
use crate::quantity::quantity_value;

/// Name of the controller manager deployment, container and `app` label
pub const CONTROLLER_MANAGER: &str = "karmada-controller-manager";

/// Node counts across member clusters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    /// All nodes
    pub total_num: i64,
    /// Ready nodes
    pub ready_num: i64,
}

/// CPU across member clusters, in cores
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuSummary {
    /// Allocatable cores
    pub total_cpu: f64,
    /// Cores requested by scheduled pods
    pub allocated_cpu: f64,
}

/// Memory across member clusters, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySummary {
    /// Allocatable bytes
    pub total_memory: f64,
    /// Bytes requested by scheduled pods
    pub allocated_memory: f64,
}

/// Pod slots across member clusters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSummary {
    /// Pod capacity
    pub total_pod: i64,
    /// Scheduled pods
    pub allocated_pod: i64,
}

/// Capacity summed over accessible member clusters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberClusterStatus {
    /// Nodes
    pub node_summary: NodeSummary,
    /// CPU
    pub cpu_summary: CpuSummary,
    /// Memory
    pub memory_summary: MemorySummary,
    /// Pods
    pub pod_summary: PodSummary,
    /// Clusters that contributed to the sums
    pub clusters: Vec<String>,
    /// Non-critical errors hit while listing clusters
    pub errors: Vec<UpstreamError>,
    /// Every registered cluster, before access filtering
    ///
    /// `None` when the cluster listing was incomplete.
    #[serde(skip)]
    pub registered: Option<Vec<String>>,
    /// Contributing clusters whose `Ready` condition is `True`
    #[serde(skip)]
    pub ready: Vec<String>,
}

/// Object counts on the control plane
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResourceStatus {
    /// Propagation policies, namespaced and cluster-wide
    pub propagation_policy_num: usize,
    /// Override policies, namespaced and cluster-wide
    pub override_policy_num: usize,
    /// Namespaces
    pub namespace_num: usize,
    /// Deployments
    pub workload_num: usize,
    /// Config maps and secrets
    pub config_num: usize,
    /// Services and ingresses
    pub service_num: usize,
    /// Non-critical errors hit while listing
    pub errors: Vec<UpstreamError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterStatus {
    #[serde(default)]
    node_summary: Option<ClusterNodeSummary>,
    #[serde(default)]
    resource_summary: Option<ClusterResourceSummary>,
    #[serde(default)]
    conditions: Vec<ClusterCondition>,
}

#[derive(Debug, Default, Deserialize)]
struct ClusterCondition {
    #[serde(rename = "type")]
    type_: String,
    status: String,
}

impl ClusterStatus {
    fn is_ready(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.type_ == "Ready" && c.status == "True")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterNodeSummary {
    #[serde(default)]
    total_num: i64,
    #[serde(default)]
    ready_num: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ClusterResourceSummary {
    #[serde(default)]
    allocatable: BTreeMap<String, Quantity>,
    #[serde(default)]
    allocated: BTreeMap<String, Quantity>,
}

impl MemberClusterStatus {
    fn add(&mut self, name: String, status: ClusterStatus) {
        if status.is_ready() {
            self.ready.push(name.clone());
        }
        if let Some(nodes) = status.node_summary {
            self.node_summary.total_num += nodes.total_num;
            self.node_summary.ready_num += nodes.ready_num;
        }
        if let Some(res) = status.resource_summary {
            self.cpu_summary.total_cpu += quantity_value(res.allocatable.get("cpu"));
            self.cpu_summary.allocated_cpu += quantity_value(res.allocated.get("cpu"));
            self.memory_summary.total_memory += quantity_value(res.allocatable.get("memory"));
            self.memory_summary.allocated_memory += quantity_value(res.allocated.get("memory"));
            self.pod_summary.total_pod += quantity_value(res.allocatable.get("pods")) as i64;
            self.pod_summary.allocated_pod += quantity_value(res.allocated.get("pods")) as i64;
        }
        self.clusters.push(name);
    }
}

/// Sum capacity over the member clusters `username` may access
///
/// A cluster whose access check is denied or fails is left out of every sum.
#[instrument(skip(lister, gate, scope))]
pub async fn member_cluster_status(
    lister: Arc<dyn ResourceLister>,
    gate: &AuthorizationGate,
    username: Option<&str>,
    scope: &RequestScope,
) -> Result<MemberClusterStatus> {
    let set = ResourceChannelAggregator::new(lister).spawn(
        &[ResourceKind::Cluster],
        &NamespaceQuery::all(),
        scope,
    );
    let mut lists = set.drain().await?;
    let errors = lists.take_warnings();
    let all = lists.take(ResourceKind::Cluster);
    let registered = errors
        .is_empty()
        .then(|| all.iter().map(|c| c.name_any()).collect());

    let clusters = gate
        .filter_accessible(
            username,
            all,
            |c| c.metadata.name.as_deref().unwrap_or_default(),
            scope,
        )
        .await;

    let mut summary = MemberClusterStatus {
        errors,
        registered,
        ..Default::default()
    };
    for cluster in clusters {
        let name = cluster.name_any();
        let status = match cluster.data.get("status") {
            Some(raw) => serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
                warn!(cluster = %name, error = %e, "ignoring malformed cluster status");
                ClusterStatus::default()
            }),
            None => ClusterStatus::default(),
        };
        summary.add(name, status);
    }

    debug!(clusters = summary.clusters.len(), "summed member cluster capacity");
    Ok(summary)
}

/// Count policies, namespaces, workloads, config and service objects
#[instrument(skip(lister, scope))]
pub async fn cluster_resource_status(
    lister: Arc<dyn ResourceLister>,
    scope: &RequestScope,
) -> Result<ClusterResourceStatus> {
    use ResourceKind as K;

    let set = ResourceChannelAggregator::new(lister).spawn(
        &[
            K::PropagationPolicy,
            K::ClusterPropagationPolicy,
            K::OverridePolicy,
            K::ClusterOverridePolicy,
            K::Namespace,
            K::Deployment,
            K::ConfigMap,
            K::Secret,
            K::Service,
            K::Ingress,
        ],
        &NamespaceQuery::all(),
        scope,
    );
    let mut lists = set.drain().await?;

    Ok(ClusterResourceStatus {
        propagation_policy_num: lists.count(K::PropagationPolicy) + lists.count(K::ClusterPropagationPolicy),
        override_policy_num: lists.count(K::OverridePolicy) + lists.count(K::ClusterOverridePolicy),
        namespace_num: lists.count(K::Namespace),
        workload_num: lists.count(K::Deployment),
        config_num: lists.count(K::ConfigMap) + lists.count(K::Secret),
        service_num: lists.count(K::Service) + lists.count(K::Ingress),
        errors: lists.take_warnings(),
    })
}

/// Argo CD objects across ready member clusters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgoMetrics {
    /// `applications.argoproj.io`
    pub application_count: usize,
    /// `appprojects.argoproj.io`
    pub project_count: usize,
}

/// Count Argo CD applications and projects over `members`
///
/// Members are counted concurrently. A member whose listing fails, or that
/// does not serve the Argo CD kinds, contributes nothing.
#[instrument(skip_all, fields(members = members.len()))]
pub async fn argo_metrics(
    members: Vec<(String, Arc<dyn ResourceLister>)>,
    scope: &RequestScope,
) -> ArgoMetrics {
    let kinds = [ResourceKind::ArgoApplication, ResourceKind::ArgoProject];
    let counts = join_all(members.into_iter().map(|(cluster, lister)| async move {
        let set = ResourceChannelAggregator::new(lister).spawn(&kinds, &NamespaceQuery::all(), scope);
        match set.drain().await {
            Ok(lists) => {
                for e in lists.warnings() {
                    debug!(cluster = %cluster, error = %e, "argo objects not listed");
                }
                ArgoMetrics {
                    application_count: lists.count(ResourceKind::ArgoApplication),
                    project_count: lists.count(ResourceKind::ArgoProject),
                }
            }
            Err(e) => {
                warn!(cluster = %cluster, error = %e, "skipping cluster in argo metrics");
                ArgoMetrics::default()
            }
        }
    }))
    .await;

    counts.into_iter().fold(ArgoMetrics::default(), |acc, c| ArgoMetrics {
        application_count: acc.application_count + c.application_count,
        project_count: acc.project_count + c.project_count,
    })
}

/// Version record printed by Karmada components
///
/// Parsed from output such as
/// `version.Info{GitVersion:"v1.9.0", GitCommit:"abc", ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// Release tag
    pub git_version: String,
    /// Commit hash
    pub git_commit: String,
    /// `clean` or `dirty`
    pub git_tree_state: String,
    /// Build timestamp
    pub build_date: String,
    /// Go toolchain version
    pub go_version: String,
    /// Compiler name
    pub compiler: String,
    /// OS/architecture
    pub platform: String,
}

impl VersionInfo {
    /// Parse the `Key: "Value"` pairs between the first `{` and the next `}`
    ///
    /// Unknown keys and malformed pairs are skipped; input without braces
    /// yields an empty record.
    pub fn parse(raw: &str) -> Self {
        let mut info = Self::default();
        let Some(start) = raw.find('{') else {
            return info;
        };
        let Some(len) = raw[start + 1..].find('}') else {
            return info;
        };

        for pair in raw[start + 1..start + 1 + len].split(',') {
            let Some((key, value)) = pair.trim().split_once(':') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_string();
            match key.trim() {
                "GitVersion" => info.git_version = value,
                "GitCommit" => info.git_commit = value,
                "GitTreeState" => info.git_tree_state = value,
                "BuildDate" => info.build_date = value,
                "GoVersion" => info.go_version = value,
                "Compiler" => info.compiler = value,
                "Platform" => info.platform = value,
                _ => {}
            }
        }
        info
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version.Info{{GitVersion:{:?}, GitCommit:{:?}, GitTreeState:{:?}, BuildDate:{:?}, GoVersion:{:?}, Compiler:{:?}, Platform:{:?}}}",
            self.git_version,
            self.git_commit,
            self.git_tree_state,
            self.build_date,
            self.go_version,
            self.compiler,
            self.platform,
        )
    }
}

/// Controller manager version and rollout health
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KarmadaInfo {
    /// Version reported by the running binary
    pub version: VersionInfo,
    /// `running` when every desired replica is available, else `unknown`
    pub status: String,
    /// Creation time of the controller manager deployment
    pub create_time: Option<DateTime<Utc>>,
}

/// Reads the controller manager's state from the host cluster
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ControllerManagerSource: Send + Sync {
    /// Output of `karmada-controller-manager version` in a running pod
    async fn version_output(&self) -> std::result::Result<String, UpstreamError>;

    /// The controller manager deployment
    async fn deployment(&self) -> std::result::Result<Deployment, UpstreamError>;
}

/// [`ControllerManagerSource`] that execs into a controller manager pod
pub struct ExecSource {
    client: Client,
}

impl ExecSource {
    /// Reads through `client`, which must reach the host cluster
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ControllerManagerSource for ExecSource {
    async fn version_output(&self) -> std::result::Result<String, UpstreamError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), KARMADA_SYSTEM_NAMESPACE);
        let selector = format!("app={}", CONTROLLER_MANAGER);
        let list = pods.list(&ListParams::default().labels(&selector)).await?;

        let pod = list
            .items
            .iter()
            .find(|p| p.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Running"))
            .or_else(|| list.items.first())
            .ok_or_else(|| {
                UpstreamError::new(
                    UpstreamErrorKind::NotFound,
                    format!("no pod found for {}", CONTROLLER_MANAGER),
                )
            })?;

        let params = AttachParams::default()
            .container(CONTROLLER_MANAGER)
            .stdout(true)
            .stderr(false);
        let mut attached = pods
            .exec(&pod.name_any(), [CONTROLLER_MANAGER, "version"], &params)
            .await?;

        let mut output = String::new();
        if let Some(mut stdout) = attached.stdout() {
            stdout
                .read_to_string(&mut output)
                .await
                .map_err(|e| UpstreamError::new(UpstreamErrorKind::Transport, e.to_string()))?;
        }
        attached
            .join()
            .await
            .map_err(|e| UpstreamError::new(UpstreamErrorKind::Internal, e.to_string()))?;
        Ok(output)
    }

    async fn deployment(&self) -> std::result::Result<Deployment, UpstreamError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), KARMADA_SYSTEM_NAMESPACE);
        Ok(api.get(CONTROLLER_MANAGER).await?)
    }
}

/// Version and health of the controller manager
#[instrument(skip_all)]
pub async fn karmada_info(source: &dyn ControllerManagerSource, scope: &RequestScope) -> Result<KarmadaInfo> {
    let fetch = async { tokio::try_join!(source.version_output(), source.deployment()) };
    let (output, deployment) = tokio::select! {
        biased;
        _ = scope.cancelled() => Err(UpstreamError::timeout("controller manager lookup cancelled")),
        result = tokio::time::timeout_at(scope.deadline(), fetch) => result.unwrap_or_else(|_| {
            Err(UpstreamError::timeout("controller manager lookup exceeded request deadline"))
        }),
    }?;

    let desired = deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let available = deployment
        .status
        .as_ref()
        .and_then(|s| s.available_replicas)
        .unwrap_or(0);

    Ok(KarmadaInfo {
        version: VersionInfo::parse(&output),
        status: if desired == available { "running" } else { "unknown" }.to_string(),
        create_time: deployment.metadata.creation_timestamp.map(|t| t.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lister::MockResourceLister;
    use dashboard_client::{AccessPolicy, PolicyError};
    use kube::api::DynamicObject;
    use serde_json::json;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    const KARMADA_VERSION: &str = r#"karmada-controller-manager version: version.Info{GitVersion:"v1.9.0", GitCommit:"3ad0fe9c8b1e", GitTreeState:"clean", BuildDate:"2024-02-29T08:39:27Z", GoVersion:"go1.20.11", Compiler:"gc", Platform:"linux/amd64"}"#;

    struct AllowList(HashSet<&'static str>);

    #[async_trait]
    impl AccessPolicy for AllowList {
        async fn has_access(&self, _user: &str, cluster: &str) -> std::result::Result<bool, PolicyError> {
            if cluster == "broken" {
                return Err(PolicyError::Unavailable("policy store down".into()));
            }
            Ok(self.0.contains(cluster))
        }
    }

    fn scope() -> RequestScope {
        RequestScope::new(Duration::from_secs(30))
    }

    fn cluster(name: &str, cpu: &str, memory: &str) -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": "cluster.karmada.io/v1alpha1",
            "kind": "Cluster",
            "metadata": {"name": name},
            "status": {
                "nodeSummary": {"totalNum": 3, "readyNum": 2},
                "resourceSummary": {
                    "allocatable": {"cpu": cpu, "memory": memory, "pods": "110"},
                    "allocated": {"cpu": "1500m", "memory": "512Mi", "pods": "20"}
                }
            }
        }))
        .unwrap()
    }

    fn cluster_lister() -> Arc<dyn ResourceLister> {
        let mut lister = MockResourceLister::new();
        lister.expect_list().returning(|kind, _| {
            assert_eq!(kind, ResourceKind::Cluster);
            Ok(vec![
                cluster("member1", "4", "16Gi"),
                cluster("member2", "3800m", "8Gi"),
                cluster("broken", "64", "1Ti"),
            ])
        });
        Arc::new(lister)
    }

    #[tokio::test]
    async fn test_member_summary_sums_all_without_user() {
        let gate = AuthorizationGate::new(Arc::new(AllowList(HashSet::new())));
        let summary = member_cluster_status(cluster_lister(), &gate, None, &scope())
            .await
            .unwrap();

        assert_eq!(summary.clusters, vec!["member1", "member2", "broken"]);
        assert_eq!(summary.node_summary.total_num, 9);
        assert_eq!(summary.pod_summary.total_pod, 330);
    }

    #[tokio::test]
    async fn test_member_summary_includes_only_allowed_clusters() {
        let gate = AuthorizationGate::new(Arc::new(AllowList(HashSet::from(["member1", "member2"]))));
        let summary = member_cluster_status(cluster_lister(), &gate, Some("alice"), &scope())
            .await
            .unwrap();

        assert_eq!(summary.clusters, vec!["member1", "member2"]);
        assert_eq!(summary.node_summary.total_num, 6);
        assert_eq!(summary.node_summary.ready_num, 4);
        assert!((summary.cpu_summary.total_cpu - 7.8).abs() < 1e-9);
        assert!((summary.cpu_summary.allocated_cpu - 3.0).abs() < 1e-9);
        assert_eq!(summary.memory_summary.total_memory, 24.0 * 1024.0 * 1024.0 * 1024.0);
        assert_eq!(summary.memory_summary.allocated_memory, 1024.0 * 1024.0 * 1024.0);
        assert_eq!(summary.pod_summary.total_pod, 220);
        assert_eq!(summary.pod_summary.allocated_pod, 40);
    }

    #[tokio::test]
    async fn test_member_summary_denied_everywhere_is_empty() {
        let gate = AuthorizationGate::new(Arc::new(AllowList(HashSet::new())));
        let summary = member_cluster_status(cluster_lister(), &gate, Some("mallory"), &scope())
            .await
            .unwrap();
        assert!(summary.clusters.is_empty());
        assert_eq!(summary.node_summary, NodeSummary::default());
    }

    #[tokio::test]
    async fn test_member_summary_tolerates_missing_status() {
        let mut lister = MockResourceLister::new();
        lister.expect_list().returning(|_, _| {
            Ok(vec![serde_json::from_value(json!({
                "apiVersion": "cluster.karmada.io/v1alpha1",
                "kind": "Cluster",
                "metadata": {"name": "fresh"}
            }))
            .unwrap()])
        });
        let summary = member_cluster_status(Arc::new(lister), &AuthorizationGate::allow_all(), None, &scope())
            .await
            .unwrap();
        assert_eq!(summary.clusters, vec!["fresh"]);
        assert_eq!(summary.cpu_summary, CpuSummary::default());
    }

    #[tokio::test]
    async fn test_member_summary_skips_cluster_whose_check_fails() {
        let gate = AuthorizationGate::new(Arc::new(AllowList(HashSet::from(["member1", "member2", "broken"]))));
        let summary = member_cluster_status(cluster_lister(), &gate, Some("alice"), &scope())
            .await
            .unwrap();

        assert_eq!(summary.clusters, vec!["member1", "member2"]);
        assert_eq!(summary.pod_summary.total_pod, 220);
        assert!(summary.errors.is_empty());
    }

    fn ready_cluster(name: &str, ready: &str) -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": "cluster.karmada.io/v1alpha1",
            "kind": "Cluster",
            "metadata": {"name": name},
            "status": {"conditions": [{"type": "Ready", "status": ready}]}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_member_summary_tracks_registered_and_ready() {
        let mut lister = MockResourceLister::new();
        lister.expect_list().returning(|_, _| {
            Ok(vec![
                ready_cluster("member1", "True"),
                ready_cluster("member2", "False"),
                ready_cluster("member3", "True"),
            ])
        });
        let gate = AuthorizationGate::new(Arc::new(AllowList(HashSet::from(["member1", "member2"]))));
        let summary = member_cluster_status(Arc::new(lister), &gate, Some("alice"), &scope())
            .await
            .unwrap();

        assert_eq!(
            summary.registered,
            Some(vec!["member1".to_string(), "member2".to_string(), "member3".to_string()])
        );
        assert_eq!(summary.ready, vec!["member1"]);

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("registered").is_none());
        assert!(json.get("ready").is_none());
    }

    #[tokio::test]
    async fn test_member_summary_forbidden_listing_leaves_registered_unknown() {
        let mut lister = MockResourceLister::new();
        lister
            .expect_list()
            .returning(|_, _| Err(UpstreamError::new(UpstreamErrorKind::Forbidden, "clusters is forbidden")));
        let summary = member_cluster_status(Arc::new(lister), &AuthorizationGate::allow_all(), None, &scope())
            .await
            .unwrap();

        assert_eq!(summary.registered, None);
        assert!(summary.clusters.is_empty());
        assert_eq!(summary.errors.len(), 1);
    }

    fn argo_lister(applications: usize, projects: usize) -> Arc<dyn ResourceLister> {
        let mut lister = MockResourceLister::new();
        lister.expect_list().returning(move |kind, _| {
            let n = match kind {
                ResourceKind::ArgoApplication => applications,
                ResourceKind::ArgoProject => projects,
                other => panic!("unexpected list of {}", other),
            };
            let ar = kind.api_resource();
            Ok((0..n).map(|i| DynamicObject::new(&format!("obj-{}", i), &ar)).collect())
        });
        Arc::new(lister)
    }

    #[tokio::test]
    async fn test_argo_metrics_sums_members() {
        let members = vec![
            ("member1".to_string(), argo_lister(3, 1)),
            ("member2".to_string(), argo_lister(2, 2)),
        ];
        let metrics = argo_metrics(members, &scope()).await;
        assert_eq!(
            metrics,
            ArgoMetrics {
                application_count: 5,
                project_count: 3
            }
        );
    }

    #[tokio::test]
    async fn test_argo_metrics_skips_failing_members() {
        let mut unreachable = MockResourceLister::new();
        unreachable
            .expect_list()
            .returning(|_, _| Err(UpstreamError::new(UpstreamErrorKind::Transport, "connection refused")));
        let mut no_argo = MockResourceLister::new();
        no_argo
            .expect_list()
            .returning(|kind, _| Err(UpstreamError::new(UpstreamErrorKind::NotFound, format!("{} not served", kind))));

        let members: Vec<(String, Arc<dyn ResourceLister>)> = vec![
            ("member1".to_string(), argo_lister(4, 2)),
            ("down".to_string(), Arc::new(unreachable)),
            ("plain".to_string(), Arc::new(no_argo)),
        ];
        let metrics = argo_metrics(members, &scope()).await;
        assert_eq!(metrics.application_count, 4);
        assert_eq!(metrics.project_count, 2);
        assert_eq!(serde_json::to_value(metrics).unwrap(), json!({"applicationCount": 4, "projectCount": 2}));
    }

    #[tokio::test]
    async fn test_cluster_resource_status_counts() {
        let counts = HashMap::from([
            (ResourceKind::PropagationPolicy, 2),
            (ResourceKind::ClusterPropagationPolicy, 1),
            (ResourceKind::Namespace, 5),
            (ResourceKind::Deployment, 4),
            (ResourceKind::ConfigMap, 3),
            (ResourceKind::Secret, 7),
            (ResourceKind::Service, 2),
        ]);
        let mut lister = MockResourceLister::new();
        lister.expect_list().returning(move |kind, _| {
            if kind == ResourceKind::Ingress {
                return Err(UpstreamError::new(UpstreamErrorKind::NotFound, "ingresses not served"));
            }
            let n = counts.get(&kind).copied().unwrap_or(0);
            let ar = kind.api_resource();
            Ok((0..n).map(|i| DynamicObject::new(&format!("obj-{}", i), &ar)).collect())
        });

        let status = cluster_resource_status(Arc::new(lister), &scope()).await.unwrap();
        assert_eq!(status.propagation_policy_num, 3);
        assert_eq!(status.override_policy_num, 0);
        assert_eq!(status.namespace_num, 5);
        assert_eq!(status.workload_num, 4);
        assert_eq!(status.config_num, 10);
        assert_eq!(status.service_num, 2);
        assert_eq!(status.errors.len(), 1);
    }

    #[test]
    fn test_version_parse() {
        let info = VersionInfo::parse(KARMADA_VERSION);
        assert_eq!(info.git_version, "v1.9.0");
        assert_eq!(info.git_commit, "3ad0fe9c8b1e");
        assert_eq!(info.git_tree_state, "clean");
        assert_eq!(info.build_date, "2024-02-29T08:39:27Z");
        assert_eq!(info.go_version, "go1.20.11");
        assert_eq!(info.compiler, "gc");
        assert_eq!(info.platform, "linux/amd64");
    }

    #[test]
    fn test_version_round_trip() {
        let info = VersionInfo::parse(KARMADA_VERSION);
        assert_eq!(VersionInfo::parse(&info.to_string()), info);
    }

    #[test]
    fn test_version_parse_spaced_pairs() {
        let info = VersionInfo::parse(
            r#"{GitVersion: "v1.9.0", GitCommit: "abc", BuildDate: "2024-02-29T08:39:27Z", Platform: "linux/amd64"}"#,
        );
        assert_eq!(info.git_version, "v1.9.0");
        assert_eq!(info.git_commit, "abc");
        assert_eq!(info.build_date, "2024-02-29T08:39:27Z");
        assert_eq!(info.platform, "linux/amd64");
    }

    #[test]
    fn test_version_parse_degenerate_input() {
        assert_eq!(VersionInfo::parse("no braces here"), VersionInfo::default());
        assert_eq!(VersionInfo::parse("{unclosed"), VersionInfo::default());

        let partial = VersionInfo::parse(r#"{GitVersion:"v1.2.3", Unknown:"x", junk}"#);
        assert_eq!(partial.git_version, "v1.2.3");
        assert_eq!(partial.platform, "");
    }

    fn deployment(replicas: i32, available: i32) -> Deployment {
        serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {
                "name": CONTROLLER_MANAGER,
                "namespace": KARMADA_SYSTEM_NAMESPACE,
                "creationTimestamp": "2024-03-01T12:00:00Z"
            },
            "spec": {
                "replicas": replicas,
                "selector": {"matchLabels": {"app": CONTROLLER_MANAGER}},
                "template": {}
            },
            "status": {"availableReplicas": available}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_karmada_info_running() {
        let mut source = MockControllerManagerSource::new();
        source
            .expect_version_output()
            .returning(|| Ok(KARMADA_VERSION.to_string()));
        source.expect_deployment().returning(|| Ok(deployment(2, 2)));

        let info = karmada_info(&source, &scope()).await.unwrap();
        assert_eq!(info.status, "running");
        assert_eq!(info.version.git_version, "v1.9.0");
        assert!(info.create_time.is_some());
    }

    #[tokio::test]
    async fn test_karmada_info_degraded_rollout() {
        let mut source = MockControllerManagerSource::new();
        source.expect_version_output().returning(|| Ok(String::new()));
        source.expect_deployment().returning(|| Ok(deployment(2, 1)));

        let info = karmada_info(&source, &scope()).await.unwrap();
        assert_eq!(info.status, "unknown");
        assert_eq!(info.version, VersionInfo::default());
    }

    #[tokio::test]
    async fn test_karmada_info_propagates_lookup_error() {
        let mut source = MockControllerManagerSource::new();
        source.expect_version_output().returning(|| {
            Err(UpstreamError::new(UpstreamErrorKind::NotFound, "no pod"))
        });
        source.expect_deployment().returning(|| Ok(deployment(1, 1)));

        assert!(karmada_info(&source, &scope()).await.is_err());
    }
}
