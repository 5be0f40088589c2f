//! Overview route

use axum::extract::State;
use axum::{Extension, Json};
use dashboard_client::{AuthIdentity, RequestScope};
use dashboard_resource::overview::{
    argo_metrics, cluster_resource_status, karmada_info, member_cluster_status, ArgoMetrics,
    ClusterResourceStatus, KarmadaInfo, MemberClusterStatus,
};
use serde::Serialize;
use tracing::warn;

use super::{success, ApiResponse};
use crate::error::{Error, Result};
use crate::server::AppState;

/// Overview page payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    /// Controller manager version and health; absent when it could not be read
    pub karmada_info: Option<KarmadaInfo>,
    /// Capacity over the member clusters the caller may access
    pub member_cluster_status: MemberClusterStatus,
    /// Object counts on the control plane
    pub cluster_resource_status: ClusterResourceStatus,
    /// Argo CD objects over the ready clusters the caller may access
    pub argo_metrics: ArgoMetrics,
}

/// `GET /api/v1/overview`
pub async fn overview(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Extension(scope): Extension<RequestScope>,
) -> Result<Json<ApiResponse<Overview>>> {
    let lister = state.targets.control_plane(&identity)?;

    let karmada = async {
        let source = state.targets.controller_manager()?;
        Ok::<_, Error>(karmada_info(source.as_ref(), &scope).await?)
    };
    let (karmada, members, resources) = tokio::join!(
        karmada,
        member_cluster_status(lister.clone(), &state.gate, identity.username(), &scope),
        cluster_resource_status(lister, &scope),
    );

    let karmada_info = karmada
        .inspect_err(|e| warn!(error = %e, "controller manager info unavailable"))
        .ok();
    let members = members?;
    let resources = resources?;

    if let Some(registered) = &members.registered {
        state.targets.retain_members(registered);
    }

    let argo_members = members
        .ready
        .iter()
        .filter_map(|cluster| {
            state
                .targets
                .member(cluster)
                .inspect_err(|e| warn!(cluster = %cluster, error = %e, "member cluster unavailable"))
                .ok()
                .map(|lister| (cluster.clone(), lister))
        })
        .collect();
    let argo_metrics = argo_metrics(argo_members, &scope).await;

    Ok(success(Overview {
        karmada_info,
        member_cluster_status: members,
        cluster_resource_status: resources,
        argo_metrics,
    }))
}
