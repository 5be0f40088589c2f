//! Member-cluster routes
//!
//! Every route here sits behind the member authorization check and reads
//! through the control plane's cluster proxy.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use dashboard_client::RequestScope;
use dashboard_resource::views::configmap::{self, ConfigMapView};
use dashboard_resource::views::cronjob::{self, CronJobView};
use dashboard_resource::views::deployment::{self, DeploymentView};
use dashboard_resource::views::namespace::{self, NamespaceView};
use dashboard_resource::views::pod::{self, PodView};
use dashboard_resource::views::secret::{self, SecretView};
use dashboard_resource::{ListRequest, ResourceList};
use k8s_openapi::api::core::v1::Pod;
use serde::Deserialize;

use super::{list_request, success, ApiResponse, ListQuery};
use crate::error::Result;
use crate::server::AppState;

type ListResponse<T> = Result<Json<ApiResponse<ResourceList<T>>>>;

/// Member cluster and optional namespace path segments
#[derive(Debug, Deserialize)]
pub struct MemberPath {
    /// Member cluster name
    pub cluster: String,
    /// Comma-separated namespaces
    pub namespace: Option<String>,
}

/// Path of a single pod on a member cluster
#[derive(Debug, Deserialize)]
pub struct MemberPodPath {
    /// Member cluster name
    pub cluster: String,
    /// Pod namespace
    pub namespace: String,
    /// Pod name
    pub name: String,
}

fn request(
    state: &AppState,
    path: &MemberPath,
    query: &ListQuery,
    scope: RequestScope,
) -> Result<ListRequest> {
    let lister = state.targets.member(&path.cluster)?;
    list_request(state, lister, path.namespace.as_deref(), query, scope)
}

/// `GET /api/v1/member/{cluster}/pod[/{namespace}]`
pub async fn list_pods(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<MemberPath>,
    Query(query): Query<ListQuery>,
) -> ListResponse<PodView> {
    let req = request(&state, &path, &query, scope)?;
    Ok(success(pod::list(&req).await?))
}

/// `GET /api/v1/member/{cluster}/pod/{namespace}/{name}`
pub async fn pod_detail(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<MemberPodPath>,
) -> Result<Json<ApiResponse<Pod>>> {
    let lister = state.targets.member(&path.cluster)?;
    let pod = pod::detail(lister.as_ref(), &path.namespace, &path.name, &scope).await?;
    Ok(success(pod))
}

/// `GET /api/v1/member/{cluster}/deployment[/{namespace}]`
pub async fn list_deployments(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<MemberPath>,
    Query(query): Query<ListQuery>,
) -> ListResponse<DeploymentView> {
    let req = request(&state, &path, &query, scope)?;
    Ok(success(deployment::list(&req).await?))
}

/// `GET /api/v1/member/{cluster}/secret[/{namespace}]`
pub async fn list_secrets(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<MemberPath>,
    Query(query): Query<ListQuery>,
) -> ListResponse<SecretView> {
    let req = request(&state, &path, &query, scope)?;
    Ok(success(secret::list(&req).await?))
}

/// `GET /api/v1/member/{cluster}/configmap[/{namespace}]`
pub async fn list_configmaps(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<MemberPath>,
    Query(query): Query<ListQuery>,
) -> ListResponse<ConfigMapView> {
    let req = request(&state, &path, &query, scope)?;
    Ok(success(configmap::list(&req).await?))
}

/// `GET /api/v1/member/{cluster}/cronjob[/{namespace}]`
pub async fn list_cronjobs(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<MemberPath>,
    Query(query): Query<ListQuery>,
) -> ListResponse<CronJobView> {
    let req = request(&state, &path, &query, scope)?;
    Ok(success(cronjob::list(&req).await?))
}

/// `GET /api/v1/member/{cluster}/namespace`
pub async fn list_namespaces(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<MemberPath>,
    Query(query): Query<ListQuery>,
) -> ListResponse<NamespaceView> {
    let req = request(&state, &path, &query, scope)?;
    Ok(success(namespace::list(&req).await?))
}
