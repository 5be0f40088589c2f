//! Control-plane list routes, read as the caller

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use dashboard_client::{AuthIdentity, RequestScope};
use dashboard_resource::views::configmap::{self, ConfigMapView};
use dashboard_resource::views::cronjob::{self, CronJobView};
use dashboard_resource::views::deployment::{self, DeploymentView};
use dashboard_resource::views::namespace::{self, NamespaceView};
use dashboard_resource::views::secret::{self, SecretView};
use dashboard_resource::{ListRequest, ResourceList};

use super::{list_request, success, ApiResponse, ListQuery, NamespacePath};
use crate::error::Result;
use crate::server::AppState;

type ListResponse<T> = Result<Json<ApiResponse<ResourceList<T>>>>;

fn request(
    state: &AppState,
    identity: &AuthIdentity,
    path: &NamespacePath,
    query: &ListQuery,
    scope: RequestScope,
) -> Result<ListRequest> {
    let lister = state.targets.control_plane(identity)?;
    list_request(state, lister, path.namespace.as_deref(), query, scope)
}

/// `GET /api/v1/secret[/{namespace}]`
pub async fn list_secrets(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<NamespacePath>,
    Query(query): Query<ListQuery>,
) -> ListResponse<SecretView> {
    let req = request(&state, &identity, &path, &query, scope)?;
    Ok(success(secret::list(&req).await?))
}

/// `GET /api/v1/configmap[/{namespace}]`
pub async fn list_configmaps(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<NamespacePath>,
    Query(query): Query<ListQuery>,
) -> ListResponse<ConfigMapView> {
    let req = request(&state, &identity, &path, &query, scope)?;
    Ok(success(configmap::list(&req).await?))
}

/// `GET /api/v1/cronjob[/{namespace}]`
pub async fn list_cronjobs(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<NamespacePath>,
    Query(query): Query<ListQuery>,
) -> ListResponse<CronJobView> {
    let req = request(&state, &identity, &path, &query, scope)?;
    Ok(success(cronjob::list(&req).await?))
}

/// `GET /api/v1/deployment[/{namespace}]`
pub async fn list_deployments(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<NamespacePath>,
    Query(query): Query<ListQuery>,
) -> ListResponse<DeploymentView> {
    let req = request(&state, &identity, &path, &query, scope)?;
    Ok(success(deployment::list(&req).await?))
}

/// `GET /api/v1/namespace`
pub async fn list_namespaces(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Extension(scope): Extension<RequestScope>,
    Query(query): Query<ListQuery>,
) -> ListResponse<NamespaceView> {
    let req = request(&state, &identity, &NamespacePath::default(), &query, scope)?;
    Ok(success(namespace::list(&req).await?))
}
