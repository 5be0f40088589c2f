//! Management-cluster routes

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use dashboard_client::RequestScope;
use dashboard_resource::views::replicaset::{self, ReplicaSetView};
use dashboard_resource::ResourceList;
use serde::Deserialize;

use super::{list_request, success, ApiResponse, ListQuery, NamespacePath};
use crate::error::Result;
use crate::server::AppState;

/// `GET /api/v1/mgmt-cluster/replicaset[/{namespace}]`
pub async fn list_replicasets(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<NamespacePath>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<ResourceList<ReplicaSetView>>>> {
    let lister = state.targets.management()?;
    let req = list_request(&state, lister, path.namespace.as_deref(), &query, scope)?;
    Ok(success(replicaset::list(&req).await?))
}

/// Path of a management-cluster replica set
#[derive(Debug, Deserialize)]
pub struct ReplicaSetPath {
    namespace: String,
    name: String,
}

/// `GET /api/v1/mgmt-cluster/replicaset/{namespace}/{name}`
pub async fn replicaset_detail(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Path(path): Path<ReplicaSetPath>,
) -> Result<Json<ApiResponse<ReplicaSetView>>> {
    let lister = state.targets.management()?;
    let view = replicaset::detail(lister, &path.namespace, &path.name, &scope).await?;
    Ok(success(view))
}
