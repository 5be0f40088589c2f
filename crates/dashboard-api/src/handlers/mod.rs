//! Route handlers
//!
//! Successful responses are wrapped as `{"code":200,"message":"success","data":...}`.

pub mod control_plane;
pub mod member;
pub mod mgmt;
pub mod overview;

use std::sync::Arc;

use axum::Json;
use dashboard_client::RequestScope;
use dashboard_resource::{DataSelectQuery, ListRequest, NamespaceQuery, ResourceLister};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::server::AppState;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always 200
    pub code: u16,
    /// Always `success`
    pub message: &'static str,
    /// Payload
    pub data: T,
}

/// Wrap `data` in the success envelope
pub fn success<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 200,
        message: "success",
        data,
    })
}

/// Selection parameters shared by every list route
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// `prop,term,prop,term...`
    pub filter_by: Option<String>,
    /// `a|d,prop,a|d,prop...`
    pub sort_by: Option<String>,
    /// Page size, zero or absent for no pagination
    pub items_per_page: Option<usize>,
    /// One-based page
    pub page: Option<usize>,
}

impl ListQuery {
    /// Parse into a selection query
    pub fn to_select(&self) -> Result<DataSelectQuery> {
        Ok(DataSelectQuery::from_params(
            self.filter_by.as_deref(),
            self.sort_by.as_deref(),
            self.items_per_page,
            self.page,
        )?)
    }
}

/// Optional namespace path segment
#[derive(Debug, Default, Deserialize)]
pub struct NamespacePath {
    /// Comma-separated namespaces
    pub namespace: Option<String>,
}

pub(crate) fn list_request(
    state: &AppState,
    lister: Arc<dyn ResourceLister>,
    namespace: Option<&str>,
    query: &ListQuery,
    scope: RequestScope,
) -> Result<ListRequest> {
    Ok(ListRequest {
        lister,
        namespaces: NamespaceQuery::parse(namespace),
        query: query.to_select()?,
        scope,
        max_page_size: state.max_page_size,
    })
}
