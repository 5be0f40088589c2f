//! Request middleware
//!
//! [`authenticate`] runs on every API route; [`ensure_member_cluster`] runs on
//! member routes after it, [`ensure_mgmt_admin`] on management-cluster routes.

use std::collections::HashMap;

use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use dashboard_client::current_user::CurrentUserGuard;
use dashboard_client::{AuthIdentity, RequestScope};
use tracing::debug;

use crate::error::{Error, Result};
use crate::server::AppState;

/// Resolve the caller and open the request scope
///
/// Inserts the [`AuthIdentity`] and a [`RequestScope`] into the request
/// extensions. The scope is cancelled once the response is produced or the
/// client goes away.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let identity = state.authenticator.authenticate(req.headers()).await?;
    debug!(user = ?identity.username(), path = %req.uri().path(), "authenticated request");

    let scope = RequestScope::new(state.request_timeout);
    let _cancel_on_exit = scope.drop_guard();
    let _current_user = CurrentUserGuard::enter(identity.username());

    req.extensions_mut().insert(identity);
    req.extensions_mut().insert(scope);
    Ok(next.run(req).await)
}

/// Reject callers that may not access the addressed member cluster
pub async fn ensure_member_cluster(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let cluster = params
        .get("cluster")
        .ok_or_else(|| Error::Internal("member route without cluster parameter".into()))?;
    let (username, scope) = caller(&state, &req)?;

    state.gate.require(username.as_deref(), cluster, &scope).await?;
    Ok(next.run(req).await)
}

/// Reject callers without admin rights on the management cluster
pub async fn ensure_mgmt_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let (username, scope) = caller(&state, &req)?;

    state.gate.require_admin(username.as_deref(), &scope).await?;
    Ok(next.run(req).await)
}

fn caller(state: &AppState, req: &Request) -> Result<(Option<String>, RequestScope)> {
    let username = req
        .extensions()
        .get::<AuthIdentity>()
        .ok_or_else(|| dashboard_client::Error::Unauthorized("request was not authenticated".into()))?
        .username()
        .map(str::to_owned);
    let scope = req
        .extensions()
        .get::<RequestScope>()
        .cloned()
        .unwrap_or_else(|| RequestScope::new(state.request_timeout));
    Ok((username, scope))
}
