//! Dashboard API server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use dashboard_client::{AuthorizationGate, RequestAuthenticator};
use tracing::info;

use crate::error::Error;
use crate::handlers::{control_plane, member, mgmt, overview};
use crate::middleware::{authenticate, ensure_member_cluster, ensure_mgmt_admin};
use crate::targets::Targets;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server
    pub addr: SocketAddr,
}

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    /// Target resolution
    pub targets: Arc<dyn Targets>,
    /// Per-request authentication
    pub authenticator: Arc<RequestAuthenticator>,
    /// Per-cluster authorization
    pub gate: Arc<AuthorizationGate>,
    /// Cap on the page size of list responses
    pub max_page_size: usize,
    /// Deadline for all upstream work of one request
    pub request_timeout: Duration,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    let member_routes = Router::new()
        .route("/member/{cluster}/pod", get(member::list_pods))
        .route("/member/{cluster}/pod/{namespace}", get(member::list_pods))
        .route("/member/{cluster}/pod/{namespace}/{name}", get(member::pod_detail))
        .route("/member/{cluster}/deployment", get(member::list_deployments))
        .route("/member/{cluster}/deployment/{namespace}", get(member::list_deployments))
        .route("/member/{cluster}/secret", get(member::list_secrets))
        .route("/member/{cluster}/secret/{namespace}", get(member::list_secrets))
        .route("/member/{cluster}/configmap", get(member::list_configmaps))
        .route("/member/{cluster}/configmap/{namespace}", get(member::list_configmaps))
        .route("/member/{cluster}/cronjob", get(member::list_cronjobs))
        .route("/member/{cluster}/cronjob/{namespace}", get(member::list_cronjobs))
        .route("/member/{cluster}/namespace", get(member::list_namespaces))
        .route_layer(from_fn_with_state(state.clone(), ensure_member_cluster));

    let mgmt_routes = Router::new()
        .route("/mgmt-cluster/replicaset", get(mgmt::list_replicasets))
        .route("/mgmt-cluster/replicaset/{namespace}", get(mgmt::list_replicasets))
        .route("/mgmt-cluster/replicaset/{namespace}/{name}", get(mgmt::replicaset_detail))
        .route_layer(from_fn_with_state(state.clone(), ensure_mgmt_admin));

    let api = Router::new()
        .route("/overview", get(overview::overview))
        .route("/secret", get(control_plane::list_secrets))
        .route("/secret/{namespace}", get(control_plane::list_secrets))
        .route("/configmap", get(control_plane::list_configmaps))
        .route("/configmap/{namespace}", get(control_plane::list_configmaps))
        .route("/cronjob", get(control_plane::list_cronjobs))
        .route("/cronjob/{namespace}", get(control_plane::list_cronjobs))
        .route("/deployment", get(control_plane::list_deployments))
        .route("/deployment/{namespace}", get(control_plane::list_deployments))
        .route("/namespace", get(control_plane::list_namespaces))
        .merge(member_routes)
        .merge(mgmt_routes)
        .layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/livez", get(|| async { "ok" }))
        .route("/readyz", get(readyz))
        .nest("/api/v1", api)
        .with_state(state)
}

async fn readyz(axum::extract::State(state): axum::extract::State<AppState>) -> StatusCode {
    if state.targets.ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Serve until ctrl-c
pub async fn start_server(config: ServerConfig, state: AppState) -> Result<(), Error> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| Error::Config(format!("failed to bind {}: {}", config.addr, e)))?;

    info!(addr = %config.addr, "Starting dashboard API server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .map_err(|e| Error::Internal(format!("server error: {}", e)))
}
