//! Dashboard API server binary

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dashboard_api::{start_server, AppState, RegistryTargets, ServerConfig};
use dashboard_client::config::{DEFAULT_BURST, DEFAULT_QPS};
use dashboard_client::{
    AuthorizationGate, BootstrapOptions, CedarAccessPolicy, ClientRegistry, ConfigStore,
    RateLimit, RequestAuthenticator, TokenReviewResolver,
};
use dashboard_common::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use dashboard_common::KARMADA_SYSTEM_NAMESPACE;
use dashboard_resource::DEFAULT_MAX_PAGE_SIZE;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, info, warn};

/// Backend API for the multi-cluster dashboard
#[derive(Parser, Debug)]
#[command(name = "dashboard-api", version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "DASHBOARD_BIND_ADDRESS", default_value = "0.0.0.0:8000")]
    bind_address: SocketAddr,

    /// Kubeconfig for the host API server, used when not running in-cluster
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Context within --kubeconfig
    #[arg(long, env = "KUBE_CONTEXT")]
    context: Option<String>,

    /// Kubeconfig for the Karmada control plane
    #[arg(long, env = "KARMADA_KUBECONFIG")]
    karmada_kubeconfig: PathBuf,

    /// Context within --karmada-kubeconfig
    #[arg(long, env = "KARMADA_CONTEXT")]
    karmada_context: Option<String>,

    /// Skip TLS verification against every cluster
    #[arg(long, env = "DASHBOARD_INSECURE")]
    insecure: bool,

    /// Client-side requests per second for each target
    #[arg(long, env = "DASHBOARD_QPS", default_value_t = DEFAULT_QPS)]
    qps: u64,

    /// Client-side concurrent request burst for each target
    #[arg(long, env = "DASHBOARD_BURST", default_value_t = DEFAULT_BURST)]
    burst: usize,

    /// Component suffix appended to the outbound user agent
    #[arg(long, env = "DASHBOARD_USER_AGENT_COMPONENT", default_value = "api")]
    user_agent_component: String,

    /// Cedar policy file deciding member cluster access; all access is allowed when unset
    #[arg(long, env = "DASHBOARD_POLICY_FILE")]
    policy_file: Option<PathBuf>,

    /// Namespace of the secret holding the fallback credential
    #[arg(long, env = "DASHBOARD_CREDENTIAL_NAMESPACE", default_value = KARMADA_SYSTEM_NAMESPACE)]
    credential_namespace: String,

    /// Largest page a list route returns
    #[arg(long, env = "DASHBOARD_MAX_PAGE_SIZE", default_value_t = DEFAULT_MAX_PAGE_SIZE)]
    max_page_size: usize,

    /// Deadline in seconds for the upstream work of one request
    #[arg(long, env = "DASHBOARD_REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Resolve usernames of bearer tokens with TokenReview
    #[arg(long, env = "DASHBOARD_TOKEN_REVIEW")]
    token_review: bool,

    /// OTLP endpoint for traces and metrics
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    /// Log encoding on stdout: json or text
    #[arg(long, env = "DASHBOARD_LOG_FORMAT", default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// Log filter directives; overrides RUST_LOG
    #[arg(long, env = "DASHBOARD_LOG_FILTER")]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let telemetry = init_telemetry(TelemetryConfig {
        log_format: cli.log_format,
        log_filter: cli.log_filter.clone(),
        otlp_endpoint: cli.otlp_endpoint.clone(),
        ..TelemetryConfig::default()
    })?;

    let options = BootstrapOptions {
        kubeconfig: cli.kubeconfig.clone(),
        context: cli.context.clone(),
        karmada_kubeconfig: Some(cli.karmada_kubeconfig.clone()),
        karmada_context: cli.karmada_context.clone(),
        insecure: cli.insecure,
        rate_limit: RateLimit {
            qps: cli.qps,
            burst: cli.burst,
        },
        component: Some(cli.user_agent_component.clone()),
    };
    let store = match ConfigStore::bootstrap(&options).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "failed to load cluster configuration");
            std::process::exit(1);
        }
    };
    let registry = Arc::new(ClientRegistry::new(Arc::new(store)));

    let mut authenticator = RequestAuthenticator::new()
        .with_store(Arc::new(registry.credential_store(cli.credential_namespace.clone())?));
    if cli.token_review {
        let control_plane = registry.control_plane_client()?.client();
        authenticator = authenticator.with_resolver(Arc::new(TokenReviewResolver::new(control_plane)));
    }

    let gate = match &cli.policy_file {
        Some(path) => {
            let policy = Arc::new(CedarAccessPolicy::from_file(path.clone()).await?);
            info!(path = %path.display(), "loaded cluster access policy, SIGHUP reloads it");

            let (reload_tx, reload_rx) = mpsc::channel(1);
            tokio::spawn(forward_hangups(reload_tx));
            let reloading = Arc::clone(&policy);
            tokio::spawn(async move { reloading.reload_on(reload_rx).await });

            AuthorizationGate::new(policy)
        }
        None => {
            warn!("no policy file given, every user may access every member cluster");
            AuthorizationGate::allow_all()
        }
    };

    let state = AppState {
        targets: Arc::new(RegistryTargets::new(registry)),
        authenticator: Arc::new(authenticator),
        gate: Arc::new(gate),
        max_page_size: cli.max_page_size,
        request_timeout: Duration::from_secs(cli.request_timeout_secs),
    };

    let served = start_server(
        ServerConfig {
            addr: cli.bind_address,
        },
        state,
    )
    .await;
    telemetry.shutdown();
    Ok(served?)
}

/// Turn SIGHUP into policy reload triggers; bursts collapse into one reload
async fn forward_hangups(triggers: mpsc::Sender<()>) {
    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(hangups) => hangups,
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGHUP, policy reload disabled");
            return;
        }
    };
    while hangups.recv().await.is_some() {
        info!("SIGHUP received, reloading access policy");
        if let Err(TrySendError::Closed(_)) = triggers.try_send(()) {
            break;
        }
    }
}
