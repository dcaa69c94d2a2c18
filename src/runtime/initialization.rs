//! # Initialization
//!
//! Process startup: rustls provider, tracing, metrics, the probe server,
//! the Kubernetes client and the reconcilers. [`run`] then drives the
//! controllers until a shutdown signal arrives.

use super::watch_loop::{
    reconcile_certificate_request, reconcile_cluster_origin_issuer, reconcile_origin_issuer,
    run_controller,
};
use super::Context;
use crate::cfapi::OriginCaClientFactory;
use crate::clock::{Clock, SystemClock};
use crate::config::{ControllerConfig, ControllerOptions};
use crate::controller::backoff::BackoffRegistry;
use crate::controller::{CertificateRequestReconciler, IssuerReconciler};
use crate::crd::{CertificateRequest, ClusterOriginIssuer, OriginIssuer};
use crate::observability;
use crate::server::{start_server, ServerState};
use crate::store::{KubeStore, ObjectStore, RateLimiter};
use anyhow::{Context as _, Result};
use kube::{api::Api, Client};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

const SERVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const SERVER_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Everything [`run`] needs
pub struct InitializationResult {
    pub client: Client,
    pub context: Arc<Context>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the issuer
///
/// Options must already be validated.
///
/// # Errors
/// Returns an error if logging, metrics, the probe server, the Kubernetes
/// client, or the Origin CA HTTP client cannot be set up.
pub async fn initialize(
    options: &ControllerOptions,
    config: &ControllerConfig,
) -> Result<InitializationResult> {
    // Required for rustls 0.23+ before any TLS connection is made
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    observability::init_logging(&config.log_filter, config.log_format)?;

    info!("Starting Origin CA Issuer");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(
        cluster_resource_namespace = options.cluster_resource_namespace.as_str(),
        check_approved_condition = options.check_approved_condition(),
        api_endpoint = options.api_endpoint.as_str(),
        kube_api_qps = options.kube_api_qps,
        kube_api_burst = options.kube_api_burst,
        "Options loaded"
    );

    observability::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_handle = {
        let state = Arc::clone(&server_state);
        let port = options.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!("HTTP server error: {}", e);
            }
        })
    };
    wait_for_server_ready(&server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let limiter = Arc::new(RateLimiter::new(
        options.kube_api_qps,
        options.kube_api_burst,
    ));
    let store: Arc<dyn ObjectStore> = Arc::new(KubeStore::new(client.clone(), limiter));
    let factory = Arc::new(OriginCaClientFactory::new(options.api_endpoint.clone())?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let certificate_requests = CertificateRequestReconciler::new(
        Arc::clone(&store),
        factory,
        Arc::clone(&clock),
        options.cluster_resource_namespace.clone(),
    )
    .with_approval_check(options.check_approved_condition());
    let issuers = IssuerReconciler::new(store, clock, options.cluster_resource_namespace.clone());

    let context = Arc::new(Context {
        certificate_requests,
        issuers,
        backoff: BackoffRegistry::new(config.backoff_min_secs, config.backoff_max_secs),
        max_concurrent_reconciliations: config.max_concurrent_reconciliations,
        watch_restart_delay: config.watch_restart_delay_duration(),
    });

    info!("Issuer initialized, starting watch loops...");

    Ok(InitializationResult {
        client,
        context,
        server_state,
    })
}

/// Run the CertificateRequest, OriginIssuer and ClusterOriginIssuer
/// controllers until shutdown
///
/// # Errors
/// Currently infallible once initialized.
pub async fn run(init: InitializationResult) -> Result<()> {
    let InitializationResult {
        client,
        context,
        server_state,
    } = init;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, initiating graceful shutdown...");
        server_state.set_ready(false);
        let _ = shutdown_tx.send(true);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    tokio::join!(
        run_controller(
            Api::<CertificateRequest>::all(client.clone()),
            Arc::clone(&context),
            reconcile_certificate_request,
            shutdown_rx.clone(),
        ),
        run_controller(
            Api::<OriginIssuer>::all(client.clone()),
            Arc::clone(&context),
            reconcile_origin_issuer,
            shutdown_rx.clone(),
        ),
        run_controller(
            Api::<ClusterOriginIssuer>::all(client),
            context,
            reconcile_cluster_origin_issuer,
            shutdown_rx,
        ),
    );

    info!("Origin CA Issuer stopped");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Wait for the HTTP server to bind before starting the controllers
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > SERVER_STARTUP_TIMEOUT {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                SERVER_STARTUP_TIMEOUT.as_secs()
            ));
        }

        tokio::time::sleep(SERVER_POLL_INTERVAL).await;
    }
}
