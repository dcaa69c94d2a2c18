//! # Watch Loop
//!
//! Runs one kube-runtime controller per watched kind and restarts it when its
//! stream ends without a shutdown request.

use super::error_policy::{handle_controller_result, handle_reconciliation_error, object_key};
use super::Context;
use crate::controller::ReconcileError;
use crate::crd::{CertificateRequest, ClusterOriginIssuer, OriginIssuer};
use futures::StreamExt;
use kube::api::Api;
use kube::{Resource, ResourceExt};
use kube_runtime::{controller, controller::Action, watcher, Controller};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Watch `api` and reconcile every change until shutdown
pub async fn run_controller<K, R, Fut>(
    api: Api<K>,
    ctx: Arc<Context>,
    reconcile: R,
    mut shutdown: watch::Receiver<bool>,
) where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default + Eq + Hash + Clone + Debug + Unpin,
    R: FnMut(Arc<K>, Arc<Context>) -> Fut + Clone,
    Fut: Future<Output = Result<Action, ReconcileError>> + Send + 'static,
{
    let kind = K::kind(&K::DynamicType::default()).into_owned();
    let config = controller::Config::default().concurrency(ctx.max_concurrent_reconciliations);

    loop {
        if *shutdown.borrow() {
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            resource.kind = kind.as_str()
        );
        info!(parent: &watch_span, "Starting controller watch loop...");

        Controller::new(api.clone(), watcher::Config::default().any_semantic())
            .with_config(config.clone())
            .shutdown_on_signal()
            .run(
                reconcile.clone(),
                handle_reconciliation_error::<K>,
                Arc::clone(&ctx),
            )
            .for_each(|result| {
                handle_controller_result(&result, &ctx.backoff);
                futures::future::ready(())
            })
            .await;

        if *shutdown.borrow() {
            break;
        }

        let delay = ctx.watch_restart_delay;
        warn!(
            parent: &watch_span,
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = shutdown.wait_for(|stop| *stop) => break,
        }
    }

    info!(resource.kind = kind.as_str(), "Controller stopped gracefully");
}

/// The watch cache copy only names the object to reconcile. The reconcilers
/// read it again from the API server so decisions never rest on a stale copy.
pub async fn reconcile_certificate_request(
    obj: Arc<CertificateRequest>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let namespace = obj.namespace().unwrap_or_default();
    ctx.certificate_requests
        .reconcile(&namespace, &obj.name_any())
        .await?;
    ctx.backoff.reset(&object_key(obj.as_ref()));
    Ok(Action::await_change())
}

pub async fn reconcile_origin_issuer(
    obj: Arc<OriginIssuer>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let namespace = obj.namespace().unwrap_or_default();
    ctx.issuers
        .reconcile_origin_issuer(&namespace, &obj.name_any())
        .await?;
    ctx.backoff.reset(&object_key(obj.as_ref()));
    Ok(Action::await_change())
}

pub async fn reconcile_cluster_origin_issuer(
    obj: Arc<ClusterOriginIssuer>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    ctx.issuers
        .reconcile_cluster_origin_issuer(&obj.name_any())
        .await?;
    ctx.backoff.reset(&object_key(obj.as_ref()));
    Ok(Action::await_change())
}
