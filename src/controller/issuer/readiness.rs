//! # Issuer Readiness
//!
//! Marks `OriginIssuer` and `ClusterOriginIssuer` resources `Ready=True`
//! once their service key secret can be read. CertificateRequests are only
//! signed by ready issuers.

use super::{credential_failure_reason, resolve_credential, IssuerKind};
use crate::clock::Clock;
use crate::controller::conditions::set_condition;
use crate::controller::error::ReconcileError;
use crate::crd::{
    ClusterOriginIssuer, Condition, ConditionStatus, OriginIssuer, OriginIssuerSpec,
    CONDITION_READY, REASON_VERIFIED,
};
use crate::observability::metrics;
use crate::store::{ObjectStore, StoreError};
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub struct IssuerReconciler {
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    cluster_resource_namespace: String,
}

impl std::fmt::Debug for IssuerReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerReconciler")
            .field("cluster_resource_namespace", &self.cluster_resource_namespace)
            .finish_non_exhaustive()
    }
}

fn validate_issuer_spec(spec: &OriginIssuerSpec) -> Result<(), ReconcileError> {
    let selector = &spec.auth.service_key_ref;
    if selector.name.trim().is_empty() {
        return Err(ReconcileError::InvalidIssuer(
            "spec.auth.serviceKeyRef.name must be set".to_string(),
        ));
    }
    if selector.key.trim().is_empty() {
        return Err(ReconcileError::InvalidIssuer(
            "spec.auth.serviceKeyRef.key must be set".to_string(),
        ));
    }
    Ok(())
}

impl IssuerReconciler {
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
        cluster_resource_namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            cluster_resource_namespace: cluster_resource_namespace.into(),
        }
    }

    /// Load and reconcile the `OriginIssuer` `namespace/name`.
    /// A missing issuer is not an error.
    ///
    /// # Errors
    /// Returns [`ReconcileError`] if the issuer is invalid, its credential
    /// cannot be read, or its status cannot be written.
    pub async fn reconcile_origin_issuer(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), ReconcileError> {
        match self.store.get_origin_issuer(namespace, name).await {
            Ok(issuer) => self.reconcile_origin_issuer_object(issuer).await,
            Err(err) if err.is_not_found() => {
                debug!(resource.namespace = namespace, resource.name = name, "OriginIssuer not found");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Reconcile an already loaded `OriginIssuer`
    ///
    /// # Errors
    /// See [`IssuerReconciler::reconcile_origin_issuer`].
    pub async fn reconcile_origin_issuer_object(
        &self,
        mut issuer: OriginIssuer,
    ) -> Result<(), ReconcileError> {
        let namespace = issuer
            .namespace()
            .ok_or(StoreError::MissingMetadata("OriginIssuer", "namespace"))?;
        let name = issuer.name_any();
        let span = info_span!(
            "reconcile",
            resource.kind = "OriginIssuer",
            resource.namespace = namespace.as_str(),
            resource.name = name.as_str()
        );

        async move {
            let start = Instant::now();
            metrics::increment_reconciliations(IssuerKind::OriginIssuer.as_str());

            let spec = issuer.spec.clone();
            let status = issuer.status.get_or_insert_with(Default::default);
            let outcome = self
                .verify(IssuerKind::OriginIssuer, &spec, &namespace, &mut status.conditions)
                .await;

            let result = match outcome {
                Verification::Invalid(err) => Err(err),
                Verification::Checked(checked) => {
                    let persisted = self.store.update_origin_issuer_status(&issuer).await;
                    finish(checked, persisted)
                }
            };

            record(IssuerKind::OriginIssuer, start, &result);
            result
        }
        .instrument(span)
        .await
    }

    /// Load and reconcile the `ClusterOriginIssuer` `name`.
    /// A missing issuer is not an error.
    ///
    /// # Errors
    /// Returns [`ReconcileError`] if the issuer is invalid, its credential
    /// cannot be read, or its status cannot be written.
    pub async fn reconcile_cluster_origin_issuer(&self, name: &str) -> Result<(), ReconcileError> {
        match self.store.get_cluster_origin_issuer(name).await {
            Ok(issuer) => self.reconcile_cluster_origin_issuer_object(issuer).await,
            Err(err) if err.is_not_found() => {
                debug!(resource.name = name, "ClusterOriginIssuer not found");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Reconcile an already loaded `ClusterOriginIssuer`
    ///
    /// # Errors
    /// See [`IssuerReconciler::reconcile_cluster_origin_issuer`].
    pub async fn reconcile_cluster_origin_issuer_object(
        &self,
        mut issuer: ClusterOriginIssuer,
    ) -> Result<(), ReconcileError> {
        let name = issuer.name_any();
        let span = info_span!(
            "reconcile",
            resource.kind = "ClusterOriginIssuer",
            resource.name = name.as_str()
        );

        async move {
            let start = Instant::now();
            metrics::increment_reconciliations(IssuerKind::ClusterOriginIssuer.as_str());

            let spec: OriginIssuerSpec = issuer.spec.clone().into();
            let status = issuer.status.get_or_insert_with(Default::default);
            let outcome = self
                .verify(
                    IssuerKind::ClusterOriginIssuer,
                    &spec,
                    &self.cluster_resource_namespace,
                    &mut status.conditions,
                )
                .await;

            let result = match outcome {
                Verification::Invalid(err) => Err(err),
                Verification::Checked(checked) => {
                    let persisted = self.store.update_cluster_origin_issuer_status(&issuer).await;
                    finish(checked, persisted)
                }
            };

            record(IssuerKind::ClusterOriginIssuer, start, &result);
            result
        }
        .instrument(span)
        .await
    }

    /// Check the issuer's credential and record the outcome in `conditions`
    async fn verify(
        &self,
        kind: IssuerKind,
        spec: &OriginIssuerSpec,
        secret_namespace: &str,
        conditions: &mut Vec<Condition>,
    ) -> Verification {
        if let Err(err) = validate_issuer_spec(spec) {
            error!(error = %err, "failed to validate {kind} resource");
            return Verification::Invalid(err);
        }

        let selector = &spec.auth.service_key_ref;
        let now = self.clock.now();
        match resolve_credential(self.store.as_ref(), secret_namespace, selector).await {
            Ok(_) => {
                set_condition(
                    conditions,
                    CONDITION_READY,
                    ConditionStatus::True,
                    REASON_VERIFIED,
                    &format!("{kind} verified and ready to sign certificates"),
                    now,
                );
                Verification::Checked(Ok(()))
            }
            Err(err) => {
                error!(
                    error = %err,
                    secret.namespace = secret_namespace,
                    secret.name = selector.name.as_str(),
                    "failed to retrieve {kind} auth secret"
                );
                set_condition(
                    conditions,
                    CONDITION_READY,
                    ConditionStatus::False,
                    credential_failure_reason(&err),
                    &format!("Failed to retrieve auth secret: {err}"),
                    now,
                );
                Verification::Checked(Err(err))
            }
        }
    }
}

enum Verification {
    /// Spec is invalid; status is left untouched
    Invalid(ReconcileError),
    /// A Ready condition was recorded
    Checked(Result<(), ReconcileError>),
}

/// Combine the verification outcome with the status write. A failed
/// credential check wins over a failed write.
fn finish(
    checked: Result<(), ReconcileError>,
    persisted: Result<(), StoreError>,
) -> Result<(), ReconcileError> {
    match (checked, persisted) {
        (Ok(()), Ok(())) => {
            info!("issuer verified");
            Ok(())
        }
        (Ok(()), Err(err)) => Err(ReconcileError::Store(err)),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(persist_err)) => {
            warn!(error = %persist_err, "failed to persist issuer status");
            Err(err)
        }
    }
}

fn record(kind: IssuerKind, start: Instant, result: &Result<(), ReconcileError>) {
    metrics::observe_reconciliation_duration(kind.as_str(), start.elapsed().as_secs_f64());
    if result.is_err() {
        metrics::increment_reconciliation_errors(kind.as_str());
    }
}
