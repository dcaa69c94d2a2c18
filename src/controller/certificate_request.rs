//! # CertificateRequest Reconciler
//!
//! Signs cert-manager CertificateRequests that reference an `OriginIssuer`
//! or `ClusterOriginIssuer`.
//!
//! ## Flow
//!
//! 1. Skip requests for other issuer groups
//! 2. Skip requests that are already `Ready=True`, `Failed` or `Denied`
//! 3. Record denial by an approval controller
//! 4. Wait for approval (unless disabled)
//! 5. Skip requests that already carry a certificate, and CA requests
//! 6. Resolve the issuer and its service key
//! 7. Sign through the Origin CA and store the certificate
//!
//! The reconciler never retries on its own. Retryable failures are returned
//! with the request left non-terminal so the runtime requeues it; terminal
//! failures are recorded as `Ready=False/Failed` before the error is
//! returned so later invocations short-circuit.

use crate::cfapi::SignerFactory;
use crate::clock::{format_time, Clock};
use crate::constants::API_GROUP;
use crate::controller::conditions::{has_condition, has_condition_with_reason, set_condition};
use crate::controller::error::{classify, ErrorClass, ReconcileError};
use crate::controller::issuer::{
    credential_failure_reason, resolve_credential, resolve_issuer, IssuerKind,
};
use crate::crd::{
    CertificateRequest, ConditionStatus, CONDITION_APPROVED, CONDITION_DENIED, CONDITION_READY,
    REASON_DENIED, REASON_FAILED, REASON_ISSUED, REASON_PENDING,
};
use crate::observability::metrics;
use crate::provisioner::Provisioner;
use crate::store::{ObjectStore, StoreError};
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

const KIND: &str = "CertificateRequest";

pub struct CertificateRequestReconciler {
    store: Arc<dyn ObjectStore>,
    factory: Arc<dyn SignerFactory>,
    clock: Arc<dyn Clock>,
    cluster_resource_namespace: String,
    check_approved_condition: bool,
}

impl std::fmt::Debug for CertificateRequestReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateRequestReconciler")
            .field("cluster_resource_namespace", &self.cluster_resource_namespace)
            .field("check_approved_condition", &self.check_approved_condition)
            .finish_non_exhaustive()
    }
}

impl CertificateRequestReconciler {
    /// Approval gating is enabled by default
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        factory: Arc<dyn SignerFactory>,
        clock: Arc<dyn Clock>,
        cluster_resource_namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            factory,
            clock,
            cluster_resource_namespace: cluster_resource_namespace.into(),
            check_approved_condition: true,
        }
    }

    #[must_use]
    pub fn with_approval_check(mut self, enabled: bool) -> Self {
        self.check_approved_condition = enabled;
        self
    }

    /// Load and reconcile the CertificateRequest `namespace/name`.
    /// A request that no longer exists is not an error.
    ///
    /// # Errors
    /// Returns [`ReconcileError`] when signing did not complete; see
    /// [`ReconcileError::is_retryable`].
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<(), ReconcileError> {
        match self.store.get_certificate_request(namespace, name).await {
            Ok(cr) => self.reconcile_object(cr).await,
            Err(err) if err.is_not_found() => {
                debug!(
                    resource.namespace = namespace,
                    resource.name = name,
                    "CertificateRequest not found"
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Reconcile an already loaded CertificateRequest
    ///
    /// # Errors
    /// See [`CertificateRequestReconciler::reconcile`].
    pub async fn reconcile_object(&self, cr: CertificateRequest) -> Result<(), ReconcileError> {
        let namespace = cr.namespace().unwrap_or_default();
        let name = cr.name_any();
        let span = info_span!(
            "reconcile",
            resource.kind = KIND,
            resource.namespace = namespace.as_str(),
            resource.name = name.as_str(),
            issuer.kind = cr.spec.issuer_ref.kind.as_deref().unwrap_or_default(),
            issuer.name = cr.spec.issuer_ref.name.as_str()
        );

        async move {
            let start = Instant::now();
            metrics::increment_reconciliations(KIND);

            let result = self.run(cr).await;

            metrics::observe_reconciliation_duration(KIND, start.elapsed().as_secs_f64());
            if result.is_err() {
                metrics::increment_reconciliation_errors(KIND);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, mut cr: CertificateRequest) -> Result<(), ReconcileError> {
        if let Some(group) = cr.spec.issuer_ref.group.as_deref() {
            if !group.is_empty() && group != API_GROUP {
                debug!(group, "issuerRef group is not ours; ignoring");
                return Ok(());
            }
        }

        let conditions = cr.conditions();
        if has_condition(conditions, CONDITION_READY, ConditionStatus::True) {
            debug!("CertificateRequest is Ready; ignoring");
            return Ok(());
        }
        if has_condition_with_reason(conditions, CONDITION_READY, ConditionStatus::False, REASON_FAILED)
        {
            debug!("CertificateRequest is Failed; ignoring");
            return Ok(());
        }
        if has_condition_with_reason(conditions, CONDITION_READY, ConditionStatus::False, REASON_DENIED)
        {
            debug!("CertificateRequest already has a Ready condition with Denied reason; ignoring");
            return Ok(());
        }

        if has_condition(conditions, CONDITION_DENIED, ConditionStatus::True) {
            debug!("CertificateRequest has been denied; marking as failed");
            let now = self.clock.now();
            let status = cr.status_mut();
            if status.failure_time.is_none() {
                status.failure_time = Some(format_time(now));
            }
            self.set_status(
                &mut cr,
                ConditionStatus::False,
                REASON_DENIED,
                "The CertificateRequest was denied by an approval controller",
            )
            .await;
            return Ok(());
        }

        if self.check_approved_condition
            && !has_condition(conditions, CONDITION_APPROVED, ConditionStatus::True)
        {
            debug!("CertificateRequest has not been approved");
            return Ok(());
        }

        if cr.has_certificate() {
            debug!("existing certificate data found in status; skipping completed request");
            return Ok(());
        }

        if cr.spec.is_ca {
            info!("Origin CA does not support signing of CA certificates");
            return Ok(());
        }

        let namespace = cr
            .namespace()
            .ok_or(StoreError::MissingMetadata(KIND, "namespace"))?;

        let kind_name = cr.spec.issuer_ref.kind.clone().unwrap_or_default();
        let kind: IssuerKind = match kind_name.parse() {
            Ok(kind) => kind,
            Err(err) => {
                error!(error = %err, "certificate request references unknown issuer kind");
                self.set_status(
                    &mut cr,
                    ConditionStatus::False,
                    REASON_FAILED,
                    &format!("Unknown issuer kind: {kind_name}"),
                )
                .await;
                return Err(err);
            }
        };

        let issuer = match resolve_issuer(
            self.store.as_ref(),
            kind,
            &cr.spec.issuer_ref.name,
            &namespace,
            &self.cluster_resource_namespace,
        )
        .await
        {
            Ok(issuer) => issuer,
            Err(err) => {
                let message = match &err {
                    ReconcileError::IssuerLookup { issuer, source } => {
                        format!("Failed to retrieve OriginIssuer resource {issuer}: {source}")
                    }
                    ReconcileError::IssuerNotReady(issuer) => {
                        format!("OriginIssuer {issuer} is not Ready")
                    }
                    other => other.to_string(),
                };
                warn!(error = %err, "issuer failed resolution or readiness checks");
                self.set_status(&mut cr, ConditionStatus::False, REASON_PENDING, &message)
                    .await;
                return Err(err);
            }
        };

        let service_key = match resolve_credential(
            self.store.as_ref(),
            &issuer.credential_namespace,
            &issuer.spec.auth.service_key_ref,
        )
        .await
        {
            Ok(key) => key,
            Err(err) => {
                warn!(
                    error = %err,
                    secret.namespace = issuer.credential_namespace.as_str(),
                    secret.name = issuer.spec.auth.service_key_ref.name.as_str(),
                    "failed to retrieve issuer auth secret"
                );
                self.set_status(
                    &mut cr,
                    ConditionStatus::False,
                    credential_failure_reason(&err),
                    &format!("Failed to retrieve auth secret: {err}"),
                )
                .await;
                return Err(err);
            }
        };

        let signer = self.factory.signer_for(&service_key).map_err(|err| {
            error!(error = %err, "failed to create API client");
            ReconcileError::SignerFactory(err)
        })?;
        drop(service_key);

        let provisioner = Provisioner::new(signer, issuer.spec.request_type);
        match provisioner.sign(&cr).await {
            Ok(pem) => {
                cr.status_mut().certificate = pem;
                self.set_status(
                    &mut cr,
                    ConditionStatus::True,
                    REASON_ISSUED,
                    "Certificate issued",
                )
                .await;
                metrics::increment_certificates_issued(issuer.spec.request_type.api_tag());
                info!(issuer = issuer.display_name.as_str(), "certificate issued");
                Ok(())
            }
            Err(err) => {
                let class = classify(&err);
                metrics::increment_sign_errors(class.as_str());

                if class == ErrorClass::Retryable {
                    warn!(error = %err, "requeue-ing after API error");
                    return Err(ReconcileError::RemoteTransient(err));
                }

                error!(error = %err, "failed to sign certificate request");
                self.set_status(
                    &mut cr,
                    ConditionStatus::False,
                    REASON_FAILED,
                    &format!("Failed to sign certificate request: {err}"),
                )
                .await;

                if err.is_malformed_input() {
                    Err(ReconcileError::MalformedInput(err))
                } else {
                    Err(ReconcileError::RemoteTerminal(err))
                }
            }
        }
    }

    /// Set the Ready condition and persist the status. Write failures are
    /// logged; the next reconcile derives and writes the status again.
    async fn set_status(
        &self,
        cr: &mut CertificateRequest,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) {
        let now = self.clock.now();
        set_condition(
            &mut cr.status_mut().conditions,
            CONDITION_READY,
            status,
            reason,
            message,
            now,
        );

        if let Err(err) = self.store.update_certificate_request_status(cr).await {
            warn!(error = %err, reason, "failed to update CertificateRequest status");
        }
    }
}
