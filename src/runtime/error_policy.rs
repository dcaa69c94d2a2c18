//! # Error Policy
//!
//! Requeue decisions for failed reconciliations and handling of controller
//! stream errors.

use super::Context;
use crate::controller::backoff::BackoffRegistry;
use crate::controller::{ErrorClass, ReconcileError};
use kube::{Resource, ResourceExt};
use kube_runtime::controller::{self, Action};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::watcher;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Backoff key of an object, `kind/namespace/name` or `kind/name`
pub fn object_key<K>(obj: &K) -> String
where
    K: Resource,
    K::DynamicType: Default,
{
    let dyntype = K::DynamicType::default();
    backoff_key(&K::kind(&dyntype), obj.namespace().as_deref(), &obj.name_any())
}

/// Backoff key of an object reference emitted by the controller stream
pub fn object_ref_key<K>(object: &ObjectRef<K>) -> String
where
    K: Resource,
{
    backoff_key(
        &K::kind(&object.dyntype),
        object.namespace.as_deref(),
        &object.name,
    )
}

fn backoff_key(kind: &str, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(namespace) => format!("{kind}/{namespace}/{name}"),
        None => format!("{kind}/{name}"),
    }
}

/// Requeue retryable errors with Fibonacci backoff tracked per object.
/// Terminal errors wait for the object to change.
pub fn handle_reconciliation_error<K>(
    obj: Arc<K>,
    error: &ReconcileError,
    ctx: Arc<Context>,
) -> Action
where
    K: Resource,
    K::DynamicType: Default,
{
    let key = object_key(obj.as_ref());
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.key = key.as_str(),
        error.class = error.class().as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    match error.class() {
        ErrorClass::Retryable => {
            let delay = ctx.backoff.next(&key);
            let next_trigger_time = chrono::Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
            info!(
                "Retrying {} in {}s (next attempt at {})",
                key,
                delay.as_secs(),
                next_trigger_time.to_rfc3339()
            );
            Action::requeue(delay)
        }
        ErrorClass::Terminal => {
            ctx.backoff.reset(&key);
            warn!("Not retrying {} until it changes: {}", key, error);
            Action::await_change()
        }
    }
}

pub type ControllerResult<K> =
    Result<(ObjectRef<K>, Action), controller::Error<ReconcileError, watcher::Error>>;

/// Log an item of the controller output stream. Objects that disappeared
/// while waiting for a requeue lose their backoff state.
pub fn handle_controller_result<K>(result: &ControllerResult<K>, backoff: &BackoffRegistry)
where
    K: Resource,
    K::DynamicType: std::fmt::Debug,
{
    match result {
        Ok((object, action)) => {
            debug!(object = %object, action = ?action, "watch.event.reconciled");
        }
        // Already logged by the error policy
        Err(controller::Error::ReconcilerFailed(err, object)) => {
            debug!(object = %object, error = %err, "watch.event.reconciliation_failed");
        }
        Err(controller::Error::ObjectNotFound(object)) => {
            debug!(object = %object, "object no longer exists");
            backoff.reset(&object_ref_key(object));
        }
        Err(controller::Error::QueueError(err)) => {
            warn!(error = %err, "watch stream error, the watcher will retry");
        }
        Err(err) => {
            error!(error = %err, "controller stream error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        ClusterOriginIssuer, OriginIssuer, OriginIssuerAuthentication, OriginIssuerSpec,
        RequestType, SecretKeySelector,
    };

    fn spec() -> OriginIssuerSpec {
        OriginIssuerSpec {
            request_type: RequestType::OriginEcc,
            auth: OriginIssuerAuthentication {
                service_key_ref: SecretKeySelector {
                    name: "service-key".to_string(),
                    key: "key".to_string(),
                },
            },
        }
    }

    #[test]
    fn test_object_key_namespaced() {
        let mut issuer = OriginIssuer::new("foobar", spec());
        issuer.metadata.namespace = Some("default".to_string());
        assert_eq!(object_key(&issuer), "OriginIssuer/default/foobar");
    }

    #[test]
    fn test_object_key_cluster_scoped() {
        let spec = spec();
        let issuer = ClusterOriginIssuer::new(
            "foobar",
            crate::crd::ClusterOriginIssuerSpec {
                request_type: spec.request_type,
                auth: spec.auth,
            },
        );
        assert_eq!(object_key(&issuer), "ClusterOriginIssuer/foobar");
    }

    #[test]
    fn test_object_ref_key_matches_object_key() {
        let mut issuer = OriginIssuer::new("foobar", spec());
        issuer.metadata.namespace = Some("default".to_string());

        assert_eq!(object_ref_key(&ObjectRef::from_obj(&issuer)), object_key(&issuer));
    }

    #[test]
    fn test_deleted_object_forgets_backoff() {
        let backoff = BackoffRegistry::new(5, 300);
        let key = "OriginIssuer/default/foobar";
        backoff.next(key);
        backoff.next(key);
        assert_eq!(backoff.next(key), std::time::Duration::from_secs(10));

        let object = ObjectRef::<OriginIssuer>::new("foobar").within("default");
        let result: ControllerResult<OriginIssuer> =
            Err(controller::Error::ObjectNotFound(object.erase()));
        handle_controller_result(&result, &backoff);

        assert_eq!(backoff.next(key), std::time::Duration::from_secs(5));
    }
}
