//! OriginIssuer and ClusterOriginIssuer readiness

mod common;

use common::*;
use origin_ca_issuer::controller::{IssuerReconciler, ReconcileError};
use origin_ca_issuer::crd::{
    Condition, ConditionStatus, OriginIssuerStatus, CONDITION_READY, REASON_NOT_FOUND,
    REASON_VERIFIED,
};
use origin_ca_issuer::store::{InMemoryStore, ObjectStore};
use std::sync::Arc;

const NAMESPACE: &str = "default";

fn reconciler(store: &Arc<InMemoryStore>) -> IssuerReconciler {
    IssuerReconciler::new(
        Arc::clone(store) as Arc<dyn ObjectStore>,
        clock(),
        CLUSTER_RESOURCE_NAMESPACE,
    )
}

fn ready(conditions: &[Condition]) -> Condition {
    conditions
        .iter()
        .find(|c| c.r#type == CONDITION_READY)
        .cloned()
        .expect("Ready condition")
}

fn issuer_conditions(status: Option<OriginIssuerStatus>) -> Vec<Condition> {
    status.map(|s| s.conditions).unwrap_or_default()
}

#[tokio::test]
async fn test_origin_issuer_with_secret_becomes_ready() {
    let store = store();
    store.insert_origin_issuer(origin_issuer(NAMESPACE, "foobar", false));
    store.insert_secret_data(NAMESPACE, SERVICE_KEY_SECRET, SERVICE_KEY, SERVICE_KEY_VALUE);

    reconciler(&store)
        .reconcile_origin_issuer(NAMESPACE, "foobar")
        .await
        .unwrap();

    let issuer = store.origin_issuer(NAMESPACE, "foobar").unwrap();
    let condition = ready(&issuer_conditions(issuer.status));
    assert_eq!(condition.status, ConditionStatus::True);
    assert_eq!(condition.reason.as_deref(), Some(REASON_VERIFIED));
    assert_eq!(
        condition.message.as_deref(),
        Some("OriginIssuer verified and ready to sign certificates")
    );
    assert_eq!(
        condition.last_transition_time.as_deref(),
        Some("2024-01-01T00:00:00Z")
    );
}

#[tokio::test]
async fn test_origin_issuer_without_secret_is_not_ready() {
    let store = store();
    store.insert_origin_issuer(origin_issuer(NAMESPACE, "foobar", false));

    let err = reconciler(&store)
        .reconcile_origin_issuer(NAMESPACE, "foobar")
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::CredentialNotFound(_)));
    assert!(err.is_retryable());
    let issuer = store.origin_issuer(NAMESPACE, "foobar").unwrap();
    let condition = ready(&issuer_conditions(issuer.status));
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.reason.as_deref(), Some(REASON_NOT_FOUND));
    assert!(condition
        .message
        .unwrap()
        .starts_with("Failed to retrieve auth secret: "));
}

#[tokio::test]
async fn test_ready_issuer_loses_readiness_when_secret_disappears() {
    let store = store();
    store.insert_origin_issuer(origin_issuer(NAMESPACE, "foobar", true));

    let result = reconciler(&store)
        .reconcile_origin_issuer(NAMESPACE, "foobar")
        .await;

    assert!(result.is_err());
    let issuer = store.origin_issuer(NAMESPACE, "foobar").unwrap();
    let condition = ready(&issuer_conditions(issuer.status));
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(
        condition.last_transition_time.as_deref(),
        Some("2024-01-01T00:00:00Z")
    );
}

#[tokio::test]
async fn test_cluster_issuer_reads_secret_from_cluster_resource_namespace() {
    let store = store();
    store.insert_cluster_origin_issuer(cluster_origin_issuer("foobar", false));
    store.insert_secret_data(
        CLUSTER_RESOURCE_NAMESPACE,
        SERVICE_KEY_SECRET,
        SERVICE_KEY,
        SERVICE_KEY_VALUE,
    );

    reconciler(&store)
        .reconcile_cluster_origin_issuer("foobar")
        .await
        .unwrap();

    let issuer = store.cluster_origin_issuer("foobar").unwrap();
    let condition = ready(&issuer_conditions(issuer.status));
    assert_eq!(condition.status, ConditionStatus::True);
    assert_eq!(
        condition.message.as_deref(),
        Some("ClusterOriginIssuer verified and ready to sign certificates")
    );
}

#[tokio::test]
async fn test_cluster_issuer_ignores_secret_in_other_namespaces() {
    let store = store();
    store.insert_cluster_origin_issuer(cluster_origin_issuer("foobar", false));
    store.insert_secret_data(NAMESPACE, SERVICE_KEY_SECRET, SERVICE_KEY, SERVICE_KEY_VALUE);

    let result = reconciler(&store)
        .reconcile_cluster_origin_issuer("foobar")
        .await;

    assert!(result.is_err());
    let issuer = store.cluster_origin_issuer("foobar").unwrap();
    let condition = ready(&issuer_conditions(issuer.status));
    assert_eq!(condition.reason.as_deref(), Some(REASON_NOT_FOUND));
}

#[tokio::test]
async fn test_invalid_issuer_spec_leaves_status_untouched() {
    let store = store();
    let mut issuer = origin_issuer(NAMESPACE, "foobar", false);
    issuer.spec.auth.service_key_ref.key = String::new();
    store.insert_origin_issuer(issuer);

    let err = reconciler(&store)
        .reconcile_origin_issuer(NAMESPACE, "foobar")
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::InvalidIssuer(_)));
    assert!(!err.is_retryable());
    assert_eq!(store.status_writes(), 0);
}

#[tokio::test]
async fn test_missing_issuer_is_not_an_error() {
    let store = store();

    let reconciler = reconciler(&store);
    reconciler
        .reconcile_origin_issuer(NAMESPACE, "missing")
        .await
        .unwrap();
    reconciler
        .reconcile_cluster_origin_issuer("missing")
        .await
        .unwrap();

    assert_eq!(store.status_writes(), 0);
}

#[tokio::test]
async fn test_status_write_failure_is_reported() {
    let store = store();
    store.insert_origin_issuer(origin_issuer(NAMESPACE, "foobar", false));
    store.insert_secret_data(NAMESPACE, SERVICE_KEY_SECRET, SERVICE_KEY, SERVICE_KEY_VALUE);
    store.set_fail_status_writes(true);

    let err = reconciler(&store)
        .reconcile_origin_issuer(NAMESPACE, "foobar")
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Store(_)));
    assert!(err.is_retryable());
}
