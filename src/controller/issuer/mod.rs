//! # Issuer Resolution
//!
//! Maps a CertificateRequest's `issuerRef` onto an issuer spec and the
//! location of its service key.
//!
//! The two issuer kinds differ in exactly two places: the issuer lookup key
//! (namespaced or not) and the namespace the service key secret is read
//! from. Both live in [`IssuerKind`].

mod readiness;

pub use readiness::IssuerReconciler;

use super::conditions::has_condition;
use super::error::ReconcileError;
use crate::constants::{CLUSTER_ORIGIN_ISSUER_KIND, ORIGIN_ISSUER_KIND};
use crate::crd::{ConditionStatus, OriginIssuerSpec, SecretKeySelector, CONDITION_READY};
use crate::store::ObjectStore;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssuerKind {
    OriginIssuer,
    ClusterOriginIssuer,
}

impl IssuerKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuerKind::OriginIssuer => ORIGIN_ISSUER_KIND,
            IssuerKind::ClusterOriginIssuer => CLUSTER_ORIGIN_ISSUER_KIND,
        }
    }

    /// Namespace holding the issuer's service key secret
    #[must_use]
    pub fn credential_namespace<'a>(
        &self,
        issuer_namespace: &'a str,
        cluster_resource_namespace: &'a str,
    ) -> &'a str {
        match self {
            IssuerKind::OriginIssuer => issuer_namespace,
            IssuerKind::ClusterOriginIssuer => cluster_resource_namespace,
        }
    }
}

impl fmt::Display for IssuerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssuerKind {
    type Err = ReconcileError;

    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        match kind {
            ORIGIN_ISSUER_KIND => Ok(IssuerKind::OriginIssuer),
            CLUSTER_ORIGIN_ISSUER_KIND => Ok(IssuerKind::ClusterOriginIssuer),
            other => Err(ReconcileError::UnknownIssuerKind(other.to_string())),
        }
    }
}

/// A ready issuer and where to find its credential
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIssuer {
    pub kind: IssuerKind,
    /// `namespace/name` for namespaced issuers, `name` for cluster issuers
    pub display_name: String,
    pub spec: OriginIssuerSpec,
    pub credential_namespace: String,
}

/// Look up the issuer named `name` and check that it is ready.
///
/// # Errors
/// [`ReconcileError::IssuerLookup`] if the issuer cannot be read, and
/// [`ReconcileError::IssuerNotReady`] if it lacks `Ready=True`.
pub async fn resolve_issuer(
    store: &dyn ObjectStore,
    kind: IssuerKind,
    name: &str,
    request_namespace: &str,
    cluster_resource_namespace: &str,
) -> Result<ResolvedIssuer, ReconcileError> {
    let (display_name, spec, conditions) = match kind {
        IssuerKind::OriginIssuer => {
            let display_name = format!("{request_namespace}/{name}");
            let issuer = store
                .get_origin_issuer(request_namespace, name)
                .await
                .map_err(|source| ReconcileError::IssuerLookup {
                    issuer: display_name.clone(),
                    source,
                })?;
            (
                display_name,
                issuer.spec,
                issuer.status.map(|s| s.conditions).unwrap_or_default(),
            )
        }
        IssuerKind::ClusterOriginIssuer => {
            let display_name = name.to_string();
            let issuer = store
                .get_cluster_origin_issuer(name)
                .await
                .map_err(|source| ReconcileError::IssuerLookup {
                    issuer: display_name.clone(),
                    source,
                })?;
            (
                display_name,
                issuer.spec.into(),
                issuer.status.map(|s| s.conditions).unwrap_or_default(),
            )
        }
    };

    if !has_condition(&conditions, CONDITION_READY, ConditionStatus::True) {
        return Err(ReconcileError::IssuerNotReady(display_name));
    }

    Ok(ResolvedIssuer {
        kind,
        display_name,
        spec,
        credential_namespace: kind
            .credential_namespace(request_namespace, cluster_resource_namespace)
            .to_string(),
    })
}

/// Read the service key selected by `selector` from `namespace`.
///
/// # Errors
/// [`ReconcileError::CredentialNotFound`] if the secret does not exist,
/// [`ReconcileError::MissingCredentialKey`] if the key is absent, and
/// [`ReconcileError::Store`] for any other read failure.
pub async fn resolve_credential(
    store: &dyn ObjectStore,
    namespace: &str,
    selector: &SecretKeySelector,
) -> Result<Zeroizing<Vec<u8>>, ReconcileError> {
    let secret = store
        .get_secret(namespace, &selector.name)
        .await
        .map_err(|err| {
            if err.is_not_found() {
                ReconcileError::CredentialNotFound(err)
            } else {
                ReconcileError::Store(err)
            }
        })?;

    secret
        .data
        .as_ref()
        .and_then(|data| data.get(&selector.key))
        .map(|value| Zeroizing::new(value.0.clone()))
        .ok_or_else(|| ReconcileError::MissingCredentialKey {
            secret: selector.name.clone(),
            key: selector.key.clone(),
        })
}

/// Condition reason recorded for a failed credential lookup
#[must_use]
pub fn credential_failure_reason(err: &ReconcileError) -> &'static str {
    match err {
        ReconcileError::CredentialNotFound(_) | ReconcileError::MissingCredentialKey { .. } => {
            crate::crd::REASON_NOT_FOUND
        }
        _ => crate::crd::REASON_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_kind_parsing() {
        assert_eq!(
            "OriginIssuer".parse::<IssuerKind>().unwrap(),
            IssuerKind::OriginIssuer
        );
        assert_eq!(
            "ClusterOriginIssuer".parse::<IssuerKind>().unwrap(),
            IssuerKind::ClusterOriginIssuer
        );

        let err = "Issuer".parse::<IssuerKind>().unwrap_err();
        assert!(matches!(err, ReconcileError::UnknownIssuerKind(ref kind) if kind == "Issuer"));
        assert!("".parse::<IssuerKind>().is_err());
    }

    #[test]
    fn test_credential_namespace_per_kind() {
        assert_eq!(
            IssuerKind::OriginIssuer.credential_namespace("default", "cert-manager"),
            "default"
        );
        assert_eq!(
            IssuerKind::ClusterOriginIssuer.credential_namespace("default", "cert-manager"),
            "cert-manager"
        );
    }
}
