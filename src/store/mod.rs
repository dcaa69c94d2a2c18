//! # Object Store
//!
//! Read and status-write access to the cluster objects the reconcilers need.
//!
//! - [`KubeStore`] talks to the Kubernetes API server.
//! - [`InMemoryStore`] keeps objects in process memory and backs the tests.

mod kube_store;
mod memory;
mod rate_limit;

pub use kube_store::KubeStore;
pub use memory::InMemoryStore;
pub use rate_limit::RateLimiter;

use crate::crd::{CertificateRequest, ClusterOriginIssuer, OriginIssuer};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Formatted like the API server's own message, e.g. `secrets "foo" not found`
    #[error("{resource} {name:?} not found")]
    NotFound {
        resource: &'static str,
        name: String,
    },
    /// Formatted like the API server's 409 message
    #[error("Operation cannot be fulfilled on {resource} {name:?}: the object has been modified; please apply your changes to the latest version and try again")]
    Conflict {
        resource: &'static str,
        name: String,
    },
    #[error("{0} has no {1}")]
    MissingMetadata(&'static str, &'static str),
    #[error(transparent)]
    Api(#[from] kube::Error),
    #[error("{0}")]
    Unavailable(String),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_certificate_request(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<CertificateRequest, StoreError>;

    async fn get_origin_issuer(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<OriginIssuer, StoreError>;

    async fn get_cluster_origin_issuer(&self, name: &str)
        -> Result<ClusterOriginIssuer, StoreError>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError>;

    /// Persist `cr.status`. Spec and metadata are never written. A `cr` read
    /// before the latest write is rejected when it carries a resourceVersion.
    async fn update_certificate_request_status(
        &self,
        cr: &CertificateRequest,
    ) -> Result<(), StoreError>;

    async fn update_origin_issuer_status(&self, issuer: &OriginIssuer) -> Result<(), StoreError>;

    async fn update_cluster_origin_issuer_status(
        &self,
        issuer: &ClusterOriginIssuer,
    ) -> Result<(), StoreError>;
}
