//! API server backed [`ObjectStore`].
//!
//! Status writes go through the status subresource as a JSON merge patch
//! guarded by the object's `resourceVersion`.
//! Every request waits on the shared [`RateLimiter`] first.

use super::{ObjectStore, RateLimiter, StoreError};
use crate::constants::FIELD_MANAGER;
use crate::crd::{CertificateRequest, ClusterOriginIssuer, OriginIssuer};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client, limiter: Arc<RateLimiter>) -> Self {
        Self { client, limiter }
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

async fn get_named<K>(api: Api<K>, resource: &'static str, name: &str) -> Result<K, StoreError>
where
    K: Clone + DeserializeOwned + Debug,
{
    api.get_opt(name).await?.ok_or_else(|| StoreError::NotFound {
        resource,
        name: name.to_string(),
    })
}

/// The object's `resourceVersion` rides along as a precondition, so a write
/// based on an outdated read fails with 409 Conflict.
async fn patch_status<K, S>(api: Api<K>, object: &K, status: Option<&S>) -> Result<(), StoreError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
    S: Serialize,
{
    let name = object.name_any();
    let mut patch = serde_json::json!({
        "status": status
    });
    if let Some(resource_version) = object.resource_version() {
        patch["metadata"] = serde_json::json!({ "resourceVersion": resource_version });
    }

    api.patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
        .await?;

    debug!(name = name.as_str(), "status updated");
    Ok(())
}

fn namespace_of<K: Resource>(object: &K, kind: &'static str) -> Result<String, StoreError> {
    object
        .meta()
        .namespace
        .clone()
        .ok_or(StoreError::MissingMetadata(kind, "namespace"))
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_certificate_request(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<CertificateRequest, StoreError> {
        self.limiter.acquire().await;
        get_named(
            self.namespaced(namespace),
            "certificaterequests.cert-manager.io",
            name,
        )
        .await
    }

    async fn get_origin_issuer(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<OriginIssuer, StoreError> {
        self.limiter.acquire().await;
        get_named(
            self.namespaced(namespace),
            "originissuers.cert-manager.k8s.cloudflare.com",
            name,
        )
        .await
    }

    async fn get_cluster_origin_issuer(
        &self,
        name: &str,
    ) -> Result<ClusterOriginIssuer, StoreError> {
        self.limiter.acquire().await;
        get_named(
            Api::all(self.client.clone()),
            "clusteroriginissuers.cert-manager.k8s.cloudflare.com",
            name,
        )
        .await
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        self.limiter.acquire().await;
        get_named(
            self.namespaced(namespace),
            "secrets",
            name,
        )
        .await
    }

    async fn update_certificate_request_status(
        &self,
        cr: &CertificateRequest,
    ) -> Result<(), StoreError> {
        let namespace = namespace_of(cr, "CertificateRequest")?;
        let api: Api<CertificateRequest> = self.namespaced(&namespace);
        self.limiter.acquire().await;
        patch_status(api, cr, cr.status.as_ref()).await
    }

    async fn update_origin_issuer_status(&self, issuer: &OriginIssuer) -> Result<(), StoreError> {
        let namespace = namespace_of(issuer, "OriginIssuer")?;
        let api: Api<OriginIssuer> = self.namespaced(&namespace);
        self.limiter.acquire().await;
        patch_status(api, issuer, issuer.status.as_ref()).await
    }

    async fn update_cluster_origin_issuer_status(
        &self,
        issuer: &ClusterOriginIssuer,
    ) -> Result<(), StoreError> {
        let api: Api<ClusterOriginIssuer> = Api::all(self.client.clone());
        self.limiter.acquire().await;
        patch_status(api, issuer, issuer.status.as_ref()).await
    }
}
