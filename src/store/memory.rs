//! In-process [`ObjectStore`] used by tests and local runs.
//!
//! Inserts and status writes stamp a fresh `resourceVersion`. Status writes
//! that carry an outdated one fail like the API server's optimistic
//! concurrency check.

use super::{ObjectStore, StoreError};
use crate::crd::{CertificateRequest, ClusterOriginIssuer, OriginIssuer};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap};
use kube::api::ObjectMeta;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

type Key = (String, String);

#[derive(Debug, Default)]
struct Objects {
    certificate_requests: HashMap<Key, CertificateRequest>,
    origin_issuers: HashMap<Key, OriginIssuer>,
    cluster_origin_issuers: HashMap<String, ClusterOriginIssuer>,
    secrets: HashMap<Key, Secret>,
}

/// Thread-safe map of objects keyed by namespace and name
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: Mutex<Objects>,
    status_writes: AtomicUsize,
    fail_status_writes: AtomicBool,
    resource_version: AtomicU64,
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn not_found(resource: &'static str, name: &str) -> StoreError {
    StoreError::NotFound {
        resource,
        name: name.to_string(),
    }
}

/// Objects written without a resourceVersion are accepted unconditionally
fn check_version(
    stored: &ObjectMeta,
    incoming: &ObjectMeta,
    resource: &'static str,
    name: &str,
) -> Result<(), StoreError> {
    match &incoming.resource_version {
        Some(version) if stored.resource_version.as_ref() != Some(version) => {
            Err(StoreError::Conflict {
                resource,
                name: name.to_string(),
            })
        }
        _ => Ok(()),
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Objects> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_certificate_request(&self, mut cr: CertificateRequest) {
        cr.metadata.resource_version = Some(self.next_version());
        let k = key(&cr.namespace().unwrap_or_default(), &cr.name_any());
        self.lock().certificate_requests.insert(k, cr);
    }

    pub fn insert_origin_issuer(&self, mut issuer: OriginIssuer) {
        issuer.metadata.resource_version = Some(self.next_version());
        let k = key(&issuer.namespace().unwrap_or_default(), &issuer.name_any());
        self.lock().origin_issuers.insert(k, issuer);
    }

    pub fn insert_cluster_origin_issuer(&self, mut issuer: ClusterOriginIssuer) {
        issuer.metadata.resource_version = Some(self.next_version());
        let name = issuer.name_any();
        self.lock().cluster_origin_issuers.insert(name, issuer);
    }

    pub fn insert_secret(&self, secret: Secret) {
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        self.lock().secrets.insert(k, secret);
    }

    /// Insert an Opaque secret holding a single `key`
    pub fn insert_secret_data(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: impl AsRef<[u8]>,
    ) {
        let mut secret = Secret::default();
        secret.metadata.namespace = Some(namespace.to_string());
        secret.metadata.name = Some(name.to_string());
        secret.data = Some(BTreeMap::from([(
            key.to_string(),
            ByteString(value.as_ref().to_vec()),
        )]));
        self.insert_secret(secret);
    }

    pub fn remove_certificate_request(&self, namespace: &str, name: &str) {
        self.lock().certificate_requests.remove(&key(namespace, name));
    }

    #[must_use]
    pub fn certificate_request(&self, namespace: &str, name: &str) -> Option<CertificateRequest> {
        self.lock()
            .certificate_requests
            .get(&key(namespace, name))
            .cloned()
    }

    #[must_use]
    pub fn origin_issuer(&self, namespace: &str, name: &str) -> Option<OriginIssuer> {
        self.lock().origin_issuers.get(&key(namespace, name)).cloned()
    }

    #[must_use]
    pub fn cluster_origin_issuer(&self, name: &str) -> Option<ClusterOriginIssuer> {
        self.lock().cluster_origin_issuers.get(name).cloned()
    }

    /// Number of successful status writes so far
    #[must_use]
    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    /// Make every later status write fail until reset
    pub fn set_fail_status_writes(&self, fail: bool) {
        self.fail_status_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "status writes are disabled".to_string(),
            ));
        }
        Ok(())
    }

    fn next_version(&self) -> String {
        (self.resource_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn record_write(&self) {
        self.status_writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get_certificate_request(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<CertificateRequest, StoreError> {
        self.certificate_request(namespace, name)
            .ok_or_else(|| not_found("certificaterequests.cert-manager.io", name))
    }

    async fn get_origin_issuer(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<OriginIssuer, StoreError> {
        self.origin_issuer(namespace, name)
            .ok_or_else(|| not_found("originissuers.cert-manager.k8s.cloudflare.com", name))
    }

    async fn get_cluster_origin_issuer(
        &self,
        name: &str,
    ) -> Result<ClusterOriginIssuer, StoreError> {
        self.cluster_origin_issuer(name)
            .ok_or_else(|| not_found("clusteroriginissuers.cert-manager.k8s.cloudflare.com", name))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        self.lock()
            .secrets
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found("secrets", name))
    }

    async fn update_certificate_request_status(
        &self,
        cr: &CertificateRequest,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let name = cr.name_any();
        let mut objects = self.lock();
        let stored = objects
            .certificate_requests
            .get_mut(&key(&cr.namespace().unwrap_or_default(), &name))
            .ok_or_else(|| not_found("certificaterequests.cert-manager.io", &name))?;
        check_version(
            &stored.metadata,
            &cr.metadata,
            "certificaterequests.cert-manager.io",
            &name,
        )?;
        stored.status = cr.status.clone();
        stored.metadata.resource_version = Some(self.next_version());
        drop(objects);
        self.record_write();
        Ok(())
    }

    async fn update_origin_issuer_status(&self, issuer: &OriginIssuer) -> Result<(), StoreError> {
        self.check_writable()?;
        let name = issuer.name_any();
        let mut objects = self.lock();
        let stored = objects
            .origin_issuers
            .get_mut(&key(&issuer.namespace().unwrap_or_default(), &name))
            .ok_or_else(|| not_found("originissuers.cert-manager.k8s.cloudflare.com", &name))?;
        check_version(
            &stored.metadata,
            &issuer.metadata,
            "originissuers.cert-manager.k8s.cloudflare.com",
            &name,
        )?;
        stored.status = issuer.status.clone();
        stored.metadata.resource_version = Some(self.next_version());
        drop(objects);
        self.record_write();
        Ok(())
    }

    async fn update_cluster_origin_issuer_status(
        &self,
        issuer: &ClusterOriginIssuer,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let name = issuer.name_any();
        let mut objects = self.lock();
        let stored = objects.cluster_origin_issuers.get_mut(&name).ok_or_else(|| {
            not_found("clusteroriginissuers.cert-manager.k8s.cloudflare.com", &name)
        })?;
        check_version(
            &stored.metadata,
            &issuer.metadata,
            "clusteroriginissuers.cert-manager.k8s.cloudflare.com",
            &name,
        )?;
        stored.status = issuer.status.clone();
        stored.metadata.resource_version = Some(self.next_version());
        drop(objects);
        self.record_write();
        Ok(())
    }
}
