//! Shared fixtures for the integration tests
//!
//! Builds issuers, secrets and CertificateRequests in an [`InMemoryStore`],
//! plus signer factories with canned Origin CA responses.

#![allow(dead_code, reason = "each test binary uses a subset of the fixtures")]

use chrono::{DateTime, TimeZone, Utc};
use origin_ca_issuer::cfapi::{
    ApiError, FactoryFn, SignError, SignRequest, SignResponse, Signer, SignerFactory, SignerFn,
};
use origin_ca_issuer::clock::FixedClock;
use origin_ca_issuer::crd::{
    CertificateRequest, CertificateRequestSpec, CertificateRequestStatus, ClusterOriginIssuer,
    ClusterOriginIssuerSpec, Condition, ConditionStatus, IssuerReference, OriginIssuer,
    OriginIssuerAuthentication, OriginIssuerSpec, OriginIssuerStatus, RequestType,
    SecretKeySelector, CONDITION_APPROVED, CONDITION_READY, REASON_VERIFIED,
};
use origin_ca_issuer::store::InMemoryStore;
use std::sync::{Arc, Mutex, Once};

pub const ISSUER_GROUP: &str = "cert-manager.k8s.cloudflare.com";
pub const CLUSTER_RESOURCE_NAMESPACE: &str = "super-secret";
pub const SERVICE_KEY_SECRET: &str = "service-key-issuer";
pub const SERVICE_KEY: &str = "key";
pub const SERVICE_KEY_VALUE: &str = "djEuMC0weDAwQkFCMTBD";

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` so it only runs once per test binary.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(epoch()))
}

/// PEM encoded CSR for `hostnames`
pub fn csr_pem(hostnames: &[&str]) -> Vec<u8> {
    let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
    let params = rcgen::CertificateParams::new(
        hostnames.iter().map(ToString::to_string).collect::<Vec<_>>(),
    )
    .unwrap();
    params
        .serialize_request(&key_pair)
        .unwrap()
        .pem()
        .unwrap()
        .into_bytes()
}

fn condition(r#type: &str, status: ConditionStatus, reason: &str) -> Condition {
    Condition {
        r#type: r#type.to_string(),
        status,
        last_transition_time: None,
        reason: Some(reason.to_string()),
        message: None,
    }
}

fn issuer_spec() -> OriginIssuerSpec {
    OriginIssuerSpec {
        request_type: RequestType::OriginEcc,
        auth: OriginIssuerAuthentication {
            service_key_ref: SecretKeySelector {
                name: SERVICE_KEY_SECRET.to_string(),
                key: SERVICE_KEY.to_string(),
            },
        },
    }
}

fn ready_status(ready: bool) -> Option<OriginIssuerStatus> {
    ready.then(|| OriginIssuerStatus {
        conditions: vec![condition(
            CONDITION_READY,
            ConditionStatus::True,
            REASON_VERIFIED,
        )],
    })
}

pub fn origin_issuer(namespace: &str, name: &str, ready: bool) -> OriginIssuer {
    let mut issuer = OriginIssuer::new(name, issuer_spec());
    issuer.metadata.namespace = Some(namespace.to_string());
    issuer.status = ready_status(ready);
    issuer
}

pub fn cluster_origin_issuer(name: &str, ready: bool) -> ClusterOriginIssuer {
    let spec = issuer_spec();
    let mut issuer = ClusterOriginIssuer::new(
        name,
        ClusterOriginIssuerSpec {
            request_type: spec.request_type,
            auth: spec.auth,
        },
    );
    issuer.status = ready_status(ready);
    issuer
}

/// An approved request for `example.com` issued by `kind/issuer`
pub fn certificate_request(
    namespace: &str,
    name: &str,
    kind: &str,
    issuer: &str,
) -> CertificateRequest {
    let mut cr = CertificateRequest::new(
        name,
        CertificateRequestSpec {
            request: csr_pem(&["example.com"]),
            duration: Some("168h".to_string()),
            issuer_ref: IssuerReference {
                name: issuer.to_string(),
                kind: Some(kind.to_string()),
                group: Some(ISSUER_GROUP.to_string()),
            },
            ..CertificateRequestSpec::default()
        },
    );
    cr.metadata.namespace = Some(namespace.to_string());
    cr.status = Some(CertificateRequestStatus {
        conditions: vec![condition(
            CONDITION_APPROVED,
            ConditionStatus::True,
            "cert-manager.io",
        )],
        ..CertificateRequestStatus::default()
    });
    cr
}

pub fn with_condition(
    mut cr: CertificateRequest,
    r#type: &str,
    status: ConditionStatus,
    reason: &str,
) -> CertificateRequest {
    cr.status_mut()
        .conditions
        .push(condition(r#type, status, reason));
    cr
}

pub fn without_conditions(mut cr: CertificateRequest) -> CertificateRequest {
    cr.status_mut().conditions.clear();
    cr
}

pub fn store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

/// Records the service keys the reconciler built clients with, and how
/// often the Origin CA was called
#[derive(Debug, Default)]
pub struct Calls {
    pub service_keys: Mutex<Vec<Vec<u8>>>,
    pub sign_requests: Mutex<Vec<SignRequest>>,
}

impl Calls {
    pub fn service_keys(&self) -> Vec<Vec<u8>> {
        self.service_keys.lock().unwrap().clone()
    }

    pub fn sign_requests(&self) -> Vec<SignRequest> {
        self.sign_requests.lock().unwrap().clone()
    }
}

/// A factory whose signers answer every request with `respond`
pub fn factory<F>(calls: &Arc<Calls>, respond: F) -> Arc<dyn SignerFactory>
where
    F: Fn(&SignRequest) -> Result<SignResponse, SignError> + Clone + Send + Sync + 'static,
{
    let calls = Arc::clone(calls);
    Arc::new(FactoryFn(
        move |service_key: &[u8]| -> anyhow::Result<Arc<dyn Signer>> {
            calls.service_keys.lock().unwrap().push(service_key.to_vec());
            let calls = Arc::clone(&calls);
            let respond = respond.clone();
            Ok(Arc::new(SignerFn(
                move |request: &SignRequest| -> Result<SignResponse, SignError> {
                    calls.sign_requests.lock().unwrap().push(request.clone());
                    respond(request)
                },
            )))
        },
    ))
}

pub fn issue(
    certificate: &'static str,
) -> impl Fn(&SignRequest) -> Result<SignResponse, SignError> + Clone + Send + Sync + 'static {
    move |request: &SignRequest| -> Result<SignResponse, SignError> {
        Ok(SignResponse {
            certificate: certificate.to_string(),
            hostnames: request.hostnames.clone(),
            request_type: request.request_type.clone(),
            validity: request.validity,
            ..SignResponse::default()
        })
    }
}

pub fn api_error(
    code: i64,
) -> impl Fn(&SignRequest) -> Result<SignResponse, SignError> + Clone + Send + Sync + 'static {
    move |_: &SignRequest| -> Result<SignResponse, SignError> {
        Err(SignError::Api(ApiError {
            code,
            message: "Failed to write certificate to Database".to_string(),
            ray_id: "0123456789abcdef-ABC".to_string(),
        }))
    }
}

pub fn conditions(cr: &CertificateRequest) -> Vec<Condition> {
    cr.conditions().to_vec()
}

pub fn ready_condition(cr: &CertificateRequest) -> Option<Condition> {
    cr.conditions()
        .iter()
        .find(|c| c.r#type == CONDITION_READY)
        .cloned()
}
