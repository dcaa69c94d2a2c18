//! # Origin Issuers
//!
//! `OriginIssuer` (namespaced) and `ClusterOriginIssuer` (cluster-scoped)
//! bind a Cloudflare Origin CA service key to a certificate type.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: cert-manager.k8s.cloudflare.com/v1
//! kind: OriginIssuer
//! metadata:
//!   name: prod-issuer
//!   namespace: default
//! spec:
//!   requestType: OriginECC
//!   auth:
//!     serviceKeyRef:
//!       name: service-key
//!       key: key
//! ```

use super::condition::Condition;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// OriginIssuer signs CertificateRequests in its own namespace
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "OriginIssuer",
    group = "cert-manager.k8s.cloudflare.com",
    version = "v1",
    namespaced,
    status = "OriginIssuerStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OriginIssuerSpec {
    /// Signature type requested from the Origin CA API
    pub request_type: RequestType,
    /// Credentials used to call the Origin CA API
    pub auth: OriginIssuerAuthentication,
}

/// ClusterOriginIssuer signs CertificateRequests in any namespace.
/// Its service key secret lives in the cluster resource namespace.
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ClusterOriginIssuer",
    group = "cert-manager.k8s.cloudflare.com",
    version = "v1",
    status = "OriginIssuerStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOriginIssuerSpec {
    pub request_type: RequestType,
    pub auth: OriginIssuerAuthentication,
}

impl From<ClusterOriginIssuerSpec> for OriginIssuerSpec {
    fn from(spec: ClusterOriginIssuerSpec) -> Self {
        Self {
            request_type: spec.request_type,
            auth: spec.auth,
        }
    }
}

/// Signature type of the certificate requested from the Origin CA API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum RequestType {
    #[serde(rename = "OriginRSA")]
    OriginRsa,
    #[serde(rename = "OriginECC")]
    OriginEcc,
}

impl RequestType {
    /// Tag sent as `request_type` to the Origin CA API
    #[must_use]
    pub fn api_tag(&self) -> &'static str {
        match self {
            RequestType::OriginRsa => "origin-rsa",
            RequestType::OriginEcc => "origin-ecc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OriginIssuerAuthentication {
    /// Secret key holding the Origin CA service key
    pub service_key_ref: SecretKeySelector,
}

/// Selects a key of a Secret. The namespace is implied by the issuer kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SecretKeySelector {
    /// Name of the secret
    pub name: String,
    /// Key within the secret's data
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OriginIssuerStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::CustomResourceExt;

    #[test]
    fn test_request_type_serialization() {
        assert_eq!(
            serde_json::to_value(RequestType::OriginEcc).unwrap(),
            "OriginECC"
        );
        let parsed: RequestType = serde_json::from_value(serde_json::json!("OriginRSA")).unwrap();
        assert_eq!(parsed, RequestType::OriginRsa);
    }

    #[test]
    fn test_request_type_api_tags() {
        assert_eq!(RequestType::OriginEcc.api_tag(), "origin-ecc");
        assert_eq!(RequestType::OriginRsa.api_tag(), "origin-rsa");
    }

    #[test]
    fn test_cluster_issuer_crd_is_cluster_scoped() {
        let crd = ClusterOriginIssuer::crd();
        assert_eq!(crd.spec.scope, "Cluster");
        assert_eq!(crd.spec.group, "cert-manager.k8s.cloudflare.com");

        let crd = OriginIssuer::crd();
        assert_eq!(crd.spec.scope, "Namespaced");
    }
}
