//! # CertificateRequest
//!
//! Mirror of cert-manager's `cert-manager.io/v1` CertificateRequest.
//!
//! cert-manager owns the CRD, so only the fields this controller reads or
//! writes are modelled and no schema is generated. Unknown spec fields are
//! ignored on read; only the status subresource is ever written back.

use super::bytes;
use super::condition::Condition;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize)]
#[kube(
    group = "cert-manager.io",
    version = "v1",
    kind = "CertificateRequest",
    namespaced,
    status = "CertificateRequestStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequestSpec {
    /// PEM encoded x509 certificate signing request
    #[serde(default, with = "bytes")]
    pub request: Vec<u8>,
    /// Requested certificate lifetime as a Go duration string (e.g. "2160h0m0s")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Issuer that should sign this request
    pub issuer_ref: IssuerReference,
    /// Whether the requested certificate is a CA
    #[serde(default, rename = "isCA")]
    pub is_ca: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usages: Vec<String>,
}

/// Reference to the issuer of a CertificateRequest
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequestStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// PEM encoded signed certificate; never overwritten once set
    #[serde(default, with = "bytes", skip_serializing_if = "Vec::is_empty")]
    pub certificate: Vec<u8>,
    /// PEM encoded CA certificate, if known
    #[serde(default, with = "bytes", skip_serializing_if = "Vec::is_empty")]
    pub ca: Vec<u8>,
    /// Time the request failed (RFC3339); set once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_time: Option<String>,
}

impl CertificateRequest {
    /// Conditions currently recorded on the request
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map_or(&[], |status| status.conditions.as_slice())
    }

    /// Status, created empty on first access
    pub fn status_mut(&mut self) -> &mut CertificateRequestStatus {
        self.status.get_or_insert_with(CertificateRequestStatus::default)
    }

    /// Whether a signed certificate has already been stored
    #[must_use]
    pub fn has_certificate(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|status| !status.certificate.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ConditionStatus;

    #[test]
    fn test_deserialize_certificate_request() {
        let value = serde_json::json!({
            "apiVersion": "cert-manager.io/v1",
            "kind": "CertificateRequest",
            "metadata": {"name": "foobar", "namespace": "default"},
            "spec": {
                "request": "Y3Ny",
                "duration": "168h0m0s",
                "isCA": false,
                "issuerRef": {
                    "name": "foobar",
                    "kind": "OriginIssuer",
                    "group": "cert-manager.k8s.cloudflare.com"
                },
                "username": "system:serviceaccount:cert-manager:cert-manager"
            },
            "status": {
                "conditions": [
                    {"type": "Approved", "status": "True", "reason": "cert-manager.io"}
                ]
            }
        });

        let cr: CertificateRequest = serde_json::from_value(value).unwrap();
        assert_eq!(cr.spec.request, b"csr");
        assert_eq!(cr.spec.duration.as_deref(), Some("168h0m0s"));
        assert_eq!(cr.spec.issuer_ref.kind.as_deref(), Some("OriginIssuer"));
        assert!(!cr.spec.is_ca);
        assert_eq!(cr.conditions().len(), 1);
        assert_eq!(cr.conditions()[0].status, ConditionStatus::True);
        assert!(!cr.has_certificate());
    }

    #[test]
    fn test_status_serializes_certificate_as_base64() {
        let status = CertificateRequestStatus {
            certificate: b"bogus".to_vec(),
            ..Default::default()
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["certificate"], "Ym9ndXM=");
        assert!(value.get("ca").is_none());
        assert!(value.get("failureTime").is_none());
    }
}
