//! # Custom Resource Definitions
//!
//! Resource types read and written by the controller.
//!
//! ## Module Structure
//!
//! - `certificate_request.rs` - cert-manager `CertificateRequest` (read spec, write status)
//! - `issuer.rs` - `OriginIssuer` and `ClusterOriginIssuer` owned by this controller
//! - `condition.rs` - Condition type shared by all resources
//! - `bytes.rs` - base64 encoding for `[]byte` fields

mod bytes;
mod certificate_request;
mod condition;
mod issuer;

pub use certificate_request::{
    CertificateRequest, CertificateRequestSpec, CertificateRequestStatus, IssuerReference,
};
pub use condition::{
    Condition, ConditionStatus, CONDITION_APPROVED, CONDITION_DENIED, CONDITION_READY,
    REASON_DENIED, REASON_ERROR, REASON_FAILED, REASON_ISSUED, REASON_NOT_FOUND, REASON_PENDING,
    REASON_VERIFIED,
};
pub use issuer::{
    ClusterOriginIssuer, ClusterOriginIssuerSpec, OriginIssuer, OriginIssuerAuthentication,
    OriginIssuerSpec, OriginIssuerStatus, RequestType, SecretKeySelector,
};
