//! # Controller
//!
//! Core reconciliation logic.
//!
//! - `certificate_request`: signs cert-manager CertificateRequests
//! - `issuer`: issuer resolution and issuer readiness reconciliation
//! - `conditions`: status condition bookkeeping
//! - `error`: reconcile error taxonomy and signing error classification
//! - `backoff`: Fibonacci backoff for requeueing retryable errors

pub mod backoff;
pub mod certificate_request;
pub mod conditions;
pub mod error;
pub mod issuer;

pub use certificate_request::CertificateRequestReconciler;
pub use error::{classify, ErrorClass, ReconcileError};
pub use issuer::{IssuerKind, IssuerReconciler, ResolvedIssuer};
