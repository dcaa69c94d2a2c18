//! # Reconcile Errors
//!
//! Every reconcile failure is either retryable (the request stays
//! non-terminal and the runtime requeues it) or terminal (a durable
//! `Ready=False` condition has been written and retrying cannot help).

use crate::constants::ORIGIN_DB_WRITE_ERROR_CODE;
use crate::provisioner::ProvisionError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The CSR or requested duration could not be decoded
    #[error(transparent)]
    MalformedInput(ProvisionError),

    #[error("unknown issuer kind: {0}")]
    UnknownIssuerKind(String),

    /// The issuer could not be read; usually because it does not exist yet
    #[error("failed to retrieve {issuer}: {source}")]
    IssuerLookup {
        issuer: String,
        #[source]
        source: StoreError,
    },

    #[error("resource {0} is not ready")]
    IssuerNotReady(String),

    #[error("invalid issuer spec: {0}")]
    InvalidIssuer(String),

    #[error(transparent)]
    CredentialNotFound(StoreError),

    #[error("secret {secret} does not contain key {key:?}")]
    MissingCredentialKey { secret: String, key: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to create API client: {0:#}")]
    SignerFactory(anyhow::Error),

    /// The Origin CA may have recorded the certificate; safe to retry
    #[error(transparent)]
    RemoteTransient(ProvisionError),

    #[error(transparent)]
    RemoteTerminal(ProvisionError),
}

impl ReconcileError {
    /// Whether a later reconcile may succeed without the object changing
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ReconcileError::MalformedInput(_)
                | ReconcileError::UnknownIssuerKind(_)
                | ReconcileError::InvalidIssuer(_)
                | ReconcileError::RemoteTerminal(_)
        )
    }

    /// Short label used in logs and metrics
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        if self.is_retryable() {
            ErrorClass::Retryable
        } else {
            ErrorClass::Terminal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    Terminal,
}

impl ErrorClass {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Retryable => "retryable",
            ErrorClass::Terminal => "terminal",
        }
    }
}

/// Classify a signing failure.
///
/// Only the Origin CA database write failure is retryable: the API may
/// have stored the certificate even though it reported an error.
#[must_use]
pub fn classify(err: &ProvisionError) -> ErrorClass {
    match err.sign_error().and_then(|e| e.api_error()) {
        Some(api) if api.code == ORIGIN_DB_WRITE_ERROR_CODE => ErrorClass::Retryable,
        _ => ErrorClass::Terminal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfapi::{ApiError, SignError};
    use crate::provisioner::DurationError;

    fn api_error(code: i64) -> ProvisionError {
        ProvisionError::Sign(SignError::Api(ApiError {
            code,
            message: "boom".to_string(),
            ray_id: "0000".to_string(),
        }))
    }

    #[test]
    fn test_classify_db_write_failure_is_retryable() {
        assert_eq!(classify(&api_error(1100)), ErrorClass::Retryable);
    }

    #[test]
    fn test_classify_other_api_codes_are_terminal() {
        assert_eq!(classify(&api_error(1000)), ErrorClass::Terminal);
        assert_eq!(classify(&api_error(1101)), ErrorClass::Terminal);
    }

    #[test]
    fn test_classify_local_errors_are_terminal() {
        let err = ProvisionError::Duration(DurationError::Empty);
        assert_eq!(classify(&err), ErrorClass::Terminal);

        let err = ProvisionError::Sign(SignError::InvalidResponse("truncated".to_string()));
        assert_eq!(classify(&err), ErrorClass::Terminal);
    }

    #[test]
    fn test_retryable_variants() {
        assert!(ReconcileError::IssuerNotReady("default/foobar".to_string()).is_retryable());
        assert!(ReconcileError::RemoteTransient(api_error(1100)).is_retryable());
        assert!(!ReconcileError::RemoteTerminal(api_error(1000)).is_retryable());
        assert!(!ReconcileError::UnknownIssuerKind("Issuer".to_string()).is_retryable());
        assert_eq!(
            ReconcileError::MissingCredentialKey {
                secret: "service-key".to_string(),
                key: "key".to_string(),
            }
            .to_string(),
            r#"secret service-key does not contain key "key""#
        );
    }
}
