//! # Provisioner
//!
//! Turns a CertificateRequest into an Origin CA signing call.
//!
//! The provisioner decodes the CSR, derives the hostnames from its DNS
//! SANs, normalizes the requested duration to a validity the API accepts,
//! and returns the PEM certificate the API hands back.

mod csr;
mod duration;

pub use csr::{decode_certificate_request, CsrError, DecodedCsr};
pub use duration::{parse_go_duration, DurationError};

use crate::cfapi::{SignError, SignRequest, Signer};
use crate::constants::{ALLOWED_VALIDITY_DAYS, DEFAULT_VALIDITY_DAYS};
use crate::crd::{CertificateRequest, RequestType};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to decode CSR for signing: {0}")]
    Csr(#[from] CsrError),
    #[error("failed to parse requested duration: {0}")]
    Duration(#[from] DurationError),
    #[error("unable to sign request: {0}")]
    Sign(#[source] SignError),
}

impl ProvisionError {
    /// Whether the input itself is malformed. Retrying cannot fix these.
    #[must_use]
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, ProvisionError::Csr(_) | ProvisionError::Duration(_))
    }

    /// The signing error, if the failure came from the Origin CA API call
    #[must_use]
    pub fn sign_error(&self) -> Option<&SignError> {
        match self {
            ProvisionError::Sign(err) => Some(err),
            _ => None,
        }
    }
}

/// Signs CertificateRequests for one issuer
pub struct Provisioner {
    signer: Arc<dyn Signer>,
    request_type: RequestType,
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("request_type", &self.request_type)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    #[must_use]
    pub fn new(signer: Arc<dyn Signer>, request_type: RequestType) -> Self {
        Self {
            signer,
            request_type,
        }
    }

    /// Sign `cr` and return the PEM encoded certificate.
    ///
    /// # Errors
    /// Returns [`ProvisionError`] if the CSR or duration is malformed or the
    /// signing call fails.
    pub async fn sign(&self, cr: &CertificateRequest) -> Result<Vec<u8>, ProvisionError> {
        let csr = decode_certificate_request(&cr.spec.request)?;

        let validity = match cr.spec.duration.as_deref() {
            Some(requested) => closest(
                validity_days(parse_go_duration(requested)?),
                &ALLOWED_VALIDITY_DAYS,
            ),
            None => DEFAULT_VALIDITY_DAYS,
        };

        let request = SignRequest {
            hostnames: csr.dns_names,
            validity,
            request_type: self.request_type.api_tag().to_string(),
            csr: String::from_utf8_lossy(&cr.spec.request).into_owned(),
        };

        debug!(
            hostnames = ?request.hostnames,
            validity = request.validity,
            request_type = request.request_type.as_str(),
            "requesting certificate from Origin CA"
        );

        let response = self
            .signer
            .sign(&request)
            .await
            .map_err(ProvisionError::Sign)?;

        Ok(response.certificate.into_bytes())
    }
}

/// Whole days in `duration`, truncated
#[must_use]
pub fn validity_days(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs() / 86_400).unwrap_or(i64::MAX)
}

/// The value in `valid` nearest to `of`. Ties go to the earlier value.
/// Returns `of` unchanged if `valid` is empty.
#[must_use]
pub fn closest(of: i64, valid: &[i64]) -> i64 {
    let mut best = of;
    let mut best_distance = u64::MAX;

    for &candidate in valid {
        let distance = candidate.abs_diff(of);
        if distance < best_distance {
            best = candidate;
            best_distance = distance;
        }
    }

    best
}
