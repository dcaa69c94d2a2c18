//! # Origin CA API
//!
//! Signing capability backed by the Cloudflare Origin CA API.
//!
//! The controller depends only on the [`Signer`] and [`SignerFactory`]
//! traits; [`OriginCaClient`] is the HTTP implementation used in
//! production. Function-backed adapters ([`SignerFn`], [`FactoryFn`]) make
//! it easy to plug canned responses into reconcilers under test.

mod client;

pub use client::{OriginCaClient, OriginCaClientFactory};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Request body for `POST /certificates`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignRequest {
    /// Hostnames (DNS SANs) the certificate covers
    pub hostnames: Vec<String>,
    /// Validity in days; must be one of the values the API accepts
    #[serde(rename = "requested_validity")]
    pub validity: i64,
    /// `origin-ecc` or `origin-rsa`
    pub request_type: String,
    /// PEM encoded CSR
    pub csr: String,
}

/// Certificate returned by the Origin CA API
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SignResponse {
    #[serde(default)]
    pub id: String,
    /// PEM encoded certificate
    pub certificate: String,
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default, rename = "expires_on")]
    pub expiration: Option<String>,
    #[serde(default)]
    pub request_type: String,
    #[serde(default, rename = "requested_validity")]
    pub validity: i64,
    #[serde(default)]
    pub csr: String,
}

/// Structured error reported by the Origin CA API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cloudflare API Error code={code} message={message} ray_id={ray_id}")]
pub struct ApiError {
    pub code: i64,
    pub message: String,
    /// Value of the `cf-ray` response header, for support correlation
    pub ray_id: String,
}

/// Failure of a signing call
#[derive(Debug, Error)]
pub enum SignError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("request to Origin CA API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected Origin CA API response: {0}")]
    InvalidResponse(String),
}

impl SignError {
    /// The structured API error, if the remote side returned one
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SignError::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// Signs certificate requests with credentials already bound
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, request: &SignRequest) -> Result<SignResponse, SignError>;
}

/// Builds a [`Signer`] bound to a service key
pub trait SignerFactory: Send + Sync {
    /// # Errors
    /// Returns an error if the key cannot be used to build a client
    fn signer_for(&self, service_key: &[u8]) -> anyhow::Result<Arc<dyn Signer>>;
}

/// [`Signer`] backed by a closure
pub struct SignerFn<F>(pub F);

impl<F> std::fmt::Debug for SignerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Signer for SignerFn<F>
where
    F: Fn(&SignRequest) -> Result<SignResponse, SignError> + Send + Sync,
{
    async fn sign(&self, request: &SignRequest) -> Result<SignResponse, SignError> {
        (self.0)(request)
    }
}

/// [`SignerFactory`] backed by a closure
pub struct FactoryFn<F>(pub F);

impl<F> std::fmt::Debug for FactoryFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryFn").finish_non_exhaustive()
    }
}

impl<F> SignerFactory for FactoryFn<F>
where
    F: Fn(&[u8]) -> anyhow::Result<Arc<dyn Signer>> + Send + Sync,
{
    fn signer_for(&self, service_key: &[u8]) -> anyhow::Result<Arc<dyn Signer>> {
        (self.0)(service_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError {
            code: 1100,
            message: "Failed to write certificate to Database".to_string(),
            ray_id: "7d3eb086eedab98e".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cloudflare API Error code=1100 message=Failed to write certificate to Database ray_id=7d3eb086eedab98e"
        );
    }

    #[test]
    fn test_sign_request_wire_names() {
        let request = SignRequest {
            hostnames: vec!["example.com".to_string()],
            validity: 7,
            request_type: "origin-ecc".to_string(),
            csr: "csr".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["requested_validity"], 7);
        assert_eq!(value["request_type"], "origin-ecc");
        assert_eq!(value["hostnames"][0], "example.com");
    }

    #[tokio::test]
    async fn test_signer_fn_returns_closure_result() {
        let signer = SignerFn(|request: &SignRequest| -> Result<SignResponse, SignError> {
            Ok(SignResponse {
                certificate: format!("cert-for-{}", request.validity),
                ..Default::default()
            })
        });
        let request = SignRequest {
            hostnames: vec![],
            validity: 30,
            request_type: "origin-rsa".to_string(),
            csr: String::new(),
        };
        let response = signer.sign(&request).await.unwrap();
        assert_eq!(response.certificate, "cert-for-30");
    }
}
