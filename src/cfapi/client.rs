//! Origin CA REST Client
//!
//! Native REST implementation of `POST /certificates`.
//! Uses reqwest for HTTP requests and the `X-Auth-User-Service-Key` header
//! for authentication.
//!
//! Responses use the standard Cloudflare v4 envelope:
//!
//! ```json
//! {"success": false, "errors": [{"code": 1100, "message": "..."}], "messages": [], "result": null}
//! ```

use super::{ApiError, SignError, SignRequest, SignResponse, Signer, SignerFactory};
use crate::observability::metrics;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};
use zeroize::Zeroizing;

const SERVICE_KEY_HEADER: &str = "X-Auth-User-Service-Key";
const RAY_ID_HEADER: &str = "cf-ray";

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Option<SignResponse>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Origin CA REST client bound to one service key
pub struct OriginCaClient {
    http_client: reqwest::Client,
    endpoint: String,
    service_key: Zeroizing<String>,
}

impl std::fmt::Debug for OriginCaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginCaClient")
            .field("endpoint", &self.endpoint)
            .field("service_key", &"***")
            .finish_non_exhaustive()
    }
}

impl OriginCaClient {
    /// Create a client for `endpoint` (e.g. `https://api.cloudflare.com/client/v4`)
    ///
    /// # Errors
    /// Returns an error if the service key is not valid UTF-8 or is empty
    pub fn new(
        http_client: reqwest::Client,
        endpoint: impl Into<String>,
        service_key: &[u8],
    ) -> anyhow::Result<Self> {
        let key = std::str::from_utf8(service_key).context("service key is not valid UTF-8")?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("service key is empty");
        }

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            service_key: Zeroizing::new(key.to_string()),
        })
    }

    fn certificates_url(&self) -> String {
        format!("{}/certificates", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl Signer for OriginCaClient {
    async fn sign(&self, request: &SignRequest) -> Result<SignResponse, SignError> {
        let span = info_span!(
            "origin_ca.sign",
            request.type = request.request_type.as_str(),
            request.validity = request.validity,
            request.hostnames = request.hostnames.len()
        );

        async move {
            let start = Instant::now();
            let response = self
                .http_client
                .post(self.certificates_url())
                .header(SERVICE_KEY_HEADER, self.service_key.as_str())
                .json(request)
                .send()
                .await?;

            let status = response.status();
            let ray_id = response
                .headers()
                .get(RAY_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = response.text().await?;
            metrics::observe_sign_duration(start.elapsed().as_secs_f64());

            debug!(http.status = status.as_u16(), ray_id = ray_id.as_str(), "Origin CA API responded");

            let envelope: ApiEnvelope = serde_json::from_str(&body).map_err(|e| {
                SignError::InvalidResponse(format!("status {status}: {e}"))
            })?;

            if !envelope.success {
                let error = envelope.errors.into_iter().next().map_or_else(
                    || ApiError {
                        code: i64::from(status.as_u16()),
                        message: format!("request failed with status {status}"),
                        ray_id: ray_id.clone(),
                    },
                    |first| ApiError {
                        code: first.code,
                        message: first.message,
                        ray_id: ray_id.clone(),
                    },
                );
                return Err(SignError::Api(error));
            }

            envelope
                .result
                .ok_or_else(|| SignError::InvalidResponse("response has no result".to_string()))
        }
        .instrument(span)
        .await
    }
}

/// Builds [`OriginCaClient`]s sharing one HTTP connection pool
#[derive(Debug, Clone)]
pub struct OriginCaClientFactory {
    http_client: reqwest::Client,
    endpoint: String,
}

impl OriginCaClientFactory {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(endpoint: impl Into<String>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("origin-ca-issuer/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }
}

impl SignerFactory for OriginCaClientFactory {
    fn signer_for(&self, service_key: &[u8]) -> anyhow::Result<Arc<dyn Signer>> {
        let client = OriginCaClient::new(self.http_client.clone(), self.endpoint.clone(), service_key)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejects_empty_key() {
        let result = OriginCaClient::new(reqwest::Client::new(), "http://localhost", b"  \n");
        assert!(result.is_err());
    }

    #[test]
    fn test_certificates_url_trims_trailing_slash() {
        let client =
            OriginCaClient::new(reqwest::Client::new(), "http://localhost/client/v4/", b"key\n")
                .unwrap();
        assert_eq!(client.certificates_url(), "http://localhost/client/v4/certificates");
        assert_eq!(client.service_key.as_str(), "key");
    }

    #[test]
    fn test_envelope_failure_parsing() {
        let envelope: ApiEnvelope = serde_json::from_value(serde_json::json!({
            "success": false,
            "errors": [{"code": 1100, "message": "Failed to write certificate to Database"}],
            "messages": [],
            "result": null
        }))
        .unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.errors[0].code, 1100);
        assert!(envelope.result.is_none());
    }
}
