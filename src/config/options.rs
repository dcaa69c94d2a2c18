//! # Controller Options
//!
//! Command-line flags, each also readable from an environment variable.

use crate::constants::{
    DEFAULT_API_ENDPOINT, DEFAULT_KUBE_API_BURST, DEFAULT_KUBE_API_QPS, DEFAULT_METRICS_PORT,
};
use clap::Parser;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionsError {
    #[error("invalid value for kube-api-burst: {0} must be higher than 0")]
    KubeApiBurst(i32),
    #[error("invalid value for kube-api-qps: {0} must be higher than 0")]
    KubeApiQps(f32),
    #[error("invalid value for cluster-resource-namespace: must be set")]
    ClusterResourceNamespace,
}

/// Cloudflare Origin CA issuer for cert-manager
#[derive(Debug, Clone, Parser)]
#[command(name = "origin-ca-issuer", version, about)]
pub struct ControllerOptions {
    /// Maximum queries-per-second of requests to the Kubernetes apiserver
    #[arg(long, env = "KUBE_API_QPS", default_value_t = DEFAULT_KUBE_API_QPS, allow_negative_numbers = true)]
    pub kube_api_qps: f32,

    /// Maximum burst of requests sent to the Kubernetes apiserver
    #[arg(long, env = "KUBE_API_BURST", default_value_t = DEFAULT_KUBE_API_BURST, allow_negative_numbers = true)]
    pub kube_api_burst: i32,

    /// Namespace used for cluster-scoped resources, such as secrets used by ClusterOriginIssuer
    #[arg(long, env = "CLUSTER_RESOURCE_NAMESPACE", default_value = "")]
    pub cluster_resource_namespace: String,

    /// Disables waiting for CertificateRequests to have an approved condition before signing
    #[arg(long, env = "DISABLE_APPROVED_CHECK")]
    pub disable_approved_check: bool,

    /// Port of the metrics and health probe server
    #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Base URL of the Cloudflare API
    #[arg(long, env = "CLOUDFLARE_API_ENDPOINT", default_value = DEFAULT_API_ENDPOINT)]
    pub api_endpoint: String,
}

impl ControllerOptions {
    /// # Errors
    /// Returns the first invalid option.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.kube_api_burst <= 0 {
            return Err(OptionsError::KubeApiBurst(self.kube_api_burst));
        }

        if self.kube_api_qps.is_nan() || self.kube_api_qps <= 0.0 {
            return Err(OptionsError::KubeApiQps(self.kube_api_qps));
        }

        if self.cluster_resource_namespace.trim().is_empty() {
            return Err(OptionsError::ClusterResourceNamespace);
        }

        Ok(())
    }

    /// Whether CertificateRequests must carry `Approved=True` before signing
    #[must_use]
    pub fn check_approved_condition(&self) -> bool {
        !self.disable_approved_check
    }
}
