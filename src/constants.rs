//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! command-line flags or environment variables where applicable.

/// API group owned by this controller (`OriginIssuer`, `ClusterOriginIssuer`)
pub const API_GROUP: &str = "cert-manager.k8s.cloudflare.com";

/// Kind of the namespaced issuer
pub const ORIGIN_ISSUER_KIND: &str = "OriginIssuer";

/// Kind of the cluster-scoped issuer
pub const CLUSTER_ORIGIN_ISSUER_KIND: &str = "ClusterOriginIssuer";

/// Field manager name used for status patches
pub const FIELD_MANAGER: &str = "origin-ca-issuer";

/// Origin CA API error code returned when the certificate could not be
/// written to the Cloudflare database. The certificate may still have been
/// issued, so the request is retried rather than failed.
pub const ORIGIN_DB_WRITE_ERROR_CODE: i64 = 1100;

/// Validity in days used when a CertificateRequest does not set a duration
pub const DEFAULT_VALIDITY_DAYS: i64 = 7;

/// Validities (days) accepted by the Origin CA API, ascending.
/// Order matters: ties resolve to the first entry.
pub const ALLOWED_VALIDITY_DAYS: [i64; 7] = [7, 30, 90, 365, 730, 1095, 5475];

/// Default Origin CA API endpoint
pub const DEFAULT_API_ENDPOINT: &str = "https://api.cloudflare.com/client/v4";

/// Default Kubernetes API client queries per second
pub const DEFAULT_KUBE_API_QPS: f32 = 20.0;

/// Default Kubernetes API client burst
pub const DEFAULT_KUBE_API_BURST: i32 = 50;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default backoff minimum for retryable reconcile errors (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default backoff maximum for retryable reconcile errors (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting a watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;
