//! # Runtime
//!
//! Wires the reconcilers into kube-runtime controllers.
//!
//! - `initialization`: process startup (TLS, logging, metrics, probes, clients)
//! - `watch_loop`: controller loops and their reconcile functions
//! - `error_policy`: requeue decisions and controller stream errors

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

use crate::controller::backoff::BackoffRegistry;
use crate::controller::{CertificateRequestReconciler, IssuerReconciler};
use std::time::Duration;

/// State shared by all controller loops
#[derive(Debug)]
pub struct Context {
    pub certificate_requests: CertificateRequestReconciler,
    pub issuers: IssuerReconciler,
    pub backoff: BackoffRegistry,
    pub max_concurrent_reconciliations: u16,
    pub watch_restart_delay: Duration,
}

pub use initialization::{initialize, run, InitializationResult};
