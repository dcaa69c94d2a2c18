//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use origin_ca_issuer::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Origin CA API seam
pub use crate::cfapi::{SignError, SignRequest, SignResponse, Signer, SignerFactory};

// Reconcilers and their errors
pub use crate::controller::{
    CertificateRequestReconciler, ErrorClass, IssuerKind, IssuerReconciler, ReconcileError,
};

// Storage seam
pub use crate::store::{InMemoryStore, KubeStore, ObjectStore, StoreError};

// Time source
pub use crate::clock::{Clock, FixedClock, SystemClock};

// Configuration
pub use crate::config::{ControllerConfig, ControllerOptions};
