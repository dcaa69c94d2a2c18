//! Origin CA Issuer Library
//!
//! A cert-manager external issuer that signs `CertificateRequest`s with the
//! Cloudflare Origin CA. Tests live next to each module and under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use origin_ca_issuer::prelude::*;
//! ```

pub mod cfapi;
pub mod clock;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provisioner;
pub mod runtime;
pub mod server;
pub mod store;
