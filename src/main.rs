//! # Origin CA Issuer
//!
//! Kubernetes controller that issues cert-manager certificates from the
//! Cloudflare Origin CA.
//!
//! ## Overview
//!
//! 1. **Watches** `CertificateRequest`, `OriginIssuer` and `ClusterOriginIssuer` resources
//! 2. **Verifies** issuers by reading their service key secret
//! 3. **Signs** approved requests through the Origin CA API
//! 4. **Records** the certificate and Ready condition on the request status
//!
//! ## Usage
//!
//! ```bash
//! origin-ca-issuer --cluster-resource-namespace=origin-ca-issuer
//! ```

use anyhow::Result;
use clap::Parser;
use origin_ca_issuer::config::{ControllerConfig, ControllerOptions};
use origin_ca_issuer::runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let options = ControllerOptions::parse();
    options.validate()?;

    let config = ControllerConfig::from_env();

    let init = runtime::initialize(&options, &config).await?;
    runtime::run(init).await
}
