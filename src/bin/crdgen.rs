//! # CRD Generator
//!
//! Prints the `OriginIssuer` and `ClusterOriginIssuer` CustomResourceDefinitions
//! as a multi-document YAML stream.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin crdgen > deploy/crds/issuers.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use origin_ca_issuer::crd::{ClusterOriginIssuer, OriginIssuer};

fn main() {
    let crds = [OriginIssuer::crd(), ClusterOriginIssuer::crd()];

    let mut documents = Vec::with_capacity(crds.len());
    for crd in &crds {
        match serde_yaml::to_string(crd) {
            Ok(yaml) => documents.push(yaml),
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }

    print!("{}", documents.join("---\n"));
}
