//! PEM/DER decoding of PKCS#10 certificate signing requests.

use thiserror::Error;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::prelude::FromDer;
use x509_parser::certification_request::X509CertificationRequest;

#[derive(Debug, Error)]
pub enum CsrError {
    #[error("error decoding certificate request PEM block: {0}")]
    Pem(#[from] pem::PemError),
    #[error("error parsing certificate request: {0}")]
    Der(String),
}

/// Fields of a CSR the Origin CA API needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedCsr {
    /// DNS names from the subjectAltName extension, in request order
    pub dns_names: Vec<String>,
}

/// Decode a PEM encoded CSR and extract its DNS SANs.
///
/// # Errors
/// Returns [`CsrError`] if the input is not a PEM block or its payload is
/// not a DER encoded PKCS#10 request.
pub fn decode_certificate_request(pem_bytes: &[u8]) -> Result<DecodedCsr, CsrError> {
    let block = pem::parse(pem_bytes)?;
    let (_, csr) = X509CertificationRequest::from_der(block.contents())
        .map_err(|e| CsrError::Der(e.to_string()))?;

    let mut dns_names = Vec::new();
    if let Some(extensions) = csr.requested_extensions() {
        for extension in extensions {
            if let ParsedExtension::SubjectAlternativeName(san) = extension {
                for name in &san.general_names {
                    if let GeneralName::DNSName(dns) = name {
                        dns_names.push((*dns).to_string());
                    }
                }
            }
        }
    }

    Ok(DecodedCsr { dns_names })
}
