//! Enveloped XML signature verification.
//!
//! Verification is a trust decision, not a parsing service: every internal
//! failure on attacker-supplied input collapses into
//! [`VerificationOutcome::Untrusted`] rather than propagating, so callers
//! branch on the outcome and nothing else.

use quick_xml::Reader;
use quick_xml::events::Event;
use quick_xml::se::to_string_with_root;
use tracing::{debug, warn};

use crate::certs::fingerprint::{calculate_fingerprint, format_fingerprint};
use crate::certs::format::format_cert;
use crate::error::Result;
use crate::transport::b64_decode;
use crate::xmlsec::constants;
use crate::xmlsec::provider::{OpensslProvider, XmlSecurityProvider};
use crate::xmlsec::types::{
    AlgorithmElement, Reference, SignedInfo, Transforms, VerificationOutcome,
};
use crate::xmlsec::xmlutil;

/// Verifies enveloped signatures against configured trust material.
///
/// Trust material is either a certificate PEM, or a SHA-1 fingerprint that
/// the document's embedded certificate must match before being adopted.
#[derive(Debug, Default)]
pub struct XmlVerifier<P = OpensslProvider> {
    provider: P,
    certificate_pem: Option<String>,
    fingerprint: Option<String>,
    strict: bool,
}

impl XmlVerifier<OpensslProvider> {
    pub fn new() -> Self {
        Self::with_provider(OpensslProvider::new())
    }
}

impl<P: XmlSecurityProvider> XmlVerifier<P> {
    pub fn with_provider(provider: P) -> Self {
        Self {
            provider,
            certificate_pem: None,
            fingerprint: None,
            strict: false,
        }
    }

    pub fn with_certificate(mut self, cert_pem: &str) -> Self {
        self.certificate_pem = Some(cert_pem.to_string());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: &str) -> Self {
        self.fingerprint = Some(fingerprint.to_string());
        self
    }

    /// Additionally requires the signing certificate to validate against
    /// the configured trust anchor as an X.509 chain.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn verify_document(&self, xml: &str) -> VerificationOutcome {
        if xml.trim().is_empty() || !document_parses(xml) {
            return VerificationOutcome::Malformed;
        }
        match self.verify_inner(xml) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "signature verification failed");
                VerificationOutcome::Untrusted
            }
        }
    }

    fn verify_inner(&self, xml: &str) -> Result<VerificationOutcome> {
        let Some((start, end)) = xmlutil::element_span(xml, "Signature")? else {
            debug!("document carries no signature");
            return Ok(VerificationOutcome::Untrusted);
        };
        let info = xmlutil::collect_signature_info(&xml[start..end])?;

        let cert_pem = if let Some(pem) = &self.certificate_pem {
            pem.clone()
        } else if let Some(expected) = &self.fingerprint {
            let Some(embedded) = &info.x509_certificate_b64 else {
                warn!("fingerprint configured but document embeds no certificate");
                return Ok(VerificationOutcome::Untrusted);
            };
            let embedded_pem = format_cert(embedded, true);
            if calculate_fingerprint(&embedded_pem)? != format_fingerprint(expected) {
                warn!("embedded certificate does not match configured fingerprint");
                return Ok(VerificationOutcome::Untrusted);
            }
            embedded_pem
        } else {
            debug!("no trust material configured");
            return Ok(VerificationOutcome::Untrusted);
        };

        if self.strict {
            let subject = match &info.x509_certificate_b64 {
                Some(embedded) => format_cert(embedded, true),
                None => cert_pem.clone(),
            };
            if !self.provider.verify_chain(subject.as_bytes(), cert_pem.as_bytes())? {
                warn!("signing certificate fails chain validation");
                return Ok(VerificationOutcome::Untrusted);
            }
        }

        // Enveloped-signature transform first, then Reference resolution:
        // the digest covers the referenced element (or the whole document
        // for an empty URI) with every signature spliced out.
        let stripped = xmlutil::remove_elements(xml, "Signature")?;
        let Some(target) = xmlutil::reference_target(&stripped, &info.reference_uri)? else {
            warn!(uri = %info.reference_uri, "signature reference resolves to nothing");
            return Ok(VerificationOutcome::Untrusted);
        };
        let canonical = self.provider.canonicalize(target)?;
        let computed = self.provider.digest(&info.digest_algorithm, canonical.as_bytes())?;
        let claimed = b64_decode(&strip_whitespace(&info.digest_value_b64))?;
        if computed != claimed {
            warn!("document digest mismatch");
            return Ok(VerificationOutcome::Untrusted);
        }

        let signed_info = SignedInfo {
            xmlns_ds: Some(constants::NS_DS.to_string()),
            canonicalization_method: AlgorithmElement {
                algorithm: info.canonicalization_algorithm.clone(),
            },
            signature_method: AlgorithmElement {
                algorithm: info.signature_algorithm.clone(),
            },
            reference: Reference {
                uri: info.reference_uri.clone(),
                transforms: Transforms {
                    transforms: info
                        .transform_algorithms
                        .iter()
                        .map(|a| AlgorithmElement {
                            algorithm: a.clone(),
                        })
                        .collect(),
                },
                digest_method: AlgorithmElement {
                    algorithm: info.digest_algorithm.clone(),
                },
                digest_value: info.digest_value_b64.clone(),
            },
        };
        let signed_info_xml = to_string_with_root("ds:SignedInfo", &signed_info)?;
        let signed_info_canonical = self.provider.canonicalize(&signed_info_xml)?;
        let signature = b64_decode(&strip_whitespace(&info.signature_value_b64))?;

        let valid = self.provider.verify(
            cert_pem.as_bytes(),
            &info.signature_algorithm,
            signed_info_canonical.as_bytes(),
            &signature,
        )?;
        if valid {
            Ok(VerificationOutcome::Trusted)
        } else {
            warn!("signature value does not verify");
            Ok(VerificationOutcome::Untrusted)
        }
    }
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn document_parses(xml: &str) -> bool {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut saw_root = false;
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return saw_root,
            Ok(Event::Start(_)) | Ok(Event::Empty(_)) => saw_root = true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
}
