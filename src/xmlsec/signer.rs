//! Enveloped XML signature construction.

use openssl::pkey::PKey;
use openssl::x509::X509;
use quick_xml::se::to_string_with_root;
use tracing::debug;

use crate::certs;
use crate::error::{Error, Result};
use crate::transport::b64_encode;
use crate::xmlsec::constants;
use crate::xmlsec::provider::{OpensslProvider, XmlSecurityProvider};
use crate::xmlsec::types::{
    AlgorithmElement, KeyInfo, Reference, Signature, SignatureAlgorithm, SignedInfo, Transforms,
    X509Data,
};
use crate::xmlsec::xmlutil;

/// Produces enveloped `ds:Signature` elements over whole documents.
///
/// The signing key and certificate are validated once at construction so a
/// bad credential surfaces where it was configured, not on first use.
pub struct XmlSigner<P = OpensslProvider> {
    provider: P,
    key_pem: String,
    cert_pem: String,
    algorithm: SignatureAlgorithm,
}

impl XmlSigner<OpensslProvider> {
    pub fn new(key_pem: &str, cert_pem: &str) -> Result<Self> {
        Self::with_provider(OpensslProvider::new(), key_pem, cert_pem)
    }
}

impl<P: XmlSecurityProvider> XmlSigner<P> {
    pub fn with_provider(provider: P, key_pem: &str, cert_pem: &str) -> Result<Self> {
        certs::validate_pem(
            key_pem,
            &[constants::PEM_PRIVATE_KEY_TAG, constants::PEM_RSA_PRIVATE_KEY_TAG],
        )?;
        certs::validate_pem(cert_pem, &[constants::PEM_CERTIFICATE_TAG])?;
        PKey::private_key_from_pem(key_pem.as_bytes())?;
        X509::from_pem(cert_pem.as_bytes())?;
        Ok(Self {
            provider,
            key_pem: key_pem.to_string(),
            cert_pem: cert_pem.to_string(),
            algorithm: SignatureAlgorithm::default(),
        })
    }

    pub fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Signs `xml` and returns the document with a `ds:Signature` spliced
    /// in, after the first `Issuer` element when one exists and otherwise
    /// as the first child of the document element.
    pub fn sign_document(&self, xml: &str) -> Result<String> {
        let reference_uri = match xmlutil::root_attribute(xml, "ID")? {
            Some(id) => format!("#{id}"),
            None => String::new(),
        };

        // Any pre-existing signatures are outside the digest, matching the
        // enveloped-signature transform the Reference declares.
        let unsigned = xmlutil::remove_elements(xml, "Signature")?;
        let target = xmlutil::reference_target(&unsigned, &reference_uri)?.ok_or_else(|| {
            Error::MalformedInput(format!("no element matches reference {reference_uri}"))
        })?;
        let canonical = self.provider.canonicalize(target)?;
        let digest = self.provider.digest(self.algorithm.digest_uri(), canonical.as_bytes())?;

        let signed_info = self.build_signed_info(&reference_uri, b64_encode(&digest));

        // The bytes actually signed are the standalone SignedInfo, with its
        // own namespace declaration, run through the same canonicalization
        // as the document.
        let standalone = SignedInfo {
            xmlns_ds: Some(constants::NS_DS.to_string()),
            ..signed_info.clone()
        };
        let signed_info_xml = to_string_with_root("ds:SignedInfo", &standalone)?;
        let signed_info_canonical = self.provider.canonicalize(&signed_info_xml)?;
        let signature_value = self.provider.sign(
            self.key_pem.as_bytes(),
            self.algorithm.uri(),
            signed_info_canonical.as_bytes(),
        )?;

        let cert_der = X509::from_pem(self.cert_pem.as_bytes())?.to_der()?;
        let signature = Signature {
            xmlns_ds: constants::NS_DS.to_string(),
            signed_info,
            signature_value: b64_encode(&signature_value),
            key_info: KeyInfo {
                x509_data: X509Data {
                    x509_certificate: b64_encode(&cert_der),
                },
            },
        };
        let signature_xml = to_string_with_root("ds:Signature", &signature)?;

        let offset = match xmlutil::after_element_offset(xml, "Issuer")? {
            Some(offset) => offset,
            None => xmlutil::root_content_offset(xml)?,
        };
        debug!(reference = %reference_uri, offset, "inserting enveloped signature");

        let mut signed = xml.to_string();
        signed.insert_str(offset, &signature_xml);
        Ok(signed)
    }

    fn build_signed_info(&self, reference_uri: &str, digest_value: String) -> SignedInfo {
        SignedInfo {
            xmlns_ds: None,
            canonicalization_method: AlgorithmElement {
                algorithm: constants::EXCLUSIVE_C14N.to_string(),
            },
            signature_method: AlgorithmElement {
                algorithm: self.algorithm.uri().to_string(),
            },
            reference: Reference {
                uri: reference_uri.to_string(),
                transforms: Transforms {
                    transforms: vec![
                        AlgorithmElement {
                            algorithm: constants::ENVELOPED_SIGNATURE.to_string(),
                        },
                        AlgorithmElement {
                            algorithm: constants::EXCLUSIVE_C14N.to_string(),
                        },
                    ],
                },
                digest_method: AlgorithmElement {
                    algorithm: self.algorithm.digest_uri().to_string(),
                },
                digest_value,
            },
        }
    }
}
