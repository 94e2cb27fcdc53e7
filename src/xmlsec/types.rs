//! Data structures for XML signature and encryption processing.

use serde::Serialize;

use super::constants::*;

/// Generic XML element carrying only an Algorithm attribute.
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmElement {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,
}

pub type CanonicalizationMethod = AlgorithmElement;
pub type SignatureMethod = AlgorithmElement;
pub type DigestMethod = AlgorithmElement;
pub type Transform = AlgorithmElement;
pub type EncryptionMethod = AlgorithmElement;

#[derive(Debug, Clone, Serialize)]
pub struct Transforms {
    #[serde(rename = "ds:Transform")]
    pub transforms: Vec<Transform>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reference {
    #[serde(rename = "@URI")]
    pub uri: String,
    #[serde(rename = "ds:Transforms")]
    pub transforms: Transforms,
    #[serde(rename = "ds:DigestMethod")]
    pub digest_method: DigestMethod,
    #[serde(rename = "ds:DigestValue")]
    pub digest_value: String,
}

/// SignedInfo carries its own namespace declaration only when serialized
/// standalone for signing; embedded in a Signature it inherits the parent's.
#[derive(Debug, Clone, Serialize)]
pub struct SignedInfo {
    #[serde(rename = "@xmlns:ds", skip_serializing_if = "Option::is_none")]
    pub xmlns_ds: Option<String>,
    #[serde(rename = "ds:CanonicalizationMethod")]
    pub canonicalization_method: CanonicalizationMethod,
    #[serde(rename = "ds:SignatureMethod")]
    pub signature_method: SignatureMethod,
    #[serde(rename = "ds:Reference")]
    pub reference: Reference,
}

#[derive(Debug, Serialize)]
pub struct X509Data {
    #[serde(rename = "ds:X509Certificate")]
    pub x509_certificate: String,
}

#[derive(Debug, Serialize)]
pub struct KeyInfo {
    #[serde(rename = "ds:X509Data")]
    pub x509_data: X509Data,
}

/// Complete enveloped ds:Signature element.
#[derive(Debug, Serialize)]
pub struct Signature {
    #[serde(rename = "@xmlns:ds")]
    pub xmlns_ds: String,
    #[serde(rename = "ds:SignedInfo")]
    pub signed_info: SignedInfo,
    #[serde(rename = "ds:SignatureValue")]
    pub signature_value: String,
    #[serde(rename = "ds:KeyInfo")]
    pub key_info: KeyInfo,
}

#[derive(Debug, Serialize)]
pub struct CipherData {
    #[serde(rename = "xenc:CipherValue")]
    pub cipher_value: String,
}

#[derive(Debug, Serialize)]
pub struct EncryptedKey {
    #[serde(rename = "xenc:EncryptionMethod")]
    pub encryption_method: EncryptionMethod,
    #[serde(rename = "xenc:CipherData")]
    pub cipher_data: CipherData,
}

#[derive(Debug, Serialize)]
pub struct EncryptedKeyInfo {
    #[serde(rename = "xenc:EncryptedKey")]
    pub encrypted_key: EncryptedKey,
}

/// xenc:EncryptedData wrapping an element: a session key wrapped for the
/// recipient, plus the element content under that session key.
#[derive(Debug, Serialize)]
pub struct EncryptedData {
    #[serde(rename = "@xmlns:xenc")]
    pub xmlns_xenc: String,
    #[serde(rename = "@xmlns:ds")]
    pub xmlns_ds: String,
    #[serde(rename = "@Type")]
    pub data_type: String,
    #[serde(rename = "xenc:EncryptionMethod")]
    pub encryption_method: EncryptionMethod,
    #[serde(rename = "ds:KeyInfo")]
    pub key_info: EncryptedKeyInfo,
    #[serde(rename = "xenc:CipherData")]
    pub cipher_data: CipherData,
}

/// Signature algorithm selection for XML and binary signing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    #[default]
    RsaSha1,
    RsaSha256,
    RsaSha384,
    RsaSha512,
}

impl SignatureAlgorithm {
    pub fn uri(self) -> &'static str {
        match self {
            SignatureAlgorithm::RsaSha1 => RSA_SHA1,
            SignatureAlgorithm::RsaSha256 => RSA_SHA256,
            SignatureAlgorithm::RsaSha384 => RSA_SHA384,
            SignatureAlgorithm::RsaSha512 => RSA_SHA512,
        }
    }

    pub fn digest_uri(self) -> &'static str {
        match self {
            SignatureAlgorithm::RsaSha1 => SHA1,
            SignatureAlgorithm::RsaSha256 => SHA256,
            SignatureAlgorithm::RsaSha384 => SHA384,
            SignatureAlgorithm::RsaSha512 => SHA512,
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            RSA_SHA1 => Some(SignatureAlgorithm::RsaSha1),
            RSA_SHA256 => Some(SignatureAlgorithm::RsaSha256),
            RSA_SHA384 => Some(SignatureAlgorithm::RsaSha384),
            RSA_SHA512 => Some(SignatureAlgorithm::RsaSha512),
            _ => None,
        }
    }
}

/// Terminal outcome of a signature verification.
///
/// "Unsigned" and "invalid signature" are both legitimate caller-handled
/// outcomes, so neither is an error; only a structurally unusable input is
/// distinguished as `Malformed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Trusted,
    Untrusted,
    Malformed,
}

impl VerificationOutcome {
    pub fn is_trusted(self) -> bool {
        self == VerificationOutcome::Trusted
    }
}

/// Signature components extracted from a signed document.
#[derive(Debug, Default)]
pub struct SignatureInfo {
    pub canonicalization_algorithm: String,
    pub signature_algorithm: String,
    pub reference_uri: String,
    pub transform_algorithms: Vec<String>,
    pub digest_algorithm: String,
    pub digest_value_b64: String,
    pub signature_value_b64: String,
    pub x509_certificate_b64: Option<String>,
}
