//! XML namespace and algorithm URIs used by the signature and encryption
//! engines, centralized to avoid magic strings.

/// XML namespace URIs
pub const NS_DS: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const NS_XENC: &str = "http://www.w3.org/2001/04/xmlenc#";
pub const NS_SAML: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// Signature algorithm URIs
pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";
pub const RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";

/// Digest algorithm URIs
pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

/// Canonicalization and transform URIs
pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// Encryption algorithm URIs
pub const AES128_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes128-cbc";
pub const RSA_OAEP_MGF1P: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p";

/// Encrypted-data type URI for whole-element encryption
pub const XENC_ELEMENT_TYPE: &str = "http://www.w3.org/2001/04/xmlenc#Element";

/// PEM tags accepted at the engines' trust boundaries
pub const PEM_CERTIFICATE_TAG: &str = "CERTIFICATE";
pub const PEM_PRIVATE_KEY_TAG: &str = "PRIVATE KEY";
pub const PEM_RSA_PRIVATE_KEY_TAG: &str = "RSA PRIVATE KEY";
