//! XML element encryption and decryption (xenc), plus NameID construction.
//!
//! An element is encrypted under a fresh AES-128-CBC session key, which is
//! in turn wrapped for the recipient certificate's RSA key with OAEP. The
//! decryption side is a trust boundary: callers only ever see the opaque
//! [`Error::DecryptionFailed`], with backend detail kept to debug logging.

use quick_xml::escape::escape;
use quick_xml::se::to_string_with_root;
use tracing::debug;

use crate::certs;
use crate::error::{Error, Result};
use crate::transport::{b64_decode, b64_encode};
use crate::xmlsec::constants;
use crate::xmlsec::provider::XmlSecurityProvider;
use crate::xmlsec::types::{
    AlgorithmElement, CipherData, EncryptedData, EncryptedKey, EncryptedKeyInfo,
};
use crate::xmlsec::xmlutil;

/// Encrypts an XML element for the given certificate, returning the
/// `xenc:EncryptedData` element that replaces it.
pub fn encrypt_element<P: XmlSecurityProvider>(
    provider: &P,
    element_xml: &str,
    cert_pem: &str,
) -> Result<String> {
    certs::validate_pem(cert_pem, &[constants::PEM_CERTIFICATE_TAG])?;
    let session_key = provider.session_key(16)?;
    let wrapped_key = provider.encrypt_key_transport(cert_pem.as_bytes(), &session_key)?;
    let payload = provider.encrypt_content(&session_key, element_xml.as_bytes())?;

    let encrypted = EncryptedData {
        xmlns_xenc: constants::NS_XENC.to_string(),
        xmlns_ds: constants::NS_DS.to_string(),
        data_type: constants::XENC_ELEMENT_TYPE.to_string(),
        encryption_method: AlgorithmElement {
            algorithm: constants::AES128_CBC.to_string(),
        },
        key_info: EncryptedKeyInfo {
            encrypted_key: EncryptedKey {
                encryption_method: AlgorithmElement {
                    algorithm: constants::RSA_OAEP_MGF1P.to_string(),
                },
                cipher_data: CipherData {
                    cipher_value: b64_encode(&wrapped_key),
                },
            },
        },
        cipher_data: CipherData {
            cipher_value: b64_encode(&payload),
        },
    };
    Ok(to_string_with_root("xenc:EncryptedData", &encrypted)?)
}

/// Decrypts an `xenc:EncryptedData` element with the recipient's private
/// key and returns the original element text.
pub fn decrypt_element<P: XmlSecurityProvider>(
    provider: &P,
    encrypted_xml: &str,
    key_pem: &str,
) -> Result<String> {
    decrypt_inner(provider, encrypted_xml, key_pem).map_err(|e| {
        debug!(error = %e, "element decryption failed");
        Error::DecryptionFailed
    })
}

fn decrypt_inner<P: XmlSecurityProvider>(
    provider: &P,
    encrypted_xml: &str,
    key_pem: &str,
) -> Result<String> {
    let (start, end) = xmlutil::element_span(encrypted_xml, "EncryptedKey")?
        .ok_or_else(|| Error::Xml("EncryptedData has no EncryptedKey".into()))?;
    let wrapped_b64 = xmlutil::element_text(&encrypted_xml[start..end], "CipherValue")?
        .ok_or_else(|| Error::Xml("EncryptedKey has no CipherValue".into()))?;

    // The content CipherValue is whichever one is left once the key
    // transport structure is out of the way.
    let without_key = xmlutil::remove_elements(encrypted_xml, "EncryptedKey")?;
    let payload_b64 = xmlutil::element_text(&without_key, "CipherValue")?
        .ok_or_else(|| Error::Xml("EncryptedData has no content CipherValue".into()))?;

    let wrapped_key = b64_decode(&strip_whitespace(&wrapped_b64))?;
    let payload = b64_decode(&strip_whitespace(&payload_b64))?;

    let session_key = provider.decrypt_key_transport(key_pem.as_bytes(), &wrapped_key)?;
    let plaintext = provider.decrypt_content(&session_key, &payload)?;
    Ok(String::from_utf8(plaintext)?)
}

/// Builds a `saml:NameID` element, optionally qualified, and optionally
/// encrypted into a `saml:EncryptedID` when a recipient certificate is
/// given.
pub fn generate_name_id<P: XmlSecurityProvider>(
    provider: &P,
    value: &str,
    sp_name_qualifier: Option<&str>,
    sp_format: Option<&str>,
    cert_pem: Option<&str>,
    name_qualifier: Option<&str>,
) -> Result<String> {
    let mut name_id = format!(r#"<saml:NameID xmlns:saml="{}""#, constants::NS_SAML);
    if let Some(qualifier) = name_qualifier {
        name_id.push_str(&format!(r#" NameQualifier="{}""#, escape(qualifier)));
    }
    if let Some(qualifier) = sp_name_qualifier {
        name_id.push_str(&format!(r#" SPNameQualifier="{}""#, escape(qualifier)));
    }
    if let Some(format) = sp_format {
        name_id.push_str(&format!(r#" Format="{}""#, escape(format)));
    }
    name_id.push('>');
    name_id.push_str(&escape(value));
    name_id.push_str("</saml:NameID>");

    match cert_pem {
        Some(cert) => {
            let encrypted = encrypt_element(provider, &name_id, cert)?;
            Ok(format!(
                r#"<saml:EncryptedID xmlns:saml="{}">{}</saml:EncryptedID>"#,
                constants::NS_SAML,
                encrypted
            ))
        }
        None => Ok(name_id),
    }
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certs::test_certs::generate_self_signed;
    use crate::xmlsec::provider::OpensslProvider;

    #[test]
    fn plain_name_id_layout() {
        let provider = OpensslProvider::new();
        let name_id = generate_name_id(
            &provider,
            "user@example.com",
            Some("https://sp.example/metadata"),
            Some("urn:oasis:names:tc:SAML:2.0:nameid-format:persistent"),
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            name_id,
            r#"<saml:NameID xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" SPNameQualifier="https://sp.example/metadata" Format="urn:oasis:names:tc:SAML:2.0:nameid-format:persistent">user@example.com</saml:NameID>"#
        );
    }

    #[test]
    fn name_id_escapes_value_and_attributes() {
        let provider = OpensslProvider::new();
        let name_id =
            generate_name_id(&provider, "a<b&c", None, None, None, Some("q\"x")).unwrap();
        assert!(name_id.contains("a&lt;b&amp;c"));
        assert!(name_id.contains("NameQualifier=\"q&quot;x\""));
    }

    #[test]
    fn recipient_material_must_be_a_certificate() {
        let creds = generate_self_signed("enc-wrongtag");
        let provider = OpensslProvider::new();
        assert!(encrypt_element(&provider, "<saml:NameID/>", &creds.key_pem).is_err());
    }

    #[test]
    fn malformed_payload_is_opaque_failure() {
        let creds = generate_self_signed("enc-opaque");
        let provider = OpensslProvider::new();
        let err = decrypt_element(&provider, "<xenc:EncryptedData/>", &creds.key_pem).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed));
    }
}
