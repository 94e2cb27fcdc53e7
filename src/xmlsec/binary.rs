//! Detached signatures over raw bytes, as used by the HTTP-Redirect
//! binding's signed query string.

use tracing::{debug, warn};

use crate::error::Result;
use crate::xmlsec::provider::XmlSecurityProvider;
use crate::xmlsec::types::SignatureAlgorithm;

/// Signs `message` with a PEM private key. Construction-side errors
/// propagate to the caller.
pub fn sign_binary<P: XmlSecurityProvider>(
    provider: &P,
    message: &[u8],
    key_pem: &str,
    algorithm: SignatureAlgorithm,
) -> Result<Vec<u8>> {
    provider.sign(key_pem.as_bytes(), algorithm.uri(), message)
}

/// Checks a detached signature against a PEM certificate.
///
/// This sits on the verification side of the trust boundary: any failure,
/// from an unparseable certificate to an algorithm the backend refuses,
/// is reported as `false`.
pub fn verify_binary<P: XmlSecurityProvider>(
    provider: &P,
    message: &[u8],
    signature: &[u8],
    cert_pem: &str,
    algorithm_uri: &str,
) -> bool {
    match provider.verify(cert_pem.as_bytes(), algorithm_uri, message, signature) {
        Ok(valid) => {
            if !valid {
                debug!("detached signature does not verify");
            }
            valid
        }
        Err(e) => {
            warn!(error = %e, "detached signature check failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certs::test_certs::generate_self_signed;
    use crate::xmlsec::provider::OpensslProvider;

    #[test]
    fn verify_is_false_on_bad_certificate() {
        let provider = OpensslProvider::new();
        assert!(!verify_binary(
            &provider,
            b"msg",
            b"sig",
            "not a certificate",
            SignatureAlgorithm::RsaSha256.uri(),
        ));
    }

    #[test]
    fn verify_is_false_on_unknown_algorithm() {
        let creds = generate_self_signed("binary-alg");
        let provider = OpensslProvider::new();
        let sig = sign_binary(&provider, b"msg", &creds.key_pem, SignatureAlgorithm::RsaSha1)
            .unwrap();
        assert!(!verify_binary(
            &provider,
            b"msg",
            &sig,
            &creds.cert_pem,
            "urn:not-an-algorithm",
        ));
    }

    #[test]
    fn round_trip_and_tamper() {
        let creds = generate_self_signed("binary-rt");
        let provider = OpensslProvider::new();
        let msg = b"SAMLRequest=abc&SigAlg=xyz";
        let sig =
            sign_binary(&provider, msg, &creds.key_pem, SignatureAlgorithm::RsaSha256).unwrap();
        assert!(verify_binary(
            &provider,
            msg,
            &sig,
            &creds.cert_pem,
            SignatureAlgorithm::RsaSha256.uri(),
        ));
        assert!(!verify_binary(
            &provider,
            b"SAMLRequest=abc&SigAlg=tampered",
            &sig,
            &creds.cert_pem,
            SignatureAlgorithm::RsaSha256.uri(),
        ));
    }
}
