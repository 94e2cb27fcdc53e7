//! Programmatic certificate generation for tests.
//!
//! Avoids hardcoded fixture paths: every test run mints fresh key material.

use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::extension::{BasicConstraints, KeyUsage};
use openssl::x509::{X509Builder, X509Name, X509NameBuilder};

/// A self-signed certificate with its PKCS#8 private key, both PEM text.
#[derive(Debug, Clone)]
pub struct TestCredentials {
    pub cert_pem: String,
    pub key_pem: String,
}

/// Generates a fresh self-signed certificate for the given common name.
pub fn generate_self_signed(common_name: &str) -> TestCredentials {
    let rsa = Rsa::generate(2048).unwrap();
    let key_pair = PKey::from_rsa(rsa).unwrap();

    let mut cert_builder = X509Builder::new().unwrap();
    cert_builder.set_version(2).unwrap();
    cert_builder.set_serial_number(&generate_serial_number()).unwrap();

    let subject_name = create_x509_name(&[
        ("C", "US"),
        ("O", "saml-trust tests"),
        ("CN", common_name),
    ]);
    cert_builder.set_subject_name(&subject_name).unwrap();
    cert_builder.set_issuer_name(&subject_name).unwrap();
    cert_builder.set_pubkey(&key_pair).unwrap();

    let not_before = Asn1Time::days_from_now(0).unwrap();
    let not_after = Asn1Time::days_from_now(365).unwrap();
    cert_builder.set_not_before(&not_before).unwrap();
    cert_builder.set_not_after(&not_after).unwrap();

    cert_builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    cert_builder
        .append_extension(
            KeyUsage::new()
                .critical()
                .digital_signature()
                .key_encipherment()
                .key_cert_sign()
                .build()
                .unwrap(),
        )
        .unwrap();

    cert_builder.sign(&key_pair, MessageDigest::sha256()).unwrap();

    TestCredentials {
        cert_pem: String::from_utf8(cert_builder.build().to_pem().unwrap()).unwrap(),
        key_pem: String::from_utf8(key_pair.private_key_to_pem_pkcs8().unwrap()).unwrap(),
    }
}

fn generate_serial_number() -> Asn1Integer {
    let mut serial = BigNum::new().unwrap();
    serial.rand(128, MsbOption::MAYBE_ZERO, false).unwrap();
    serial.to_asn1_integer().unwrap()
}

fn create_x509_name(entries: &[(&str, &str)]) -> X509Name {
    let mut name_builder = X509NameBuilder::new().unwrap();
    for (key, value) in entries {
        name_builder.append_entry_by_text(key, value).unwrap();
    }
    name_builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::x509::X509;

    #[test]
    fn generates_parseable_material() {
        let creds = generate_self_signed("localhost");
        assert!(X509::from_pem(creds.cert_pem.as_bytes()).is_ok());
        assert!(PKey::private_key_from_pem(creds.key_pem.as_bytes()).is_ok());
    }
}
