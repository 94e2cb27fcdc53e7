//! End-to-end enveloped signature tests: documents signed by [`XmlSigner`]
//! must verify through every trust-material configuration, and any
//! tampering must be caught.

use saml_trust::certs::fingerprint::calculate_fingerprint;
use saml_trust::certs::test_certs::generate_self_signed;
use saml_trust::xmlsec::{SignatureAlgorithm, VerificationOutcome, XmlSigner, XmlVerifier};

const RESPONSE: &str = r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_resp42" IssueInstant="2026-08-29T10:00:00Z"><saml:Issuer xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">https://idp.example/metadata</saml:Issuer><samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status><saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_a1"><saml:Subject><saml:NameID>user@example.com</saml:NameID></saml:Subject></saml:Assertion></samlp:Response>"#;

#[test]
fn signed_document_verifies_against_certificate() {
    let creds = generate_self_signed("rt-cert");
    let signer = XmlSigner::new(&creds.key_pem, &creds.cert_pem).unwrap();
    let signed = signer.sign_document(RESPONSE).unwrap();

    let verifier = XmlVerifier::new().with_certificate(&creds.cert_pem);
    assert_eq!(verifier.verify_document(&signed), VerificationOutcome::Trusted);
}

#[test]
fn signed_document_verifies_against_fingerprint() {
    let creds = generate_self_signed("rt-fp");
    let signer = XmlSigner::new(&creds.key_pem, &creds.cert_pem).unwrap();
    let signed = signer.sign_document(RESPONSE).unwrap();

    let fingerprint = calculate_fingerprint(&creds.cert_pem).unwrap();
    let verifier = XmlVerifier::new().with_fingerprint(&fingerprint);
    assert_eq!(verifier.verify_document(&signed), VerificationOutcome::Trusted);

    // Colon-separated uppercase presentation of the same anchor.
    let pretty: String = fingerprint
        .as_bytes()
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).unwrap().to_uppercase())
        .collect::<Vec<_>>()
        .join(":");
    let verifier = XmlVerifier::new().with_fingerprint(&pretty);
    assert_eq!(verifier.verify_document(&signed), VerificationOutcome::Trusted);
}

#[test]
fn wrong_fingerprint_is_untrusted() {
    let creds = generate_self_signed("rt-badfp");
    let signer = XmlSigner::new(&creds.key_pem, &creds.cert_pem).unwrap();
    let signed = signer.sign_document(RESPONSE).unwrap();

    let verifier = XmlVerifier::new().with_fingerprint(&"00".repeat(20));
    assert_eq!(
        verifier.verify_document(&signed),
        VerificationOutcome::Untrusted
    );
}

#[test]
fn wrong_certificate_is_untrusted() {
    let signing = generate_self_signed("rt-signing");
    let other = generate_self_signed("rt-other");
    let signer = XmlSigner::new(&signing.key_pem, &signing.cert_pem).unwrap();
    let signed = signer.sign_document(RESPONSE).unwrap();

    let verifier = XmlVerifier::new().with_certificate(&other.cert_pem);
    assert_eq!(
        verifier.verify_document(&signed),
        VerificationOutcome::Untrusted
    );
}

#[test]
fn tampered_content_is_untrusted() {
    let creds = generate_self_signed("rt-tamper");
    let signer = XmlSigner::new(&creds.key_pem, &creds.cert_pem).unwrap();
    let signed = signer.sign_document(RESPONSE).unwrap();
    let tampered = signed.replace("user@example.com", "admin@example.com");

    let verifier = XmlVerifier::new().with_certificate(&creds.cert_pem);
    assert_eq!(
        verifier.verify_document(&tampered),
        VerificationOutcome::Untrusted
    );
}

#[test]
fn sha256_signatures_round_trip() {
    let creds = generate_self_signed("rt-sha256");
    let signer = XmlSigner::new(&creds.key_pem, &creds.cert_pem)
        .unwrap()
        .with_algorithm(SignatureAlgorithm::RsaSha256);
    let signed = signer.sign_document(RESPONSE).unwrap();
    assert!(signed.contains("xmldsig-more#rsa-sha256"));

    let verifier = XmlVerifier::new().with_certificate(&creds.cert_pem);
    assert_eq!(verifier.verify_document(&signed), VerificationOutcome::Trusted);
}

#[test]
fn strict_mode_accepts_self_signed_anchor() {
    let creds = generate_self_signed("rt-strict");
    let signer = XmlSigner::new(&creds.key_pem, &creds.cert_pem).unwrap();
    let signed = signer.sign_document(RESPONSE).unwrap();

    let verifier = XmlVerifier::new()
        .with_certificate(&creds.cert_pem)
        .strict(true);
    assert_eq!(verifier.verify_document(&signed), VerificationOutcome::Trusted);
}

#[test]
fn strict_mode_rejects_foreign_embedded_certificate() {
    let signing = generate_self_signed("rt-strict-bad");
    let anchor = generate_self_signed("rt-strict-anchor");
    let signer = XmlSigner::new(&signing.key_pem, &signing.cert_pem).unwrap();
    let signed = signer.sign_document(RESPONSE).unwrap();

    let verifier = XmlVerifier::new()
        .with_certificate(&anchor.cert_pem)
        .strict(true);
    assert_eq!(
        verifier.verify_document(&signed),
        VerificationOutcome::Untrusted
    );
}

#[test]
fn missing_trust_material_is_untrusted() {
    let creds = generate_self_signed("rt-nomaterial");
    let signer = XmlSigner::new(&creds.key_pem, &creds.cert_pem).unwrap();
    let signed = signer.sign_document(RESPONSE).unwrap();

    assert_eq!(
        XmlVerifier::new().verify_document(&signed),
        VerificationOutcome::Untrusted
    );
}

#[test]
fn unsigned_and_unusable_inputs() {
    let verifier = XmlVerifier::new().with_fingerprint("aa");
    assert_eq!(
        verifier.verify_document(RESPONSE),
        VerificationOutcome::Untrusted
    );
    assert_eq!(verifier.verify_document(""), VerificationOutcome::Malformed);
    assert_eq!(
        verifier.verify_document("<broken"),
        VerificationOutcome::Malformed
    );
}

#[test]
fn verifies_with_reordered_root_attributes() {
    let creds = generate_self_signed("rt-reorder");
    let signer = XmlSigner::new(&creds.key_pem, &creds.cert_pem).unwrap();
    let signed = signer.sign_document(RESPONSE).unwrap();

    // Same infoset, different byte form: attribute and namespace
    // declaration order is insignificant under exclusive C14N.
    let original = r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_resp42" IssueInstant="2026-08-29T10:00:00Z">"#;
    let reordered = r#"<samlp:Response IssueInstant="2026-08-29T10:00:00Z" ID="_resp42" xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol">"#;
    let shuffled = signed.replace(original, reordered);
    assert_ne!(shuffled, signed);

    let verifier = XmlVerifier::new().with_certificate(&creds.cert_pem);
    assert_eq!(
        verifier.verify_document(&shuffled),
        VerificationOutcome::Trusted
    );
}

#[test]
fn dangling_reference_is_untrusted() {
    let creds = generate_self_signed("rt-dangling");
    let signer = XmlSigner::new(&creds.key_pem, &creds.cert_pem).unwrap();
    let signed = signer.sign_document(RESPONSE).unwrap();
    let renamed = signed.replace(r#"ID="_resp42""#, r#"ID="_other42""#);

    let verifier = XmlVerifier::new().with_certificate(&creds.cert_pem);
    assert_eq!(
        verifier.verify_document(&renamed),
        VerificationOutcome::Untrusted
    );
}

#[test]
fn signature_sits_after_issuer() {
    let creds = generate_self_signed("rt-placement");
    let signer = XmlSigner::new(&creds.key_pem, &creds.cert_pem).unwrap();
    let signed = signer.sign_document(RESPONSE).unwrap();
    let issuer_end = signed.find("</saml:Issuer>").unwrap() + "</saml:Issuer>".len();
    assert!(signed[issuer_end..].starts_with("<ds:Signature"));
}
