//! Cryptographic and canonicalization backend for the XML engines.
//!
//! The engines talk to a [`XmlSecurityProvider`] so the crypto surface stays
//! in one place. [`OpensslProvider`] is the default backend.

use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Padding;
use openssl::sign::{Signer, Verifier};
use openssl::stack::Stack;
use openssl::symm::{Cipher, decrypt, encrypt};
use openssl::x509::X509;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::X509StoreContext;
use tracing::debug;

use crate::error::{Error, Result};
use crate::xmlsec::{c14n, constants};

/// Backend operations the signing, verification and encryption engines
/// are built on.
pub trait XmlSecurityProvider {
    /// Normalizes an XML fragment so that signer and verifier agree on the
    /// exact bytes being digested.
    fn canonicalize(&self, xml: &str) -> Result<String>;

    /// Digest of `data` under the digest algorithm named by `algorithm_uri`.
    fn digest(&self, algorithm_uri: &str, data: &[u8]) -> Result<Vec<u8>>;

    /// RSA signature over `data` with a PEM private key.
    fn sign(&self, key_pem: &[u8], algorithm_uri: &str, data: &[u8]) -> Result<Vec<u8>>;

    /// Verifies an RSA signature against a PEM certificate's public key.
    fn verify(
        &self,
        cert_pem: &[u8],
        algorithm_uri: &str,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool>;

    /// Verifies that `cert_pem` chains to `anchor_pem`.
    fn verify_chain(&self, cert_pem: &[u8], anchor_pem: &[u8]) -> Result<bool>;

    /// Fresh random session key of `len` bytes.
    fn session_key(&self, len: usize) -> Result<Vec<u8>>;

    /// Wraps a session key for the certificate's RSA public key (OAEP).
    fn encrypt_key_transport(&self, cert_pem: &[u8], session_key: &[u8]) -> Result<Vec<u8>>;

    /// Unwraps a session key with an RSA private key (OAEP).
    fn decrypt_key_transport(&self, key_pem: &[u8], wrapped: &[u8]) -> Result<Vec<u8>>;

    /// AES-128-CBC encryption; returns `iv || ciphertext`.
    fn encrypt_content(&self, session_key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// AES-128-CBC decryption of `iv || ciphertext`.
    fn decrypt_content(&self, session_key: &[u8], payload: &[u8]) -> Result<Vec<u8>>;
}

/// OpenSSL-backed provider used throughout the crate.
#[derive(Debug, Clone, Default)]
pub struct OpensslProvider {
    /// When set, decryption failures are logged with backend detail before
    /// being collapsed into the opaque error the caller sees.
    pub debug_trace: bool,
}

impl OpensslProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn message_digest(algorithm_uri: &str) -> Result<MessageDigest> {
        match algorithm_uri {
            constants::RSA_SHA1 | constants::SHA1 => Ok(MessageDigest::sha1()),
            constants::RSA_SHA256 | constants::SHA256 => Ok(MessageDigest::sha256()),
            constants::RSA_SHA384 | constants::SHA384 => Ok(MessageDigest::sha384()),
            constants::RSA_SHA512 | constants::SHA512 => Ok(MessageDigest::sha512()),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl XmlSecurityProvider for OpensslProvider {
    fn canonicalize(&self, xml: &str) -> Result<String> {
        c14n::canonicalize(xml, None)
    }

    fn digest(&self, algorithm_uri: &str, data: &[u8]) -> Result<Vec<u8>> {
        let digest = Self::message_digest(algorithm_uri)?;
        Ok(openssl::hash::hash(digest, data)?.to_vec())
    }

    fn sign(&self, key_pem: &[u8], algorithm_uri: &str, data: &[u8]) -> Result<Vec<u8>> {
        let digest = Self::message_digest(algorithm_uri)?;
        let key = PKey::private_key_from_pem(key_pem)?;
        let mut signer = Signer::new(digest, &key)?;
        signer.update(data)?;
        Ok(signer.sign_to_vec()?)
    }

    fn verify(
        &self,
        cert_pem: &[u8],
        algorithm_uri: &str,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        let digest = Self::message_digest(algorithm_uri)?;
        let cert = X509::from_pem(cert_pem)?;
        let key = cert.public_key()?;
        let mut verifier = Verifier::new(digest, &key)?;
        verifier.update(data)?;
        Ok(verifier.verify(signature)?)
    }

    fn verify_chain(&self, cert_pem: &[u8], anchor_pem: &[u8]) -> Result<bool> {
        let cert = X509::from_pem(cert_pem)?;
        let anchor = X509::from_pem(anchor_pem)?;

        let mut store = X509StoreBuilder::new()?;
        store.add_cert(anchor)?;
        let store = store.build();

        let chain = Stack::new()?;
        let mut ctx = X509StoreContext::new()?;
        Ok(ctx.init(&store, &cert, &chain, |c| c.verify_cert())?)
    }

    fn session_key(&self, len: usize) -> Result<Vec<u8>> {
        let mut key = vec![0u8; len];
        openssl::rand::rand_bytes(&mut key)?;
        Ok(key)
    }

    fn encrypt_key_transport(&self, cert_pem: &[u8], session_key: &[u8]) -> Result<Vec<u8>> {
        let cert = X509::from_pem(cert_pem)?;
        let rsa = cert.public_key()?.rsa()?;
        let mut wrapped = vec![0u8; rsa.size() as usize];
        let len = rsa.public_encrypt(session_key, &mut wrapped, Padding::PKCS1_OAEP)?;
        wrapped.truncate(len);
        Ok(wrapped)
    }

    fn decrypt_key_transport(&self, key_pem: &[u8], wrapped: &[u8]) -> Result<Vec<u8>> {
        let key = PKey::private_key_from_pem(key_pem)?;
        let rsa = key.rsa()?;
        let mut session_key = vec![0u8; rsa.size() as usize];
        let len = rsa.private_decrypt(wrapped, &mut session_key, Padding::PKCS1_OAEP)?;
        session_key.truncate(len);
        Ok(session_key)
    }

    fn encrypt_content(&self, session_key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut iv = [0u8; 16];
        openssl::rand::rand_bytes(&mut iv)?;
        let ciphertext = encrypt(Cipher::aes_128_cbc(), session_key, Some(&iv), plaintext)?;
        let mut payload = iv.to_vec();
        payload.extend_from_slice(&ciphertext);
        Ok(payload)
    }

    fn decrypt_content(&self, session_key: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
        if payload.len() < 16 {
            if self.debug_trace {
                debug!(len = payload.len(), "encrypted payload shorter than one IV");
            }
            return Err(Error::DecryptionFailed);
        }
        let (iv, ciphertext) = payload.split_at(16);
        decrypt(Cipher::aes_128_cbc(), session_key, Some(iv), ciphertext).map_err(|e| {
            if self.debug_trace {
                debug!(error = %e, "symmetric decryption failed");
            }
            Error::DecryptionFailed
        })
    }
}
