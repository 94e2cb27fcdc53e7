//! XML signature, verification and encryption engines.

pub mod binary;
pub mod c14n;
pub mod constants;
pub mod encryption;
pub mod provider;
pub mod signer;
pub mod types;
pub mod verifier;
pub mod xmlutil;

pub use binary::{sign_binary, verify_binary};
pub use encryption::{decrypt_element, encrypt_element, generate_name_id};
pub use provider::{OpensslProvider, XmlSecurityProvider};
pub use signer::XmlSigner;
pub use types::{SignatureAlgorithm, VerificationOutcome};
pub use verifier::XmlVerifier;
