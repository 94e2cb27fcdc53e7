//! Trust-verification and message-integrity core for a SAML 2.0 exchange.
//!
//! Decides whether an inbound assertion or redirect-bound message was issued
//! by a trusted party and has not been tampered with, and produces the
//! outbound counterparts: signed and optionally encrypted messages and
//! identifiers. Cryptographic primitives are delegated to an injected
//! [`xmlsec::provider::XmlSecurityProvider`] backed by OpenSSL.

pub mod certs;
pub mod error;
pub mod ident;
pub mod locator;
pub mod status;
pub mod telemetry;
pub mod temporal;
pub mod transport;
pub mod xmlsec;

pub use error::{Error, Result};
pub use xmlsec::types::{SignatureAlgorithm, VerificationOutcome};
