//! Certificate and key-material handling: PEM normalization and
//! fingerprint-based trust anchors.

pub mod fingerprint;
pub mod format;
pub mod test_certs;

pub use fingerprint::{calculate_fingerprint, format_fingerprint};
pub use format::{format_cert, format_private_key, validate_pem};
