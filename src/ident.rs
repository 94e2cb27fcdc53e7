//! Unique identifier generation for messages and assertions.

use uuid::Uuid;

/// Generates a unique string usable as an XML `ID` attribute.
///
/// Derived from a fresh random UUID on every call; never registered
/// anywhere, uniqueness is statistical.
pub fn generate_unique_id() -> String {
    let seed = Uuid::new_v4().simple().to_string();
    format!("ONELOGIN_{}", hex::encode(openssl::sha::sha1(seed.as_bytes())))
}
