//! Base64 and raw-DEFLATE helpers for the HTTP-Redirect binding.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use flate2::{Compression, read::DeflateDecoder, write::DeflateEncoder};
use std::io::{Read as _, Write as _};

use crate::error::Result;

pub fn b64_encode(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

pub fn b64_decode(data: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(data)?)
}

/// Deflates (RFC 1951, no zlib framing) and base64-encodes a message.
pub fn deflate_and_base64_encode(value: &[u8]) -> Result<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(value)?;
    Ok(STANDARD.encode(encoder.finish()?))
}

/// Base64-decodes and inflates a redirect-bound message.
///
/// With `ignore_zip`, inflate failures fall back to the raw decoded bytes,
/// for peers that send plain base64 without compressing.
pub fn decode_base64_and_inflate(value: &str, ignore_zip: bool) -> Result<Vec<u8>> {
    let decoded = STANDARD.decode(value)?;

    let mut inflated = Vec::new();
    match DeflateDecoder::new(decoded.as_slice()).read_to_end(&mut inflated) {
        Ok(_) => Ok(inflated),
        Err(_) if ignore_zip => Ok(decoded),
        Err(e) => Err(e.into()),
    }
}
