//! Encoding helpers for biometric payloads.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};

/// Wrap PNG bytes in a `data:` URI, the shape the service expects for
/// uploaded face images.
pub fn png_data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(bytes))
}

/// Strip the media-type prefix off a `data:` URI, leaving the base64 payload.
/// Inputs without a comma are treated as bare payloads.
pub fn data_uri_payload(uri: &str) -> &str {
    match uri.split_once(',') {
        Some((_, payload)) => payload,
        None => uri,
    }
}

/// Decode the base64 payload of a `data:` URI back into raw bytes.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(data_uri_payload(uri))
}

/// Hex-encoded SHA-256 digest, used to reference image payloads in logs
/// without reproducing them.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
