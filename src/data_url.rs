//! Converting binary data to and from `data:` URLs.
//!
//! Documents go up to the OCR service as `data:` URLs, and extracted images
//! come back the same way.

use std::sync::LazyLock;

use base64::{Engine as _, prelude::BASE64_STANDARD};
use regex::Regex;

use crate::prelude::*;

/// Regex for parsing a `data:` URL.
static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:(?P<mime_type>[^;,]+);base64,(?P<data>.+)$")
        .expect("failed to compile regex")
});

/// Convert binary data to a `data:` URL.
pub fn data_url(mime_type: &str, data: &[u8]) -> String {
    let base64_data = BASE64_STANDARD.encode(data);
    // Some sources indicate that the Base64 data should be percent-encoded, but
    // the OCR API expects it raw.
    format!("data:{};base64,{}", mime_type, base64_data)
}

/// Parse a `data:` URL into a MIME type and Base64-encoded data.
pub fn parse_data_url(data_url: &str) -> Option<(String, &str)> {
    let caps = DATA_URL_RE.captures(data_url)?;
    let mime_type = caps.name("mime_type")?.as_str().to_string();
    let data = caps.name("data")?.as_str();
    Some((mime_type, data))
}

/// Decode either a `data:` URL or a bare Base64 payload.
///
/// Returns the MIME type, if the payload declared one.
pub fn decode_payload(payload: &str) -> Result<(Option<String>, Vec<u8>)> {
    let (mime_type, data) = match parse_data_url(payload) {
        Some((mime_type, data)) => (Some(mime_type), data),
        None => (None, payload),
    };
    let bytes = BASE64_STANDARD
        .decode(data.trim())
        .context("invalid Base64 image data")?;
    Ok((mime_type, bytes))
}
