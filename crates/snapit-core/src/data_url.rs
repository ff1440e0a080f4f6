// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `data:` URL encoding: the wire form of image and document payloads when
// they travel through shared storage or the host channel.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Result, SnapitError};

/// Encode bytes as a base64 `data:` URL with the given MIME type.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Decode a base64 `data:` URL into its MIME type and raw bytes.
///
/// A bare base64 string (no `data:` prefix) is accepted and reported as
/// `application/octet-stream`.
pub fn decode(url: &str) -> Result<(String, Vec<u8>)> {
    let (mime, payload) = match url.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| SnapitError::InvalidPayload("data URL has no payload".into()))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| SnapitError::InvalidPayload("data URL is not base64".into()))?;
            let mime = if mime.is_empty() {
                "application/octet-stream"
            } else {
                mime
            };
            (mime.to_string(), payload)
        }
        None => ("application/octet-stream".to_string(), url),
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| SnapitError::InvalidPayload(format!("base64: {e}")))?;
    Ok((mime, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_mime_and_bytes() {
        let url = encode("image/jpeg", &[0xFF, 0xD8, 0xFF, 0x00, 0x7F]);
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let (mime, bytes) = decode(&url).expect("decode");
        assert_eq!(mime, "image/jpeg");
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0x00, 0x7F]);
    }

    #[test]
    fn bare_base64_is_accepted() {
        let (mime, bytes) = decode("aGVsbG8=").expect("decode");
        assert_eq!(mime, "application/octet-stream");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn rejects_non_base64_data_url() {
        assert!(decode("data:text/plain,hello").is_err());
        assert!(decode("data:image/png;base64").is_err());
        assert!(decode("data:image/png;base64,@@@").is_err());
    }
}
