//! Response body handling: gzip-aware bodies and collected responses.

use anyhow::{Context, Result};
use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::header::{
    CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, TRANSFER_ENCODING,
};
use reqwest::{Response, StatusCode, Version};
use std::io::Read;

/// A response body tagged with its transfer encoding.
///
/// Gzip bodies are held compressed and inflated on read; their length is
/// unknown until decompression, so
/// [`content_length`](ResponseBody::content_length) reports `None`.
#[derive(Debug, Clone)]
pub struct ResponseBody {
    kind: BodyKind,
}

#[derive(Debug, Clone)]
enum BodyKind {
    Plain(Bytes),
    Gzip(Bytes),
}

impl ResponseBody {
    pub fn plain(bytes: Bytes) -> Self {
        Self {
            kind: BodyKind::Plain(bytes),
        }
    }

    /// Wraps bytes that are still gzip-compressed.
    pub fn gzip(bytes: Bytes) -> Self {
        Self {
            kind: BodyKind::Gzip(bytes),
        }
    }

    /// Body length in bytes, or `None` when it cannot be known without
    /// decompressing first.
    pub fn content_length(&self) -> Option<u64> {
        match &self.kind {
            BodyKind::Plain(bytes) => Some(bytes.len() as u64),
            BodyKind::Gzip(_) => None,
        }
    }

    /// Returns the decoded body bytes, inflating gzip transparently.
    /// A malformed gzip stream surfaces as the underlying I/O error.
    pub fn bytes(self) -> Result<Bytes> {
        match self.kind {
            BodyKind::Plain(bytes) => Ok(bytes),
            BodyKind::Gzip(bytes) => {
                let mut decoder = GzDecoder::new(bytes.as_ref());
                let mut decoded = Vec::new();
                decoder
                    .read_to_end(&mut decoded)
                    .context("Failed to decompress gzip response body")?;
                Ok(Bytes::from(decoded))
            }
        }
    }
}

/// A fully-read HTTP response.
///
/// The body is collected (and the connection drained) at construction
/// time, so dropping a `ConsoleResponse` never leaves unread bytes on a
/// pooled connection.
#[derive(Debug)]
pub struct ConsoleResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    /// `None` when the response carried no body at all. An explicit
    /// zero-length body is `Some` with empty bytes.
    pub body: Option<ResponseBody>,
}

impl ConsoleResponse {
    /// Reads the full body of a completed response and tags it for
    /// transparent gzip decompression when the server compressed it.
    pub async fn collect(response: Response) -> Result<Self> {
        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        let body = body_from_parts(bytes, &headers);

        Ok(Self {
            status,
            version,
            headers,
            body,
        })
    }

    /// Decodes the body as text using the charset declared in
    /// `Content-Type`, defaulting to UTF-8. Returns `None` when there is
    /// no body to decode.
    pub fn text(self) -> Result<Option<String>> {
        let Some(body) = self.body else {
            return Ok(None);
        };

        let content_type = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let bytes = body.bytes()?;
        Ok(Some(decode_text(&bytes, content_type.as_deref())))
    }
}

/// Distinguishes "no body" from "empty body": a response that declares
/// neither a length nor a transfer encoding and delivered no bytes has no
/// body.
fn body_from_parts(bytes: Bytes, headers: &HeaderMap) -> Option<ResponseBody> {
    let declares_body =
        headers.contains_key(CONTENT_LENGTH) || headers.contains_key(TRANSFER_ENCODING);
    if bytes.is_empty() && !declares_body {
        return None;
    }

    if is_gzip_encoded(headers) {
        Some(ResponseBody::gzip(bytes))
    } else {
        Some(ResponseBody::plain(bytes))
    }
}

/// True when any `Content-Encoding` token equals `gzip`, case-insensitively.
fn is_gzip_encoded(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("gzip"))
}

fn decode_text(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Permissive `charset=` parameter extraction from a Content-Type value.
fn charset_from_content_type(content_type: &str) -> Option<&str> {
    let lowered = content_type.to_ascii_lowercase();
    let start = lowered.find("charset=")? + "charset=".len();
    let rest = &content_type[start..];
    let end = rest.find([';', ' ', '\t']).unwrap_or(rest.len());
    let label = rest[..end].trim_matches('"');
    (!label.is_empty()).then_some(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use reqwest::header::HeaderValue;
    use std::io::Write;

    fn gzip_bytes(data: &[u8]) -> Bytes {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        Bytes::from(encoder.finish().unwrap())
    }

    #[test]
    fn test_plain_body_len_and_bytes() {
        let body = ResponseBody::plain(Bytes::from_static(b"hello"));
        assert_eq!(body.content_length(), Some(5));
        assert_eq!(body.bytes().unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_gzip_body_len_is_unknown() {
        let body = ResponseBody::gzip(gzip_bytes(b"hello world"));
        assert_eq!(body.content_length(), None);
    }

    #[test]
    fn test_gzip_body_inflates_on_read() {
        let body = ResponseBody::gzip(gzip_bytes(b"hello world"));
        assert_eq!(body.bytes().unwrap(), Bytes::from_static(b"hello world"));
    }

    #[test]
    fn test_malformed_gzip_is_an_error() {
        let body = ResponseBody::gzip(Bytes::from_static(b"definitely not gzip"));
        assert!(body.bytes().is_err());
    }

    #[test]
    fn test_gzip_detection_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("GZIP"));
        assert!(is_gzip_encoded(&headers));
    }

    #[test]
    fn test_gzip_detection_among_other_tokens() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("br, gzip"));
        assert!(is_gzip_encoded(&headers));
    }

    #[test]
    fn test_gzip_detection_rejects_other_encodings() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("br"));
        assert!(!is_gzip_encoded(&headers));

        assert!(!is_gzip_encoded(&HeaderMap::new()));
    }

    #[test]
    fn test_body_absent_without_length_or_encoding() {
        let headers = HeaderMap::new();
        assert!(body_from_parts(Bytes::new(), &headers).is_none());
    }

    #[test]
    fn test_explicit_empty_body_is_present() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));

        let body = body_from_parts(Bytes::new(), &headers).unwrap();
        assert_eq!(body.content_length(), Some(0));
    }

    #[test]
    fn test_gzipped_parts_are_tagged() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("31"));

        let body = body_from_parts(gzip_bytes(b"x"), &headers).unwrap();
        assert_eq!(body.content_length(), None);
    }

    #[test]
    fn test_decode_text_default_utf8() {
        assert_eq!(decode_text("héllo".as_bytes(), None), "héllo");
    }

    #[test]
    fn test_decode_text_declared_charset() {
        // "café" in ISO-8859-1
        let latin1 = b"caf\xe9";
        let text = decode_text(latin1, Some("text/html; charset=ISO-8859-1"));
        assert_eq!(text, "café");
    }

    #[test]
    fn test_charset_extraction() {
        assert_eq!(
            charset_from_content_type("text/html; charset=utf-8"),
            Some("utf-8")
        );
        assert_eq!(
            charset_from_content_type("text/html; CHARSET=\"ISO-8859-1\""),
            Some("ISO-8859-1")
        );
        assert_eq!(charset_from_content_type("text/html"), None);
        assert_eq!(charset_from_content_type("text/html; charset="), None);
    }

    #[test]
    fn test_response_text_with_no_body() {
        let response = ConsoleResponse {
            status: StatusCode::OK,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: None,
        };
        assert_eq!(response.text().unwrap(), None);
    }

    #[test]
    fn test_response_text_decodes_gzip_with_charset() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        let response = ConsoleResponse {
            status: StatusCode::OK,
            version: Version::HTTP_11,
            headers,
            body: Some(ResponseBody::gzip(gzip_bytes("héllo".as_bytes()))),
        };
        assert_eq!(response.text().unwrap(), Some("héllo".to_string()));
    }
}
