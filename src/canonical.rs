//! Canonical request construction for Signature Version 4.
//!
//! ```text
//! Method\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! \n
//! SignedHeaders\n
//! HexSha256(Body)
//! ```

use std::collections::BTreeMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};

/// Everything except RFC 3986 unreserved characters.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Headers to sign, keyed by lowercase name, values already normalized.
pub(crate) type CanonicalHeaders = BTreeMap<String, String>;

pub(crate) struct CanonicalRequest {
    pub text: String,
    pub signed_headers: String,
}

impl CanonicalRequest {
    pub fn new(
        method: &str,
        path: &str,
        query: &str,
        headers: &CanonicalHeaders,
        payload: &[u8],
    ) -> Self {
        let signed_headers = headers.keys().map(String::as_str).collect::<Vec<_>>().join(";");
        let header_block = headers
            .iter()
            .map(|(name, value)| format!("{name}:{value}\n"))
            .collect::<String>();

        let text = format!(
            "{method}\n{}\n{}\n{header_block}\n{signed_headers}\n{}",
            canonical_uri(path),
            canonical_query(query),
            hash_hex(payload),
        );

        Self {
            text,
            signed_headers,
        }
    }

    pub fn hash(&self) -> String {
        hash_hex(self.text.as_bytes())
    }
}

/// Adds a header, joining repeated names with commas.
pub(crate) fn push_header(headers: &mut CanonicalHeaders, name: &str, value: &str) {
    let value = collapse_whitespace(value.trim());
    headers
        .entry(name.to_ascii_lowercase())
        .and_modify(|existing| {
            existing.push(',');
            existing.push_str(&value);
        })
        .or_insert(value);
}

pub(crate) fn hash_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Normalizes each path segment, then encodes it a second time.
///
/// Double encoding is what every service except S3 expects. This signer does
/// not special-case S3.
fn canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            let once = uri_encode(&percent_decode_str(segment).decode_utf8_lossy());
            uri_encode(&once)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Decodes then re-encodes every key and value, sorting by encoded key then value.
fn canonical_query(query: &str) -> String {
    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (normalize_component(key), normalize_component(value))
        })
        .collect();
    pairs.sort_unstable();

    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn normalize_component(raw: &str) -> String {
    uri_encode(&percent_decode_str(raw).decode_utf8_lossy())
}

fn uri_encode(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::{canonical_query, canonical_uri, push_header, CanonicalHeaders, CanonicalRequest};

    #[test]
    fn empty_path_is_root() {
        assert_eq!(canonical_uri(""), "/");
        assert_eq!(canonical_uri("/"), "/");
    }

    #[test]
    fn path_segments_are_encoded_twice() {
        assert_eq!(canonical_uri("/a b/c%20d"), "/a%2520b/c%2520d");
        assert_eq!(canonical_uri("/docs/file~1.txt"), "/docs/file~1.txt");
        assert_eq!(canonical_uri("/tables/caf%C3%A9"), "/tables/caf%25C3%25A9");
    }

    #[test]
    fn query_is_sorted() {
        assert_eq!(canonical_query(""), "");
        assert_eq!(canonical_query("b=2&a=1&a=0"), "a=0&a=1&b=2");
        assert_eq!(canonical_query("flag"), "flag=");
    }

    #[test]
    fn query_encoding_is_normalized_before_sorting() {
        assert_eq!(
            canonical_query("Param2=value%2A&Param1=a%20b&key=~x"),
            "Param1=a%20b&Param2=value%2A&key=~x"
        );
        assert_eq!(canonical_query("a=%7e&a=%2a"), "a=%2A&a=~");
        assert_eq!(canonical_query("sp%61ce=x%3dy"), "space=x%3Dy");
    }

    #[test]
    fn headers_are_lowercased_trimmed_and_merged() {
        let mut headers = CanonicalHeaders::new();
        push_header(&mut headers, "X-Amz-Target", "  Kinesis_20131202.PutRecord ");
        push_header(&mut headers, "X-Custom", "a   b");
        push_header(&mut headers, "x-custom", "c");

        assert_eq!(headers["x-amz-target"], "Kinesis_20131202.PutRecord");
        assert_eq!(headers["x-custom"], "a b,c");
    }

    #[test]
    fn canonical_request_matches_documented_layout() {
        let mut headers = CanonicalHeaders::new();
        push_header(&mut headers, "host", "example.amazonaws.com");
        push_header(&mut headers, "x-amz-date", "20150830T123600Z");

        let canonical = CanonicalRequest::new("GET", "/", "", &headers, b"");
        assert_eq!(
            canonical.text,
            "GET\n/\n\nhost:example.amazonaws.com\nx-amz-date:20150830T123600Z\n\n\
             host;x-amz-date\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(canonical.signed_headers, "host;x-amz-date");
    }
}
