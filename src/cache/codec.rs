//! Serialization of cached HTTP responses
//!
//! A `CacheRecord` is a snapshot of a fully drained response plus the ETag it
//! was served with. Records are stored as JSON with a base64 body, so binary
//! payloads survive unchanged.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, TRANSFER_ENCODING};
use reqwest::{StatusCode, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bumped whenever the record layout changes. Older entries are then treated
/// as corrupt and get overwritten on the next successful fetch.
pub const FORMAT_VERSION: u32 = 1;

/// Errors that can occur when decoding a stored record
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes are not a serialized record
    #[error("Malformed cache record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The record was written by an incompatible version
    #[error("Unsupported cache record format version: {0}")]
    UnsupportedVersion(u32),

    /// A field holds a value that cannot be turned back into a response
    #[error("Invalid cache record field: {0}")]
    InvalidField(String),
}

/// One cached response, keyed externally by the request's cache key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// `ETag` response header at the time the record was written
    pub etag: String,
    pub status_code: u16,
    /// Reason phrase, e.g. "OK"
    pub status_text: String,
    /// Protocol version, e.g. "HTTP/1.1"
    pub protocol_version: String,
    /// Response headers with per-name order and multiplicity. Values are
    /// raw bytes, since header values need not be UTF-8.
    #[serde(with = "base64_headers")]
    pub headers: Vec<(String, Vec<u8>)>,
    pub content_length: Option<u64>,
    pub transfer_encoding: Vec<String>,
    /// The complete response body
    #[serde(with = "base64_body")]
    pub body: Vec<u8>,
}

/// On-disk envelope carrying the format version
#[derive(Serialize, Deserialize)]
struct Envelope<R> {
    format: u32,
    record: R,
}

impl CacheRecord {
    /// Snapshot a drained response
    pub fn from_parts(
        etag: impl Into<String>,
        status: StatusCode,
        version: Version,
        headers: &HeaderMap,
        body: Vec<u8>,
    ) -> Self {
        let transfer_encoding = headers
            .get_all(TRANSFER_ENCODING)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|coding| coding.trim().to_string())
            .filter(|coding| !coding.is_empty())
            .collect();

        let headers = headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();

        Self {
            etag: etag.into(),
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            protocol_version: version_to_str(version).to_string(),
            headers,
            content_length: Some(body.len() as u64),
            transfer_encoding,
            body,
        }
    }

    /// Typed status code of the stored response
    pub fn status(&self) -> Result<StatusCode, CodecError> {
        StatusCode::from_u16(self.status_code)
            .map_err(|_| CodecError::InvalidField(format!("status_code {}", self.status_code)))
    }

    /// Typed protocol version of the stored response
    pub fn version(&self) -> Result<Version, CodecError> {
        parse_version(&self.protocol_version).ok_or_else(|| {
            CodecError::InvalidField(format!("protocol_version {}", self.protocol_version))
        })
    }

    /// Rebuild the header map, keeping order and repeated names
    pub fn header_map(&self) -> Result<HeaderMap, CodecError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| CodecError::InvalidField(format!("header name {:?}", name)))?;
            let value = HeaderValue::from_bytes(value)
                .map_err(|_| CodecError::InvalidField(format!("header value for {}", name)))?;
            map.append(name, value);
        }
        Ok(map)
    }
}

/// Serialize a record for storage
pub fn encode(record: &CacheRecord) -> Result<Vec<u8>, CodecError> {
    let envelope = Envelope {
        format: FORMAT_VERSION,
        record,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Deserialize a stored record
///
/// Truncated or foreign bytes and records from other format versions are
/// reported as `CodecError`, never as a panic.
pub fn decode(bytes: &[u8]) -> Result<CacheRecord, CodecError> {
    #[derive(Deserialize)]
    struct Header {
        format: u32,
    }

    let header: Header = serde_json::from_slice(bytes)?;
    if header.format != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(header.format));
    }

    let envelope: Envelope<CacheRecord> = serde_json::from_slice(bytes)?;
    Ok(envelope.record)
}

fn version_to_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

fn parse_version(s: &str) -> Option<Version> {
    match s {
        "HTTP/0.9" => Some(Version::HTTP_09),
        "HTTP/1.0" => Some(Version::HTTP_10),
        "HTTP/1.1" => Some(Version::HTTP_11),
        "HTTP/2.0" => Some(Version::HTTP_2),
        "HTTP/3.0" => Some(Version::HTTP_3),
        _ => None,
    }
}

mod base64_headers {
    use super::{Engine, STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        headers: &[(String, Vec<u8>)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let encoded: Vec<(&str, String)> = headers
            .iter()
            .map(|(name, value)| (name.as_str(), STANDARD.encode(value)))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, Vec<u8>)>, D::Error> {
        Vec::<(String, String)>::deserialize(deserializer)?
            .into_iter()
            .map(|(name, value)| {
                STANDARD
                    .decode(value.as_bytes())
                    .map(|value| (name, value))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

mod base64_body {
    use super::{Engine, STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CacheRecord {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/octet-stream"));
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("etag", HeaderValue::from_static("\"v1\""));

        CacheRecord::from_parts(
            "\"v1\"",
            StatusCode::OK,
            Version::HTTP_11,
            &headers,
            vec![0, 1, 2, 0xff, 0, b'\n', 0x80, 0],
        )
    }

    #[test]
    fn test_record_roundtrip_preserves_everything() {
        let record = sample_record();

        let bytes = encode(&record).expect("Encode should succeed");
        let decoded = decode(&bytes).expect("Decode should succeed");

        assert_eq!(decoded, record);
        assert_eq!(encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn test_from_parts_snapshots_response_fields() {
        let record = sample_record();

        assert_eq!(record.etag, "\"v1\"");
        assert_eq!(record.status_code, 200);
        assert_eq!(record.status_text, "OK");
        assert_eq!(record.protocol_version, "HTTP/1.1");
        assert_eq!(record.content_length, Some(8));
        assert!(record.transfer_encoding.is_empty());
    }

    #[test]
    fn test_repeated_headers_keep_order_and_multiplicity() {
        let record = sample_record();
        let cookies: Vec<&[u8]> = record
            .headers
            .iter()
            .filter(|(name, _)| name == "set-cookie")
            .map(|(_, value)| value.as_slice())
            .collect();
        assert_eq!(cookies, vec![&b"a=1"[..], &b"b=2"[..]]);

        let map = record.header_map().expect("Headers should rebuild");
        let values: Vec<&str> = map
            .get_all("set-cookie")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["a=1", "b=2"]);
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_non_utf8_header_values_roundtrip_exactly() {
        let raw = b"attachment; filename=caf\xe9.yml";
        let mut headers = HeaderMap::new();
        headers.insert("content-disposition", HeaderValue::from_bytes(raw).unwrap());

        let record = CacheRecord::from_parts("x", StatusCode::OK, Version::HTTP_11, &headers, vec![]);
        let decoded = decode(&encode(&record).unwrap()).unwrap();

        let map = decoded.header_map().expect("Headers should rebuild");
        assert_eq!(map.get("content-disposition").unwrap().as_bytes(), raw);
    }

    #[test]
    fn test_invalid_base64_header_value_is_rejected() {
        let bytes = encode(&sample_record()).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["record"]["headers"][0][1] = serde_json::json!("%%%");
        let bytes = serde_json::to_vec(&value).unwrap();

        assert!(matches!(decode(&bytes), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_transfer_encoding_is_split() {
        let mut headers = HeaderMap::new();
        headers.insert("transfer-encoding", HeaderValue::from_static("gzip, chunked"));

        let record = CacheRecord::from_parts("x", StatusCode::OK, Version::HTTP_11, &headers, vec![]);

        assert_eq!(record.transfer_encoding, vec!["gzip", "chunked"]);
    }

    #[test]
    fn test_typed_accessors() {
        let record = CacheRecord::from_parts(
            "x",
            StatusCode::NON_AUTHORITATIVE_INFORMATION,
            Version::HTTP_2,
            &HeaderMap::new(),
            vec![],
        );

        assert_eq!(record.status().unwrap(), StatusCode::NON_AUTHORITATIVE_INFORMATION);
        assert_eq!(record.version().unwrap(), Version::HTTP_2);
    }

    #[test]
    fn test_decode_rejects_foreign_data() {
        assert!(matches!(decode(b"not a record"), Err(CodecError::Malformed(_))));
        assert!(matches!(decode(b""), Err(CodecError::Malformed(_))));
        assert!(matches!(decode(&[0, 159, 146, 150]), Err(CodecError::Malformed(_))));
        assert!(matches!(decode(b"{\"format\":1}"), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_data() {
        let bytes = encode(&sample_record()).unwrap();

        for len in [1, bytes.len() / 2, bytes.len() - 1] {
            assert!(decode(&bytes[..len]).is_err(), "Truncated at {} should fail", len);
        }
    }

    #[test]
    fn test_decode_rejects_other_format_versions() {
        let bytes = encode(&sample_record()).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["format"] = serde_json::json!(FORMAT_VERSION + 1);
        let bytes = serde_json::to_vec(&value).unwrap();

        assert!(matches!(
            decode(&bytes),
            Err(CodecError::UnsupportedVersion(v)) if v == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_base64_body() {
        let bytes = encode(&sample_record()).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["record"]["body"] = serde_json::json!("!!not base64!!");
        let bytes = serde_json::to_vec(&value).unwrap();

        assert!(matches!(decode(&bytes), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_invalid_fields_are_reported() {
        let mut record = sample_record();
        record.status_code = 1000;
        record.protocol_version = "SPDY/3".to_string();
        record.headers.push(("bad header".to_string(), b"v".to_vec()));

        assert!(matches!(record.status(), Err(CodecError::InvalidField(_))));
        assert!(matches!(record.version(), Err(CodecError::InvalidField(_))));
        assert!(matches!(record.header_map(), Err(CodecError::InvalidField(_))));
    }
}
