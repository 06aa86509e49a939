//! Request body collection and parsing

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::HeaderMap;
use serde_json::{Map, Value};

use super::mime;
use crate::logger;
use crate::pipeline::PipelineError;

pub const JSON_TYPE: &str = "application/json";
pub const FORM_TYPE: &str = "application/x-www-form-urlencoded";

/// Reject early when `Content-Length` already exceeds the limit
pub fn check_content_length(headers: &HeaderMap, limit: u64) -> Result<(), PipelineError> {
    let Some(value) = headers.get(hyper::header::CONTENT_LENGTH) else {
        return Ok(());
    };
    match value.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(size) if size > limit => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {limit})"
            ));
            Err(PipelineError::PayloadTooLarge)
        }
        Some(_) => Ok(()),
        None => {
            logger::log_warning("Invalid Content-Length header, skipping size check");
            Ok(())
        }
    }
}

/// Read the whole body, failing once more than `limit` bytes arrive
pub async fn collect_body<B>(body: B, limit: u64) -> Result<Bytes, PipelineError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit_usize = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, limit_usize).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(PipelineError::PayloadTooLarge)
        }
        Err(e) => Err(PipelineError::MalformedBody(format!(
            "failed to read request body: {e}"
        ))),
    }
}

/// Whether the body parsers handle this content type
///
/// Bodies of any other type are left unread for later stages.
pub fn has_parser(content_type: Option<&str>) -> bool {
    let essence = content_type.map(mime::essence).unwrap_or_default();
    matches!(essence.as_str(), JSON_TYPE | FORM_TYPE)
}

/// Decode a JSON or URL-encoded body; other content types yield `{}`
pub fn parse_body(content_type: Option<&str>, raw: &[u8]) -> Result<Value, PipelineError> {
    let essence = content_type.map(mime::essence).unwrap_or_default();
    match essence.as_str() {
        JSON_TYPE => parse_json(raw),
        FORM_TYPE => parse_form(raw),
        _ => Ok(Value::Object(Map::new())),
    }
}

fn parse_json(raw: &[u8]) -> Result<Value, PipelineError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| PipelineError::MalformedBody(format!("Unexpected token in JSON: {e}")))?;
    // Only objects and arrays are accepted at the top level
    if value.is_object() || value.is_array() {
        Ok(value)
    } else {
        Err(PipelineError::MalformedBody(
            "JSON body must be an object or an array".to_string(),
        ))
    }
}

fn parse_form(raw: &[u8]) -> Result<Value, PipelineError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(raw)
        .map_err(|e| PipelineError::MalformedBody(e.to_string()))?;

    let mut map = Map::new();
    for (key, value) in pairs {
        insert_form_field(&mut map, &key, Value::String(value));
    }
    Ok(Value::Object(map))
}

/// Insert a form field, nesting bracketed keys
///
/// `user[name]=ada` becomes `{"user":{"name":"ada"}}` and `tag[]=a` always
/// yields an array. Keys that are not well-formed bracket paths stay flat.
pub fn insert_form_field(map: &mut Map<String, Value>, key: &str, value: Value) {
    match split_key(key) {
        Some((root, segments)) => insert_path(map, root.to_string(), &segments, value),
        None => insert_field(map, key.to_string(), value),
    }
}

/// Split `a[b][c]` into `a` and `["b", "c"]`; `[]` is only allowed last
fn split_key(key: &str) -> Option<(&str, Vec<&str>)> {
    let open = key.find('[')?;
    let (root, mut rest) = key.split_at(open);
    if root.is_empty() {
        return None;
    }
    let mut segments = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }
    if segments.iter().rev().skip(1).any(|s| s.is_empty()) {
        return None;
    }
    Some((root, segments))
}

fn insert_path(map: &mut Map<String, Value>, key: String, segments: &[&str], value: Value) {
    let Some((next, rest)) = segments.split_first() else {
        insert_field(map, key, value);
        return;
    };
    if next.is_empty() {
        match map.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
            Value::Array(items) => items.push(value),
            other => append(other, value),
        }
        return;
    }
    match map.entry(key).or_insert_with(|| Value::Object(Map::new())) {
        Value::Object(child) => insert_path(child, (*next).to_string(), rest, value),
        // A plain value already sits here; keep both
        other => append(other, value),
    }
}

/// Insert a field; repeated keys collect into an array
pub fn insert_field(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(existing) => append(existing, value),
        None => {
            map.insert(key, value);
        }
    }
}

fn append(existing: &mut Value, value: Value) {
    if let Value::Array(items) = existing {
        items.push(value);
    } else {
        let first = existing.take();
        *existing = Value::Array(vec![first, value]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use serde_json::json;

    #[test]
    fn test_json_body() {
        let value = parse_body(Some("application/json; charset=utf-8"), br#"{"name":"ada"}"#).unwrap();
        assert_eq!(value, json!({ "name": "ada" }));
    }

    #[test]
    fn test_empty_json_body_is_empty_object() {
        assert_eq!(parse_body(Some(JSON_TYPE), b"").unwrap(), json!({}));
    }

    #[test]
    fn test_malformed_json_is_bad_request() {
        let err = parse_body(Some(JSON_TYPE), b"{oops").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedBody(_)));
        assert!(parse_body(Some(JSON_TYPE), b"42").is_err());
    }

    #[test]
    fn test_form_body() {
        let value = parse_body(Some(FORM_TYPE), b"name=ada+lovelace&tag=a&tag=b").unwrap();
        assert_eq!(value, json!({ "name": "ada lovelace", "tag": ["a", "b"] }));
    }

    #[test]
    fn test_form_bracket_keys_nest() {
        let value = parse_body(
            Some(FORM_TYPE),
            b"user%5Bname%5D=ada&user[tags][]=a&user[tags][]=b&solo[]=x&plain=1&bad[x=2",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "user": { "name": "ada", "tags": ["a", "b"] },
                "solo": ["x"],
                "plain": "1",
                "bad[x": "2"
            })
        );
    }

    #[test]
    fn test_only_json_and_form_have_parsers() {
        assert!(has_parser(Some("application/json; charset=utf-8")));
        assert!(has_parser(Some(FORM_TYPE)));
        assert!(!has_parser(Some("multipart/form-data; boundary=x")));
        assert!(!has_parser(None));
    }

    #[test]
    fn test_other_types_are_ignored() {
        assert_eq!(parse_body(Some("text/plain"), b"hello").unwrap(), json!({}));
        assert_eq!(parse_body(None, b"{\"a\":1}").unwrap(), json!({}));
    }

    #[test]
    fn test_content_length_limit() {
        let mut headers = HeaderMap::new();
        headers.insert(hyper::header::CONTENT_LENGTH, "11".parse().unwrap());
        assert!(check_content_length(&headers, 10).is_err());
        assert!(check_content_length(&headers, 11).is_ok());
        assert!(check_content_length(&HeaderMap::new(), 0).is_ok());
    }

    #[tokio::test]
    async fn test_collect_body_limit() {
        let ok = collect_body(Full::new(Bytes::from_static(b"12345")), 5).await.unwrap();
        assert_eq!(&ok[..], b"12345");

        let err = collect_body(Full::new(Bytes::from_static(b"123456")), 5)
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::PayloadTooLarge);
    }
}
