//! Per-request state passed from stage to stage

use hyper::{HeaderMap, Method};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Request information the stages read and fill in
///
/// Owned by a single pipeline traversal and dropped with it.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    /// Path plus query, as received
    pub url: String,
    pub headers: HeaderMap,
    /// Route parameters captured by `:name` segments
    pub params: HashMap<String, String>,
    /// Parsed body; an empty object when nothing was parsed
    pub body: Value,
    pub file: Option<UploadedFile>,
}

impl RequestContext {
    pub fn new(method: Method, url: String, path: String, headers: HeaderMap) -> Self {
        Self {
            method,
            path,
            url,
            headers,
            params: HashMap::new(),
            body: Value::Object(Map::new()),
            file: None,
        }
    }

    pub fn header(&self, name: hyper::header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(hyper::header::CONTENT_TYPE)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}

/// Descriptor of a stored upload, echoed back to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub fieldname: String,
    pub originalname: String,
    pub encoding: String,
    pub mimetype: String,
    pub destination: String,
    pub filename: String,
    pub path: String,
    pub size: u64,
}
