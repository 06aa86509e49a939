//! Request log line formats
//!
//! - `request`: the access log line written before a request is handled
//! - `dev`: concise `METHOD url status ms - bytes`
//! - `common` (Common Log Format - CLF)
//! - `combined` (Apache/Nginx combined format)
//! - `json` (JSON structured logging)

use chrono::Local;

/// One request as seen by the logging stages
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Client IP address
    pub remote_addr: String,
    /// Request timestamp
    pub time: chrono::DateTime<Local>,
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Original request URL, query included
    pub url: String,
    /// HTTP version (1.0, 1.1, 2)
    pub http_version: String,
    /// Response status code
    pub status: u16,
    /// Response body size in bytes
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Request processing time in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Create a new entry stamped with the current local time
    pub fn new(remote_addr: String, method: String, url: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            url,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Access log line, newline-terminated
    ///
    /// `Fri Oct 16 2026 09:30:00 GMT+0200 ---Request:[GET] [/api/users]`
    pub fn request_line(&self) -> String {
        format!(
            "{} ---Request:[{}] [{}]\n",
            self.time.format("%a %b %d %Y %H:%M:%S GMT%z"),
            self.method,
            self.url
        )
    }

    /// Format a completed request according to the named format
    ///
    /// Unknown names fall back to `dev`.
    pub fn format(&self, format: &str) -> String {
        match format {
            "common" => self.format_common(),
            "combined" => self.format_combined(),
            "json" => self.format_json(),
            _ => self.format_dev(),
        }
    }

    fn format_dev(&self) -> String {
        #[allow(clippy::cast_precision_loss)]
        let ms = self.request_time_us as f64 / 1000.0;
        format!(
            "{} {} {} {ms:.3} ms - {}",
            self.method, self.url, self.status, self.body_bytes
        )
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} HTTP/{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.url,
            self.http_version,
            self.status,
            self.body_bytes,
        )
    }

    /// Common format plus `"$http_referer" "$http_user_agent"`
    fn format_combined(&self) -> String {
        format!(
            "{} \"{}\" \"{}\"",
            self.format_common(),
            self.referer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    fn format_json(&self) -> String {
        serde_json::json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "url": self.url,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1".to_string(),
            "PUT".to_string(),
            "/api/users/42?dry=1".to_string(),
        );
        entry.status = 200;
        entry.body_bytes = 32;
        entry.referer = Some("https://example.com".to_string());
        entry.user_agent = Some("curl/8.0".to_string());
        entry.request_time_us = 1500;
        entry
    }

    #[test]
    fn test_request_line() {
        let line = create_test_entry().request_line();
        assert!(line.ends_with(" ---Request:[PUT] [/api/users/42?dry=1]\n"));
        assert!(line.contains("GMT"));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_format_dev() {
        let log = create_test_entry().format("dev");
        assert_eq!(log, "PUT /api/users/42?dry=1 200 1.500 ms - 32");
    }

    #[test]
    fn test_unknown_format_falls_back_to_dev() {
        let entry = create_test_entry();
        assert_eq!(entry.format("tiny"), entry.format("dev"));
    }

    #[test]
    fn test_format_common() {
        let log = create_test_entry().format("common");
        assert!(log.starts_with("192.168.1.1 - - ["));
        assert!(log.contains("\"PUT /api/users/42?dry=1 HTTP/1.1\" 200 32"));
        assert!(!log.contains("curl/8.0"));
    }

    #[test]
    fn test_format_combined() {
        let log = create_test_entry().format("combined");
        assert!(log.ends_with("\"https://example.com\" \"curl/8.0\""));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["method"], "PUT");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 32);
        assert_eq!(value["referer"], "https://example.com");
    }
}
