// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub static_files: StaticFilesConfig,
    pub uploads: UploadConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// Append one line per request to `access_log_file`
    pub access_log: bool,
    pub access_log_file: String,
    /// Write one diagnostic line per completed request
    pub http_log: bool,
    /// Diagnostic line format (dev, common, combined, json)
    #[serde(default = "default_http_log_format")]
    pub http_log_format: String,
    /// Info log file path (optional, stdout if not set)
    #[serde(default)]
    pub info_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_http_log_format() -> String {
    "dev".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Upper bound in seconds for serving one connection
    pub request_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// Static file mount
#[derive(Debug, Deserialize, Clone)]
pub struct StaticFilesConfig {
    /// URL prefix, e.g. `/static`
    pub prefix: String,
    /// Directory the prefix maps to
    pub dir: String,
    #[serde(default = "default_index_files")]
    pub index_files: Vec<String>,
}

fn default_index_files() -> Vec<String> {
    vec!["index.html".to_string()]
}

/// Multipart upload destination
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub dir: String,
    /// Name of the single accepted file field
    pub field: String,
}
