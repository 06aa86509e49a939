// Configuration module entry point
// Loads the start-up configuration once; the result is injected everywhere else

mod types;

use std::net::SocketAddr;

pub use types::{
    Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, StaticFilesConfig,
    UploadConfig,
};

/// Environment variable that overrides `server.port`
pub const PORT_ENV: &str = "PORT";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Sources, lowest priority first: built-in defaults, the config file,
    /// `SERVER_*` environment variables, then `PORT`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::load_with_port(config_path, std::env::var(PORT_ENV).ok())
    }

    /// Same as [`Config::load_from`] with the port override passed explicitly
    pub fn load_with_port(
        config_path: &str,
        port: Option<String>,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_file", "./server_logs.txt")?
            .set_default("logging.http_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.request_timeout", 30)?
            .set_default("http.server_name", "rest-stub-server")?
            .set_default("http.max_body_size", 102_400)? // 100KB
            .set_default("static_files.prefix", "/static")?
            .set_default("static_files.dir", "public")?
            .set_default("uploads.dir", "public/uploads")?
            .set_default("uploads.field", "image")?
            .set_override_option("server.port", port)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    pub fn is_debug(&self) -> bool {
        self.logging.level.eq_ignore_ascii_case("debug")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING: &str = "this-config-file-does-not-exist";

    #[test]
    fn test_defaults() {
        let cfg = Config::load_with_port(MISSING, None).unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.static_files.prefix, "/static");
        assert_eq!(cfg.static_files.dir, "public");
        assert_eq!(cfg.static_files.index_files, vec!["index.html".to_string()]);
        assert_eq!(cfg.uploads.dir, "public/uploads");
        assert_eq!(cfg.uploads.field, "image");
        assert_eq!(cfg.logging.access_log_file, "./server_logs.txt");
        assert_eq!(cfg.logging.http_log_format, "dev");
        assert_eq!(cfg.http.max_body_size, 102_400);
        assert!(!cfg.is_debug());
    }

    #[test]
    fn test_port_override() {
        let cfg = Config::load_with_port(MISSING, Some("4321".to_string())).unwrap();
        assert_eq!(cfg.server.port, 4321);
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "127.0.0.1:4321".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(Config::load_with_port(MISSING, Some("not-a-port".to_string())).is_err());
    }
}
