use crate::error::{RelayError, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP/HTTPS server configuration
    pub server: ServerConfig,
    /// WebSocket origin policy configuration
    pub origin: OriginConfig,
    /// Telemetry configuration
    pub telemetry: TelemetryConfig,
    /// TLS configuration
    pub tls: TlsConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Plain HTTP listen address (default: 0.0.0.0:9000)
    pub http_listen: SocketAddr,
    /// TLS listen address (default: 0.0.0.0:9443)
    pub https_listen: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct OriginConfig {
    /// Accept any Origin header (default: false)
    pub allow_all: bool,
    /// Explicitly approved origins (comma-separated).
    /// Loopback and private-network origins are always accepted.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Interval between plane report broadcasts in milliseconds (default: 200)
    pub report_interval_ms: u64,
    /// Refuse viewer relocation commands (default: false)
    pub disable_relocate: bool,
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Directory where the certificate and key PEM files live (default: ".")
    pub cert_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            server: ServerConfig {
                http_listen: parse_addr("RELAY_HTTP_LISTEN", "0.0.0.0:9000")?,
                https_listen: parse_addr("RELAY_HTTPS_LISTEN", "0.0.0.0:9443")?,
            },
            origin: OriginConfig {
                allow_all: get_env_or("RELAY_ALLOW_ALL_ORIGINS", "false")
                    .parse()
                    .unwrap_or(false),
                allowed_origins: get_env_or("RELAY_ALLOWED_ORIGINS", "")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            telemetry: TelemetryConfig {
                report_interval_ms: get_env_or("RELAY_REPORT_INTERVAL_MS", "200")
                    .parse()
                    .map_err(|_| {
                        RelayError::InvalidConfig(
                            "RELAY_REPORT_INTERVAL_MS must be a valid number".into(),
                        )
                    })?,
                disable_relocate: get_env_or("RELAY_DISABLE_RELOCATE", "false")
                    .parse()
                    .unwrap_or(false),
            },
            tls: TlsConfig {
                cert_dir: PathBuf::from(get_env_or("RELAY_TLS_DIR", ".")),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }

    /// Copy-paste base URL for the plain HTTP endpoint
    pub fn http_url(&self) -> String {
        format!("http://{}", display_host(&self.server.http_listen))
    }

    /// Copy-paste base URL for the TLS endpoint
    pub fn https_url(&self) -> String {
        format!("https://{}", display_host(&self.server.https_listen))
    }

    /// Copy-paste WebSocket URL (no TLS)
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", display_host(&self.server.http_listen))
    }

    /// Copy-paste secure WebSocket URL
    pub fn wss_url(&self) -> String {
        format!("wss://{}/ws", display_host(&self.server.https_listen))
    }
}

/// Wildcard bind addresses are not reachable as-is; substitute localhost
/// in user-facing URLs.
fn display_host(addr: &SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("localhost:{}", addr.port())
    } else {
        addr.to_string()
    }
}

fn parse_addr(key: &str, default: &str) -> Result<SocketAddr> {
    get_env_or(key, default)
        .parse()
        .map_err(|_| RelayError::InvalidConfig(format!("{} must be a host:port address", key)))
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
