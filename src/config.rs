use crate::error::{HeraldError, Result};
use std::env;
use std::time::Duration;

/// Upper bound for transport timeouts; deadlines are added to `Instant::now()`.
const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// WebSocket connection configuration
    pub websocket: WebSocketConfig,
    /// Hub configuration
    pub hub: HubConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server (default: 50054)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// How long shutdown waits for the hub and server to stop
    pub shutdown_grace: Duration,
}

/// Per-connection transport settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketConfig {
    /// Upgrade path (default: /ws)
    pub path: String,
    /// Largest inbound frame or message accepted from a client, in bytes
    pub max_frame_size: usize,
    /// Deadline for a single transport write
    pub write_timeout: Duration,
    /// Peer read-inactivity timeout
    pub read_timeout: Duration,
    /// Keepalive ping period, always shorter than `read_timeout`
    pub ping_interval: Duration,
    /// Outbound mailbox capacity per connection
    pub mailbox_capacity: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        let read_timeout = Duration::from_secs(60);
        Self {
            path: "/ws".to_string(),
            max_frame_size: 512,
            write_timeout: Duration::from_secs(10),
            read_timeout,
            ping_interval: default_ping_interval(read_timeout),
            mailbox_capacity: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the hub's command queue
    pub queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
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
        let read_timeout = Duration::from_secs(parse_env("WS_READ_TIMEOUT_SECS", "60")?);
        let ping_interval = match env::var("WS_PING_INTERVAL_SECS") {
            Ok(_) => Duration::from_secs(parse_env("WS_PING_INTERVAL_SECS", "")?),
            Err(_) => default_ping_interval(read_timeout),
        };

        let config = Config {
            server: ServerConfig {
                port: get_env_or("NOTIFICATION_SERVICE_PORT", "50054")
                    .parse()
                    .map_err(|_| {
                        HeraldError::InvalidConfig(
                            "NOTIFICATION_SERVICE_PORT must be a valid port number".into(),
                        )
                    })?,
                host: get_env_or("NOTIFICATION_SERVICE_HOST", "0.0.0.0"),
                shutdown_grace: Duration::from_secs(parse_env("SHUTDOWN_GRACE_SECS", "5")?),
            },
            websocket: WebSocketConfig {
                path: get_env_or("WS_PATH", "/ws"),
                max_frame_size: parse_env("WS_MAX_FRAME_SIZE", "512")?,
                write_timeout: Duration::from_secs(parse_env("WS_WRITE_TIMEOUT_SECS", "10")?),
                read_timeout,
                ping_interval,
                mailbox_capacity: parse_env("WS_MAILBOX_CAPACITY", "256")?,
            },
            hub: HubConfig {
                queue_capacity: parse_env("HUB_QUEUE_CAPACITY", "1024")?,
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "json"),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the hub cannot run with
    pub fn validate(&self) -> Result<()> {
        let ws = &self.websocket;

        if !ws.path.starts_with('/') {
            return Err(HeraldError::InvalidConfig(
                "WS_PATH must start with '/'".into(),
            ));
        }
        if ws.max_frame_size == 0 {
            return Err(HeraldError::InvalidConfig(
                "WS_MAX_FRAME_SIZE must be greater than zero".into(),
            ));
        }
        if ws.mailbox_capacity == 0 {
            return Err(HeraldError::InvalidConfig(
                "WS_MAILBOX_CAPACITY must be greater than zero".into(),
            ));
        }
        if ws.write_timeout.is_zero() || ws.read_timeout.is_zero() || ws.ping_interval.is_zero() {
            return Err(HeraldError::InvalidConfig(
                "WebSocket timeouts must be greater than zero".into(),
            ));
        }
        if ws.write_timeout > MAX_TIMEOUT || ws.read_timeout > MAX_TIMEOUT {
            return Err(HeraldError::InvalidConfig(format!(
                "WebSocket timeouts must not exceed {} seconds",
                MAX_TIMEOUT.as_secs()
            )));
        }
        // A ping must land inside every read window or healthy peers time out.
        if ws.ping_interval >= ws.read_timeout {
            return Err(HeraldError::InvalidConfig(
                "WS_PING_INTERVAL_SECS must be shorter than WS_READ_TIMEOUT_SECS".into(),
            ));
        }
        if self.hub.queue_capacity == 0 {
            return Err(HeraldError::InvalidConfig(
                "HUB_QUEUE_CAPACITY must be greater than zero".into(),
            ));
        }
        if !matches!(self.log.format.as_str(), "json" | "pretty") {
            return Err(HeraldError::InvalidConfig(format!(
                "LOG_FORMAT must be 'json' or 'pretty', got '{}'",
                self.log.format
            )));
        }

        Ok(())
    }

    /// Get the HTTP server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Keepalive ping period derived from the read timeout (90%)
pub fn default_ping_interval(read_timeout: Duration) -> Duration {
    read_timeout / 10 * 9
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a numeric environment variable, falling back to `default` when unset
fn parse_env<T: std::str::FromStr>(key: &str, default: &str) -> Result<T> {
    get_env_or(key, default)
        .trim()
        .parse()
        .map_err(|_| HeraldError::InvalidConfig(format!("{} must be a valid number", key)))
}
