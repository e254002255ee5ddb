use std::str::FromStr;
use std::time::Duration;

use herald_events::DispatcherConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Shared secret for publishers. `None` disables principal checks.
    pub api_secret: Option<String>,
    /// Dispatcher poll interval in milliseconds (default: `2000`).
    pub dispatch_poll_interval_ms: u64,
    /// Maximum rows handled per dispatcher tick (default: `500`).
    pub dispatch_batch_size: usize,
    /// Outbound frame buffer per WebSocket connection (default: `64`).
    pub ws_outbound_capacity: usize,
    /// Per-frame socket write timeout in seconds (default: `5`).
    pub ws_send_timeout_secs: u64,
    /// Event names that get a `LoggingHandler` at startup.
    pub event_log_names: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `HOST`                      | `0.0.0.0`               |
    /// | `PORT`                      | `3000`                  |
    /// | `CORS_ORIGINS`              | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                    |
    /// | `API_SECRET`                | unset                   |
    /// | `DISPATCH_POLL_INTERVAL_MS` | `2000`                  |
    /// | `DISPATCH_BATCH_SIZE`       | `500`                   |
    /// | `WS_OUTBOUND_CAPACITY`      | `64`                    |
    /// | `WS_SEND_TIMEOUT_SECS`      | `5`                     |
    /// | `EVENT_LOG_NAMES`           | empty                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let api_secret = std::env::var("API_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            host,
            port: parse_env("PORT", 3000),
            cors_origins: list_env("CORS_ORIGINS", "http://localhost:5173"),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT_SECS", 30),
            api_secret,
            dispatch_poll_interval_ms: parse_env("DISPATCH_POLL_INTERVAL_MS", 2000),
            dispatch_batch_size: parse_env("DISPATCH_BATCH_SIZE", 500),
            ws_outbound_capacity: parse_env("WS_OUTBOUND_CAPACITY", 64),
            ws_send_timeout_secs: parse_env("WS_SEND_TIMEOUT_SECS", 5),
            event_log_names: list_env("EVENT_LOG_NAMES", ""),
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            poll_interval: Duration::from_millis(self.dispatch_poll_interval_ms),
            batch_size: self.dispatch_batch_size,
        }
    }

    /// Per-frame write timeout. Zero would drop every client on its first
    /// frame, so it is raised to one second.
    pub fn ws_send_timeout(&self) -> Duration {
        Duration::from_secs(self.ws_send_timeout_secs.max(1))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            api_secret: None,
            dispatch_poll_interval_ms: 2000,
            dispatch_batch_size: 500,
            ws_outbound_capacity: 64,
            ws_send_timeout_secs: 5,
            event_log_names: Vec::new(),
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when unset.
///
/// Panics on a present but malformed value so misconfiguration fails fast.
fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be valid: {e}")),
        Err(_) => default,
    }
}

fn list_env(key: &str, default: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_else(|_| default.into())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
