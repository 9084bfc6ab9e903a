//! Hub configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::service::hub::DEFAULT_CONNECTION_BUFFER;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

/// Top-level hub configuration.
///
/// Loaded once at startup via [`HubConfig::from_env`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Path prefix reserved for WebSocket upgrades.
    pub ws_path: String,

    /// Period of the process-wide heartbeat ping.
    pub heartbeat_interval: Duration,

    /// Capacity of each connection's outbound queue.
    pub connection_buffer: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            ws_path: "/ws".to_string(),
            heartbeat_interval: Duration::from_secs(30),
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
            log_format: LogFormat::Text,
        }
    }
}

impl HubConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file, then
    /// delegates to [`HubConfig::from_lookup`].
    ///
    /// # Errors
    ///
    /// See [`HubConfig::from_lookup`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Falls back to defaults for missing or unparsable numeric values.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but is not a valid
    /// [`SocketAddr`], or if `HUB_WS_PATH` does not start with `/`.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .with_context(|| format!("LISTEN_ADDR `{raw}` is not a socket address"))?,
            None => defaults.listen_addr,
        };

        let ws_path = lookup("HUB_WS_PATH").unwrap_or(defaults.ws_path);
        if !ws_path.starts_with('/') {
            bail!("HUB_WS_PATH `{ws_path}` must start with `/`");
        }

        let heartbeat_secs: u64 = parse_or(&lookup, "HUB_HEARTBEAT_INTERVAL_SECS", 30);
        let connection_buffer: usize =
            parse_or(&lookup, "HUB_CONNECTION_BUFFER", defaults.connection_buffer);
        let log_format = parse_or(&lookup, "LOG_FORMAT", defaults.log_format);

        Ok(Self {
            listen_addr,
            ws_path,
            heartbeat_interval: Duration::from_secs(heartbeat_secs.max(1)),
            connection_buffer: connection_buffer.max(1),
            log_format,
        })
    }
}

/// Parses the value under `key` as `T`, returning `default` on missing or
/// invalid values.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
