use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use webrcon::model::{Server, ServerKind, UserView};
use webrcon::util::RetryConfig;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Log filter in `tracing_subscriber::EnvFilter` syntax; `RUST_LOG`
    /// overrides it.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub users: Vec<UserEntry>,
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str("").expect("empty config must deserialize")
    }
}

fn default_bind() -> SocketAddr {
    "127.0.0.1:8080".parse().expect("valid default bind address")
}

fn default_heartbeat_interval_ms() -> u64 {
    1000
}

fn default_log_filter() -> String {
    "info".to_owned()
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub base_backoff_ms: u64,
    pub jitter_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_backoff_ms: 100,
            jitter_ms: 10,
            max_backoff_ms: 60_000,
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            base_backoff: Duration::from_millis(self.base_backoff_ms),
            jitter: (self.jitter_ms > 0).then(|| Duration::from_millis(self.jitter_ms)),
            max_backoff: Some(Duration::from_millis(self.max_backoff_ms)),
            max_tries: None,
            log_level: log::Level::Warn,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserEntry {
    pub username: String,
    #[serde(default)]
    pub disabled: bool,
}

impl UserEntry {
    pub fn into_user(self) -> UserView {
        UserView {
            username: self.username,
            disabled: self.disabled,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerEntry {
    #[serde(default = "Uuid::new_v4")]
    pub uid: Uuid,
    pub kind: ServerKind,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub rcon_port: u16,
    pub rcon_password: String,
    #[serde(default)]
    pub description: String,
}

impl ServerEntry {
    pub fn into_server(self) -> Server {
        Server {
            uid: self.uid,
            kind: self.kind,
            name: self.name,
            host: self.host,
            port: self.port,
            rcon_port: self.rcon_port,
            rcon_password: self.rcon_password,
            description: self.description,
        }
    }
}

impl Config {
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("invalid configuration")
    }

    /// Loads the file, or falls back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::warn!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&raw)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}
