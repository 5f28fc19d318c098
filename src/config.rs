//! Server configuration.
//!
//! The primary construction path for an embedded library is programmatic
//! (`ServerConfig::builder()` or a struct literal over `Default`); loading
//! from TOML is an ambient convenience for standalone binaries.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors raised while loading a [`ServerConfig`] from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: SocketAddr,
    /// Ceiling on the number of simultaneously live connections (§3 `MAX_CLIENTS`).
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// Per-iteration read buffer size bound.
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Interval at which the event loop pings every established connection,
    /// independent of any protocol's own traffic.
    #[serde(default = "default_ping_interval", with = "humantime_secs")]
    pub ping_interval: Duration,
    /// Time allotted for the HTTP/WebSocket handshake before the connection
    /// is dropped.
    #[serde(default = "default_handshake_timeout", with = "humantime_secs")]
    pub handshake_timeout: Duration,
    /// Optional transport security.
    pub tls: Option<TlsConfig>,
    /// Optional privilege-drop request, handed to a [`crate::privilege::PrivilegeDrop`].
    pub privilege: Option<PrivilegeRequest>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("valid default addr"),
            max_clients: default_max_clients(),
            read_buffer_size: default_read_buffer_size(),
            ping_interval: default_ping_interval(),
            handshake_timeout: default_handshake_timeout(),
            tls: None,
            privilege: None,
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Loads a config from a TOML file on disk. An ambient convenience for
    /// standalone binaries; embedders typically construct `ServerConfig`
    /// programmatically instead.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

fn default_max_clients() -> usize {
    1024
}

fn default_read_buffer_size() -> usize {
    16 * 1024
}

fn default_ping_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_handshake_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Builder for [`ServerConfig`], for embedders who prefer not to write a
/// full struct literal.
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    inner: ServerConfigOverrides,
}

#[derive(Debug, Default)]
struct ServerConfigOverrides {
    bind_addr: Option<SocketAddr>,
    max_clients: Option<usize>,
    read_buffer_size: Option<usize>,
    ping_interval: Option<Duration>,
    handshake_timeout: Option<Duration>,
    tls: Option<TlsConfig>,
    privilege: Option<PrivilegeRequest>,
}

impl ServerConfigBuilder {
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.inner.bind_addr = Some(addr);
        self
    }

    pub fn max_clients(mut self, max_clients: usize) -> Self {
        self.inner.max_clients = Some(max_clients);
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.inner.read_buffer_size = Some(size);
        self
    }

    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.inner.ping_interval = Some(interval);
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.inner.handshake_timeout = Some(timeout);
        self
    }

    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.inner.tls = Some(tls);
        self
    }

    pub fn privilege(mut self, privilege: PrivilegeRequest) -> Self {
        self.inner.privilege = Some(privilege);
        self
    }

    pub fn build(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            bind_addr: self.inner.bind_addr.unwrap_or(defaults.bind_addr),
            max_clients: self.inner.max_clients.unwrap_or(defaults.max_clients),
            read_buffer_size: self
                .inner
                .read_buffer_size
                .unwrap_or(defaults.read_buffer_size),
            ping_interval: self.inner.ping_interval.unwrap_or(defaults.ping_interval),
            handshake_timeout: self
                .inner
                .handshake_timeout
                .unwrap_or(defaults.handshake_timeout),
            tls: self.inner.tls,
            privilege: self.inner.privilege,
        }
    }
}

/// Transport security configuration: a certificate/key pair to load via
/// [`crate::tls`].
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Identity to drop privileges to after binding sockets, handed to the
/// configured [`crate::privilege::PrivilegeDrop`] implementation.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PrivilegeRequest {
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

mod humantime_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_overrides_over_defaults() {
        let config = ServerConfig::builder().max_clients(16).build();
        assert_eq!(config.max_clients, 16);
        assert_eq!(config.read_buffer_size, default_read_buffer_size());
    }

    #[test]
    fn parses_minimal_toml() {
        let toml = r#"
            bind_addr = "127.0.0.1:9000"
            max_clients = 4
        "#;
        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_clients, 4);
        assert_eq!(config.read_buffer_size, default_read_buffer_size());
        assert!(config.tls.is_none());
    }
}
