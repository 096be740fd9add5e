//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the Gopher server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Hostname advertised in generated menus.
    pub hostname: String,

    /// Directory handler settings.
    pub directory: DirectoryConfig,

    /// Transports to listen on.
    pub listeners: Vec<ListenerConfig>,

    /// Resource limits and timeouts.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            directory: DirectoryConfig::default(),
            listeners: vec![ListenerConfig::default()],
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Settings for serving a directory tree.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Root of the served tree.
    pub root: PathBuf,

    /// Generate listings for directories instead of serving `index` files.
    pub generate_menus: bool,

    /// Sniff file signatures to pick item types in generated listings.
    pub classify_content: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            generate_menus: false,
            classify_content: false,
        }
    }
}

/// Transport a listener speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Plain TCP.
    Tcp,
    /// TLS over TCP.
    Tls,
    /// QUIC, one request per bidirectional stream.
    Quic,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Tls => "tls",
            Transport::Quic => "quic",
        }
    }

    /// Whether the transport needs certificate material.
    pub fn is_secure(&self) -> bool {
        !matches!(self, Transport::Tcp)
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Transport spoken on this address.
    #[serde(default = "default_transport")]
    pub transport: Transport,

    /// Bind address (e.g., "0.0.0.0:70").
    pub bind_address: String,

    /// Port written into menus; defaults to the bound port.
    #[serde(default)]
    pub advertised_port: Option<u16>,

    /// Certificate material, required for `tls` and `quic`.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

fn default_transport() -> Transport {
    Transport::Tcp
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Tcp,
            bind_address: "0.0.0.0:7000".to_string(),
            advertised_port: None,
            tls: None,
        }
    }
}

/// TLS configuration for secured and QUIC listeners.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,

    /// Passphrase for an encrypted PKCS#8 private key.
    #[serde(default)]
    pub key_passphrase: Option<String>,

    /// ALPN protocols to offer. QUIC listeners fall back to `gopher`.
    #[serde(default)]
    pub alpn_protocols: Vec<String>,
}

/// Resource limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum concurrent connections per listener (backpressure).
    pub max_connections: usize,

    /// Maximum selector size in bytes, line terminator included.
    pub max_selector_bytes: usize,

    /// Time allowed for a client to send its selector; 0 disables.
    pub read_timeout_secs: u64,

    /// QUIC idle timeout in seconds.
    pub idle_timeout_secs: u64,

    /// Concurrent bidirectional streams per QUIC connection.
    pub max_streams_per_connection: u32,

    /// Time allowed for in-flight requests after shutdown starts.
    pub shutdown_grace_secs: u64,
}

impl LimitsConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            max_selector_bytes: 4096,
            read_timeout_secs: 30,
            idle_timeout_secs: 30,
            max_streams_per_connection: 100,
            shutdown_grace_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
