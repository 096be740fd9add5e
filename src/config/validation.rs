//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check bind addresses parse and do not collide
//! - Check secure transports carry certificate material
//! - Validate value ranges (limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - File existence is checked when listeners bind, not here

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{ServerConfig, Transport};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("hostname must be non-empty and free of tabs and line breaks")]
    InvalidHostname,

    #[error("at least one listener is required")]
    NoListeners,

    #[error("listener {index}: invalid bind address `{address}`")]
    InvalidBindAddress { index: usize, address: String },

    #[error("listener {index}: {transport} listener requires a [tls] section")]
    MissingTls { index: usize, transport: Transport },

    #[error("listener {index}: tcp listener does not take a [tls] section")]
    UnexpectedTls { index: usize },

    #[error("listener {index}: {address} is already bound by another {protocol} listener")]
    DuplicateBind { index: usize, address: SocketAddr, protocol: &'static str },

    #[error("limits.{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.hostname.is_empty() || config.hostname.contains(['\t', '\r', '\n']) {
        errors.push(ValidationError::InvalidHostname);
    }

    if config.listeners.is_empty() {
        errors.push(ValidationError::NoListeners);
    }

    // TCP and QUIC may share a port number: one is TCP, the other UDP.
    let mut bound: HashSet<(&'static str, SocketAddr)> = HashSet::new();
    for (index, listener) in config.listeners.iter().enumerate() {
        match listener.bind_address.parse::<SocketAddr>() {
            Ok(addr) => {
                let protocol = match listener.transport {
                    Transport::Quic => "udp",
                    Transport::Tcp | Transport::Tls => "tcp",
                };
                if addr.port() != 0 && !bound.insert((protocol, addr)) {
                    errors.push(ValidationError::DuplicateBind { index, address: addr, protocol });
                }
            }
            Err(_) => errors.push(ValidationError::InvalidBindAddress {
                index,
                address: listener.bind_address.clone(),
            }),
        }

        match (listener.transport.is_secure(), listener.tls.is_some()) {
            (true, false) => errors.push(ValidationError::MissingTls {
                index,
                transport: listener.transport,
            }),
            (false, true) => errors.push(ValidationError::UnexpectedTls { index }),
            _ => {}
        }
    }

    let limits = &config.limits;
    for (name, value) in [
        ("max_connections", limits.max_connections as u64),
        ("max_selector_bytes", limits.max_selector_bytes as u64),
        ("idle_timeout_secs", limits.idle_timeout_secs),
        ("max_streams_per_connection", limits.max_streams_per_connection as u64),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroLimit(name));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
