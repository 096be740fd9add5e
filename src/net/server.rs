//! Multi-listener Gopher server.
//!
//! # Responsibilities
//! - Bind every configured listener before serving anything
//! - Run one accept loop per listener
//! - Stop accepting on shutdown, drain live sessions, close QUIC endpoints

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;

use crate::config::{ListenerConfig, ServerConfig, Transport};
use crate::gopher::Application;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};
use crate::net::quic::{self, QuicListener};
use crate::net::stream::{serve_stream, SessionContext};
use crate::net::tls::{stream_server_config, TlsError};

/// Error type for server startup.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Listener {address}: {source}")]
    Tls {
        address: String,
        #[source]
        source: TlsError,
    },

    #[error("Listener {address}: {transport} requires TLS settings")]
    MissingTls { address: String, transport: Transport },

    #[error("Failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

enum Acceptor {
    Stream { listener: Listener, tls: Option<TlsAcceptor> },
    Quic(QuicListener),
}

struct Bound {
    local_addr: SocketAddr,
    ctx: SessionContext,
    acceptor: Acceptor,
}

/// Serves one application on every configured listener.
pub struct GopherServer {
    listeners: Vec<Bound>,
    tracker: ConnectionTracker,
    shutdown_grace: Duration,
}

impl GopherServer {
    /// Bind every listener in `config`. Nothing is served until [`run`](Self::run).
    pub async fn bind(config: &ServerConfig, application: Application) -> Result<Self, ServerError> {
        let hostname: Arc<str> = Arc::from(config.hostname.as_str());
        let limits = &config.limits;
        let mut listeners = Vec::with_capacity(config.listeners.len());

        for listener in &config.listeners {
            let acceptor = bind_listener(listener, config).await?;
            let local_addr = match &acceptor {
                Acceptor::Stream { listener, .. } => listener.local_addr(),
                Acceptor::Quic(quic) => quic.local_addr(),
            }
            .map_err(ServerError::LocalAddr)?;

            let port = listener.advertised_port.unwrap_or(local_addr.port());
            let ctx = SessionContext::new(
                application.clone(),
                Arc::clone(&hostname),
                port,
                listener.transport,
                limits,
            );
            tracing::info!(
                transport = %listener.transport,
                address = %local_addr,
                hostname = %hostname,
                advertised_port = port,
                "Listener ready"
            );
            listeners.push(Bound {
                local_addr,
                ctx,
                acceptor,
            });
        }

        Ok(Self {
            listeners,
            tracker: ConnectionTracker::new(),
            shutdown_grace: limits.shutdown_grace(),
        })
    }

    /// Bound address of the first listener speaking `transport`.
    pub fn local_addr(&self, transport: Transport) -> Option<SocketAddr> {
        self.listeners
            .iter()
            .find(|bound| bound.ctx.transport == transport)
            .map(|bound| bound.local_addr)
    }

    /// Bound addresses of all listeners, in configuration order.
    pub fn local_addrs(&self) -> Vec<(Transport, SocketAddr)> {
        self.listeners
            .iter()
            .map(|bound| (bound.ctx.transport, bound.local_addr))
            .collect()
    }

    /// Tracker counting live sessions across all listeners.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Serve until `shutdown` fires, then drain and close.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut accept_loops = JoinSet::new();
        let mut endpoints = Vec::new();

        for bound in self.listeners {
            let tracker = self.tracker.clone();
            let stop = stop_rx.clone();
            match bound.acceptor {
                Acceptor::Stream { listener, tls } => {
                    accept_loops.spawn(accept_streams(listener, tls, bound.ctx, tracker, stop));
                }
                Acceptor::Quic(quic) => {
                    endpoints.push(quic.endpoint());
                    accept_loops.spawn(quic.serve(bound.ctx, tracker, stop));
                }
            }
        }
        drop(stop_rx);

        let _ = shutdown.recv().await;
        tracing::info!("Shutdown requested, no longer accepting");
        stop_tx.send_replace(true);

        while let Some(joined) = accept_loops.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Accept loop failed");
            }
        }

        tracing::info!(
            active = self.tracker.active_count(),
            grace_secs = self.shutdown_grace.as_secs(),
            "Draining sessions"
        );
        if !self.tracker.drain(self.shutdown_grace).await {
            tracing::warn!(active = self.tracker.active_count(), "Grace period expired with sessions open");
        }

        for endpoint in &endpoints {
            endpoint.close(quinn::VarInt::from_u32(0), b"shutdown");
        }
        for endpoint in endpoints {
            let _ = tokio::time::timeout(Duration::from_secs(1), endpoint.wait_idle()).await;
        }
        tracing::info!("Server stopped");
    }
}

impl std::fmt::Debug for GopherServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GopherServer")
            .field("listeners", &self.local_addrs())
            .field("shutdown_grace", &self.shutdown_grace)
            .finish()
    }
}

async fn bind_listener(listener: &ListenerConfig, config: &ServerConfig) -> Result<Acceptor, ServerError> {
    let limits = &config.limits;
    let address = &listener.bind_address;
    let tls_settings = || {
        listener.tls.as_ref().ok_or_else(|| ServerError::MissingTls {
            address: address.clone(),
            transport: listener.transport,
        })
    };
    let tls_error = |source: TlsError| ServerError::Tls {
        address: address.clone(),
        source,
    };

    Ok(match listener.transport {
        Transport::Tcp => Acceptor::Stream {
            listener: Listener::bind(address, limits.max_connections).await?,
            tls: None,
        },
        Transport::Tls => {
            let tls = stream_server_config(tls_settings()?).map_err(tls_error)?;
            Acceptor::Stream {
                listener: Listener::bind(address, limits.max_connections).await?,
                tls: Some(TlsAcceptor::from(tls)),
            }
        }
        Transport::Quic => {
            let server_config = quic::server_config(tls_settings()?, limits).map_err(tls_error)?;
            Acceptor::Quic(QuicListener::bind(address, server_config, limits.max_connections)?)
        }
    })
}

async fn accept_streams(
    listener: Listener,
    tls: Option<TlsAcceptor>,
    ctx: SessionContext,
    tracker: ConnectionTracker,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let accepted = tokio::select! {
            _ = stopped(&mut stop) => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer_addr, permit) = match accepted {
            Ok(accepted) => accepted,
            Err(ListenerError::Closed) => break,
            Err(e) => {
                tracing::warn!(transport = %ctx.transport, error = %e, "Accept failed");
                tokio::time::sleep(Duration::from_millis(50)).await;
                continue;
            }
        };

        let mut guard = tracker.track(ctx.transport);
        let ctx = ctx.clone();
        let tls = tls.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let result = match tls {
                None => serve_stream(stream, &ctx, &mut guard).await,
                Some(acceptor) => {
                    let handshake = ctx.with_read_timeout(acceptor.accept(stream)).await;
                    match handshake {
                        Some(Ok(tls_stream)) => serve_stream(tls_stream, &ctx, &mut guard).await,
                        Some(Err(e)) => Err(e),
                        None => Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "TLS handshake timed out")),
                    }
                }
            };
            if let Err(e) = result {
                tracing::debug!(
                    connection_id = %guard.id(),
                    peer_addr = %peer_addr,
                    error = %e,
                    "Session ended with I/O error"
                );
            }
        });
    }
    tracing::info!(transport = %ctx.transport, "Stream listener stopped accepting");
}

/// Resolve once shutdown has been requested or the server is gone.
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}
