//! QUIC listener: one request per bidirectional stream.
//!
//! # Responsibilities
//! - Bind a quinn endpoint with the listener's certificate material
//! - Bound concurrent connections; refuse the excess at the handshake
//! - Serve every bidirectional stream in its own task
//!
//! # Data Flow
//! ```text
//! Incoming → Connection (ConnectionOpen)
//!     → accept_bi (StreamOpened)
//!         → read_to_end(max_selector_bytes) (ReadingSelector)
//!         → Application::dispatch (Dispatching)
//!         → write_all + finish (WritingResponse → StreamClosed)
//!     → peer closes / idle timeout / shutdown (ConnectionClosed)
//! ```
//!
//! # Design Decisions
//! - A stream's selector is everything sent before the peer finishes it,
//!   so an empty stream asks for the empty selector
//! - Finishing a stream never closes its connection
//! - On shutdown a connection stops taking streams, lets open ones finish,
//!   then closes

use quinn::crypto::rustls::QuicServerConfig;
use quinn::{Endpoint, Incoming, RecvStream, SendStream, VarInt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use crate::config::{LimitsConfig, TlsConfig, Transport};
use crate::gopher::ErrorResponse;
use crate::net::connection::{ConnectionGuard, ConnectionId, ConnectionTracker, SessionState};
use crate::net::listener::{parse_address, ListenerError};
use crate::net::server::stopped;
use crate::net::stream::SessionContext;
use crate::net::tls::{quic_server_config, TlsError};
use crate::observability::metrics;

/// ALPN offered when the listener configures none.
pub const DEFAULT_ALPN: &str = "gopher";

/// Build the quinn server config for a listener.
pub fn server_config(tls: &TlsConfig, limits: &LimitsConfig) -> Result<quinn::ServerConfig, TlsError> {
    let crypto = quic_server_config(tls, DEFAULT_ALPN)?;
    let crypto = QuicServerConfig::try_from(crypto).map_err(|e| TlsError::Quic(e.to_string()))?;

    let mut transport = quinn::TransportConfig::default();
    transport.max_concurrent_bidi_streams(VarInt::from_u32(limits.max_streams_per_connection));
    transport.max_concurrent_uni_streams(VarInt::from_u32(0));
    let idle = quinn::IdleTimeout::try_from(limits.idle_timeout()).map_err(|e| TlsError::Quic(e.to_string()))?;
    transport.max_idle_timeout(Some(idle));

    let mut config = quinn::ServerConfig::with_crypto(Arc::new(crypto));
    config.transport_config(Arc::new(transport));
    Ok(config)
}

/// A bound QUIC endpoint.
#[derive(Debug)]
pub struct QuicListener {
    endpoint: Endpoint,
    connection_limit: Arc<Semaphore>,
}

impl QuicListener {
    /// Bind `address` with the given server config.
    pub fn bind(address: &str, config: quinn::ServerConfig, max_connections: usize) -> Result<Self, ListenerError> {
        let addr = parse_address(address)?;
        let endpoint = Endpoint::server(config, addr).map_err(|source| ListenerError::Bind {
            address: address.to_string(),
            source,
        })?;

        if let Ok(local) = endpoint.local_addr() {
            tracing::info!(address = %local, max_connections, "QUIC listener bound");
        }

        Ok(Self {
            endpoint,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.endpoint.local_addr()
    }

    /// Handle to the endpoint, used to close it after draining.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }

    /// Accept connections until shutdown.
    pub async fn serve(self, ctx: SessionContext, tracker: ConnectionTracker, stop: watch::Receiver<bool>) {
        let mut accept_stop = stop.clone();
        loop {
            let incoming = tokio::select! {
                _ = stopped(&mut accept_stop) => break,
                incoming = self.endpoint.accept() => incoming,
            };
            let Some(incoming) = incoming else {
                break;
            };

            let Ok(permit) = Arc::clone(&self.connection_limit).try_acquire_owned() else {
                tracing::warn!(peer_addr = %incoming.remote_address(), "QUIC connection limit reached, refusing");
                incoming.refuse();
                continue;
            };

            let guard = tracker.track(Transport::Quic);
            let ctx = ctx.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                serve_connection(incoming, ctx, guard, stop).await;
                drop(permit);
            });
        }
        tracing::info!("QUIC listener stopped accepting");
    }
}

async fn serve_connection(
    incoming: Incoming,
    ctx: SessionContext,
    guard: ConnectionGuard,
    mut stop: watch::Receiver<bool>,
) {
    let connection_id = guard.id();
    let connection = match incoming.await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::debug!(connection_id = %connection_id, error = %e, "QUIC handshake failed");
            return;
        }
    };

    let alpn = connection
        .handshake_data()
        .and_then(|data| data.downcast::<quinn::crypto::rustls::HandshakeData>().ok())
        .and_then(|data| data.protocol)
        .map(|p| String::from_utf8_lossy(&p).into_owned());
    tracing::debug!(
        connection_id = %connection_id,
        peer_addr = %connection.remote_address(),
        alpn = ?alpn,
        "QUIC connection open"
    );

    let mut streams = JoinSet::new();
    loop {
        tokio::select! {
            _ = stopped(&mut stop) => {
                tracing::debug!(connection_id = %connection_id, "Shutdown, no new streams");
                break;
            }
            accepted = connection.accept_bi() => match accepted {
                Ok((send, recv)) => {
                    metrics::quic_stream_opened();
                    streams.spawn(serve_stream(send, recv, ctx.clone(), connection_id));
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, reason = %e, "QUIC connection closed by peer");
                    break;
                }
            },
            Some(joined) = streams.join_next(), if !streams.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(connection_id = %connection_id, error = %e, "QUIC stream task failed");
                }
            }
        }
    }

    while streams.join_next().await.is_some() {}
    connection.close(VarInt::from_u32(0), b"");
    drop(guard);
}

/// Per-stream state, traced like a stream session.
struct StreamSession {
    connection: ConnectionId,
    stream: u64,
    state: SessionState,
}

impl StreamSession {
    fn transition(&mut self, next: SessionState) {
        tracing::trace!(
            connection_id = %self.connection,
            stream = self.stream,
            from = %self.state,
            to = %next,
            "QUIC stream state"
        );
        self.state = next;
    }
}

async fn serve_stream(mut send: SendStream, mut recv: RecvStream, ctx: SessionContext, connection: ConnectionId) {
    let mut session = StreamSession {
        connection,
        stream: send.id().index(),
        state: SessionState::Accepted,
    };

    session.transition(SessionState::ReadingSelector);
    let started = Instant::now();
    let read = ctx.with_read_timeout(recv.read_to_end(ctx.max_selector_bytes)).await;
    let response = match read {
        None => {
            tracing::debug!(connection_id = %connection, stream = session.stream, "Selector read timed out");
            let _ = recv.stop(VarInt::from_u32(0));
            let _ = send.reset(VarInt::from_u32(0));
            return;
        }
        Some(Ok(raw)) => {
            session.transition(SessionState::Dispatching);
            ctx.dispatch(&raw).await
        }
        Some(Err(quinn::ReadToEndError::TooLong)) => {
            tracing::debug!(
                connection_id = %connection,
                stream = session.stream,
                limit = ctx.max_selector_bytes,
                "Selector too long"
            );
            let _ = recv.stop(VarInt::from_u32(0));
            metrics::record_dispatch(ErrorResponse::BadSelector.as_str(), started);
            ErrorResponse::BadSelector.encode()
        }
        Some(Err(e)) => {
            tracing::debug!(connection_id = %connection, stream = session.stream, error = %e, "QUIC stream read failed");
            return;
        }
    };

    session.transition(SessionState::WritingResponse);
    if let Err(e) = send.write_all(&response).await {
        tracing::debug!(connection_id = %connection, stream = session.stream, error = %e, "QUIC stream write failed");
        return;
    }
    if send.finish().is_ok() {
        // Keep the task alive until the peer has the whole response.
        let _ = send.stopped().await;
    }
    session.transition(SessionState::Closed);
}
