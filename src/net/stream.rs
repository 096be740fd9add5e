//! One request per byte stream.
//!
//! # Responsibilities
//! - Read the selector line with a size limit and a timeout
//! - Dispatch it and write the response
//! - Close the write side so the client sees end-of-response
//!
//! Shared by the plain TCP and TLS listeners; QUIC streams reuse the
//! context but read to end-of-stream instead of to a line feed.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::{LimitsConfig, Transport};
use crate::gopher::{Application, ErrorResponse};
use crate::net::connection::{ConnectionGuard, SessionState};
use crate::observability::metrics;

/// Everything a session needs to answer a request.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub application: Application,
    /// Hostname handed to handlers.
    pub hostname: Arc<str>,
    /// Advertised port handed to handlers.
    pub port: u16,
    pub transport: Transport,
    pub max_selector_bytes: usize,
    pub read_timeout: Option<Duration>,
}

impl SessionContext {
    pub fn new(
        application: Application,
        hostname: impl Into<Arc<str>>,
        port: u16,
        transport: Transport,
        limits: &LimitsConfig,
    ) -> Self {
        Self {
            application,
            hostname: hostname.into(),
            port,
            transport,
            max_selector_bytes: limits.max_selector_bytes,
            read_timeout: limits.read_timeout(),
        }
    }

    /// Dispatch raw selector bytes with this session's address.
    pub async fn dispatch(&self, raw_selector: &[u8]) -> Vec<u8> {
        self.application
            .dispatch(&self.hostname, self.port, raw_selector)
            .await
    }

    /// Run `read` under the configured read timeout. `None` means it expired.
    pub(crate) async fn with_read_timeout<F: std::future::Future>(&self, read: F) -> Option<F::Output> {
        match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, read).await.ok(),
            None => Some(read.await),
        }
    }
}

/// Result of reading a selector line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SelectorLine {
    /// A line, terminator included, or the bytes sent before end-of-stream.
    Line(Vec<u8>),
    /// No line feed within the limit.
    TooLong,
    /// End-of-stream before any byte.
    Empty,
}

/// Read up to and including the first line feed, never more than `limit` bytes.
pub(crate) async fn read_selector<R>(reader: R, limit: usize) -> std::io::Result<SelectorLine>
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    let mut limited = BufReader::new(reader).take(limit as u64);
    limited.read_until(b'\n', &mut line).await?;

    Ok(if line.last() == Some(&b'\n') {
        SelectorLine::Line(line)
    } else if line.len() >= limit {
        SelectorLine::TooLong
    } else if line.is_empty() {
        SelectorLine::Empty
    } else {
        SelectorLine::Line(line)
    })
}

/// Serve a single request on an accepted stream.
pub async fn serve_stream<S>(mut stream: S, ctx: &SessionContext, guard: &mut ConnectionGuard) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    guard.transition(SessionState::ReadingSelector);
    let started = Instant::now();
    let read = ctx
        .with_read_timeout(read_selector(&mut stream, ctx.max_selector_bytes))
        .await;

    let response = match read {
        None => {
            tracing::debug!(connection_id = %guard.id(), "Selector read timed out");
            return Ok(());
        }
        Some(read) => match read? {
            SelectorLine::Empty => {
                tracing::debug!(connection_id = %guard.id(), "Client closed before sending a selector");
                return Ok(());
            }
            SelectorLine::TooLong => {
                tracing::debug!(
                    connection_id = %guard.id(),
                    limit = ctx.max_selector_bytes,
                    "Selector line too long"
                );
                metrics::record_dispatch(ErrorResponse::BadSelector.as_str(), started);
                ErrorResponse::BadSelector.encode()
            }
            SelectorLine::Line(raw) => {
                guard.transition(SessionState::Dispatching);
                ctx.dispatch(&raw).await
            }
        },
    };

    guard.transition(SessionState::WritingResponse);
    stream.write_all(&response).await?;
    stream.shutdown().await
}
