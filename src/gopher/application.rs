//! Dispatch engine.
//!
//! # Responsibilities
//! - Decode and validate the raw selector
//! - Run the configured handler
//! - Map handler outcomes to wire-format responses
//!
//! # Design Decisions
//! - `dispatch` cannot fail: every path ends in a well-formed response
//! - Handler failures (including panics) are logged here and reach the
//!   client only as the generic internal error
//! - Identical selectors yield identical bytes on every transport

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::gopher::request::Request;
use crate::gopher::response::ErrorResponse;
use crate::handlers::{Handler, HandlerError};
use crate::observability::metrics;

/// Connects the transport layer to a handler.
///
/// Cheap to clone; every listener task holds its own copy.
#[derive(Clone)]
pub struct Application {
    handler: Arc<dyn Handler>,
}

impl Application {
    pub fn new(handler: impl Handler + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Build from an already shared handler.
    pub fn from_shared(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    /// Turn raw selector bytes into the bytes to send back.
    pub async fn dispatch(&self, hostname: &str, port: u16, raw_selector: &[u8]) -> Vec<u8> {
        let started = Instant::now();

        let selector = match parse_selector(raw_selector) {
            Some(selector) => selector,
            None => {
                tracing::debug!(raw_len = raw_selector.len(), "Rejected selector");
                metrics::record_dispatch(ErrorResponse::BadSelector.as_str(), started);
                return ErrorResponse::BadSelector.encode();
            }
        };

        let request = Request::new(hostname, port, selector);
        let outcome = AssertUnwindSafe(self.handler.handle(&request))
            .catch_unwind()
            .await;

        let (label, bytes) = match outcome {
            Ok(Ok(response)) => {
                let label = response_label(&response);
                (label, response.encode())
            }
            Ok(Err(HandlerError::NotFound)) => {
                tracing::debug!(selector = %request.selector(), "Not found");
                let err = ErrorResponse::NotFound;
                (err.as_str(), err.encode())
            }
            Ok(Err(e)) => {
                tracing::error!(
                    hostname = %request.hostname(),
                    port = request.port(),
                    selector = %request.selector(),
                    error = %e,
                    details = ?e,
                    "Handler failed"
                );
                let err = ErrorResponse::InternalError;
                (err.as_str(), err.encode())
            }
            Err(panic) => {
                tracing::error!(
                    hostname = %request.hostname(),
                    port = request.port(),
                    selector = %request.selector(),
                    panic = %panic_message(panic.as_ref()),
                    "Handler panicked"
                );
                let err = ErrorResponse::InternalError;
                (err.as_str(), err.encode())
            }
        };

        metrics::record_dispatch(label, started);
        tracing::debug!(
            selector = %request.selector(),
            outcome = label,
            bytes = bytes.len(),
            "Dispatched"
        );
        bytes
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application").finish_non_exhaustive()
    }
}

/// Decode, trim and validate a raw selector. `None` means "bad selector".
fn parse_selector(raw: &[u8]) -> Option<&str> {
    let decoded = std::str::from_utf8(raw).ok()?;
    let selector = decoded.trim_end();
    if selector.contains(['\t', '\r', '\n']) {
        return None;
    }
    Some(selector)
}

fn response_label(response: &crate::gopher::Response) -> &'static str {
    match response {
        crate::gopher::Response::Binary(_) => "binary",
        crate::gopher::Response::Text(_) => "text",
        crate::gopher::Response::Menu(_) => "menu",
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
