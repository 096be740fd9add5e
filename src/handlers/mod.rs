//! Request handlers.
//!
//! # Data Flow
//! ```text
//! Request (hostname, port, selector)
//!     → Handler::handle
//!         → directory.rs (files under a root, optional generated menus)
//!         → pattern.rs (regex routes to views, first match wins)
//!         → any user type implementing Handler
//!     → Response (text, binary, menu) or HandlerError
//! ```
//!
//! # Design Decisions
//! - One async operation; synchronous handlers simply never suspend
//! - NotFound is a distinct variant, every other variant is a failure
//! - Handlers are built during setup and shared read-only afterwards

pub mod classify;
pub mod directory;
pub mod pattern;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::gopher::{MenuError, Request, Response};

pub use classify::{ContentClassifier, PlainTextClassifier, SignatureClassifier};
pub use directory::DirectoryHandler;
pub use pattern::{Params, PatternError, PatternHandler, View};

/// Outcome of a handler that did not produce a response.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// No resource matches the selector.
    #[error("no resource matches the selector")]
    NotFound,

    /// Filesystem or other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A menu could not be built.
    #[error(transparent)]
    Menu(#[from] MenuError),

    /// Any other failure.
    #[error("{0}")]
    Failed(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Wrap an arbitrary error or message as a failure.
    pub fn failed(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HandlerError::Failed(err.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, HandlerError::NotFound)
    }
}

/// Maps a request to a response.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: &Request) -> Result<Response, HandlerError>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle(&self, request: &Request) -> Result<Response, HandlerError> {
        (**self).handle(request).await
    }
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Box<H> {
    async fn handle(&self, request: &Request) -> Result<Response, HandlerError> {
        (**self).handle(request).await
    }
}
