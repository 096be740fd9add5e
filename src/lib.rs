//! Gopher server library.
//!
//! An [`Application`] wraps a [`Handler`] and turns raw selector bytes into
//! response bytes; [`GopherServer`] serves one application over plain TCP,
//! TLS and QUIC listeners.

pub mod config;
pub mod gopher;
pub mod handlers;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::ServerConfig;
pub use gopher::{Application, ItemType, Menu, MenuItem, Request, Response};
pub use handlers::{DirectoryHandler, Handler, HandlerError, PatternHandler};
pub use lifecycle::Shutdown;
pub use net::GopherServer;
