//! Gopher protocol core.
//!
//! # Data Flow
//! ```text
//! raw selector bytes (+ advertised hostname, port)
//!     → application.rs (decode, trim, validate)
//!     → request.rs (immutable Request)
//!     → handler (see crate::handlers)
//!     → response.rs (text / binary / menu encoding, error lines)
//!     → bytes for the transport
//! ```
//!
//! # Design Decisions
//! - Menu serialization never appends the terminator; encoding does
//! - Error responses are fixed strings so every transport sends identical bytes

pub mod application;
pub mod menu;
pub mod request;
pub mod response;

pub use application::Application;
pub use menu::{InfoText, ItemType, Menu, MenuEntry, MenuError, MenuItem};
pub use request::Request;
pub use response::{ErrorResponse, Response};
