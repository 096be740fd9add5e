//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → tls.rs (optional TLS handshake)
//!     → stream.rs (read selector line → dispatch → write → close)
//!
//! Incoming QUIC connection
//!     → quic.rs (endpoint, per-stream tasks)
//!     → dispatch per bidirectional stream
//!
//! Session States (connection.rs):
//!     Accepted → ReadingSelector → Dispatching → WritingResponse → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each session tracked for graceful shutdown
//! - All transports hand identical bytes to the same Application

pub mod connection;
pub mod listener;
pub mod quic;
pub mod server;
pub mod stream;
pub mod tls;

pub use connection::{ConnectionTracker, SessionState};
pub use listener::ListenerError;
pub use server::{GopherServer, ServerError};
pub use stream::SessionContext;
pub use tls::TlsError;
