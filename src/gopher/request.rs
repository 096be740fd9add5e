//! The per-dispatch request value.

/// A validated selector together with the address the server advertises.
///
/// Built once per dispatch by the application and handed to handlers by
/// reference. Handlers use `hostname` and `port` when they emit menu items
/// pointing back at this server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    hostname: String,
    port: u16,
    selector: String,
}

impl Request {
    pub fn new(hostname: impl Into<String>, port: u16, selector: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            selector: selector.into(),
        }
    }

    /// Advertised hostname of the listener that received the request.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Advertised port of the listener that received the request.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The selector with trailing whitespace removed.
    pub fn selector(&self) -> &str {
        &self.selector
    }
}
