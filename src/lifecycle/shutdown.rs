//! Shutdown trigger shared by the binary and the server.

use tokio::sync::broadcast;

/// One-shot stop request for a running [`GopherServer`](crate::GopherServer).
///
/// Cloning yields another handle to the same trigger. Subscribe before
/// triggering; the server turns the first message into its own stop flag.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscriber to stop. A no-op when nobody is subscribed.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
