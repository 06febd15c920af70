//! Live-reload channel shared by the HTTP layer and the dispatcher.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Buffered events per subscriber before slow clients start lagging.
const CHANNEL_CAPACITY: usize = 16;

/// Message sent to connected browsers as a JSON text frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadEvent {
    /// Sent once when a client connects.
    Connected,
    /// Reload the whole page.
    Reload,
    /// Swap the stylesheets served from these URL paths.
    Css { paths: Vec<String> },
}

impl ReloadEvent {
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}

/// Handle to the live-reload channel.
///
/// Cloning is cheap; every clone sends to the same set of clients.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    tx: broadcast::Sender<ReloadEvent>,
}

impl Default for ServerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerHandle {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Receive every event sent after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Ask every client to reload. Returns the number of clients reached.
    pub fn reload(&self) -> usize {
        self.send(ReloadEvent::Reload)
    }

    /// Ask every client to swap the stylesheets at `paths`.
    pub fn refresh_styles(&self, paths: Vec<String>) -> usize {
        self.send(ReloadEvent::Css { paths })
    }

    /// Number of connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn send(&self, event: ReloadEvent) -> usize {
        tracing::debug!(?event, clients = self.client_count(), "live reload");
        // Err only means there are no receivers
        self.tx.send(event).unwrap_or(0)
    }
}
