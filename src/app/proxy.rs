//! Defines an abstraction over the event sending mechanism.

use super::events::EngineEvent;
use tokio::sync::mpsc::UnboundedSender;

/// A trait that abstracts the sending of engine events to the display.
/// This is "fire-and-forget" and doesn't return a result, simplifying its use.
pub trait EventProxy: Send + Sync + Clone + 'static {
    fn send_event(&self, event: EngineEvent);
}

/// A plain tokio channel is the default transport to the display task.
impl EventProxy for UnboundedSender<EngineEvent> {
    fn send_event(&self, event: EngineEvent) {
        // A closed receiver means the display is gone; the engine keeps going.
        if let Err(e) = self.send(event) {
            tracing::warn!("Failed to send event to display: {:?}", e.0);
        }
    }
}
