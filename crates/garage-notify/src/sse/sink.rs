//! Seam between the connection driver and whatever consumes its output.

use crate::{notification::Notification, sse::types::ConnectionStatus};

/// Receives everything the connection driver produces.
///
/// The driver calls these from its background task, one call at a time and
/// in stream order. Implementations must not block.
pub trait StreamSink: Send + Sync + 'static {
    /// Called on every status transition.
    fn on_status(&self, status: ConnectionStatus);

    /// Called for every notification decoded from the stream.
    fn on_notification(&self, notification: Notification);
}
