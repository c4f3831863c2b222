//! Core type definitions for the notification stream.

use std::fmt;

use crate::notification::Notification;

/// Connection state of the per-session notification stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    /// Not connected; the initial state and the state after a deliberate
    /// teardown.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Bytes are flowing from the stream.
    Connected,
    /// The last attempt failed; a retry may be scheduled.
    Error,
}

impl ConnectionStatus {
    /// Returns `true` if the stream is live.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if the last attempt failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Wire/display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded `data:` line.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Frame {
    /// A payload that parsed as a notification.
    Notification(Notification),
    /// Empty payload or a heartbeat sentinel.
    KeepAlive,
    /// A payload that could not be parsed; already logged by the decoder.
    Malformed {
        /// The raw payload (lossy UTF-8).
        payload: String,
        /// Why parsing failed.
        reason: String,
    },
}

impl Frame {
    /// Returns the notification carried by this frame, if any.
    pub fn into_notification(self) -> Option<Notification> {
        match self {
            Self::Notification(n) => Some(n),
            _ => None,
        }
    }

    /// Returns true if this is a keep-alive frame.
    pub fn is_keep_alive(&self) -> bool {
        matches!(self, Self::KeepAlive)
    }

    /// Returns true if this frame failed to parse.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}
