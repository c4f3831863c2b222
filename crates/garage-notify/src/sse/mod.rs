//! Server-Sent Events transport for the per-user notification stream.
//!
//! This module provides:
//!
//! - **Frame decoding**: [`FrameDecoder`] turns arbitrarily split byte chunks
//!   into [`Frame`]s, skipping heartbeats and logging malformed payloads.
//! - **Connection management**: [`ConnectionManager`] opens the authenticated
//!   stream, reports [`ConnectionStatus`] transitions and reconnects after
//!   failures.
//! - **Sink seam**: decoded notifications and status changes are pushed into
//!   a [`StreamSink`], normally the
//!   [`NotificationStore`](crate::store::NotificationStore).
//!
//! # Architecture
//!
//! ```text
//! ConnectionManager::connect(user_id, token)
//!   └─ spawns background task ──► tokio::spawn(connection_driver)
//!        │                              │
//!        ├── manager ──────► mpsc ─────►┤  (commands: Close, Reconnect)
//!        │                              │
//!        └── StreamSink ◄───────────────┘  (status, notifications)
//! ```
//!
//! # Module Index
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | [`StreamConfig`] builder for connection settings |
//! | [`connection`] | [`ConnectionManager`], [`ConnectionCommand`] |
//! | [`parse`] | [`FrameDecoder`], [`FrameStream`] |
//! | `sink` | [`StreamSink`] trait |
//! | `types` | [`ConnectionStatus`], [`Frame`] |

pub(crate) mod config;
pub mod connection;
pub mod parse;
mod sink;
mod types;

// Re-export config types
pub use config::{StreamConfig, USER_ID_PLACEHOLDER};
// Re-export connection types
pub use connection::{ConnectionCommand, ConnectionManager};
// Re-export decoder types
pub use parse::{FrameDecoder, FrameStream};
// Re-export the sink seam
pub use sink::StreamSink;
// Re-export core types
pub use types::{ConnectionStatus, Frame};
