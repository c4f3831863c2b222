//! # garage-notify
//!
//! Real-time notification delivery for the service center portal.
//!
//! This crate keeps one long-lived Server-Sent Events connection per signed-in
//! session, decodes the `data:` line protocol into [`Notification`]s, and
//! feeds them into a shared [`NotificationStore`] that any number of UI
//! surfaces can observe.
//!
//! ## Features
//!
//! - **Stream client**: authenticated SSE connection with status reporting and
//!   a swappable [`RetryPolicy`] (fixed interval by default).
//! - **Chunk-safe decoding**: lines and UTF-8 sequences split across network
//!   reads are reassembled; heartbeats and malformed frames never stop the
//!   stream.
//! - **Shared store**: list, unread counts and status with backend-first
//!   mutations and id de-duplication.
//! - **Fan-out**: subscribe to status, raw notifications or full snapshots;
//!   every registration returns a [`Subscription`] disposer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use garage_notify::{ApiConfig, NotificationCenter, Session, StreamConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new("42", "jwt-token");
//!     let center = NotificationCenter::new(
//!         session,
//!         StreamConfig::new("https://portal.example.com"),
//!         ApiConfig::new("https://portal.example.com"),
//!     )?;
//!
//!     let _badge = center.store().on_change(|snapshot| {
//!         println!("{} unread", snapshot.unread_count);
//!     });
//!
//!     center.start().await?;
//!     // ...
//!     center.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod center;
pub mod error;
pub mod fanout;
pub mod notification;
pub mod reconnect;
pub mod sse;
pub mod store;

// Re-export commonly used types
pub use api::{ApiConfig, NotificationApi, NotificationPage, RestNotificationApi};
pub use auth::Session;
pub use center::NotificationCenter;
pub use error::{NotifyError, NotifyResult};
pub use fanout::{Listeners, Subscription};
pub use notification::{Notification, NotificationId, NotificationKind};
pub use reconnect::RetryPolicy;
pub use sse::{ConnectionManager, ConnectionStatus, Frame, FrameDecoder, StreamConfig, StreamSink};
pub use store::{NotificationStore, StoreSnapshot};
