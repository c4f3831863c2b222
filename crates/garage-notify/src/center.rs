//! Per-session notification context.
//!
//! A [`NotificationCenter`] is created once per signed-in session and handed
//! to every UI surface. It owns the shared [`NotificationStore`] and the one
//! [`ConnectionManager`] feeding it, so no surface ever opens its own stream.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    api::{ApiConfig, NotificationApi, RestNotificationApi},
    auth::Session,
    error::{NotifyError, NotifyResult},
    sse::{ConnectionManager, StreamConfig},
    store::NotificationStore,
};

struct Inner {
    session: Session,
    store: Arc<NotificationStore>,
    connection: ConnectionManager,
    page_size: u32,
}

/// Shared handle to one session's notification pipeline.
///
/// Cloning is cheap; all clones share the same store and connection.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

impl NotificationCenter {
    /// Build the pipeline for `session` against the portal REST backend.
    ///
    /// # Errors
    ///
    /// Returns an error if either configuration is invalid.
    pub fn new(
        session: Session,
        stream_config: StreamConfig,
        api_config: ApiConfig,
    ) -> NotifyResult<Self> {
        let page_size = api_config.page_size;
        let api = RestNotificationApi::new(api_config, &session)?;
        Self::with_api(session, stream_config, Arc::new(api), page_size)
    }

    /// Build the pipeline over a custom backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream configuration is invalid or
    /// `page_size` is zero.
    pub fn with_api(
        session: Session,
        stream_config: StreamConfig,
        api: Arc<dyn NotificationApi>,
        page_size: u32,
    ) -> NotifyResult<Self> {
        if page_size == 0 {
            return Err(NotifyError::config("Page size must be > 0"));
        }
        let store = Arc::new(NotificationStore::new(api));
        let connection = ConnectionManager::new(stream_config, store.clone())?;

        Ok(Self {
            inner: Arc::new(Inner {
                session,
                store,
                connection,
                page_size,
            }),
        })
    }

    /// Load the first page and open the stream.
    ///
    /// Does nothing for a session without credentials. The stream is opened
    /// even when the initial load fails.
    ///
    /// # Errors
    ///
    /// Returns the load error, after the stream has been started.
    pub async fn start(&self) -> NotifyResult<()> {
        let session = &self.inner.session;
        if !session.is_authenticated() {
            debug!("No authenticated session, notification center idle");
            return Ok(());
        }
        info!(user_id = %session.user_id(), "Starting notification center");

        let loaded = self.inner.store.load(0, self.inner.page_size).await;
        self.inner
            .connection
            .connect(session.user_id(), session.token())
            .await?;
        loaded
    }

    /// Close the stream. Store contents stay readable.
    pub async fn shutdown(&self) {
        info!(user_id = %self.inner.session.user_id(), "Stopping notification center");
        self.inner.connection.disconnect().await;
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.inner.store
    }

    /// The stream connection.
    pub fn connection(&self) -> &ConnectionManager {
        &self.inner.connection
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Page size used for the initial load.
    pub fn page_size(&self) -> u32 {
        self.inner.page_size
    }
}

impl std::fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("session", &self.inner.session)
            .field("store", &self.inner.store)
            .field("status", &self.inner.connection.status())
            .finish()
    }
}
