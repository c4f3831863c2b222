//! Notification stream connection manager.
//!
//! [`ConnectionManager`] owns at most one background driver task per
//! session. The driver opens the authenticated stream, feeds chunks through
//! the [`FrameDecoder`], forwards notifications to a [`StreamSink`], and
//! retries failed attempts according to the configured [`RetryPolicy`].
//!
//! [`RetryPolicy`]: crate::reconnect::RetryPolicy

use std::{sync::Arc, time::Duration};

use futures_util::StreamExt;
use http::{HeaderMap, HeaderValue, header};
use tokio::{
    sync::{Mutex, mpsc, watch},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, error, info, trace, warn};

use super::{
    config::StreamConfig,
    parse::FrameDecoder,
    sink::StreamSink,
    types::{ConnectionStatus, Frame},
};
use crate::{
    auth::Session,
    error::{NotifyError, NotifyResult},
};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Control commands sent from the manager to the background task.
#[derive(Debug)]
pub enum ConnectionCommand {
    /// Stop reading and exit without reconnecting.
    Close,
    /// Drop the current stream and reconnect immediately.
    Reconnect {
        /// Human-readable reason for the reconnection request.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Status reporting
// ---------------------------------------------------------------------------

/// Publishes status transitions to the watch channel and the sink, skipping
/// repeats.
struct StatusReporter {
    tx: watch::Sender<ConnectionStatus>,
    sink: Arc<dyn StreamSink>,
}

impl StatusReporter {
    fn set(&self, status: ConnectionStatus) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            debug!(%status, "Notification stream status changed");
            self.sink.on_status(status);
        }
    }

    fn get(&self) -> ConnectionStatus {
        *self.tx.borrow()
    }
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

struct ActiveConnection {
    user_id: String,
    cmd_tx: mpsc::Sender<ConnectionCommand>,
    task: JoinHandle<()>,
    /// Cleared when the driver is abandoned without being awaited.
    live: Arc<parking_lot::Mutex<bool>>,
}

/// Owns the single streaming connection of a session.
///
/// Dropping the manager aborts the background task.
pub struct ConnectionManager {
    config: Arc<StreamConfig>,
    client: reqwest::Client,
    status: Arc<StatusReporter>,
    active: Mutex<Option<ActiveConnection>>,
}

impl ConnectionManager {
    /// Create a manager that reports into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails or the HTTP client
    /// cannot be built.
    pub fn new(config: StreamConfig, sink: Arc<dyn StreamSink>) -> NotifyResult<Self> {
        config.validate().map_err(NotifyError::config)?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| NotifyError::config(format!("Failed to build HTTP client: {e}")))?;

        let (tx, _) = watch::channel(ConnectionStatus::Disconnected);

        Ok(Self {
            config: Arc::new(config),
            client,
            status: Arc::new(StatusReporter { tx, sink }),
            active: Mutex::new(None),
        })
    }

    /// Open the notification stream for `user_id`.
    ///
    /// A blank user id or token is a no-op. Any running connection is torn
    /// down first, and the status is [`ConnectionStatus::Connecting`] by the
    /// time this returns. Transport failures are never returned here; they show up
    /// as [`ConnectionStatus::Error`] and are retried in the background.
    ///
    /// # Errors
    ///
    /// Returns an error only if the stream URL or the auth header cannot be
    /// built.
    pub async fn connect(&self, user_id: &str, token: &str) -> NotifyResult<()> {
        let session = Session::new(user_id, token);
        if !session.is_authenticated() {
            debug!("No authenticated session, notification stream not started");
            return Ok(());
        }

        let url = self
            .config
            .stream_url(session.user_id())
            .map_err(NotifyError::config)?;

        let mut headers = self.config.headers.clone();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        session.authenticate(&mut headers)?;

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            debug!(user_id = %previous.user_id, "Replacing running notification stream");
            shutdown(previous).await;
        }

        self.status.set(ConnectionStatus::Connecting);

        let live = Arc::new(parking_lot::Mutex::new(true));
        let (cmd_tx, cmd_rx) = mpsc::channel(self.config.command_channel_capacity);
        let task = tokio::spawn(connection_driver(
            DriverContext {
                config: Arc::clone(&self.config),
                client: self.client.clone(),
                url,
                headers,
                status: Arc::clone(&self.status),
                live: Arc::clone(&live),
            },
            cmd_rx,
        ));

        *active = Some(ActiveConnection {
            user_id: session.user_id().to_string(),
            cmd_tx,
            task,
            live,
        });
        Ok(())
    }

    /// Stop the stream and any pending reconnect.
    ///
    /// Waits for the background task to exit, then reports
    /// [`ConnectionStatus::Disconnected`]. Safe to call repeatedly or before
    /// any `connect`.
    pub async fn disconnect(&self) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            info!(user_id = %previous.user_id, "Closing notification stream");
            shutdown(previous).await;
        }
        self.status.set(ConnectionStatus::Disconnected);
    }

    /// Drop the current stream and reconnect right away, skipping backoff.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection is running.
    pub async fn reconnect(&self, reason: &str) -> NotifyResult<()> {
        let active = self.active.lock().await;
        let Some(connection) = active.as_ref() else {
            return Err(NotifyError::connection_closed(Some(
                "notification stream is not running".to_string(),
            )));
        };
        connection
            .cmd_tx
            .send(ConnectionCommand::Reconnect {
                reason: reason.to_string(),
            })
            .await
            .map_err(|_| {
                NotifyError::connection_closed(Some(
                    "notification stream task shut down".to_string(),
                ))
            })
    }

    /// Whether a background task is alive (connected, connecting, or
    /// waiting to retry).
    pub async fn is_running(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .is_some_and(|connection| !connection.task.is_finished())
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    /// Receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.tx.subscribe()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(connection) = self.active.get_mut().take() {
            // `abort` cannot interrupt a poll already running on another
            // worker, so silence the driver before reporting.
            *connection.live.lock() = false;
            connection.task.abort();
            self.status.set(ConnectionStatus::Disconnected);
        }
    }
}

async fn shutdown(connection: ActiveConnection) {
    // The task may already have exited on its own.
    let _ = connection.cmd_tx.send(ConnectionCommand::Close).await;
    if let Err(e) = connection.task.await
        && e.is_panic()
    {
        error!(error = %e, "Notification stream task panicked");
    }
}

// ---------------------------------------------------------------------------
// Internal: establish a single HTTP connection
// ---------------------------------------------------------------------------

async fn open_stream(
    client: &reqwest::Client,
    url: &url::Url,
    headers: &HeaderMap,
    connect_timeout: Duration,
) -> NotifyResult<reqwest::Response> {
    let request = client.get(url.clone()).headers(headers.clone());

    let response = timeout(connect_timeout, request.send())
        .await
        .map_err(|_| NotifyError::timeout(connect_timeout))??;

    let status = response.status();
    if !status.is_success() {
        return Err(NotifyError::invalid_status(status));
    }

    if let Some(ct) = response.headers().get(header::CONTENT_TYPE) {
        let ct = ct.to_str().unwrap_or("");
        if !ct.contains("text/event-stream") {
            warn!(content_type = %ct, "Notification stream has unexpected content type");
        }
    }

    Ok(response)
}

// ---------------------------------------------------------------------------
// Internal: background driver
// ---------------------------------------------------------------------------

struct DriverContext {
    config: Arc<StreamConfig>,
    client: reqwest::Client,
    url: url::Url,
    headers: HeaderMap,
    status: Arc<StatusReporter>,
    live: Arc<parking_lot::Mutex<bool>>,
}

impl DriverContext {
    /// Report `status` unless the manager has abandoned this driver.
    fn report(&self, status: ConnectionStatus) {
        let live = self.live.lock();
        if *live {
            self.status.set(status);
        }
    }

    fn deliver(&self, frames: Vec<Frame>) {
        let live = self.live.lock();
        if !*live {
            return;
        }
        for frame in frames {
            match frame {
                Frame::Notification(notification) => {
                    debug!(id = %notification.id, kind = %notification.kind, "Notification received");
                    self.status.sink.on_notification(notification);
                }
                Frame::KeepAlive => trace!("Notification stream keep-alive"),
                // Logged by the decoder.
                Frame::Malformed { .. } => {}
            }
        }
    }
}

/// The long-lived background task that drives the notification stream.
///
/// It connects, reads and decodes chunks, forwards notifications, and
/// reconnects after failures until it receives [`ConnectionCommand::Close`]
/// or the retry policy gives up.
async fn connection_driver(ctx: DriverContext, mut cmd_rx: mpsc::Receiver<ConnectionCommand>) {
    let config = Arc::clone(&ctx.config);
    let mut attempt: u32 = 0;
    let mut decoder = FrameDecoder::new();

    'connect: loop {
        // --- Establish connection ---
        ctx.report(ConnectionStatus::Connecting);
        info!(url = %ctx.url, attempt, "Notification stream connecting");

        let opened = tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ConnectionCommand::Close) | None => {
                        info!("Notification stream closing (requested)");
                        return;
                    }
                    Some(ConnectionCommand::Reconnect { reason }) => {
                        warn!(reason = %reason, "Notification stream reconnect requested");
                        continue 'connect;
                    }
                }
            }

            result = open_stream(&ctx.client, &ctx.url, &ctx.headers, config.connect_timeout) => result,
        };

        let failure = match opened {
            Err(err) => err,
            Ok(response) => {
                debug!(url = %ctx.url, "Notification stream response received");
                decoder.reset();
                let mut body = std::pin::pin!(response.bytes_stream());

                // --- Read loop ---
                loop {
                    tokio::select! {
                        biased;

                        cmd = cmd_rx.recv() => {
                            match cmd {
                                Some(ConnectionCommand::Close) | None => {
                                    info!("Notification stream closing (requested)");
                                    return;
                                }
                                Some(ConnectionCommand::Reconnect { reason }) => {
                                    warn!(reason = %reason, "Notification stream reconnect requested");
                                    continue 'connect;
                                }
                            }
                        }

                        chunk = body.next() => {
                            match chunk {
                                Some(Ok(bytes)) => {
                                    if bytes.is_empty() {
                                        continue;
                                    }
                                    if !ctx.status.get().is_connected() {
                                        info!(url = %ctx.url, "Notification stream connected");
                                        ctx.report(ConnectionStatus::Connected);
                                        attempt = 0;
                                    }
                                    ctx.deliver(decoder.decode(&bytes));
                                }
                                Some(Err(err)) => break NotifyError::Http(err),
                                None => {
                                    ctx.deliver(decoder.finish());
                                    break NotifyError::StreamEnded;
                                }
                            }
                        }
                    }
                }
            }
        };

        // --- Failure: report and maybe retry ---
        warn!(url = %ctx.url, error = %failure, "Notification stream failed");
        ctx.report(ConnectionStatus::Error);

        if !config.auto_reconnect {
            info!("Auto-reconnect disabled, notification stream stays down");
            return;
        }
        if !config.retry.allows(attempt) {
            error!(attempts = attempt, "Max notification stream reconnect attempts exceeded");
            return;
        }

        let delay = config.retry.delay(attempt);
        attempt = attempt.saturating_add(1);
        warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Notification stream reconnecting after backoff"
        );

        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ConnectionCommand::Close) | None => {
                        info!("Notification stream closing during backoff (requested)");
                        return;
                    }
                    Some(ConnectionCommand::Reconnect { reason }) => {
                        debug!(reason = %reason, "Skipping backoff on request");
                    }
                }
            }

            () = tokio::time::sleep(delay) => {}
        }
    }
}
