//! Shared notification state for one session.
//!
//! [`NotificationStore`] is the single source of truth for the notification
//! list, the unread counts and the stream status. Mutations that need the
//! backend call it first and only touch local state once it succeeds; every
//! read-modify-write runs inside one short lock section that never spans an
//! `.await`. Listeners are notified after the lock is released.

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    api::NotificationApi,
    error::NotifyResult,
    fanout::{Listeners, Subscription},
    notification::{Notification, NotificationId},
    sse::{ConnectionStatus, StreamSink},
};

/// Page size used by [`NotificationStore::refresh`] before any `load`.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Point-in-time copy of the store, handed to change listeners.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Newest first.
    pub notifications: Vec<Notification>,
    /// Unread entries in `notifications`.
    pub unread_count: usize,
    /// Server-side unread total, kept in step with local changes.
    pub total_unread: u64,
    /// Last reported stream status.
    pub status: ConnectionStatus,
}

/// A local change made while a page fetch was in flight.
#[derive(Debug)]
enum Edit {
    Received(Notification),
    Read(NotificationId),
    AllRead,
    Deleted(NotificationId),
}

impl Edit {
    fn apply(&self, notifications: &mut Vec<Notification>) {
        match self {
            Self::Received(notification) => {
                if !notifications.iter().any(|n| n.id == notification.id) {
                    notifications.insert(0, notification.clone());
                }
            }
            Self::Read(id) => {
                if let Some(n) = notifications.iter_mut().find(|n| &n.id == id) {
                    n.read = true;
                }
            }
            Self::AllRead => notifications.iter_mut().for_each(|n| n.read = true),
            Self::Deleted(id) => notifications.retain(|n| &n.id != id),
        }
    }
}

#[derive(Debug)]
struct State {
    notifications: Vec<Notification>,
    total_unread: u64,
    status: ConnectionStatus,
    last_page: (u32, u32),
    version: u64,
    loads_in_flight: usize,
    /// Edits since the oldest in-flight load started; empty when idle.
    journal: Vec<Edit>,
}

impl State {
    fn unread_count(&self) -> usize {
        count_unread(&self.notifications)
    }

    fn position(&self, id: &NotificationId) -> Option<usize> {
        self.notifications.iter().position(|n| &n.id == id)
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            notifications: self.notifications.clone(),
            unread_count: self.unread_count(),
            total_unread: self.total_unread,
            status: self.status,
        }
    }

    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn record(&mut self, edit: impl FnOnce() -> Edit) {
        if self.loads_in_flight > 0 {
            self.journal.push(edit());
        }
    }
}

fn count_unread(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}

/// Keeps the journal alive for one load, including a cancelled one.
struct LoadGuard<'a>(&'a Mutex<State>);

impl LoadGuard<'_> {
    /// Register a load and return where its journal window starts.
    fn start(state: &Mutex<State>, page: (u32, u32)) -> (LoadGuard<'_>, usize) {
        let mut locked = state.lock();
        locked.last_page = page;
        locked.loads_in_flight += 1;
        (LoadGuard(state), locked.journal.len())
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        state.loads_in_flight = state.loads_in_flight.saturating_sub(1);
        if state.loads_in_flight == 0 {
            state.journal.clear();
        }
    }
}

/// Session-wide notification state plus its subscriber fan-out.
pub struct NotificationStore {
    api: Arc<dyn NotificationApi>,
    state: Mutex<State>,
    emitted: AtomicU64,
    status_listeners: Listeners<ConnectionStatus>,
    notification_listeners: Listeners<Notification>,
    change_listeners: Listeners<StoreSnapshot>,
}

impl NotificationStore {
    /// Create an empty store backed by `api`.
    pub fn new(api: Arc<dyn NotificationApi>) -> Self {
        Self {
            api,
            state: Mutex::new(State {
                notifications: Vec::new(),
                total_unread: 0,
                status: ConnectionStatus::Disconnected,
                last_page: (0, DEFAULT_PAGE_SIZE),
                version: 0,
                loads_in_flight: 0,
                journal: Vec::new(),
            }),
            emitted: AtomicU64::new(0),
            status_listeners: Listeners::new(),
            notification_listeners: Listeners::new(),
            change_listeners: Listeners::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Backend-synchronised operations
    // -----------------------------------------------------------------------

    /// Replace the collection with page `offset` of `size` entries and seed
    /// the server unread total.
    ///
    /// Safe to call repeatedly. On failure the previous state is kept.
    /// Receives, reads and deletes that land while the page is in flight are
    /// replayed on top of it, so they survive the replacement.
    ///
    /// # Errors
    ///
    /// Returns the first backend error.
    pub async fn load(&self, offset: u32, size: u32) -> NotifyResult<()> {
        let (_guard, since) = LoadGuard::start(&self.state, (offset, size));

        let (page, unread) =
            match tokio::try_join!(self.api.fetch_page(offset, size), self.api.unread_count()) {
                Ok(fetched) => fetched,
                Err(e) => {
                    error!(offset, size, error = %e, "Failed to load notifications");
                    return Err(e);
                }
            };

        let mut seen = HashSet::with_capacity(page.items.len());
        let mut notifications: Vec<_> = page
            .items
            .into_iter()
            .filter(|n| seen.insert(n.id.clone()))
            .collect();

        let (version, snapshot) = {
            let mut state = self.state.lock();
            let edits = &state.journal[since..];
            if !edits.is_empty() {
                debug!(replayed = edits.len(), "Replaying edits made during load");
            }
            let before = count_unread(&notifications) as u64;
            edits.iter().for_each(|edit| edit.apply(&mut notifications));
            let after = count_unread(&notifications) as u64;
            // The server count was requested when the load started.
            let unread = if edits.iter().any(|edit| matches!(edit, Edit::AllRead)) {
                0
            } else {
                unread.saturating_add(after).saturating_sub(before)
            };
            state.notifications = notifications;
            state.total_unread = unread.max(state.unread_count() as u64);
            (state.bump(), state.snapshot())
        };
        info!(
            loaded = snapshot.notifications.len(),
            total_unread = snapshot.total_unread,
            "Notifications loaded"
        );
        self.publish(version, snapshot);
        Ok(())
    }

    /// Re-run the last [`load`](Self::load), or the first page if none ran.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub async fn refresh(&self) -> NotifyResult<()> {
        let (offset, size) = self.state.lock().last_page;
        self.load(offset, size).await
    }

    /// Mark `id` as read on the backend, then locally.
    ///
    /// # Errors
    ///
    /// Returns the backend error; local state is untouched in that case.
    pub async fn mark_as_read(&self, id: &NotificationId) -> NotifyResult<()> {
        if let Err(e) = self.api.mark_read(id).await {
            warn!(%id, error = %e, "Failed to mark notification as read");
            return Err(e);
        }

        self.mutate(|state| {
            state.record(|| Edit::Read(id.clone()));
            let Some(index) = state.position(id) else {
                return false;
            };
            let entry = &mut state.notifications[index];
            if entry.read {
                return false;
            }
            entry.read = true;
            state.total_unread = state.total_unread.saturating_sub(1);
            true
        });
        Ok(())
    }

    /// Mark everything as read on the backend, then locally.
    ///
    /// # Errors
    ///
    /// Returns the backend error; local state is untouched in that case.
    pub async fn mark_all_as_read(&self) -> NotifyResult<()> {
        if let Err(e) = self.api.mark_all_read().await {
            warn!(error = %e, "Failed to mark all notifications as read");
            return Err(e);
        }

        self.mutate(|state| {
            state.record(|| Edit::AllRead);
            let changed = state.total_unread > 0 || state.notifications.iter().any(|n| !n.read);
            state.notifications.iter_mut().for_each(|n| n.read = true);
            state.total_unread = 0;
            changed
        });
        Ok(())
    }

    /// Delete `id` on the backend, then locally.
    ///
    /// # Errors
    ///
    /// Returns the backend error; local state is untouched in that case.
    pub async fn delete_notification(&self, id: &NotificationId) -> NotifyResult<()> {
        if let Err(e) = self.api.delete(id).await {
            warn!(%id, error = %e, "Failed to delete notification");
            return Err(e);
        }

        self.mutate(|state| {
            state.record(|| Edit::Deleted(id.clone()));
            let Some(index) = state.position(id) else {
                return false;
            };
            let removed = state.notifications.remove(index);
            if !removed.read {
                state.total_unread = state.total_unread.saturating_sub(1);
            }
            true
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Stream input
    // -----------------------------------------------------------------------

    /// Prepend a streamed notification unless its id is already present.
    ///
    /// Returns whether it was inserted.
    pub fn receive(&self, notification: Notification) -> bool {
        let id = notification.id.clone();
        let inserted = self.mutate(move |state| {
            if state.position(&notification.id).is_some() {
                return false;
            }
            if !notification.read {
                state.total_unread = state.total_unread.saturating_add(1);
            }
            state.record(|| Edit::Received(notification.clone()));
            state.notifications.insert(0, notification);
            true
        });
        if !inserted {
            debug!(%id, "Duplicate notification ignored");
        }
        inserted
    }

    fn set_status(&self, status: ConnectionStatus) {
        let changed = self.mutate(|state| {
            if state.status == status {
                return false;
            }
            state.status = status;
            true
        });
        if changed {
            self.status_listeners.emit(&status);
        }
    }

    // -----------------------------------------------------------------------
    // Readers
    // -----------------------------------------------------------------------

    /// Copy of the whole state.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.lock().snapshot()
    }

    /// Notifications, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().notifications.clone()
    }

    /// Unread entries in the local collection.
    pub fn unread_count(&self) -> usize {
        self.state.lock().unread_count()
    }

    /// Server-side unread total.
    pub fn total_unread(&self) -> u64 {
        self.state.lock().total_unread
    }

    /// Last reported stream status.
    pub fn status(&self) -> ConnectionStatus {
        self.state.lock().status
    }

    /// Look up one notification by id.
    pub fn get(&self, id: &NotificationId) -> Option<Notification> {
        let state = self.state.lock();
        state.position(id).map(|i| state.notifications[i].clone())
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Observe stream status transitions.
    #[must_use = "dropping the subscription unregisters the callback"]
    pub fn on_status_change(
        &self,
        callback: impl Fn(&ConnectionStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.status_listeners.add(callback)
    }

    /// Observe every notification decoded from the stream, duplicates
    /// included.
    #[must_use = "dropping the subscription unregisters the callback"]
    pub fn on_notification(
        &self,
        callback: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> Subscription {
        self.notification_listeners.add(callback)
    }

    /// Observe the full state after each change.
    #[must_use = "dropping the subscription unregisters the callback"]
    pub fn on_change(
        &self,
        callback: impl Fn(&StoreSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.change_listeners.add(callback)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Apply `f` under the lock; publish a snapshot if it reports a change.
    fn mutate(&self, f: impl FnOnce(&mut State) -> bool) -> bool {
        let published = {
            let mut state = self.state.lock();
            if f(&mut state) {
                Some((state.bump(), state.snapshot()))
            } else {
                None
            }
        };
        match published {
            Some((version, snapshot)) => {
                self.publish(version, snapshot);
                true
            }
            None => false,
        }
    }

    /// Emit `snapshot` unless a newer one already went out.
    fn publish(&self, version: u64, snapshot: StoreSnapshot) {
        if self.emitted.fetch_max(version, Ordering::AcqRel) < version {
            self.change_listeners.emit(&snapshot);
        }
    }
}

impl StreamSink for NotificationStore {
    fn on_status(&self, status: ConnectionStatus) {
        self.set_status(status);
    }

    fn on_notification(&self, notification: Notification) {
        self.notification_listeners.emit(&notification);
        self.receive(notification);
    }
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("NotificationStore")
            .field("notifications", &state.notifications.len())
            .field("unread_count", &state.unread_count())
            .field("total_unread", &state.total_unread)
            .field("status", &state.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::AtomicUsize, time::Duration};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        api::NotificationPage,
        error::NotifyError,
        notification::NotificationKind,
    };

    #[derive(Default)]
    struct MockApi {
        page: Mutex<Vec<Notification>>,
        unread: Mutex<u64>,
        fail: Mutex<bool>,
        calls: Mutex<Vec<String>>,
        page_delay: Mutex<Option<Duration>>,
    }

    impl MockApi {
        fn with_page(items: Vec<Notification>, unread: u64) -> Arc<Self> {
            let api = Self::default();
            *api.page.lock() = items;
            *api.unread.lock() = unread;
            Arc::new(api)
        }

        fn delay_page(&self, delay: Duration) {
            *self.page_delay.lock() = Some(delay);
        }

        fn fail(&self, fail: bool) {
            *self.fail.lock() = fail;
        }

        fn record(&self, call: String) -> NotifyResult<()> {
            self.calls.lock().push(call);
            if *self.fail.lock() {
                Err(NotifyError::api(
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    "boom",
                ))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl NotificationApi for MockApi {
        async fn fetch_page(&self, offset: u32, size: u32) -> NotifyResult<NotificationPage> {
            self.record(format!("page {offset} {size}"))?;
            let items = self.page.lock().clone();
            let delay = *self.page_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(NotificationPage { items, total: None })
        }

        async fn unread_count(&self) -> NotifyResult<u64> {
            self.record("count".to_string())?;
            Ok(*self.unread.lock())
        }

        async fn mark_read(&self, id: &NotificationId) -> NotifyResult<()> {
            self.record(format!("read {id}"))
        }

        async fn mark_all_read(&self) -> NotifyResult<()> {
            self.record("read-all".to_string())
        }

        async fn delete(&self, id: &NotificationId) -> NotifyResult<()> {
            self.record(format!("delete {id}"))
        }
    }

    fn note(id: &str, read: bool) -> Notification {
        Notification::new(id, format!("title {id}"), "", NotificationKind::System).read(read)
    }

    fn assert_invariant(store: &NotificationStore) {
        let snapshot = store.snapshot();
        let derived = snapshot.notifications.iter().filter(|n| !n.read).count();
        assert_eq!(snapshot.unread_count, derived);
        let ids: HashSet<_> = snapshot.notifications.iter().map(|n| &n.id).collect();
        assert_eq!(ids.len(), snapshot.notifications.len(), "ids must be unique");
    }

    #[tokio::test]
    async fn test_load_replaces_and_dedups_page() {
        let api = MockApi::with_page(
            vec![note("1", false), note("2", true), note("1", true)],
            7,
        );
        let store = NotificationStore::new(api.clone());
        store.receive(note("stale", false));

        store.load(0, 20).await.expect("load");

        let ids: Vec<_> = store
            .notifications()
            .into_iter()
            .map(|n| n.id.to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(!store.get(&"1".into()).expect("present").read);
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.total_unread(), 7);
        assert_invariant(&store);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_state() {
        let api = MockApi::with_page(vec![note("1", false)], 1);
        let store = NotificationStore::new(api.clone());
        store.load(0, 20).await.expect("load");

        api.fail(true);
        assert!(store.load(1, 20).await.is_err());

        assert_eq!(store.notifications().len(), 1);
        assert_eq!(store.total_unread(), 1);
    }

    #[tokio::test]
    async fn test_refresh_reuses_last_page() {
        let api = MockApi::with_page(Vec::new(), 0);
        let store = NotificationStore::new(api.clone());

        store.refresh().await.expect("refresh");
        store.load(2, 5).await.expect("load");
        store.refresh().await.expect("refresh");

        let pages: Vec<_> = api
            .calls
            .lock()
            .iter()
            .filter(|c| c.starts_with("page"))
            .cloned()
            .collect();
        assert_eq!(pages, vec!["page 0 20", "page 2 5", "page 2 5"]);
    }

    fn ids(store: &NotificationStore) -> Vec<String> {
        store
            .notifications()
            .into_iter()
            .map(|n| n.id.to_string())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_during_load_survive() {
        let api = MockApi::with_page(vec![note("1", false), note("2", false)], 2);
        let store = NotificationStore::new(api.clone());
        store.load(0, 20).await.expect("load");
        api.delay_page(Duration::from_millis(100));

        let edits = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            store.mark_as_read(&"1".into()).await.expect("mark");
            store.receive(note("live", false));
            store.delete_notification(&"2".into()).await.expect("delete");
        };
        let (refreshed, ()) = tokio::join!(store.refresh(), edits);
        refreshed.expect("refresh");

        assert_eq!(ids(&store), vec!["live", "1"]);
        assert!(store.get(&"1".into()).expect("present").read);
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.total_unread(), 1);
        assert!(store.state.lock().journal.is_empty());
        assert_invariant(&store);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_all_during_load_survives() {
        let api = MockApi::with_page(vec![note("1", false), note("2", false)], 5);
        let store = NotificationStore::new(api.clone());
        api.delay_page(Duration::from_millis(100));

        let edits = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            store.mark_all_as_read().await.expect("mark all");
            store.receive(note("live", false));
        };
        let (loaded, ()) = tokio::join!(store.load(0, 20), edits);
        loaded.expect("load");

        assert_eq!(ids(&store), vec!["live", "1", "2"]);
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.total_unread(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_load_releases_journal() {
        let api = MockApi::with_page(vec![note("1", false)], 1);
        let store = NotificationStore::new(api.clone());
        api.delay_page(Duration::from_secs(1));

        let cancelled = tokio::time::timeout(Duration::from_millis(50), store.load(0, 20)).await;
        assert!(cancelled.is_err());

        store.receive(note("live", false));
        assert!(store.state.lock().journal.is_empty());
        assert_eq!(store.state.lock().loads_in_flight, 0);
        assert_eq!(ids(&store), vec!["live"]);
    }

    #[test]
    fn test_receive_prepends_and_dedups() {
        let store = NotificationStore::new(MockApi::with_page(Vec::new(), 0));

        assert!(store.receive(note("1", false)));
        assert!(store.receive(note("2", false)));
        assert!(!store.receive(note("1", false)));

        let ids: Vec<_> = store
            .notifications()
            .into_iter()
            .map(|n| n.id.to_string())
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(store.unread_count(), 2);
        assert_eq!(store.total_unread(), 2);
        assert_invariant(&store);
    }

    #[tokio::test]
    async fn test_mark_as_read() {
        let api = MockApi::with_page(vec![note("1", false), note("2", false)], 2);
        let store = NotificationStore::new(api.clone());
        store.load(0, 20).await.expect("load");

        store.mark_as_read(&"1".into()).await.expect("mark");
        assert!(store.get(&"1".into()).expect("present").read);
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.total_unread(), 1);

        // Already read: count does not move again.
        store.mark_as_read(&"1".into()).await.expect("mark");
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.total_unread(), 1);
        assert_invariant(&store);
    }

    #[tokio::test]
    async fn test_mark_all_as_read() {
        let api = MockApi::with_page(
            vec![note("1", false), note("2", false), note("3", false)],
            3,
        );
        let store = NotificationStore::new(api.clone());
        store.load(0, 20).await.expect("load");
        assert_eq!(store.unread_count(), 3);

        store.mark_all_as_read().await.expect("mark all");

        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.total_unread(), 0);
        assert!(store.notifications().iter().all(|n| n.read));
    }

    #[tokio::test]
    async fn test_delete_unread_notification() {
        let api = MockApi::with_page(vec![note("5", false), note("6", true)], 1);
        let store = NotificationStore::new(api.clone());
        store.load(0, 20).await.expect("load");

        store.delete_notification(&"5".into()).await.expect("delete");

        assert!(store.get(&"5".into()).is_none());
        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.total_unread(), 0);

        store.delete_notification(&"6".into()).await.expect("delete");
        assert!(store.notifications().is_empty());
        assert_eq!(store.total_unread(), 0);
    }

    #[tokio::test]
    async fn test_failed_mutations_leave_state_untouched() {
        let api = MockApi::with_page(vec![note("1", false), note("2", false)], 2);
        let store = NotificationStore::new(api.clone());
        store.load(0, 20).await.expect("load");
        let before = store.snapshot();

        api.fail(true);
        let err = store.mark_as_read(&"1".into()).await.expect_err("fails");
        assert!(matches!(err, NotifyError::Api { .. }));
        assert!(store.mark_all_as_read().await.is_err());
        assert!(store.delete_notification(&"2".into()).await.is_err());

        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_change_listeners() {
        let store = NotificationStore::new(MockApi::with_page(vec![note("1", false)], 1));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let sub = store.on_change(move |s| sink.lock().push(s.unread_count));

        store.load(0, 20).await.expect("load");
        store.receive(note("2", false));
        store.receive(note("2", false));
        store.mark_all_as_read().await.expect("mark all");

        assert_eq!(*seen.lock(), vec![1, 2, 0]);

        sub.unsubscribe();
        store.receive(note("3", false));
        assert_eq!(seen.lock().len(), 3);
    }

    #[test]
    fn test_stream_sink_fans_out() {
        let store = NotificationStore::new(MockApi::with_page(Vec::new(), 0));
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let raw = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&statuses);
        let _status = store.on_status_change(move |status| s.lock().push(*status));
        let r = Arc::clone(&raw);
        let _raw = store.on_notification(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        });

        store.on_status(ConnectionStatus::Connecting);
        store.on_status(ConnectionStatus::Connecting);
        store.on_status(ConnectionStatus::Connected);
        StreamSink::on_notification(&store, note("1", false));
        StreamSink::on_notification(&store, note("1", false));

        assert_eq!(
            *statuses.lock(),
            vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
        );
        assert_eq!(store.status(), ConnectionStatus::Connected);
        assert_eq!(raw.load(Ordering::SeqCst), 2);
        assert_eq!(store.notifications().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_keep_invariant() {
        let initial: Vec<_> = (0..50).map(|i| note(&format!("p{i}"), false)).collect();
        let api = MockApi::with_page(initial, 50);
        let store = Arc::new(NotificationStore::new(api.clone()));
        store.load(0, 50).await.expect("load");

        let mut tasks = Vec::new();
        for i in 0..50 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                match i % 3 {
                    0 => store.mark_as_read(&format!("p{i}").into()).await,
                    1 => store.delete_notification(&format!("p{i}").into()).await,
                    _ => {
                        store.receive(note(&format!("s{i}"), false));
                        Ok(())
                    }
                }
            }));
        }
        for task in tasks {
            task.await.expect("join").expect("mutation");
        }

        assert_invariant(&store);
        let snapshot = store.snapshot();
        // 17 read, 17 deleted, 16 untouched unread + 16 streamed.
        assert_eq!(snapshot.notifications.len(), 50 - 17 + 16);
        assert_eq!(snapshot.unread_count, 16 + 16);
        assert_eq!(snapshot.total_unread, 32);
    }
}
