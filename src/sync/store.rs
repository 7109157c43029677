//! The query store: keyed cache entries, subscriptions and refetching.
//!
//! Every read dependency in the application is a [`QueryKey`] plus a
//! fetch closure, registered via [`QueryStore::watch`]. The store keeps
//! one entry per key holding `{status, data, error, last_fetched_at}`
//! and guarantees:
//!
//! - **De-duplication** — any number of simultaneous subscribers to one
//!   key share a single outstanding fetch.
//! - **Stale-while-revalidate** — snapshots return the previous data
//!   immediately while a refetch runs in the background.
//! - **Invalidation** — [`QueryStore::invalidate`] marks an entry stale
//!   and refetches at once when it has subscribers, or defers the
//!   refetch to the next subscription when it has none.
//! - **Last-write-wins** — when two fetches for one key race (a manual
//!   refetch against a background one), whichever resolves last is
//!   authoritative. All reads are idempotent, so no stronger ordering
//!   is provided.
//! - **Error retention** — a failed fetch flips the status to `Error`
//!   but keeps the previous data, so callers can show last-known-good
//!   values next to the error flag.
//!
//! Entries are garbage-collected a grace period after their last
//! subscriber is dropped. The store itself is a cheaply cloneable
//! context object; construct one per application (or per test) and pass
//! it where it is needed.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use futures_util::stream::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use super::key::QueryKey;
use crate::error::{HermodError, Result};
use crate::telemetry;

/// How long an unsubscribed entry survives before collection.
pub const DEFAULT_GC_GRACE: Duration = Duration::from_secs(30);

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Pending,
    Success,
    Error,
}

type ErasedData = Arc<dyn Any + Send + Sync>;
type ErasedFetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<ErasedData>> + Send + Sync>;

/// Per-subscription freshness options.
///
/// The default is the invalidation-driven policy: cached data stays
/// fresh until something invalidates it. A `stale_after` window makes a
/// new subscription refetch data older than the window; `poll_interval`
/// refetches on a timer for as long as the handle lives.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Treat cached data older than this as stale on subscription.
    pub stale_after: Option<Duration>,
    /// Background refetch cadence while the handle is alive.
    pub poll_interval: Option<Duration>,
}

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stale_after(mut self, window: Duration) -> Self {
        self.stale_after = Some(window);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }
}

/// A typed view of one entry at one moment.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<Arc<HermodError>>,
    pub last_fetched_at: Option<Instant>,
    /// Whether at least one fetch is currently outstanding.
    pub is_fetching: bool,
}

impl<T> QuerySnapshot<T> {
    /// True only on the initial load: pending with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.data.is_none()
    }
}

struct EntryState {
    status: QueryStatus,
    data: Option<ErasedData>,
    error: Option<Arc<HermodError>>,
    last_fetched_at: Option<Instant>,
    stale: bool,
    in_flight: usize,
    subscribers: usize,
    released_at: Option<Instant>,
    fetcher: Option<ErasedFetcher>,
}

struct Entry {
    state: Mutex<EntryState>,
    /// Bumped on every state change to wake subscribers.
    version: watch::Sender<u64>,
}

impl Entry {
    fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: Mutex::new(EntryState {
                status: QueryStatus::Pending,
                data: None,
                error: None,
                last_fetched_at: None,
                stale: false,
                in_flight: 0,
                subscribers: 0,
                released_at: None,
                fetcher: None,
            }),
            version,
        }
    }

    fn touch(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

struct StoreInner {
    entries: Mutex<HashMap<QueryKey, Arc<Entry>>>,
    gc_grace: Duration,
}

/// Process-wide keyed store of query entries. Clones share state.
#[derive(Clone)]
pub struct QueryStore {
    inner: Arc<StoreInner>,
}

impl QueryStore {
    pub fn new() -> Self {
        Self::with_gc_grace(DEFAULT_GC_GRACE)
    }

    /// Override the grace period between last unsubscribe and entry
    /// collection.
    pub fn with_gc_grace(gc_grace: Duration) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                entries: Mutex::new(HashMap::new()),
                gc_grace,
            }),
        }
    }

    /// Subscribe to `key`, fetching with `fetch` when the entry has no
    /// fresh data. Returns a typed RAII handle; dropping the last handle
    /// for a key schedules the entry for collection.
    ///
    /// The fetch closure is stored so later invalidations can refetch
    /// without a live call site; the most recently registered closure
    /// wins.
    pub fn watch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> QueryHandle<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.watch_with(key, fetch, WatchOptions::default())
    }

    /// [`watch`](Self::watch) with explicit freshness options.
    pub fn watch_with<T, F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
        options: WatchOptions,
    ) -> QueryHandle<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fetcher: ErasedFetcher = Arc::new(move || {
            let fut = fetch();
            Box::pin(async move { fut.await.map(|data| Arc::new(data) as ErasedData) })
        });

        let entry = self.entry(&key);
        let start = {
            let mut state = entry.state.lock().expect("entry lock");
            state.subscribers += 1;
            state.released_at = None;
            state.fetcher = Some(fetcher);

            let expired = match (options.stale_after, state.last_fetched_at) {
                (Some(window), Some(at)) => at.elapsed() >= window,
                (Some(_), None) => true,
                (None, _) => false,
            };
            let fresh = state.data.is_some() && !state.stale && !expired;
            let cache = if fresh { "hit" } else { "miss" };
            if fresh {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "cache" => "query").increment(1);
            } else {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "cache" => "query").increment(1);
            }
            debug!(%key, cache, subscribers = state.subscribers, "query subscribed");

            !fresh && state.in_flight == 0
        };
        if start {
            Self::spawn_fetch(&key, &entry, "subscribe");
        }

        let poller = options.poll_interval.map(|interval| {
            let store = self.clone();
            let key = key.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    store.refetch(&key);
                }
            })
        });

        QueryHandle {
            key,
            store: self.clone(),
            version: entry.version.subscribe(),
            entry,
            poller,
            _marker: PhantomData,
        }
    }

    /// Mark `key` stale. With subscribers present, exactly one refetch
    /// starts immediately; without, the refetch happens on the next
    /// subscription.
    pub fn invalidate(&self, key: &QueryKey) {
        let Some(entry) = self.get(key) else {
            return;
        };
        let refetch = {
            let mut state = entry.state.lock().expect("entry lock");
            state.stale = true;
            state.subscribers > 0 && state.fetcher.is_some()
        };
        debug!(%key, refetch, "query invalidated");
        if refetch {
            Self::spawn_fetch(key, &entry, "invalidate");
        } else {
            entry.touch();
        }
    }

    /// Invalidate every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) {
        let matching: Vec<QueryKey> = {
            let entries = self.inner.entries.lock().expect("entries lock");
            entries
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect()
        };
        for key in matching {
            self.invalidate(&key);
        }
    }

    /// Force a fetch for `key` now, even if one is already in flight
    /// (last-write-wins resolves the race). No-op for unknown keys or
    /// entries without a registered fetcher.
    pub fn refetch(&self, key: &QueryKey) {
        let Some(entry) = self.get(key) else {
            return;
        };
        Self::spawn_fetch(key, &entry, "refetch");
    }

    /// Write data straight into the cache, bypassing the network. The
    /// optimistic-write escape hatch: `update` receives the current
    /// value (if any, and of matching type) and returns the new one.
    pub fn set_data<T, F>(&self, key: &QueryKey, update: F)
    where
        T: Send + Sync + 'static,
        F: FnOnce(Option<Arc<T>>) -> T,
    {
        let entry = self.entry(key);
        {
            let mut state = entry.state.lock().expect("entry lock");
            let current = state
                .data
                .as_ref()
                .and_then(|d| Arc::clone(d).downcast::<T>().ok());
            if state.data.is_some() && current.is_none() {
                warn!(%key, "set_data type mismatch; treating as empty");
            }
            state.data = Some(Arc::new(update(current)) as ErasedData);
            state.status = QueryStatus::Success;
            state.error = None;
            state.stale = false;
            state.last_fetched_at = Some(Instant::now());
        }
        debug!(%key, "cache written directly");
        entry.touch();
    }

    /// Non-subscribing peek at an entry.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QuerySnapshot<T>> {
        let entry = self.get(key)?;
        let state = entry.state.lock().expect("entry lock");
        Some(typed_snapshot(key, &state))
    }

    /// Number of live entries (subscribed or awaiting collection).
    pub fn entry_count(&self) -> usize {
        self.inner.entries.lock().expect("entries lock").len()
    }

    fn entry(&self, key: &QueryKey) -> Arc<Entry> {
        let mut entries = self.inner.entries.lock().expect("entries lock");
        Arc::clone(
            entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Entry::new())),
        )
    }

    fn get(&self, key: &QueryKey) -> Option<Arc<Entry>> {
        self.inner
            .entries
            .lock()
            .expect("entries lock")
            .get(key)
            .cloned()
    }

    fn spawn_fetch(key: &QueryKey, entry: &Arc<Entry>, trigger: &'static str) {
        let fetcher = {
            let mut state = entry.state.lock().expect("entry lock");
            let Some(fetcher) = state.fetcher.clone() else {
                return;
            };
            state.in_flight += 1;
            state.status = QueryStatus::Pending;
            fetcher
        };
        metrics::counter!(telemetry::QUERY_FETCHES_TOTAL, "trigger" => trigger).increment(1);
        debug!(%key, trigger, "fetch started");
        entry.touch();

        let key = key.clone();
        let entry = Arc::clone(entry);
        tokio::spawn(async move {
            let result = fetcher().await;
            {
                let mut state = entry.state.lock().expect("entry lock");
                state.in_flight -= 1;
                match result {
                    Ok(data) => {
                        state.data = Some(data);
                        state.status = QueryStatus::Success;
                        state.error = None;
                        state.stale = false;
                        state.last_fetched_at = Some(Instant::now());
                    }
                    Err(e) => {
                        // Previous data is kept for last-known-good display.
                        warn!(%key, error = %e, "fetch failed");
                        state.status = QueryStatus::Error;
                        state.error = Some(Arc::new(e));
                        state.stale = true;
                    }
                }
            }
            entry.touch();
        });
    }

    fn release(&self, key: &QueryKey) {
        let Some(entry) = self.get(key) else {
            return;
        };
        let schedule_gc = {
            let mut state = entry.state.lock().expect("entry lock");
            state.subscribers = state.subscribers.saturating_sub(1);
            if state.subscribers == 0 {
                state.released_at = Some(Instant::now());
                true
            } else {
                false
            }
        };
        if !schedule_gc {
            return;
        }
        // Outside a runtime (e.g. a handle dropped after a test body)
        // the entry just lingers until the store itself is dropped.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = self.clone();
            let key = key.clone();
            let grace = self.inner.gc_grace;
            handle.spawn(async move {
                tokio::time::sleep(grace).await;
                store.sweep(&key);
            });
        }
    }

    fn sweep(&self, key: &QueryKey) {
        let mut entries = self.inner.entries.lock().expect("entries lock");
        let collectable = entries.get(key).is_some_and(|entry| {
            let state = entry.state.lock().expect("entry lock");
            state.subscribers == 0
                && state
                    .released_at
                    .is_some_and(|at| at.elapsed() >= self.inner.gc_grace)
        });
        if collectable {
            entries.remove(key);
            debug!(%key, "query entry collected");
        }
    }
}

impl Default for QueryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn typed_snapshot<T: Send + Sync + 'static>(key: &QueryKey, state: &EntryState) -> QuerySnapshot<T> {
    let data = state
        .data
        .as_ref()
        .and_then(|d| Arc::clone(d).downcast::<T>().ok());
    if state.data.is_some() && data.is_none() {
        warn!(%key, "cache type mismatch on read");
    }
    QuerySnapshot {
        status: state.status,
        data,
        error: state.error.clone(),
        last_fetched_at: state.last_fetched_at,
        is_fetching: state.in_flight > 0,
    }
}

/// RAII subscription to one query key.
///
/// Reads are non-blocking snapshots; `changed()` / `snapshots()` provide
/// change notification. Cloning registers an additional subscription.
pub struct QueryHandle<T> {
    key: QueryKey,
    store: QueryStore,
    entry: Arc<Entry>,
    version: watch::Receiver<u64>,
    /// Background poll task, aborted when the handle drops.
    poller: Option<tokio::task::JoinHandle<()>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> QueryHandle<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current entry state. Stale data is returned as-is; check
    /// `is_fetching` to know whether a revalidation is running.
    pub fn snapshot(&self) -> QuerySnapshot<T> {
        let state = self.entry.state.lock().expect("entry lock");
        typed_snapshot(&self.key, &state)
    }

    /// Shortcut for `snapshot().data`.
    pub fn data(&self) -> Option<Arc<T>> {
        self.snapshot().data
    }

    /// Wait for the next entry change after the last observed one.
    pub async fn changed(&mut self) {
        let _ = self.version.changed().await;
    }

    /// Wait until the entry has settled (not pending), then return it.
    pub async fn ready(&mut self) -> QuerySnapshot<T> {
        loop {
            let snapshot = self.snapshot();
            if snapshot.status != QueryStatus::Pending {
                return snapshot;
            }
            self.changed().await;
        }
    }

    /// Stream of snapshots, one per entry change (latest-value
    /// semantics; intermediate states may be skipped under load).
    pub fn snapshots(&self) -> impl Stream<Item = QuerySnapshot<T>> + Send + use<T> {
        let entry = Arc::clone(&self.entry);
        let key = self.key.clone();
        WatchStream::new(self.entry.version.subscribe()).map(move |_| {
            let state = entry.state.lock().expect("entry lock");
            typed_snapshot(&key, &state)
        })
    }

    /// Force a refetch of this key.
    pub fn refetch(&self) {
        self.store.refetch(&self.key);
    }
}

impl<T> Clone for QueryHandle<T> {
    fn clone(&self) -> Self {
        {
            let mut state = self.entry.state.lock().expect("entry lock");
            state.subscribers += 1;
            state.released_at = None;
        }
        Self {
            key: self.key.clone(),
            store: self.store.clone(),
            entry: Arc::clone(&self.entry),
            version: self.entry.version.subscribe(),
            // Polling belongs to the original registration.
            poller: None,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for QueryHandle<T> {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        self.store.release(&self.key);
    }
}
