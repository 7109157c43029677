//! The mutation runner: writes plus their declared invalidation sets.
//!
//! A [`Mutation`] pairs an async write operation with the cache keys
//! that become stale when it succeeds. The dependency graph is declared
//! by hand at each call site — creating a leave record, for example,
//! invalidates both the single salary period and the period list,
//! because the salary recomputation happens server-side and is only
//! visible through a refetch.
//!
//! Mutations are never retried automatically; the only retry in the
//! system is the single 401 refresh cycle inside the HTTP adapter. The
//! in-flight flag is advisory, mirroring the original's disabled submit
//! button: it lets callers suppress duplicate submissions but enforces
//! nothing.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::store::QueryStore;
use crate::error::{HermodError, Result};
use crate::telemetry;

type RunFn<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O>> + Send + Sync>;

/// A write operation with declared cache invalidations.
pub struct Mutation<I, O> {
    store: QueryStore,
    run: RunFn<I, O>,
    invalidate_keys: Vec<QueryKey>,
    invalidate_prefixes: Vec<QueryKey>,
    on_success: Option<Arc<dyn Fn(&O) + Send + Sync>>,
    on_error: Option<Arc<dyn Fn(&HermodError) + Send + Sync>>,
    in_flight: Arc<AtomicBool>,
}

impl<I, O> Mutation<I, O> {
    pub fn new<F, Fut>(store: QueryStore, run: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Self {
            store,
            run: Arc::new(move |input| Box::pin(run(input))),
            invalidate_keys: Vec::new(),
            invalidate_prefixes: Vec::new(),
            on_success: None,
            on_error: None,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Declare a key to invalidate on success.
    pub fn invalidates(mut self, key: QueryKey) -> Self {
        self.invalidate_keys.push(key);
        self
    }

    /// Declare a key prefix to invalidate on success (hits every
    /// parameterised variant).
    pub fn invalidates_prefix(mut self, prefix: QueryKey) -> Self {
        self.invalidate_prefixes.push(prefix);
        self
    }

    /// Hook run on success, before the declared invalidations. The
    /// optimistic-write flow uses this to `set_data` the server response
    /// so the refetch never causes a visible jump.
    pub fn on_success<F: Fn(&O) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Hook run on failure, after the error is logged.
    pub fn on_error<F: Fn(&HermodError) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Advisory flag: true while a dispatch is running. Callers use it
    /// to disable submit controls; concurrent dispatches are not
    /// rejected.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run the operation. On success, the `on_success` hook fires and
    /// every declared key is invalidated (refetching immediately where
    /// subscribed). On error, the mapped error is returned unmodified
    /// after the `on_error` hook.
    pub async fn dispatch(&self, input: I) -> Result<O> {
        self.in_flight.store(true, Ordering::SeqCst);
        let result = (self.run)(input).await;
        self.in_flight.store(false, Ordering::SeqCst);

        match result {
            Ok(output) => {
                metrics::counter!(telemetry::MUTATIONS_TOTAL, "status" => "ok").increment(1);
                if let Some(hook) = &self.on_success {
                    hook(&output);
                }
                for key in &self.invalidate_keys {
                    debug!(%key, "mutation invalidates");
                    self.store.invalidate(key);
                }
                for prefix in &self.invalidate_prefixes {
                    debug!(%prefix, "mutation invalidates prefix");
                    self.store.invalidate_prefix(prefix);
                }
                Ok(output)
            }
            Err(e) => {
                metrics::counter!(telemetry::MUTATIONS_TOTAL, "status" => "error").increment(1);
                warn!(error = %e, "mutation failed");
                if let Some(hook) = &self.on_error {
                    hook(&e);
                }
                Err(e)
            }
        }
    }
}

impl<I, O> Clone for Mutation<I, O> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            run: Arc::clone(&self.run),
            invalidate_keys: self.invalidate_keys.clone(),
            invalidate_prefixes: self.invalidate_prefixes.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            // Clones share the flag: they are the same logical action.
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}
