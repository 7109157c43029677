//! Mutation runner behaviour: declared invalidations, hooks, the
//! advisory in-flight flag, and the no-retry policy.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hermod::sync::{Mutation, QueryKey, QueryStatus, QueryStore};
use hermod::HermodError;
use tokio_test::assert_ok;

/// In-memory stand-in for the backend: mutations write it, fetches read it.
#[derive(Clone, Default)]
struct FakeServer {
    items: Arc<Mutex<Vec<String>>>,
}

impl FakeServer {
    fn push(&self, item: &str) {
        self.items.lock().unwrap().push(item.to_string());
    }

    fn list(&self) -> Vec<String> {
        self.items.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn successful_mutation_invalidates_and_refetches() {
    let store = QueryStore::new();
    let server = FakeServer::default();
    server.push("first");
    let key = QueryKey::new("clients");
    let fetches = Arc::new(AtomicU32::new(0));

    let fetch_server = server.clone();
    let fetch_count = Arc::clone(&fetches);
    let mut handle = store.watch::<Vec<String>, _, _>(key.clone(), move || {
        let server = fetch_server.clone();
        fetch_count.fetch_add(1, Ordering::SeqCst);
        async move { Ok(server.list()) }
    });
    let snapshot = handle.ready().await;
    assert_eq!(snapshot.data.as_deref(), Some(&vec!["first".to_string()]));

    let mutate_server = server.clone();
    let mutation = Mutation::new(store.clone(), move |name: String| {
        let server = mutate_server.clone();
        async move {
            server.push(&name);
            Ok(name)
        }
    })
    .invalidates(key.clone());

    assert_ok!(mutation.dispatch("second".to_string()).await);

    // Round trip: mutate → invalidate → refetch → consistent view.
    let snapshot = handle.ready().await;
    assert_eq!(snapshot.status, QueryStatus::Success);
    assert_eq!(
        snapshot.data.as_deref(),
        Some(&vec!["first".to_string(), "second".to_string()])
    );
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_mutation_invalidates_nothing() {
    let store = QueryStore::new();
    let key = QueryKey::new("projects");
    let fetches = Arc::new(AtomicU32::new(0));

    let fetch_count = Arc::clone(&fetches);
    let mut handle = store.watch::<u32, _, _>(key.clone(), move || {
        fetch_count.fetch_add(1, Ordering::SeqCst);
        async move { Ok(1) }
    });
    handle.ready().await;

    let errors_seen = Arc::new(AtomicU32::new(0));
    let errors_in_hook = Arc::clone(&errors_seen);
    let mutation = Mutation::new(store.clone(), |_: ()| async {
        Err::<(), _>(HermodError::Api {
            status: 500,
            message: "boom".to_string(),
        })
    })
    .invalidates(key.clone())
    .on_error(move |e| {
        assert!(matches!(e, HermodError::Api { status: 500, .. }));
        errors_in_hook.fetch_add(1, Ordering::SeqCst);
    });

    let result = mutation.dispatch(()).await;
    assert!(result.is_err());
    assert_eq!(errors_seen.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(20)).await;
    // No retry, no invalidation: the single initial fetch stands.
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(handle.snapshot().status, QueryStatus::Success);
}

#[tokio::test]
async fn in_flight_flag_tracks_dispatch() {
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let slow = Mutation::new(
        QueryStore::new(),
        move |rx: tokio::sync::oneshot::Receiver<()>| async move {
            rx.await
                .map_err(|_| HermodError::InvalidInput("dropped".into()))?;
            Ok(())
        },
    );

    assert!(!slow.is_in_flight());
    // Clones share the flag: they are the same logical action.
    let dispatcher = slow.clone();
    let task = tokio::spawn(async move { dispatcher.dispatch(release_rx).await });

    // Give the dispatch a chance to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(slow.is_in_flight(), "flag set while the operation runs");

    release_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
    assert!(!slow.is_in_flight(), "flag cleared after completion");
}

#[tokio::test]
async fn on_success_hook_runs_before_invalidation_refetch() {
    let store = QueryStore::new();
    let key = QueryKey::new("tracking-lines").with(7);

    // Seed the cache the way a subscribed modal would.
    store.set_data::<Vec<String>, _>(&key, |_| vec!["old line".to_string()]);

    let hook_store = store.clone();
    let hook_key = key.clone();
    let mutation = Mutation::new(store.clone(), |line: String| async move { Ok(line) })
        .on_success(move |updated: &String| {
            let updated = updated.clone();
            hook_store.set_data::<Vec<String>, _>(&hook_key, move |current| {
                let mut lines = current.map(|l| (*l).clone()).unwrap_or_default();
                lines.push(updated);
                lines
            });
        })
        .invalidates(key.clone());

    mutation.dispatch("new line".to_string()).await.unwrap();

    // The optimistic write landed; with no registered fetcher the
    // invalidation has nothing to refetch, so the written value stands.
    let snapshot = store.peek::<Vec<String>>(&key).unwrap();
    assert_eq!(
        snapshot.data.as_deref(),
        Some(&vec!["old line".to_string(), "new line".to_string()])
    );
}

#[tokio::test]
async fn prefix_invalidation_covers_every_month() {
    let store = QueryStore::new();
    let fetches = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for month in [1i64, 2, 3] {
        let fetches = Arc::clone(&fetches);
        let key = QueryKey::new("general-expenses").with(2024i64).with(month);
        handles.push(store.watch::<u32, _, _>(key, move || {
            let fetches = Arc::clone(&fetches);
            async move { Ok(fetches.fetch_add(1, Ordering::SeqCst)) }
        }));
    }
    for handle in &mut handles {
        handle.ready().await;
    }
    assert_eq!(fetches.load(Ordering::SeqCst), 3);

    let mutation = Mutation::new(store.clone(), |_: ()| async { Ok(()) })
        .invalidates_prefix(QueryKey::new("general-expenses"));
    mutation.dispatch(()).await.unwrap();

    for handle in &mut handles {
        handle.ready().await;
    }
    assert_eq!(fetches.load(Ordering::SeqCst), 6);
}
