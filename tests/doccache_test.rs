//! Document blob cache behaviour: hits, eviction, TTL expiry.

use std::time::Duration;

use hermod::{DocumentCache, DocumentCacheConfig, DocumentKind};

#[tokio::test]
async fn insert_then_get_hits() {
    let cache = DocumentCache::new(&DocumentCacheConfig::new());
    cache
        .insert(DocumentKind::QuotePdf, 7, b"%PDF quote".to_vec())
        .await;

    let blob = cache.get(DocumentKind::QuotePdf, 7).await.expect("hit");
    assert_eq!(blob.as_slice(), b"%PDF quote");
}

#[tokio::test]
async fn kinds_do_not_collide() {
    let cache = DocumentCache::new(&DocumentCacheConfig::new());
    cache
        .insert(DocumentKind::QuotePdf, 7, b"quote".to_vec())
        .await;

    assert!(cache.get(DocumentKind::DeliveryNote, 7).await.is_none());
}

#[tokio::test]
async fn evict_drops_one_document() {
    let cache = DocumentCache::new(&DocumentCacheConfig::new());
    cache
        .insert(DocumentKind::QuotePdf, 7, b"seven".to_vec())
        .await;
    cache
        .insert(DocumentKind::QuotePdf, 8, b"eight".to_vec())
        .await;

    cache.evict(DocumentKind::QuotePdf, 7).await;

    assert!(cache.get(DocumentKind::QuotePdf, 7).await.is_none());
    assert!(cache.get(DocumentKind::QuotePdf, 8).await.is_some());
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let cache = DocumentCache::new(
        &DocumentCacheConfig::new()
            .max_entries(8)
            .ttl(Duration::from_millis(40)),
    );
    cache
        .insert(DocumentKind::DeliveryNote, 3, b"note".to_vec())
        .await;
    assert!(cache.get(DocumentKind::DeliveryNote, 3).await.is_some());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.get(DocumentKind::DeliveryNote, 3).await.is_none());
}

#[tokio::test]
async fn clear_empties_the_cache() {
    let cache = DocumentCache::new(&DocumentCacheConfig::new());
    cache
        .insert(DocumentKind::QuotePdf, 1, b"one".to_vec())
        .await;
    cache
        .insert(DocumentKind::DeliveryNote, 2, b"two".to_vec())
        .await;

    cache.clear().await;

    assert!(cache.get(DocumentKind::QuotePdf, 1).await.is_none());
    assert!(cache.get(DocumentKind::DeliveryNote, 2).await.is_none());
}
