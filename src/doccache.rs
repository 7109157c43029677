//! Opt-in cache for generated document blobs.
//!
//! The PDF endpoints (`/quotes/{id}/pdf/` and delivery-note generation)
//! are deterministic for a given document until it is edited, and the
//! blobs are large enough that refetching on every preview is wasteful. [`DocumentCache`] is a bounded LRU + TTL cache
//! in front of them; it is opt-in via the client builder and costs
//! nothing when absent.
//!
//! Keyed on a content hash of (kind, document id). The hash uses
//! `DefaultHasher` (SipHash), deterministic within a process lifetime,
//! which is all an in-memory cache needs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::telemetry;

/// Which generated document a blob belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    QuotePdf,
    DeliveryNote,
}

impl DocumentKind {
    fn label(self) -> &'static str {
        match self {
            DocumentKind::QuotePdf => "quote_pdf",
            DocumentKind::DeliveryNote => "delivery_note",
        }
    }
}

/// Configuration for the document blob cache.
#[derive(Debug, Clone)]
pub struct DocumentCacheConfig {
    /// Maximum number of cached blobs. Default: 64.
    pub max_entries: u64,
    /// Time-to-live for cached blobs. Default: 10 minutes.
    pub ttl: Duration,
}

impl Default for DocumentCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 64,
            ttl: Duration::from_secs(600),
        }
    }
}

impl DocumentCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// In-memory LRU + TTL cache for generated document blobs.
pub struct DocumentCache {
    cache: Cache<u64, Arc<Vec<u8>>>,
}

impl DocumentCache {
    pub fn new(config: &DocumentCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }

    /// Look up a cached blob. Emits cache hit/miss metrics.
    pub async fn get(&self, kind: DocumentKind, id: i64) -> Option<Arc<Vec<u8>>> {
        match self.cache.get(&blob_key(kind, id)).await {
            Some(blob) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "cache" => "document").increment(1);
                Some(blob)
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "cache" => "document")
                    .increment(1);
                None
            }
        }
    }

    /// Insert (or overwrite) a blob.
    pub async fn insert(&self, kind: DocumentKind, id: i64, blob: Vec<u8>) -> Arc<Vec<u8>> {
        let blob = Arc::new(blob);
        self.cache.insert(blob_key(kind, id), Arc::clone(&blob)).await;
        blob
    }

    /// Drop the cached blob for one document (after it was edited).
    pub async fn evict(&self, kind: DocumentKind, id: i64) {
        self.cache.invalidate(&blob_key(kind, id)).await;
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
    }
}

fn blob_key(kind: DocumentKind, id: i64) -> u64 {
    let mut hasher = DefaultHasher::new();
    kind.label().hash(&mut hasher);
    id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_key_deterministic() {
        assert_eq!(
            blob_key(DocumentKind::QuotePdf, 7),
            blob_key(DocumentKind::QuotePdf, 7)
        );
    }

    #[test]
    fn blob_key_differs_on_kind() {
        assert_ne!(
            blob_key(DocumentKind::QuotePdf, 7),
            blob_key(DocumentKind::DeliveryNote, 7)
        );
    }

    #[test]
    fn blob_key_differs_on_id() {
        assert_ne!(
            blob_key(DocumentKind::QuotePdf, 7),
            blob_key(DocumentKind::QuotePdf, 8)
        );
    }
}
