//! Delivery-note tracking: tracked quotes, their editable line sets,
//! and the generated delivery-note PDF.
//!
//! Line edits are the one place the cache is written directly: the
//! modal re-renders from the updated line immediately (no visible jump
//! back to the stale value) while the invalidation-triggered refetch
//! confirms the server state. Edited and added line ids are persisted
//! as highlight state so the document view can mark them after a
//! reload.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::doccache::{DocumentCache, DocumentKind};
use crate::error::Result;
use crate::finance::PricedLine;
use crate::highlight::{HighlightSet, HighlightStore};
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const TRACKINGS_PATH: &str = "/quotes/trackings/";
const TRACKING_LINES_PATH: &str = "/quotes/tracking-lines/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteTracking {
    pub id: i64,
    pub quote: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingLine {
    pub id: i64,
    pub tracking: i64,
    pub designation: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_excl_tax: f64,
}

impl PricedLine for TrackingLine {
    fn quantity(&self) -> f64 {
        self.quantity
    }
    fn unit_price(&self) -> f64 {
        self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingLineInput {
    pub tracking: i64,
    pub designation: String,
    pub quantity: f64,
    pub unit_price: f64,
}

/// Scoped accessor for `/quotes/trackings/` and `/quotes/tracking-lines/`.
pub struct TrackingApi {
    http: Arc<HttpClient>,
    store: QueryStore,
    documents: Option<Arc<DocumentCache>>,
    highlights: Arc<dyn HighlightStore>,
}

impl TrackingApi {
    pub(crate) fn new(
        http: Arc<HttpClient>,
        store: QueryStore,
        documents: Option<Arc<DocumentCache>>,
        highlights: Arc<dyn HighlightStore>,
    ) -> Self {
        Self {
            http,
            store,
            documents,
            highlights,
        }
    }

    pub fn list_key() -> QueryKey {
        QueryKey::new("quote-trackings")
    }

    pub fn lines_key(tracking_id: i64) -> QueryKey {
        QueryKey::new("tracking-lines").with(tracking_id)
    }

    pub fn watch_list(&self) -> QueryHandle<Vec<QuoteTracking>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::list_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(TRACKINGS_PATH).await }
        })
    }

    pub fn watch_lines(&self, tracking_id: i64) -> QueryHandle<Vec<TrackingLine>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::lines_key(tracking_id), move || {
            let http = Arc::clone(&http);
            async move {
                http.get_list(&format!("{TRACKING_LINES_PATH}?tracking={tracking_id}"))
                    .await
            }
        })
    }

    /// Start tracking a quote.
    pub async fn create(&self, quote_id: i64) -> Result<QuoteTracking> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |quote: i64| {
            let http = Arc::clone(&http);
            async move {
                http.post_json(TRACKINGS_PATH, &serde_json::json!({ "quote": quote }))
                    .await
            }
        })
        .invalidates(Self::list_key())
        .dispatch(quote_id)
        .await
    }

    pub async fn delete(&self, tracking_id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        let result = Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{TRACKINGS_PATH}{id}/")).await }
        })
        .invalidates(Self::list_key())
        .dispatch(tracking_id)
        .await;
        let _ = self.highlights.clear(tracking_id).await;
        result
    }

    // ------------------------------------------------------------------
    // Lines
    // ------------------------------------------------------------------

    /// Mutation updating one line.
    ///
    /// On success the server's line is written straight into the cached
    /// list (the sanctioned optimistic write), then the list is
    /// invalidated so the natural refetch confirms it.
    pub fn update_line_mutation(&self, tracking_id: i64) -> Mutation<TrackingLine, TrackingLine> {
        let http = Arc::clone(&self.http);
        let store = self.store.clone();
        let key = Self::lines_key(tracking_id);
        Mutation::new(self.store.clone(), move |line: TrackingLine| {
            let http = Arc::clone(&http);
            async move {
                http.patch_json(&format!("{TRACKING_LINES_PATH}{}/", line.id), &line)
                    .await
            }
        })
        .on_success(move |updated: &TrackingLine| {
            let updated = updated.clone();
            store.set_data::<Vec<TrackingLine>, _>(&key, move |current| {
                let mut lines = current.map(|l| (*l).clone()).unwrap_or_default();
                match lines.iter_mut().find(|l| l.id == updated.id) {
                    Some(line) => *line = updated,
                    None => lines.push(updated),
                }
                lines
            });
        })
        .invalidates(Self::lines_key(tracking_id))
    }

    /// Update a line and remember it as edited for highlighting.
    pub async fn update_line(&self, line: TrackingLine) -> Result<TrackingLine> {
        let tracking_id = line.tracking;
        let updated = self.update_line_mutation(tracking_id).dispatch(line).await?;
        self.mark(tracking_id, updated.id, Mark::Edited).await?;
        Ok(updated)
    }

    /// Create a line and remember it as added for highlighting.
    pub async fn create_line(&self, input: TrackingLineInput) -> Result<TrackingLine> {
        let http = Arc::clone(&self.http);
        let tracking_id = input.tracking;
        let created: TrackingLine =
            Mutation::new(self.store.clone(), move |input: TrackingLineInput| {
                let http = Arc::clone(&http);
                async move { http.post_json(TRACKING_LINES_PATH, &input).await }
            })
            .invalidates(Self::lines_key(tracking_id))
            .dispatch(input)
            .await?;
        self.mark(tracking_id, created.id, Mark::Added).await?;
        Ok(created)
    }

    pub async fn delete_line(&self, tracking_id: i64, line_id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |line_id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{TRACKING_LINES_PATH}{line_id}/")).await }
        })
        .invalidates(Self::lines_key(tracking_id))
        .dispatch(line_id)
        .await
    }

    // ------------------------------------------------------------------
    // Highlights
    // ------------------------------------------------------------------

    pub async fn highlights(&self, tracking_id: i64) -> Result<HighlightSet> {
        self.highlights.get(tracking_id).await
    }

    pub async fn clear_highlights(&self, tracking_id: i64) -> Result<()> {
        self.highlights.clear(tracking_id).await
    }

    async fn mark(&self, tracking_id: i64, line_id: i64, mark: Mark) -> Result<()> {
        let mut set = self.highlights.get(tracking_id).await?;
        let ids = match mark {
            Mark::Edited => &mut set.edited,
            Mark::Added => &mut set.added,
        };
        if !ids.contains(&line_id) {
            ids.push(line_id);
        }
        self.highlights.set(tracking_id, set).await
    }

    // ------------------------------------------------------------------
    // Delivery note
    // ------------------------------------------------------------------

    /// Generate (or fetch cached) the delivery-note PDF for a quote.
    pub async fn delivery_note(&self, quote_id: i64) -> Result<Arc<Vec<u8>>> {
        if let Some(cache) = &self.documents {
            if let Some(blob) = cache.get(DocumentKind::DeliveryNote, quote_id).await {
                return Ok(blob);
            }
        }
        let blob = self
            .http
            .download(
                reqwest::Method::POST,
                &format!("/quotes/{quote_id}/generate-delivery-note/"),
                Some(serde_json::json!({})),
            )
            .await?;
        match &self.documents {
            Some(cache) => Ok(cache.insert(DocumentKind::DeliveryNote, quote_id, blob).await),
            None => Ok(Arc::new(blob)),
        }
    }
}

enum Mark {
    Edited,
    Added,
}
