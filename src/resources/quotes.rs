//! Quotes, their lines and line groups, and quote PDFs.
//!
//! Line and group mutations invalidate both the per-quote line list and
//! the quote list itself: the backend recomputes document totals, and
//! the overview page shows them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::doccache::{DocumentCache, DocumentKind};
use crate::error::Result;
use crate::finance::{DocumentTotals, PricedLine, document_totals};
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const QUOTES_PATH: &str = "/quotes/";
const LINES_PATH: &str = "/quotes/lines/";
const GROUPS_PATH: &str = "/quotes/groups/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    pub number: String,
    pub subject: String,
    pub delivery_date: String,
    pub total_excl_tax: f64,
    pub total_incl_tax: f64,
    pub vat_rate: f64,
    pub project: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteInput {
    pub number: String,
    pub subject: String,
    pub delivery_date: String,
    pub vat_rate: f64,
    pub project: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub id: i64,
    pub quote: i64,
    /// Group membership; ungrouped lines sit directly on the document.
    #[serde(default)]
    pub group: Option<i64>,
    pub designation: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_excl_tax: f64,
}

impl PricedLine for QuoteLine {
    fn quantity(&self) -> f64 {
        self.quantity
    }
    fn unit_price(&self) -> f64 {
        self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLineInput {
    pub quote: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<i64>,
    pub designation: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteGroup {
    pub id: i64,
    pub quote: i64,
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteGroupInput {
    pub quote: i64,
    pub title: String,
    pub position: i32,
}

/// Scoped accessor for `/quotes/` and its nested collections.
pub struct QuotesApi {
    http: Arc<HttpClient>,
    store: QueryStore,
    documents: Option<Arc<DocumentCache>>,
}

impl QuotesApi {
    pub(crate) fn new(
        http: Arc<HttpClient>,
        store: QueryStore,
        documents: Option<Arc<DocumentCache>>,
    ) -> Self {
        Self {
            http,
            store,
            documents,
        }
    }

    pub fn list_key() -> QueryKey {
        QueryKey::new("quotes")
    }

    pub fn lines_key(quote_id: i64) -> QueryKey {
        QueryKey::new("quote-lines").with(quote_id)
    }

    pub fn groups_key(quote_id: i64) -> QueryKey {
        QueryKey::new("quote-groups").with(quote_id)
    }

    pub fn watch_list(&self) -> QueryHandle<Vec<Quote>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::list_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(QUOTES_PATH).await }
        })
    }

    pub fn watch_lines(&self, quote_id: i64) -> QueryHandle<Vec<QuoteLine>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::lines_key(quote_id), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(&format!("{LINES_PATH}?quote={quote_id}")).await }
        })
    }

    pub fn watch_groups(&self, quote_id: i64) -> QueryHandle<Vec<QuoteGroup>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::groups_key(quote_id), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(&format!("{GROUPS_PATH}?quote={quote_id}")).await }
        })
    }

    pub async fn create(&self, input: QuoteInput) -> Result<Quote> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |input: QuoteInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(QUOTES_PATH, &input).await }
        })
        .invalidates(Self::list_key())
        .dispatch(input)
        .await
    }

    pub async fn update(&self, id: i64, input: QuoteInput) -> Result<Quote> {
        let http = Arc::clone(&self.http);
        let result = Mutation::new(self.store.clone(), move |(id, input): (i64, QuoteInput)| {
            let http = Arc::clone(&http);
            async move { http.put_json(&format!("{QUOTES_PATH}{id}/"), &input).await }
        })
        .invalidates(Self::list_key())
        .dispatch((id, input))
        .await;
        self.evict_pdf(id).await;
        result
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        let result = Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{QUOTES_PATH}{id}/")).await }
        })
        .invalidates(Self::list_key())
        .dispatch(id)
        .await;
        self.evict_pdf(id).await;
        result
    }

    // ------------------------------------------------------------------
    // Lines and groups
    // ------------------------------------------------------------------

    pub async fn create_line(&self, input: QuoteLineInput) -> Result<QuoteLine> {
        let http = Arc::clone(&self.http);
        let quote_id = input.quote;
        let result = Mutation::new(self.store.clone(), move |input: QuoteLineInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(LINES_PATH, &input).await }
        })
        .invalidates(Self::lines_key(quote_id))
        .invalidates(Self::list_key())
        .dispatch(input)
        .await;
        self.evict_pdf(quote_id).await;
        result
    }

    pub async fn update_line(&self, line: QuoteLine) -> Result<QuoteLine> {
        let http = Arc::clone(&self.http);
        let quote_id = line.quote;
        let result = Mutation::new(self.store.clone(), move |line: QuoteLine| {
            let http = Arc::clone(&http);
            async move {
                http.patch_json(&format!("{LINES_PATH}{}/", line.id), &line)
                    .await
            }
        })
        .invalidates(Self::lines_key(quote_id))
        .invalidates(Self::list_key())
        .dispatch(line)
        .await;
        self.evict_pdf(quote_id).await;
        result
    }

    pub async fn delete_line(&self, quote_id: i64, line_id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        let result = Mutation::new(self.store.clone(), move |line_id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{LINES_PATH}{line_id}/")).await }
        })
        .invalidates(Self::lines_key(quote_id))
        .invalidates(Self::list_key())
        .dispatch(line_id)
        .await;
        self.evict_pdf(quote_id).await;
        result
    }

    pub async fn create_group(&self, input: QuoteGroupInput) -> Result<QuoteGroup> {
        let http = Arc::clone(&self.http);
        let quote_id = input.quote;
        Mutation::new(self.store.clone(), move |input: QuoteGroupInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(GROUPS_PATH, &input).await }
        })
        .invalidates(Self::groups_key(quote_id))
        .invalidates(Self::lines_key(quote_id))
        .dispatch(input)
        .await
    }

    pub async fn delete_group(&self, quote_id: i64, group_id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |group_id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{GROUPS_PATH}{group_id}/")).await }
        })
        .invalidates(Self::groups_key(quote_id))
        .invalidates(Self::lines_key(quote_id))
        .dispatch(group_id)
        .await
    }

    /// Client-side totals for an edited line set, grouped the way the
    /// document renders them. The backend remains authoritative for the
    /// persisted totals.
    pub fn totals(groups: &[QuoteGroup], lines: &[QuoteLine]) -> DocumentTotals {
        let grouped: Vec<Vec<QuoteLine>> = groups
            .iter()
            .map(|g| {
                lines
                    .iter()
                    .filter(|l| l.group == Some(g.id))
                    .cloned()
                    .collect()
            })
            .collect();
        let ungrouped: Vec<QuoteLine> =
            lines.iter().filter(|l| l.group.is_none()).cloned().collect();
        document_totals(&grouped, &ungrouped)
    }

    // ------------------------------------------------------------------
    // Generated documents
    // ------------------------------------------------------------------

    /// Fetch the quote PDF, consulting the blob cache when configured.
    pub async fn pdf(&self, quote_id: i64) -> Result<Arc<Vec<u8>>> {
        if let Some(cache) = &self.documents {
            if let Some(blob) = cache.get(DocumentKind::QuotePdf, quote_id).await {
                return Ok(blob);
            }
        }
        let blob = self
            .http
            .download(reqwest::Method::GET, &format!("{QUOTES_PATH}{quote_id}/pdf/"), None)
            .await?;
        match &self.documents {
            Some(cache) => Ok(cache.insert(DocumentKind::QuotePdf, quote_id, blob).await),
            None => Ok(Arc::new(blob)),
        }
    }

    async fn evict_pdf(&self, quote_id: i64) {
        if let Some(cache) = &self.documents {
            cache.evict(DocumentKind::QuotePdf, quote_id).await;
            cache.evict(DocumentKind::DeliveryNote, quote_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, group: Option<i64>, quantity: f64, unit_price: f64) -> QuoteLine {
        QuoteLine {
            id,
            quote: 1,
            group,
            designation: format!("line {id}"),
            quantity,
            unit_price,
            total_excl_tax: quantity * unit_price,
        }
    }

    #[test]
    fn totals_split_groups_and_ungrouped() {
        let groups = vec![
            QuoteGroup { id: 10, quote: 1, title: "prep".into(), position: 0 },
            QuoteGroup { id: 11, quote: 1, title: "install".into(), position: 1 },
        ];
        let lines = vec![
            line(1, Some(10), 2.0, 100.0),
            line(2, Some(10), 1.0, 50.0),
            line(3, Some(11), 4.0, 25.0),
            line(4, None, 1.0, 10.0),
        ];
        let totals = QuotesApi::totals(&groups, &lines);
        assert_eq!(totals.group_subtotals, vec![250.0, 100.0]);
        assert_eq!(totals.ungrouped_subtotal, 10.0);
        assert_eq!(totals.grand_total, 360.0);
    }
}
