//! Client invoices, created from accepted quotes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const INVOICES_PATH: &str = "/invoices/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub number: String,
    pub quote: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceInput {
    pub quote: i64,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_reference: Option<String>,
}

/// Scoped accessor for `/invoices/`.
pub struct InvoicesApi {
    http: Arc<HttpClient>,
    store: QueryStore,
}

impl InvoicesApi {
    pub(crate) fn new(http: Arc<HttpClient>, store: QueryStore) -> Self {
        Self { http, store }
    }

    pub fn list_key() -> QueryKey {
        QueryKey::new("invoices")
    }

    pub fn watch_list(&self) -> QueryHandle<Vec<Invoice>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::list_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(INVOICES_PATH).await }
        })
    }

    /// Invoice a quote. The dashboard KPIs include invoiced amounts, so
    /// they refetch alongside the invoice history.
    pub async fn create(&self, input: InvoiceInput) -> Result<Invoice> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |input: InvoiceInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(INVOICES_PATH, &input).await }
        })
        .invalidates(Self::list_key())
        .invalidates(QueryKey::new("kpis"))
        .dispatch(input)
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{INVOICES_PATH}{id}/")).await }
        })
        .invalidates(Self::list_key())
        .invalidates(QueryKey::new("kpis"))
        .dispatch(id)
        .await
    }
}
