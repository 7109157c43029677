//! Suppliers and supplier invoices.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const SUPPLIERS_PATH: &str = "/suppliers/";
const SUPPLIER_INVOICES_PATH: &str = "/suppliers/invoices/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierKind {
    Large,
    Small,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub kind: SupplierKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    pub kind: SupplierKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierInvoice {
    pub id: i64,
    pub supplier: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_name: Option<String>,
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierInvoiceInput {
    pub supplier: i64,
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Scoped accessor for `/suppliers/`.
pub struct SuppliersApi {
    http: Arc<HttpClient>,
    store: QueryStore,
}

impl SuppliersApi {
    pub(crate) fn new(http: Arc<HttpClient>, store: QueryStore) -> Self {
        Self { http, store }
    }

    pub fn list_key() -> QueryKey {
        QueryKey::new("suppliers")
    }

    pub fn invoices_key() -> QueryKey {
        QueryKey::new("supplier-invoices")
    }

    pub fn watch_list(&self) -> QueryHandle<Vec<Supplier>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::list_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(SUPPLIERS_PATH).await }
        })
    }

    pub fn watch_invoices(&self) -> QueryHandle<Vec<SupplierInvoice>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::invoices_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(SUPPLIER_INVOICES_PATH).await }
        })
    }

    pub async fn create(&self, input: SupplierInput) -> Result<Supplier> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |input: SupplierInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(SUPPLIERS_PATH, &input).await }
        })
        .invalidates(Self::list_key())
        .dispatch(input)
        .await
    }

    pub async fn update(&self, id: i64, input: SupplierInput) -> Result<Supplier> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |(id, input): (i64, SupplierInput)| {
            let http = Arc::clone(&http);
            async move { http.put_json(&format!("{SUPPLIERS_PATH}{id}/"), &input).await }
        })
        .invalidates(Self::list_key())
        .dispatch((id, input))
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{SUPPLIERS_PATH}{id}/")).await }
        })
        .invalidates(Self::list_key())
        .invalidates(Self::invoices_key())
        .dispatch(id)
        .await
    }

    /// Record a purchase invoice. The supplier list refetches too so
    /// aggregate purchase columns stay current.
    pub async fn create_invoice(&self, input: SupplierInvoiceInput) -> Result<SupplierInvoice> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |input: SupplierInvoiceInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(SUPPLIER_INVOICES_PATH, &input).await }
        })
        .invalidates(Self::invoices_key())
        .invalidates(Self::list_key())
        .dispatch(input)
        .await
    }

    pub async fn update_invoice(
        &self,
        id: i64,
        input: SupplierInvoiceInput,
    ) -> Result<SupplierInvoice> {
        let http = Arc::clone(&self.http);
        Mutation::new(
            self.store.clone(),
            move |(id, input): (i64, SupplierInvoiceInput)| {
                let http = Arc::clone(&http);
                async move {
                    http.put_json(&format!("{SUPPLIER_INVOICES_PATH}{id}/"), &input)
                        .await
                }
            },
        )
        .invalidates(Self::invoices_key())
        .invalidates(Self::list_key())
        .dispatch((id, input))
        .await
    }

    pub async fn delete_invoice(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{SUPPLIER_INVOICES_PATH}{id}/")).await }
        })
        .invalidates(Self::invoices_key())
        .invalidates(Self::list_key())
        .dispatch(id)
        .await
    }
}
