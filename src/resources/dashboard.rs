//! Dashboard KPIs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::http::HttpClient;
use crate::sync::{QueryHandle, QueryKey, QueryStore};

const KPIS_PATH: &str = "/dashboard/kpis/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: String,
    #[serde(default)]
    pub quotes_amount: f64,
    #[serde(default)]
    pub invoices_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardKpis {
    #[serde(default)]
    pub total_projects: i64,
    #[serde(default)]
    pub active_projects: i64,
    #[serde(default)]
    pub total_quotes_amount: f64,
    #[serde(default)]
    pub total_invoices_amount: f64,
    #[serde(default)]
    pub monthly_evolution: Vec<MonthlyPoint>,
}

/// Scoped accessor for `/dashboard/kpis/`.
pub struct DashboardApi {
    http: Arc<HttpClient>,
    store: QueryStore,
}

impl DashboardApi {
    pub(crate) fn new(http: Arc<HttpClient>, store: QueryStore) -> Self {
        Self { http, store }
    }

    pub fn kpis_key() -> QueryKey {
        QueryKey::new("kpis")
    }

    pub fn watch_kpis(&self) -> QueryHandle<DashboardKpis> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::kpis_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_json(KPIS_PATH).await }
        })
    }
}
