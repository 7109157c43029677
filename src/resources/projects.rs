//! Projects and their revenue records.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::finance::revenue_remaining;
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const PROJECTS_PATH: &str = "/projects/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub status: String,
    pub budget_total: f64,
    pub client: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    pub manager: String,
    /// Advance received so far, when the backend expands revenue state.
    #[serde(default)]
    pub advance_paid: Option<f64>,
    #[serde(default)]
    pub amount_pending: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInput {
    pub name: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub status: String,
    pub budget_total: f64,
    pub client: i64,
    pub manager: String,
}

/// Revenue update: the pending amount is always derived, never typed in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueUpdate {
    pub advance_paid: f64,
    pub amount_pending: f64,
}

impl RevenueUpdate {
    /// Build from the advance, recomputing the clamped remainder the way
    /// the revenue form does on every keystroke.
    pub fn from_advance(budget_total: f64, advance_paid: f64) -> Self {
        Self {
            advance_paid,
            amount_pending: revenue_remaining(budget_total, advance_paid),
        }
    }
}

/// Scoped accessor for `/projects/`.
pub struct ProjectsApi {
    http: Arc<HttpClient>,
    store: QueryStore,
}

impl ProjectsApi {
    pub(crate) fn new(http: Arc<HttpClient>, store: QueryStore) -> Self {
        Self { http, store }
    }

    pub fn list_key() -> QueryKey {
        QueryKey::new("projects")
    }

    pub fn watch_list(&self) -> QueryHandle<Vec<Project>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::list_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(PROJECTS_PATH).await }
        })
    }

    pub async fn create(&self, input: ProjectInput) -> Result<Project> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |input: ProjectInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(PROJECTS_PATH, &input).await }
        })
        .invalidates(Self::list_key())
        .dispatch(input)
        .await
    }

    pub async fn update(&self, id: i64, input: ProjectInput) -> Result<Project> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |(id, input): (i64, ProjectInput)| {
            let http = Arc::clone(&http);
            async move { http.put_json(&format!("{PROJECTS_PATH}{id}/"), &input).await }
        })
        .invalidates(Self::list_key())
        .dispatch((id, input))
        .await
    }

    /// Record an advance payment; the clamped remainder rides along.
    pub async fn update_revenue(&self, id: i64, update: RevenueUpdate) -> Result<Project> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |(id, update): (i64, RevenueUpdate)| {
            let http = Arc::clone(&http);
            async move { http.patch_json(&format!("{PROJECTS_PATH}{id}/"), &update).await }
        })
        .invalidates(Self::list_key())
        .dispatch((id, update))
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{PROJECTS_PATH}{id}/")).await }
        })
        .invalidates(Self::list_key())
        .dispatch(id)
        .await
    }
}
