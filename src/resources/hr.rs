//! HR cost estimation table.
//!
//! The whole table is saved in one bulk call and cleared in one call;
//! the row arithmetic lives in [`crate::finance`].

use std::sync::Arc;

use crate::error::Result;
use crate::finance::EstimationRow;
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const HR_ESTIMATION_PATH: &str = "/hr-estimation/";

/// Scoped accessor for `/hr-estimation/`.
pub struct HrEstimationApi {
    http: Arc<HttpClient>,
    store: QueryStore,
}

impl HrEstimationApi {
    pub(crate) fn new(http: Arc<HttpClient>, store: QueryStore) -> Self {
        Self { http, store }
    }

    pub fn rows_key() -> QueryKey {
        QueryKey::new("hr-estimation")
    }

    pub fn watch_rows(&self) -> QueryHandle<Vec<EstimationRow>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::rows_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(HR_ESTIMATION_PATH).await }
        })
    }

    /// Mutation replacing the whole table. Exposed so a form can watch
    /// `is_in_flight()` to disable its save control.
    pub fn save_mutation(&self) -> Mutation<Vec<EstimationRow>, Vec<EstimationRow>> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |rows: Vec<EstimationRow>| {
            let http = Arc::clone(&http);
            async move {
                http.post_json(&format!("{HR_ESTIMATION_PATH}bulk_update_rows/"), &rows)
                    .await
            }
        })
        .invalidates(Self::rows_key())
    }

    pub async fn save(&self, rows: Vec<EstimationRow>) -> Result<Vec<EstimationRow>> {
        self.save_mutation().dispatch(rows).await
    }

    /// Empty the table server-side.
    pub async fn clear(&self) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |_: ()| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{HR_ESTIMATION_PATH}clear_all/")).await }
        })
        .invalidates(Self::rows_key())
        .dispatch(())
        .await
    }
}
