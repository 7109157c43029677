//! In-app notifications.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const NOTIFICATIONS_PATH: &str = "/notifications/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Info,
    Warning,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
    pub kind: NotificationKind,
}

/// Scoped accessor for `/notifications/`.
pub struct NotificationsApi {
    http: Arc<HttpClient>,
    store: QueryStore,
}

impl NotificationsApi {
    pub(crate) fn new(http: Arc<HttpClient>, store: QueryStore) -> Self {
        Self { http, store }
    }

    pub fn list_key() -> QueryKey {
        QueryKey::new("notifications")
    }

    pub fn watch_list(&self) -> QueryHandle<Vec<Notification>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::list_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(NOTIFICATIONS_PATH).await }
        })
    }

    pub async fn mark_read(&self, id: i64) -> Result<Notification> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move {
                http.patch_json(
                    &format!("{NOTIFICATIONS_PATH}{id}/"),
                    &serde_json::json!({ "is_read": true }),
                )
                .await
            }
        })
        .invalidates(Self::list_key())
        .dispatch(id)
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{NOTIFICATIONS_PATH}{id}/")).await }
        })
        .invalidates(Self::list_key())
        .dispatch(id)
        .await
    }
}
