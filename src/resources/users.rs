//! User accounts (administration screen).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const USERS_PATH: &str = "/auth/users/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    /// Only sent on creation or password change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Scoped accessor for `/auth/users/`.
pub struct UsersApi {
    http: Arc<HttpClient>,
    store: QueryStore,
}

impl UsersApi {
    pub(crate) fn new(http: Arc<HttpClient>, store: QueryStore) -> Self {
        Self { http, store }
    }

    pub fn list_key() -> QueryKey {
        QueryKey::new("users")
    }

    pub fn watch_list(&self) -> QueryHandle<Vec<UserAccount>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::list_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(USERS_PATH).await }
        })
    }

    pub async fn create(&self, input: UserInput) -> Result<UserAccount> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |input: UserInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(USERS_PATH, &input).await }
        })
        .invalidates(Self::list_key())
        .dispatch(input)
        .await
    }

    pub async fn update(&self, id: i64, input: UserInput) -> Result<UserAccount> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |(id, input): (i64, UserInput)| {
            let http = Arc::clone(&http);
            async move { http.put_json(&format!("{USERS_PATH}{id}/"), &input).await }
        })
        .invalidates(Self::list_key())
        .dispatch((id, input))
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{USERS_PATH}{id}/")).await }
        })
        .invalidates(Self::list_key())
        .dispatch(id)
        .await
    }
}
