//! Client (customer) directory.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const CLIENTS_PATH: &str = "/clients/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientKind {
    Individual,
    Company,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub kind: ClientKind,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub status: ClientStatus,
    pub created_at: String,
}

/// Create/update payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInput {
    pub name: String,
    pub kind: ClientKind,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub status: ClientStatus,
}

/// Scoped accessor for `/clients/`.
pub struct ClientsApi {
    http: Arc<HttpClient>,
    store: QueryStore,
}

impl ClientsApi {
    pub(crate) fn new(http: Arc<HttpClient>, store: QueryStore) -> Self {
        Self { http, store }
    }

    /// Cache key of the client list.
    pub fn list_key() -> QueryKey {
        QueryKey::new("clients")
    }

    /// Subscribe to the client list.
    pub fn watch_list(&self) -> QueryHandle<Vec<Client>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::list_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(CLIENTS_PATH).await }
        })
    }

    /// Mutation creating a client; invalidates the list on success.
    pub fn create_mutation(&self) -> Mutation<ClientInput, Client> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |input: ClientInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(CLIENTS_PATH, &input).await }
        })
        .invalidates(Self::list_key())
    }

    pub async fn create(&self, input: ClientInput) -> Result<Client> {
        self.create_mutation().dispatch(input).await
    }

    pub async fn update(&self, id: i64, input: ClientInput) -> Result<Client> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |(id, input): (i64, ClientInput)| {
            let http = Arc::clone(&http);
            async move { http.put_json(&format!("{CLIENTS_PATH}{id}/"), &input).await }
        })
        .invalidates(Self::list_key())
        .dispatch((id, input))
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{CLIENTS_PATH}{id}/")).await }
        })
        .invalidates(Self::list_key())
        .dispatch(id)
        .await
    }
}
