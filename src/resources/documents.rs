//! Project documents: listing, multipart upload, deletion.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const DOCUMENTS_PATH: &str = "/documents/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub file_url: String,
    pub project: i64,
    pub created_at: String,
}

/// Upload payload: metadata plus the file bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentUpload {
    pub name: String,
    pub kind: String,
    pub project: i64,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Scoped accessor for `/documents/`.
pub struct DocumentsApi {
    http: Arc<HttpClient>,
    store: QueryStore,
}

impl DocumentsApi {
    pub(crate) fn new(http: Arc<HttpClient>, store: QueryStore) -> Self {
        Self { http, store }
    }

    pub fn list_key() -> QueryKey {
        QueryKey::new("documents")
    }

    pub fn watch_list(&self) -> QueryHandle<Vec<Document>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::list_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(DOCUMENTS_PATH).await }
        })
    }

    /// Multipart upload. The form is rebuilt if the request goes through
    /// the 401 retry cycle.
    pub async fn upload(&self, upload: DocumentUpload) -> Result<Document> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |upload: DocumentUpload| {
            let http = Arc::clone(&http);
            async move {
                http.upload(DOCUMENTS_PATH, || {
                    Form::new()
                        .text("name", upload.name.clone())
                        .text("kind", upload.kind.clone())
                        .text("project", upload.project.to_string())
                        .part(
                            "file",
                            Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone()),
                        )
                })
                .await
            }
        })
        .invalidates(Self::list_key())
        .dispatch(upload)
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{DOCUMENTS_PATH}{id}/")).await }
        })
        .invalidates(Self::list_key())
        .dispatch(id)
        .await
    }
}
