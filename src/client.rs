//! Builder and the assembled API client.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::auth::{AuthSession, SignOutReason, TokenPair};
use crate::doccache::{DocumentCache, DocumentCacheConfig};
use crate::error::Result;
use crate::highlight::{HighlightStore, MemoryHighlightStore};
use crate::http::{HttpClient, HttpConfig};
use crate::resources::{
    BudgetApi, ClientsApi, DashboardApi, DocumentsApi, HrEstimationApi, InvoicesApi,
    NotificationsApi, PayrollApi, ProjectsApi, QuotesApi, SuppliersApi, TrackingApi, UsersApi,
};
use crate::sync::QueryStore;

const AUTH_LOGIN_PATH: &str = "/auth/login/";

/// Main entry point for creating client instances.
pub struct Hermod;

impl Hermod {
    /// Create a new builder for configuring the client.
    pub fn builder() -> HermodBuilder {
        HermodBuilder::new()
    }
}

/// Builder for configuring client instances.
pub struct HermodBuilder {
    http: HttpConfig,
    tokens: Option<TokenPair>,
    gc_grace: Option<Duration>,
    document_cache: Option<DocumentCacheConfig>,
    highlight_store: Option<Arc<dyn HighlightStore>>,
}

impl HermodBuilder {
    pub fn new() -> Self {
        Self {
            http: HttpConfig::default(),
            tokens: None,
            gc_grace: None,
            document_cache: None,
            highlight_store: None,
        }
    }

    /// API root URL (default: `HERMOD_API_URL` or the local backend).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.http.base_url = url.into();
        self
    }

    /// Per-request timeout (default: 30s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = timeout;
        self
    }

    /// Start the session from a stored token pair.
    pub fn tokens(mut self, tokens: TokenPair) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Override the query-entry GC grace period.
    pub fn gc_grace(mut self, grace: Duration) -> Self {
        self.gc_grace = Some(grace);
        self
    }

    /// Enable the generated-document blob cache. Without this call no
    /// cache is allocated and every PDF request hits the network.
    pub fn document_cache(mut self, config: DocumentCacheConfig) -> Self {
        self.document_cache = Some(config);
        self
    }

    /// Persistence backend for tracking-line highlights (default: in
    /// memory, lost on exit).
    pub fn highlight_store(mut self, store: Arc<dyn HighlightStore>) -> Self {
        self.highlight_store = Some(store);
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let auth = match self.tokens {
            Some(tokens) => AuthSession::with_tokens(tokens),
            None => AuthSession::new(),
        };
        let http = Arc::new(HttpClient::new(&self.http, auth.clone())?);
        let store = match self.gc_grace {
            Some(grace) => QueryStore::with_gc_grace(grace),
            None => QueryStore::new(),
        };
        let documents = self
            .document_cache
            .map(|config| Arc::new(DocumentCache::new(&config)));
        let highlights = self
            .highlight_store
            .unwrap_or_else(|| Arc::new(MemoryHighlightStore::new()));
        Ok(ApiClient {
            http,
            store,
            auth,
            documents,
            highlights,
        })
    }
}

impl Default for HermodBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
}

/// The assembled client: HTTP adapter, query store, session, and the
/// per-domain resource accessors. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ApiClient {
    http: Arc<HttpClient>,
    store: QueryStore,
    auth: AuthSession,
    documents: Option<Arc<DocumentCache>>,
    highlights: Arc<dyn HighlightStore>,
}

impl ApiClient {
    /// The shared query store (for ad hoc keys and tests).
    pub fn store(&self) -> &QueryStore {
        &self.store
    }

    /// The auth session: token state and sign-in/out events.
    pub fn session(&self) -> &AuthSession {
        &self.auth
    }

    /// Exchange credentials for a token pair and sign the session in.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let response: LoginResponse = self
            .http
            .post_json(
                AUTH_LOGIN_PATH,
                &serde_json::json!({ "username": username, "password": password }),
            )
            .await?;
        self.auth
            .sign_in(TokenPair::new(response.access, response.refresh));
        Ok(())
    }

    /// Clear the session.
    pub fn logout(&self) {
        self.auth.sign_out(SignOutReason::Logout);
    }

    // ------------------------------------------------------------------
    // Resource accessors
    // ------------------------------------------------------------------

    pub fn clients(&self) -> ClientsApi {
        ClientsApi::new(Arc::clone(&self.http), self.store.clone())
    }

    pub fn projects(&self) -> ProjectsApi {
        ProjectsApi::new(Arc::clone(&self.http), self.store.clone())
    }

    pub fn quotes(&self) -> QuotesApi {
        QuotesApi::new(
            Arc::clone(&self.http),
            self.store.clone(),
            self.documents.clone(),
        )
    }

    pub fn tracking(&self) -> TrackingApi {
        TrackingApi::new(
            Arc::clone(&self.http),
            self.store.clone(),
            self.documents.clone(),
            Arc::clone(&self.highlights),
        )
    }

    pub fn payroll(&self) -> PayrollApi {
        PayrollApi::new(Arc::clone(&self.http), self.store.clone())
    }

    pub fn budget(&self) -> BudgetApi {
        BudgetApi::new(Arc::clone(&self.http), self.store.clone())
    }

    pub fn suppliers(&self) -> SuppliersApi {
        SuppliersApi::new(Arc::clone(&self.http), self.store.clone())
    }

    pub fn invoices(&self) -> InvoicesApi {
        InvoicesApi::new(Arc::clone(&self.http), self.store.clone())
    }

    pub fn documents(&self) -> DocumentsApi {
        DocumentsApi::new(Arc::clone(&self.http), self.store.clone())
    }

    pub fn notifications(&self) -> NotificationsApi {
        NotificationsApi::new(Arc::clone(&self.http), self.store.clone())
    }

    pub fn hr_estimation(&self) -> HrEstimationApi {
        HrEstimationApi::new(Arc::clone(&self.http), self.store.clone())
    }

    pub fn dashboard(&self) -> DashboardApi {
        DashboardApi::new(Arc::clone(&self.http), self.store.clone())
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(Arc::clone(&self.http), self.store.clone())
    }
}
