//! Hermod - typed client and data-synchronization layer for a
//! business-management REST backend
//!
//! Every screen of the management front end follows the same pattern:
//! subscribe to a list, render it, submit a mutation, refetch what the
//! mutation made stale. This crate packages that pattern: an
//! authenticating HTTP adapter with a single 401 refresh-and-retry
//! cycle, a keyed query cache with request de-duplication and
//! stale-while-revalidate reads, a mutation runner that drives the
//! declared invalidations, and the pure financial calculations the
//! forms derive live.
//!
//! # Example
//!
//! ```rust,no_run
//! use hermod::Hermod;
//!
//! #[tokio::main]
//! async fn main() -> hermod::Result<()> {
//!     let client = Hermod::builder()
//!         .base_url("https://erp.example.com/api/")
//!         .build()?;
//!
//!     client.login("admin", "secret").await?;
//!
//!     let mut invoices = client.invoices().watch_list();
//!     let snapshot = invoices.ready().await;
//!     for invoice in snapshot.data.iter().flat_map(|list| list.iter()) {
//!         println!("{} ({})", invoice.number, invoice.created_at);
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
mod client;
#[cfg(feature = "cli")]
pub mod config;
pub mod doccache;
pub mod error;
pub mod finance;
pub mod highlight;
pub mod http;
pub mod resources;
pub mod sync;
pub mod telemetry;
pub mod version;

// Re-export main types at crate root
pub use auth::{AuthSession, SessionEvent, SignOutReason, TokenPair};
pub use client::{ApiClient, Hermod, HermodBuilder};
pub use doccache::{DocumentCache, DocumentCacheConfig, DocumentKind};
pub use error::{HermodError, Result};
pub use highlight::{HighlightSet, HighlightStore, JsonFileHighlightStore, MemoryHighlightStore};
pub use http::{HttpClient, HttpConfig};
pub use sync::{
    Mutation, QueryHandle, QueryKey, QuerySnapshot, QueryStatus, QueryStore, WatchOptions,
};
pub use version::PKG_VERSION;
