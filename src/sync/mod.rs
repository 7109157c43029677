//! Data-synchronisation layer.
//!
//! Three cooperating pieces keep every view consistent with the backend
//! without duplicate requests or stale screens:
//!
//! - [`QueryKey`] — structural identifier tuple for one logical data
//!   dependency (resource name plus parameters).
//!
//! - [`QueryStore`] — keyed cache of `{status, data, error}` entries
//!   with subscription-based fetch de-duplication, stale-while-
//!   revalidate reads, manual invalidation and a direct-write escape
//!   hatch. See the [`QueryStore`] docs for the exact guarantees.
//!
//! - [`Mutation`] — a write operation paired with the cache keys it
//!   makes stale; on success the store refetches them wherever
//!   subscribed.

mod key;
mod mutation;
mod store;

pub use key::{KeyPart, QueryKey};
pub use mutation::Mutation;
pub use store::{
    DEFAULT_GC_GRACE, QueryHandle, QuerySnapshot, QueryStatus, QueryStore, WatchOptions,
};
