//! Reconciliation of the Printful catalog into Directus.
//!
//! [`SyncEngine`] sequences the phases; [`CategoryReconciler`] and
//! [`ProductReconciler`] do the per-record work. Everything here is written
//! against the [`catsync_printful::CatalogSource`] and
//! [`catsync_directus::TargetStore`] traits.

pub mod categories;
pub mod dedup;
pub mod description;
pub mod error;
pub mod merge;
pub mod products;
pub mod slug;
pub mod stats;
pub mod sync;

pub use categories::CategoryReconciler;
pub use error::{ItemError, SyncError};
pub use products::ProductReconciler;
pub use stats::{CategoryStats, CleanupStats, ProductStats, SyncReport, VariantStats};
pub use sync::{SyncEngine, SyncPhase, SyncSettings};
